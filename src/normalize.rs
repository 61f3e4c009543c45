//! Free-text model answers -> bounded integer categories.
//!
//! Rules are tried in order and the first one that yields a value in range wins:
//! `N:` labels (mean of all in 1..=12), `Category N`, `Option N`, a bare number,
//! then the mean of every number in 0..=12 anywhere in the text. Nothing found
//! gives [`NO_ANSWER`].

use once_cell::sync::Lazy;
use regex::Regex;

/// Highest category any survey item uses.
pub const MAX_CATEGORY: u8 = 12;

/// Sentinel for "no valid value extracted".
pub const NO_ANSWER: u8 = 0;

// `\d` is Unicode-aware: any decimal digit (Nd), not just ASCII
static COLON_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d+):").unwrap());
static CATEGORY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Category\s+(\d+)").unwrap());
static OPTION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Option\s+(\d+)").unwrap());
static BARE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(\d+)\s*$").unwrap());
static NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());
static DIGIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d$").unwrap());

pub fn normalize(text: &str) -> u8 {
    let labelled: Vec<u8> = COLON_RE
        .captures_iter(text)
        .filter_map(|c| in_range(&c[1], 1))
        .collect();
    if let Some(v) = rounded_mean(&labelled) {
        return v;
    }

    for re in [&*CATEGORY_RE, &*OPTION_RE, &*BARE_RE] {
        if let Some(v) = re.captures(text).and_then(|c| in_range(&c[1], 0)) {
            return v;
        }
    }

    let loose: Vec<u8> = NUMBER_RE
        .find_iter(text)
        .filter_map(|m| in_range(m.as_str(), 0))
        .collect();
    rounded_mean(&loose).unwrap_or(NO_ANSWER)
}

// digits that overflow u64 are just out of range
fn in_range(digits: &str, min: u8) -> Option<u8> {
    let n = parse_digits(digits)?;
    (u64::from(min)..=u64::from(MAX_CATEGORY))
        .contains(&n)
        .then_some(n as u8)
}

fn parse_digits(digits: &str) -> Option<u64> {
    digits.chars().try_fold(0u64, |n, c| {
        n.checked_mul(10)?.checked_add(u64::from(digit_value(c)?))
    })
}

fn is_decimal(c: char) -> bool {
    let mut buf = [0u8; 4];
    DIGIT_RE.is_match(c.encode_utf8(&mut buf))
}

/// Value of a decimal digit in any script. Unicode encodes each script's
/// digits as a contiguous 0..=9 run, so the value is the offset into the run.
fn digit_value(c: char) -> Option<u32> {
    if let Some(d) = c.to_digit(10) {
        return Some(d);
    }
    if !is_decimal(c) {
        return None;
    }
    let mut offset = 0u32;
    let mut cp = u32::from(c);
    while let Some(prev) = cp.checked_sub(1).and_then(char::from_u32) {
        if !is_decimal(prev) {
            break;
        }
        offset += 1;
        cp -= 1;
    }
    Some(offset % 10)
}

/// Mean rounded half-to-even, so "2: ..., 3: ..." gives 2 and "3: ..., 4: ..." gives 4.
fn rounded_mean(values: &[u8]) -> Option<u8> {
    if values.is_empty() {
        return None;
    }
    let sum: u32 = values.iter().map(|&v| u32::from(v)).sum();
    let mean = f64::from(sum) / values.len() as f64;
    Some(mean.round_ties_even() as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documented_examples() {
        assert_eq!(normalize("Category 7"), 7);
        assert_eq!(normalize("Option 0"), 0);
        assert_eq!(normalize("  5  "), 5);
        assert_eq!(normalize("no valid info"), 0);
        assert_eq!(normalize("3: strongly agree"), 3);
        assert_eq!(normalize("4: agree, 6: disagree"), 5);
    }

    #[test]
    fn colon_rule_ignores_zero_and_out_of_range_labels() {
        // 0 and 13 are not valid labels, only 8 survives
        assert_eq!(normalize("0: none, 13: other, 8: mostly"), 8);
        // no valid label -> falls through to the loose rule: mean(0) = 0
        assert_eq!(normalize("0: none"), 0);
    }

    #[test]
    fn colon_rule_beats_category_keyword() {
        assert_eq!(normalize("Category 2 because 9: fits best"), 9);
    }

    #[test]
    fn category_out_of_range_falls_through() {
        // Category 40 rejected, Option 6 accepted
        assert_eq!(normalize("Category 40 or Option 6"), 6);
    }

    #[test]
    fn keywords_are_case_sensitive() {
        // "category" lower case is not a keyword, loose rule averages 2 and 11
        assert_eq!(normalize("category 2 of 11"), 6);
    }

    #[test]
    fn bare_number_out_of_range() {
        assert_eq!(normalize("99"), 0);
        assert_eq!(normalize("12\n"), 12);
    }

    #[test]
    fn loose_rule_rounds_half_to_even() {
        assert_eq!(normalize("between 2 and 3"), 2);
        assert_eq!(normalize("between 3 and 4"), 4);
    }

    #[test]
    fn huge_numbers_do_not_panic() {
        assert_eq!(normalize("99999999999999999999999999: x"), 0);
        assert_eq!(normalize("Category 184467440737095516160"), 0);
    }

    #[test]
    fn error_text_maps_to_sentinel() {
        assert_eq!(normalize("Error occurred during LLM call"), NO_ANSWER);
    }

    #[test]
    fn digits_from_other_scripts() {
        // Arabic-Indic
        assert_eq!(normalize("Category \u{663}"), 3);
        assert_eq!(normalize("\u{664}: agree, \u{666}: disagree"), 5);
        // fullwidth 12
        assert_eq!(normalize("\u{FF11}\u{FF12}"), 12);
        // mathematical double-struck nine sits 19 places into its digit block
        assert_eq!(normalize("Option \u{1D7E1}"), 9);
        // superscript two is numeric but not a decimal digit
        assert_eq!(normalize("\u{B2}"), 0);
    }

    #[test]
    fn output_always_in_range() {
        let samples = [
            "", " ", ":", "12:", "1: a 12: b 12: c", "I'd say 7, maybe 8", "-3", "3.5",
            "Option  12", "Category\t11", "ünïcödé 5", "1000 7",
        ];
        for s in samples {
            assert!(normalize(s) <= MAX_CATEGORY, "{s:?}");
        }
    }
}
