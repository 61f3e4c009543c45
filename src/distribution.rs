//! Discrete distributions over survey categories and the divergence /
//! goodness-of-fit statistics between a reference and a model side.
//!
//! All statistics add a small epsilon to avoid `log(0)` and division by zero,
//! so KL, JS and chi-square are approximations of the exact quantities.

use std::collections::{BTreeMap, BTreeSet};

use itertools::Itertools;

use crate::error::{EvalError, Result};
use crate::stats;

pub const DEFAULT_EPSILON: f64 = 1e-10;

/// Empirical distribution of one question's answers, keyed by category.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Distribution {
    counts: BTreeMap<u32, usize>,
    total: usize,
}

impl Distribution {
    pub fn from_samples<I: IntoIterator<Item = u32>>(samples: I) -> Self {
        let counts: BTreeMap<u32, usize> = samples.into_iter().counts().into_iter().collect();
        let total = counts.values().sum();
        Self { counts, total }
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn categories(&self) -> impl Iterator<Item = u32> + '_ {
        self.counts.keys().copied()
    }

    pub fn count(&self, category: u32) -> usize {
        self.counts.get(&category).copied().unwrap_or(0)
    }

    /// Probability mass of `category`, 0 for categories never observed.
    pub fn prob(&self, category: u32) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.count(category) as f64 / self.total as f64
    }

    /// Most frequent category; ties go to the smallest category.
    pub fn mode(&self) -> Option<u32> {
        // BTreeMap iterates ascending, max_by_key keeps the last max, so reverse
        self.counts
            .iter()
            .rev()
            .max_by_key(|(_, &n)| n)
            .map(|(&c, _)| c)
    }

    /// Rank of each observed category by descending frequency, average rank for ties.
    pub fn frequency_ranks(&self) -> BTreeMap<u32, f64> {
        let cats: Vec<u32> = self.counts.keys().copied().collect();
        let freqs: Vec<f64> = self.counts.values().map(|&n| n as f64).collect();
        cats.into_iter()
            .zip(stats::average_ranks(&freqs, true))
            .collect()
    }

    /// Probabilities laid out along `support`, 0 where unobserved.
    pub fn reindex(&self, support: &[u32]) -> Vec<f64> {
        support.iter().map(|&c| self.prob(c)).collect()
    }

    pub fn mean(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        let sum: f64 = self.counts.iter().map(|(&c, &n)| f64::from(c) * n as f64).sum();
        Some(sum / self.total as f64)
    }
}

/// Sorted union of the categories seen on either side.
pub fn union_support(a: &Distribution, b: &Distribution) -> Vec<u32> {
    a.categories()
        .chain(b.categories())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// `sum(p * ln(p / q))` with `epsilon` added to both sides.
pub fn kl_divergence(p: &[f64], q: &[f64], epsilon: f64) -> f64 {
    p.iter()
        .zip(q)
        .map(|(&p, &q)| {
            let (p, q) = (p + epsilon, q + epsilon);
            p * (p / q).ln()
        })
        .sum()
}

/// Jensen-Shannon divergence against the mixture `m = (p + q) / 2`, smoothed
/// the same way as [`kl_divergence`].
pub fn js_divergence(p: &[f64], q: &[f64], epsilon: f64) -> f64 {
    let p: Vec<f64> = p.iter().map(|v| v + epsilon).collect();
    let q: Vec<f64> = q.iter().map(|v| v + epsilon).collect();
    let m: Vec<f64> = p.iter().zip(&q).map(|(a, b)| 0.5 * (a + b)).collect();
    0.5 * kl_divergence(&p, &m, epsilon) + 0.5 * kl_divergence(&q, &m, epsilon)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChiSquare {
    pub statistic: f64,
    /// `None` with a single category (zero degrees of freedom).
    pub p_value: Option<f64>,
}

/// Pearson goodness of fit of `observed` against `expected`; zero expected
/// cells are replaced with `epsilon`.
pub fn chi_square(observed: &[f64], expected: &[f64], epsilon: f64) -> Result<ChiSquare> {
    if observed.is_empty() || observed.len() != expected.len() {
        return Err(EvalError::Degenerate(format!(
            "chi-square needs matching non-empty vectors, got {} and {}",
            observed.len(),
            expected.len()
        )));
    }
    let expected: Vec<f64> = expected
        .iter()
        .map(|&e| if e == 0.0 { epsilon } else { e })
        .collect();
    if observed.iter().chain(&expected).any(|v| !v.is_finite() || *v < 0.0) {
        return Err(EvalError::Degenerate("chi-square input is not finite".into()));
    }

    let obs_sum: f64 = observed.iter().sum();
    let exp_sum: f64 = expected.iter().sum();
    // frequencies must describe the same total
    let rel = (obs_sum - exp_sum).abs() / obs_sum.min(exp_sum);
    if !rel.is_finite() || rel > 1e-8 {
        return Err(EvalError::Degenerate(format!(
            "observed sum {obs_sum} and expected sum {exp_sum} differ"
        )));
    }

    let statistic: f64 = observed
        .iter()
        .zip(&expected)
        .map(|(o, e)| (o - e).powi(2) / e)
        .sum();
    let dof = observed.len() - 1;
    let p_value = (dof > 0).then(|| stats::chi_square_sf(statistic, dof as f64));
    Ok(ChiSquare { statistic, p_value })
}

/// All divergence statistics for one (subgroup, question).
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub support: Vec<u32>,
    pub kl: f64,
    pub js: f64,
    /// `Err` when the goodness-of-fit test is degenerate for this input.
    pub chi_square: std::result::Result<ChiSquare, String>,
}

#[derive(Debug, Clone, Copy)]
pub struct Comparator {
    pub epsilon: f64,
}

impl Default for Comparator {
    fn default() -> Self {
        Self { epsilon: DEFAULT_EPSILON }
    }
}

impl Comparator {
    pub fn new(epsilon: f64) -> Self {
        Self { epsilon }
    }

    /// Compare a model distribution against the survey reference.
    ///
    /// KL is `KL(reference || model)`; chi-square treats the model as observed
    /// and the reference as expected.
    pub fn compare(&self, reference: &Distribution, model: &Distribution) -> Result<Comparison> {
        if reference.is_empty() || model.is_empty() {
            return Err(EvalError::Degenerate("one side has no observations".into()));
        }
        let support = union_support(reference, model);
        let p = reference.reindex(&support);
        let q = model.reindex(&support);

        Ok(Comparison {
            kl: kl_divergence(&p, &q, self.epsilon),
            js: js_divergence(&p, &q, self.epsilon),
            chi_square: chi_square(&q, &p, self.epsilon).map_err(|e| e.to_string()),
            support,
        })
    }
}
