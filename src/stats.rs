//! Descriptive statistics, rank correlations and the distribution tails their
//! p-values need.

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

/// Standard deviation with Bessel's correction; `None` below two values.
pub fn sample_std(data: &[f64]) -> Option<f64> {
    if data.len() < 2 {
        return None;
    }
    let m = mean(data)?;
    let var = data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (data.len() - 1) as f64;
    Some(var.sqrt())
}

/// Ranks starting at 1, ties share the average of the positions they span.
/// `descending` puts the largest value at rank 1.
pub fn average_ranks(data: &[f64], descending: bool) -> Vec<f64> {
    let mut order: Vec<usize> = (0..data.len()).collect();
    order.sort_by(|&a, &b| {
        let ord = data[a].total_cmp(&data[b]);
        if descending {
            ord.reverse()
        } else {
            ord
        }
    });

    let mut ranks = vec![0.0; data.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && data[order[j + 1]] == data[order[i]] {
            j += 1;
        }
        // positions i..=j (0-based) -> ranks i+1..=j+1
        let avg = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg;
        }
        i = j + 1;
    }
    ranks
}

fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let mx = mean(x)?;
    let my = mean(y)?;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx).powi(2);
        syy += (b - my).powi(2);
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return None;
    }
    Some((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correlation {
    pub coefficient: f64,
    /// Two-sided; `None` when there are too few points for a test.
    pub p_value: Option<f64>,
}

/// Spearman's rho with a t-distribution p-value.
///
/// `None` when fewer than two pairs are given or either side is constant.
pub fn spearman(x: &[f64], y: &[f64]) -> Option<Correlation> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let rho = pearson(&average_ranks(x, false), &average_ranks(y, false))?;
    let n = x.len();
    let p_value = if n < 3 {
        None
    } else if 1.0 - rho * rho <= f64::EPSILON {
        Some(0.0)
    } else {
        let df = (n - 2) as f64;
        let t = rho * (df / (1.0 - rho * rho)).sqrt();
        Some(student_t_two_sided(t, df))
    };
    Some(Correlation { coefficient: rho, p_value })
}

/// Kendall's tau-b, which corrects for ties on either side.
///
/// `None` below two pairs, or when a side is constant and the coefficient is
/// undefined.
pub fn kendall_tau(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let (mut concordant, mut discordant) = (0i64, 0i64);
    let (mut tied_x, mut tied_y) = (0i64, 0i64);
    for i in 0..x.len() {
        for j in (i + 1)..x.len() {
            let dx = x[i] - x[j];
            let dy = y[i] - y[j];
            match (dx == 0.0, dy == 0.0) {
                (true, true) => {}
                (true, false) => tied_x += 1,
                (false, true) => tied_y += 1,
                (false, false) if (dx > 0.0) == (dy > 0.0) => concordant += 1,
                (false, false) => discordant += 1,
            }
        }
    }
    // pairs untied in x = c + d + tied_y, pairs untied in y = c + d + tied_x
    let untied_x = (concordant + discordant + tied_y) as f64;
    let untied_y = (concordant + discordant + tied_x) as f64;
    if untied_x == 0.0 || untied_y == 0.0 {
        return None;
    }
    Some((concordant - discordant) as f64 / (untied_x * untied_y).sqrt())
}

/// Upper tail of the chi-square distribution.
pub fn chi_square_sf(stat: f64, dof: f64) -> f64 {
    if stat <= 0.0 {
        return 1.0;
    }
    gamma_q(dof / 2.0, stat / 2.0)
}

/// Two-sided tail probability of Student's t.
pub fn student_t_two_sided(t: f64, df: f64) -> f64 {
    incomplete_beta(df / 2.0, 0.5, df / (df + t * t)).clamp(0.0, 1.0)
}

// Lanczos approximation, g = 7
pub fn ln_gamma(x: f64) -> f64 {
    const COEF: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];
    if x < 0.5 {
        // reflection
        let pi = std::f64::consts::PI;
        return (pi / (pi * x).sin()).ln() - ln_gamma(1.0 - x);
    }
    let x = x - 1.0;
    let mut a = COEF[0];
    let t = x + 7.5;
    for (i, c) in COEF.iter().enumerate().skip(1) {
        a += c / (x + i as f64);
    }
    0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + a.ln()
}

const MAX_ITER: usize = 500;
const TINY: f64 = 1e-300;
const TOL: f64 = 1e-14;

/// Regularized upper incomplete gamma Q(a, x).
fn gamma_q(a: f64, x: f64) -> f64 {
    if x < a + 1.0 {
        1.0 - gamma_p_series(a, x)
    } else {
        gamma_q_fraction(a, x)
    }
}

fn gamma_p_series(a: f64, x: f64) -> f64 {
    let mut ap = a;
    let mut sum = 1.0 / a;
    let mut del = sum;
    for _ in 0..MAX_ITER {
        ap += 1.0;
        del *= x / ap;
        sum += del;
        if del.abs() < sum.abs() * TOL {
            break;
        }
    }
    sum * (-x + a * x.ln() - ln_gamma(a)).exp()
}

// Lentz's method
fn gamma_q_fraction(a: f64, x: f64) -> f64 {
    let mut b = x + 1.0 - a;
    let mut c = 1.0 / TINY;
    let mut d = 1.0 / b;
    let mut h = d;
    for i in 1..=MAX_ITER {
        let an = -(i as f64) * (i as f64 - a);
        b += 2.0;
        d = an * d + b;
        if d.abs() < TINY {
            d = TINY;
        }
        c = b + an / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        let del = d * c;
        h *= del;
        if (del - 1.0).abs() < TOL {
            break;
        }
    }
    (-x + a * x.ln() - ln_gamma(a)).exp() * h
}

/// Regularized incomplete beta I_x(a, b).
pub fn incomplete_beta(a: f64, b: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }
    let front = (ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln()).exp();
    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_fraction(a, b, x) / a
    } else {
        1.0 - front * beta_fraction(b, a, 1.0 - x) / b
    }
}

fn beta_fraction(a: f64, b: f64, x: f64) -> f64 {
    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;
    let mut c = 1.0;
    let mut d = 1.0 - qab * x / qap;
    if d.abs() < TINY {
        d = TINY;
    }
    d = 1.0 / d;
    let mut h = d;
    for m in 1..=MAX_ITER {
        let m = m as f64;
        let m2 = 2.0 * m;
        let aa = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 + aa * d;
        if d.abs() < TINY {
            d = TINY;
        }
        c = 1.0 + aa / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        h *= d * c;
        let aa = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 + aa * d;
        if d.abs() < TINY {
            d = TINY;
        }
        c = 1.0 + aa / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        let del = d * c;
        h *= del;
        if (del - 1.0).abs() < TOL {
            break;
        }
    }
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn mean_and_sample_std() {
        let data = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!(close(mean(&data).unwrap(), 5.0, 1e-12));
        // sqrt(32/7)
        assert!(close(sample_std(&data).unwrap(), 2.138_089_935, 1e-6));
        assert_eq!(sample_std(&[3.0]), None);
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn ranks_average_ties() {
        assert_eq!(average_ranks(&[10.0, 20.0, 20.0, 5.0], false), vec![2.0, 3.5, 3.5, 1.0]);
        assert_eq!(average_ranks(&[0.5, 0.25, 0.25], true), vec![1.0, 2.5, 2.5]);
    }

    #[test]
    fn ln_gamma_matches_factorials() {
        assert!(close(ln_gamma(1.0), 0.0, 1e-12));
        assert!(close(ln_gamma(5.0), 24f64.ln(), 1e-10));
        assert!(close(ln_gamma(0.5), std::f64::consts::PI.sqrt().ln(), 1e-10));
    }

    #[test]
    fn chi_square_tail_known_values() {
        // 3.841 is the 95% critical value for one degree of freedom
        assert!(close(chi_square_sf(3.841_458_820_694_124, 1.0), 0.05, 1e-6));
        // dof 2 has a closed form: exp(-x/2)
        assert!(close(chi_square_sf(4.0, 2.0), (-2.0f64).exp(), 1e-10));
        assert!(close(chi_square_sf(30.0, 2.0), (-15.0f64).exp(), 1e-12));
        assert_eq!(chi_square_sf(0.0, 3.0), 1.0);
    }

    #[test]
    fn student_t_tail_known_values() {
        // t = 2.228 is the two-sided 5% critical value at df = 10
        assert!(close(student_t_two_sided(2.228_138_851_986_273_5, 10.0), 0.05, 1e-6));
        assert!(close(student_t_two_sided(0.0, 7.0), 1.0, 1e-12));
    }

    #[test]
    fn spearman_monotone_and_reversed() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let up = spearman(&x, &[2.0, 4.0, 8.0, 16.0, 32.0]).unwrap();
        assert!(close(up.coefficient, 1.0, 1e-12));
        assert_eq!(up.p_value, Some(0.0));
        let down = spearman(&x, &[5.0, 4.0, 3.0, 2.0, 1.0]).unwrap();
        assert!(close(down.coefficient, -1.0, 1e-12));
    }

    #[test]
    fn spearman_with_ties_matches_reference_value() {
        // scipy.stats.spearmanr([1,2,3,4,5],[5,6,7,8,7]) -> 0.820782681668123, p 0.0886
        let c = spearman(&[1.0, 2.0, 3.0, 4.0, 5.0], &[5.0, 6.0, 7.0, 8.0, 7.0]).unwrap();
        assert!(close(c.coefficient, 0.820_782_681_668_123, 1e-9));
        assert!(close(c.p_value.unwrap(), 0.088_587_005_313_543_8, 1e-6));
    }

    #[test]
    fn spearman_undefined_cases() {
        assert!(spearman(&[1.0], &[1.0]).is_none());
        assert!(spearman(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]).is_none());
        let two = spearman(&[1.0, 2.0], &[3.0, 4.0]).unwrap();
        assert_eq!(two.p_value, None);
    }

    #[test]
    fn kendall_known_values() {
        assert!(close(kendall_tau(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]).unwrap(), 1.0, 1e-12));
        assert!(close(kendall_tau(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]).unwrap(), -1.0, 1e-12));
        // scipy.stats.kendalltau([12,2,1,12,2],[1,4,7,1,0]) -> -0.4714045207910316
        let tau = kendall_tau(&[12.0, 2.0, 1.0, 12.0, 2.0], &[1.0, 4.0, 7.0, 1.0, 0.0]).unwrap();
        assert!(close(tau, -0.471_404_520_791_031_6, 1e-12));
    }

    #[test]
    fn kendall_undefined_cases() {
        assert_eq!(kendall_tau(&[1.0], &[2.0]), None);
        assert_eq!(kendall_tau(&[1.0, 1.0], &[1.0, 2.0]), None);
    }
}
