//! Agreement between model answers and the survey subgroup: exact-match
//! accuracy against the modal survey answer, frequency-weighted alignment,
//! and Kendall's Tau between answer-popularity rankings.

use crate::distribution::Distribution;
use crate::stats;

/// One shared question: the survey distribution and the model's valid answers.
#[derive(Debug, Clone)]
pub struct PairedQuestion {
    pub question: String,
    pub reference: Distribution,
    pub model: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Agreement {
    /// Percentage of (question, run) answers equal to the modal survey answer.
    pub accuracy: f64,
    /// Mean survey probability of the model's answers, as a percentage.
    pub weighted_alignment: f64,
    /// Kendall's tau-b; `None` when fewer than two rank pairs exist.
    pub rank_correlation: Option<f64>,
    /// (question, run) answers scored.
    pub evaluated: usize,
    pub rank_pairs: usize,
}

pub fn score(questions: &[PairedQuestion]) -> Agreement {
    let mut correct = 0usize;
    let mut total = 0usize;
    let mut mass = 0.0;

    for q in questions {
        let Some(mode) = q.reference.mode() else {
            continue;
        };
        for &answer in &q.model {
            total += 1;
            if answer == mode {
                correct += 1;
            }
            mass += q.reference.prob(answer);
        }
    }

    let (ref_ranks, model_ranks) = rank_pairs(questions);
    Agreement {
        accuracy: percentage(correct as f64, total),
        weighted_alignment: percentage(mass, total),
        rank_correlation: stats::kendall_tau(&ref_ranks, &model_ranks),
        evaluated: total,
        rank_pairs: ref_ranks.len(),
    }
}

fn percentage(x: f64, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        x / total as f64 * 100.0
    }
}

/// (survey rank, model rank) of every category both sides used, pooled over questions.
/// Questions without a shared category contribute nothing.
pub fn rank_pairs(questions: &[PairedQuestion]) -> (Vec<f64>, Vec<f64>) {
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    for q in questions {
        if q.reference.is_empty() || q.model.is_empty() {
            continue;
        }
        let ref_ranks = q.reference.frequency_ranks();
        let model_ranks = Distribution::from_samples(q.model.iter().copied()).frequency_ranks();
        for (cat, model_rank) in model_ranks {
            if let Some(&ref_rank) = ref_ranks.get(&cat) {
                xs.push(ref_rank);
                ys.push(model_rank);
            }
        }
    }
    (xs, ys)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paired(question: &str, reference: &[u32], model: &[u32]) -> PairedQuestion {
        PairedQuestion {
            question: question.to_owned(),
            reference: Distribution::from_samples(reference.iter().copied()),
            model: model.to_vec(),
        }
    }

    #[test]
    fn nothing_to_score_gives_zero_not_error() {
        let a = score(&[]);
        assert_eq!(a.accuracy, 0.0);
        assert_eq!(a.weighted_alignment, 0.0);
        assert_eq!(a.rank_correlation, None);
        assert_eq!(a.evaluated, 0);
    }

    #[test]
    fn weighted_alignment_uses_reference_mass() {
        // reference {1: .5, 2: .5}
        assert_eq!(score(&[paired("F1", &[1, 2], &[1])]).weighted_alignment, 50.0);
        // 3 never occurs in the reference
        assert_eq!(score(&[paired("F1", &[1, 1], &[3])]).weighted_alignment, 0.0);
    }

    #[test]
    fn accuracy_counts_every_run() {
        // mode is 4; two of four runs hit it
        let a = score(&[paired("F1", &[4, 4, 2], &[4, 2, 4, 7])]);
        assert_eq!(a.accuracy, 50.0);
        assert_eq!(a.evaluated, 4);
        // 2 * 2/3 + 1/3 + 0
        assert!((a.weighted_alignment - (5.0 / 3.0) / 4.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn accuracy_tie_uses_smallest_mode() {
        let a = score(&[paired("F1", &[2, 5], &[2])]);
        assert_eq!(a.accuracy, 100.0);
    }

    #[test]
    fn single_rank_pair_is_undefined() {
        let a = score(&[paired("F1", &[1, 1, 2], &[1, 1])]);
        assert_eq!(a.rank_pairs, 1);
        assert_eq!(a.rank_correlation, None);
    }

    #[test]
    fn disjoint_categories_add_no_pairs() {
        let (xs, _) = rank_pairs(&[paired("F1", &[1, 2], &[3, 4])]);
        assert!(xs.is_empty());
    }

    #[test]
    fn matching_popularity_orders_correlate() {
        let qs = [
            paired("F1", &[1, 1, 1, 2, 2, 3], &[1, 1, 1, 1, 2, 2, 3]),
            paired("F2", &[5, 5, 6], &[5, 5, 5, 6]),
        ];
        let a = score(&qs);
        assert_eq!(a.rank_pairs, 5);
        assert!((a.rank_correlation.unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn reversed_popularity_is_negative() {
        let qs = [paired("F1", &[1, 1, 1, 2, 2, 3], &[3, 3, 3, 2, 2, 1])];
        assert!(score(&qs).rank_correlation.unwrap() < 0.0);
    }
}
