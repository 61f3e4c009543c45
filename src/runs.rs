//! Model output across repeated runs, its normalized form, and the per-question
//! aggregates (mean, sample SD, frequency distribution).

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::distribution::Distribution;
use crate::error::{EvalError, Result};
use crate::normalize::{normalize, NO_ANSWER};
use crate::stats;

/// Raw model answers: run id -> question -> text.
///
/// Serialized exactly like the model-output JSON files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunMatrix {
    runs: BTreeMap<String, BTreeMap<String, String>>,
}

impl RunMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Missing file -> [`EvalError::MissingResource`] so callers can skip the subgroup.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(EvalError::MissingResource(path.to_path_buf()));
        }
        let data = fs::read_to_string(path).map_err(|e| EvalError::io(path, e))?;
        serde_json::from_str(&data).map_err(|e| EvalError::json(path, e))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let out = serde_json::to_string_pretty(self).map_err(|e| EvalError::json(path, e))?;
        fs::write(path, out).map_err(|e| EvalError::io(path, e))
    }

    pub fn insert(&mut self, run: &str, question: &str, text: impl Into<String>) {
        self.runs
            .entry(run.to_owned())
            .or_default()
            .insert(question.to_owned(), text.into());
    }

    pub fn get(&self, run: &str, question: &str) -> Option<&str> {
        self.runs.get(run)?.get(question).map(String::as_str)
    }

    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    pub fn questions(&self) -> BTreeSet<&str> {
        self.runs
            .values()
            .flat_map(|answers| answers.keys().map(String::as_str))
            .collect()
    }

    /// Inverts to question -> answers, one per run that answered it.
    pub fn by_question(&self) -> BTreeMap<&str, Vec<&str>> {
        let mut out: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for answers in self.runs.values() {
            for (q, text) in answers {
                out.entry(q.as_str()).or_default().push(text.as_str());
            }
        }
        out
    }

    /// Normalizes every answer, dropping `excluded` questions.
    pub fn normalize(&self, excluded: &BTreeSet<String>) -> NormalizedRuns {
        let values = self
            .by_question()
            .into_iter()
            .filter(|(q, _)| !excluded.contains(*q))
            .map(|(q, texts)| (q.to_owned(), texts.into_iter().map(normalize).collect()))
            .collect();
        NormalizedRuns { values }
    }
}

/// Normalized answers per question, sentinel values included.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NormalizedRuns {
    values: BTreeMap<String, Vec<u8>>,
}

impl NormalizedRuns {
    pub fn all(&self, question: &str) -> &[u8] {
        self.values.get(question).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Answers with the sentinel removed.
    pub fn valid(&self, question: &str) -> Vec<u32> {
        self.all(question)
            .iter()
            .filter(|&&v| v != NO_ANSWER)
            .map(|&v| u32::from(v))
            .collect()
    }

    /// Questions with at least one valid answer.
    pub fn answered(&self) -> BTreeSet<&str> {
        self.values
            .iter()
            .filter(|(_, v)| v.iter().any(|&x| x != NO_ANSWER))
            .map(|(q, _)| q.as_str())
            .collect()
    }

    /// Questions where every run fell back to the sentinel.
    pub fn unanswered(&self) -> Vec<&str> {
        self.values
            .iter()
            .filter(|(_, v)| !v.is_empty() && v.iter().all(|&x| x == NO_ANSWER))
            .map(|(q, _)| q.as_str())
            .collect()
    }

    pub fn distribution(&self, question: &str) -> Distribution {
        Distribution::from_samples(self.valid(question))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuestionSummary {
    pub question: String,
    pub n: usize,
    pub mean: f64,
    /// Sample SD; `None` with a single valid run.
    pub std_dev: Option<f64>,
    pub distribution: Distribution,
}

/// Mean / sample SD / distribution of `values`; `None` when there is nothing to summarise.
pub fn summarise(question: &str, values: &[u32]) -> Option<QuestionSummary> {
    let xs: Vec<f64> = values.iter().map(|&v| f64::from(v)).collect();
    let mean = stats::mean(&xs)?;
    Some(QuestionSummary {
        question: question.to_owned(),
        n: xs.len(),
        mean,
        std_dev: stats::sample_std(&xs),
        distribution: Distribution::from_samples(values.iter().copied()),
    })
}

/// Per-question summaries of the valid answers; questions without any are left out.
pub fn aggregate(runs: &RunMatrix, excluded: &BTreeSet<String>) -> Vec<QuestionSummary> {
    let normalized = runs.normalize(excluded);
    normalized
        .values
        .keys()
        .filter_map(|q| summarise(q, &normalized.valid(q)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix() -> RunMatrix {
        let mut m = RunMatrix::new();
        m.insert("Run_1", "F1", "3: agree");
        m.insert("Run_2", "F1", "Category 5");
        m.insert("Run_3", "F1", "I cannot answer that");
        m.insert("Run_1", "F2", "Option 4");
        m.insert("Run_2", "F2", "Option 4");
        m.insert("Run_3", "F2", "Option 4");
        m.insert("Run_1", "F3", "Error occurred during LLM call");
        m.insert("Run_2", "F3", "no idea");
        m.insert("Run_1", "F9", "7");
        m
    }

    #[test]
    fn parses_model_output_shape() {
        let json = r#"{"Run_1": {"F1": "3: agree", "F2": "Option 4"}, "Run_2": {"F1": "5"}}"#;
        let m: RunMatrix = serde_json::from_str(json).unwrap();
        assert_eq!(m.run_count(), 2);
        assert_eq!(m.get("Run_2", "F1"), Some("5"));
        assert_eq!(m.by_question()["F1"], vec!["3: agree", "5"]);
    }

    #[test]
    fn aggregate_drops_sentinel_and_empty_questions() {
        let out = aggregate(&matrix(), &BTreeSet::new());
        let names: Vec<&str> = out.iter().map(|s| s.question.as_str()).collect();
        assert_eq!(names, vec!["F1", "F2", "F9"]);

        let f1 = &out[0];
        assert_eq!(f1.n, 2);
        assert_eq!(f1.mean, 4.0);
        // sample SD of {3, 5}
        assert!((f1.std_dev.unwrap() - 2f64.sqrt()).abs() < 1e-12);
        assert_eq!(f1.distribution.prob(3), 0.5);

        let f2 = &out[1];
        assert_eq!(f2.std_dev, Some(0.0));
        assert_eq!(f2.distribution.prob(4), 1.0);

        // a single run has no sample SD, but still a mean
        assert_eq!(out[2].std_dev, None);
        assert_eq!(out[2].mean, 7.0);
    }

    #[test]
    fn aggregate_honours_exclusions() {
        let excluded: BTreeSet<String> = ["F1".to_string()].into();
        let out = aggregate(&matrix(), &excluded);
        assert!(out.iter().all(|s| s.question != "F1"));
    }

    #[test]
    fn partial_runs_are_tolerated() {
        // F9 was only answered in one of three runs
        let n = matrix().normalize(&BTreeSet::new());
        assert_eq!(n.all("F9"), &[7]);
        assert_eq!(n.valid("F1"), vec![3, 5]);
    }

    #[test]
    fn unanswered_lists_all_sentinel_questions() {
        let n = matrix().normalize(&BTreeSet::new());
        assert_eq!(n.unanswered(), vec!["F3"]);
        assert!(!n.answered().contains("F3"));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = RunMatrix::load(Path::new("definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, EvalError::MissingResource(_)));
    }
}
