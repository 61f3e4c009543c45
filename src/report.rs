//! Report rows and their CSV / JSON persistence.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{EvalError, Result};

/// One (subgroup, question) row of the distribution comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsRow {
    #[serde(rename = "Group")]
    pub group: String,
    #[serde(rename = "Question")]
    pub question: String,
    #[serde(rename = "Chi-Square")]
    pub chi_square: f64,
    #[serde(rename = "Chi p-value")]
    pub chi_p_value: Option<f64>,
    #[serde(rename = "KL Divergence")]
    pub kl_divergence: f64,
    #[serde(rename = "JS Divergence")]
    pub js_divergence: f64,
    #[serde(rename = "Spearman Correlation")]
    pub spearman: Option<f64>,
    #[serde(rename = "Spearman p-value")]
    pub spearman_p_value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgreementRow {
    #[serde(rename = "Group")]
    pub group: String,
    #[serde(rename = "Accuracy")]
    pub accuracy: f64,
    #[serde(rename = "Weighted Alignment")]
    pub weighted_alignment: f64,
    #[serde(rename = "Kendall Tau Rank Correlation")]
    pub rank_correlation: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    #[serde(rename = "Group")]
    pub group: String,
    #[serde(rename = "Variable")]
    pub variable: String,
    #[serde(rename = "Model Mean")]
    pub model_mean: f64,
    #[serde(rename = "Model SD")]
    pub model_sd: Option<f64>,
    #[serde(rename = "Survey Mean")]
    pub survey_mean: f64,
    #[serde(rename = "Survey SD")]
    pub survey_sd: Option<f64>,
    #[serde(rename = "SD Difference")]
    pub sd_difference: Option<f64>,
    #[serde(rename = "Squared Error")]
    pub squared_error: f64,
}

/// Writes `rows` as CSV with a header; `None` cells stay empty.
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| EvalError::io(parent, e))?;
    }
    let mut wtr = csv::Writer::from_path(path)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush().map_err(|e| EvalError::io(path, e))?;
    Ok(())
}

/// `<report>.issues.json` next to the report; nothing is written when there are no issues.
pub fn write_issues(report: &Path, issues: &[String]) -> Result<Option<PathBuf>> {
    if issues.is_empty() {
        return Ok(None);
    }
    let path = report.with_extension("issues.json");
    let out = serde_json::to_string_pretty(issues).map_err(|e| EvalError::json(&path, e))?;
    fs::write(&path, out).map_err(|e| EvalError::io(&path, e))?;
    Ok(Some(path))
}
