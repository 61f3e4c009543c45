//! Evaluation settings loaded from a JSON file.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::distribution::DEFAULT_EPSILON;
use crate::error::{EvalError, Result};
use crate::groups::Subgroup;

pub const DEFAULT_RESPONSE_TEMPLATE: &str = "{group}_{runs}_LLM_Output.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvalConfig {
    /// Survey CSV, one respondent per row.
    pub reference: PathBuf,
    /// Directory holding one model-output JSON per subgroup.
    pub responses_dir: PathBuf,
    pub runs: usize,
    #[serde(default = "default_template")]
    pub response_file_template: String,
    #[serde(default)]
    pub excluded_questions: BTreeSet<String>,
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
    pub groups: Vec<Subgroup>,
}

fn default_template() -> String {
    DEFAULT_RESPONSE_TEMPLATE.to_owned()
}

fn default_epsilon() -> f64 {
    DEFAULT_EPSILON
}

impl EvalConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .map_err(|e| EvalError::config(format!("cannot read config {}: {e}", path.display())))?;
        let cfg: EvalConfig = serde_json::from_str(&data)
            .map_err(|e| EvalError::config(format!("invalid config {}: {e}", path.display())))?;
        cfg.check()?;
        Ok(cfg)
    }

    pub fn check(&self) -> Result<()> {
        if self.groups.is_empty() {
            return Err(EvalError::config("no subgroups configured"));
        }
        if !(self.epsilon > 0.0 && self.epsilon.is_finite()) {
            return Err(EvalError::config(format!("epsilon must be positive, got {}", self.epsilon)));
        }
        if !self.response_file_template.contains("{group}") {
            return Err(EvalError::config("response_file_template must contain {group}"));
        }
        Ok(())
    }

    /// Keeps only the named subgroups, in config order. Empty keeps all.
    pub fn select_groups(&mut self, names: &[String]) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }
        if let Some(unknown) = names.iter().find(|n| !self.groups.iter().any(|g| &g.name == *n)) {
            return Err(EvalError::config(format!("unknown subgroup {unknown}")));
        }
        self.groups.retain(|g| names.contains(&g.name));
        Ok(())
    }
}

pub fn response_file_name(template: &str, group: &str, runs: usize) -> String {
    template
        .replace("{group}", group)
        .replace("{runs}", &runs.to_string())
}
