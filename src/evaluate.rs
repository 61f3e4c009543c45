//! Batch evaluation over subgroups: load each subgroup's model runs, select the
//! matching survey respondents, and produce report rows.
//!
//! Configuration errors abort the batch. A subgroup whose model output is
//! missing or unreadable is skipped and recorded as an issue; so is a question
//! whose chi-square test is degenerate.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use indicatif::ProgressBar;
use log::{debug, info, warn};

use crate::agreement::{self, PairedQuestion};
use crate::config::{response_file_name, EvalConfig};
use crate::distribution::{Comparator, Distribution};
use crate::error::Result;
use crate::groups::{self, Subgroup};
use crate::reference::ReferenceFrame;
use crate::report::{AgreementRow, StatsRow, SummaryRow};
use crate::runs::{self, NormalizedRuns, QuestionSummary, RunMatrix};
use crate::stats;

/// Where a subgroup's model runs come from.
pub trait ModelSource {
    fn load(&self, group: &str) -> Result<RunMatrix>;
}

/// `<dir>/<template>` with `{group}` and `{runs}` substituted.
#[derive(Debug, Clone)]
pub struct ResponseDir {
    pub dir: PathBuf,
    pub template: String,
    pub runs: usize,
}

impl ResponseDir {
    pub fn from_config(cfg: &EvalConfig) -> Self {
        Self {
            dir: cfg.responses_dir.clone(),
            template: cfg.response_file_template.clone(),
            runs: cfg.runs,
        }
    }

    pub fn path(&self, group: &str) -> PathBuf {
        self.dir.join(response_file_name(&self.template, group, self.runs))
    }
}

impl ModelSource for ResponseDir {
    fn load(&self, group: &str) -> Result<RunMatrix> {
        RunMatrix::load(&self.path(group))
    }
}

/// Rows of one report plus everything that was skipped on the way.
#[derive(Debug, Clone)]
pub struct Report<T> {
    pub rows: Vec<T>,
    pub issues: Vec<String>,
}

/// One subgroup's aligned inputs.
struct GroupData<'f> {
    matrix: RunMatrix,
    normalized: NormalizedRuns,
    rows: Vec<usize>,
    questions: Vec<&'f str>,
}

pub struct Evaluator<'f, S> {
    frame: &'f ReferenceFrame,
    groups: Vec<Subgroup>,
    source: S,
    excluded: BTreeSet<String>,
    comparator: Comparator,
}

impl<'f, S: ModelSource> Evaluator<'f, S> {
    /// Validates every subgroup against the frame before any model output is read.
    pub fn new(
        frame: &'f ReferenceFrame,
        groups: &[Subgroup],
        source: S,
        excluded: BTreeSet<String>,
        epsilon: f64,
    ) -> Result<Self> {
        groups::validate(groups, frame)?;
        Ok(Self {
            frame,
            groups: groups.to_vec(),
            source,
            excluded,
            comparator: Comparator::new(epsilon),
        })
    }

    /// The validated subgroups, in evaluation order.
    pub fn groups(&self) -> &[Subgroup] {
        &self.groups
    }

    /// Runs `per_group` for every validated subgroup in order, skipping recoverable failures.
    pub fn run<T, F>(&self, progress: &ProgressBar, mut per_group: F) -> Result<Report<T>>
    where
        F: FnMut(&Self, &Subgroup, &mut Vec<String>) -> Result<Vec<T>>,
    {
        let mut report = Report { rows: Vec::new(), issues: Vec::new() };
        for group in &self.groups {
            progress.set_message(group.name.clone());
            match per_group(self, group, &mut report.issues) {
                Ok(rows) => report.rows.extend(rows),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("skipping subgroup {}: {e}", group.name);
                    report.issues.push(format!("{}: {e}", group.name));
                }
            }
            progress.inc(1);
        }
        Ok(report)
    }

    fn prepare(&self, group: &Subgroup) -> Result<GroupData<'f>> {
        let matrix = self.source.load(&group.name)?;
        let normalized = matrix.normalize(&self.excluded);
        let rows = group.select(self.frame)?;
        let answered = normalized.answered();
        let questions = groups::align_questions(self.frame, &answered, &self.excluded);
        info!(
            "{}: {} runs, {} respondents, {} shared questions",
            group.name,
            matrix.run_count(),
            rows.len(),
            questions.len()
        );
        Ok(GroupData { matrix, normalized, rows, questions })
    }

    /// Survey distribution and valid model answers per shared question; questions
    /// with no observations on either side are left out.
    fn paired(&self, group: &Subgroup, data: &GroupData<'_>) -> Result<Vec<PairedQuestion>> {
        let mut out = Vec::with_capacity(data.questions.len());
        for &q in &data.questions {
            let reference = Distribution::from_samples(self.frame.values(q, &data.rows)?);
            let model = data.normalized.valid(q);
            if reference.is_empty() || model.is_empty() {
                debug!("{}/{q}: no observations on one side, not compared", group.name);
                continue;
            }
            out.push(PairedQuestion { question: q.to_owned(), reference, model });
        }
        Ok(out)
    }

    /// Chi-square, KL and JS per question plus the subgroup's Spearman
    /// correlation between per-question model and survey means.
    pub fn compare_group(&self, group: &Subgroup, issues: &mut Vec<String>) -> Result<Vec<StatsRow>> {
        let data = self.prepare(group)?;
        let paired = self.paired(group, &data)?;

        let (model_means, survey_means): (Vec<f64>, Vec<f64>) = paired
            .iter()
            .filter_map(|p| {
                let model = Distribution::from_samples(p.model.iter().copied()).mean()?;
                Some((model, p.reference.mean()?))
            })
            .unzip();
        let spearman = stats::spearman(&model_means, &survey_means);

        let mut rows = Vec::with_capacity(paired.len());
        for p in &paired {
            let model = Distribution::from_samples(p.model.iter().copied());
            let cmp = self.comparator.compare(&p.reference, &model)?;
            let chi = match cmp.chi_square {
                Ok(chi) => chi,
                Err(msg) => {
                    warn!("{}/{}: chi-square failed: {msg}", group.name, p.question);
                    issues.push(format!("{}/{}: chi-square failed: {msg}", group.name, p.question));
                    continue;
                }
            };
            rows.push(StatsRow {
                group: group.name.clone(),
                question: p.question.clone(),
                chi_square: chi.statistic,
                chi_p_value: chi.p_value,
                kl_divergence: cmp.kl,
                js_divergence: cmp.js,
                spearman: spearman.map(|c| c.coefficient),
                spearman_p_value: spearman.and_then(|c| c.p_value),
            });
        }
        Ok(rows)
    }

    /// Accuracy, weighted alignment and Kendall's Tau for one subgroup.
    pub fn agreement_group(&self, group: &Subgroup, _issues: &mut Vec<String>) -> Result<Vec<AgreementRow>> {
        let data = self.prepare(group)?;
        let paired = self.paired(group, &data)?;
        let a = agreement::score(&paired);
        debug!(
            "{}: {} answers scored, {} rank pairs",
            group.name, a.evaluated, a.rank_pairs
        );
        Ok(vec![AgreementRow {
            group: group.name.clone(),
            accuracy: a.accuracy,
            weighted_alignment: a.weighted_alignment,
            rank_correlation: a.rank_correlation,
        }])
    }

    /// Per-question mean and spread for model and survey side by side.
    pub fn summarise_group(&self, group: &Subgroup, _issues: &mut Vec<String>) -> Result<Vec<SummaryRow>> {
        let data = self.prepare(group)?;
        let aggregated: BTreeMap<String, QuestionSummary> = runs::aggregate(&data.matrix, &self.excluded)
            .into_iter()
            .map(|s| (s.question.clone(), s))
            .collect();
        let mut rows = Vec::new();
        for &q in &data.questions {
            let survey = runs::summarise(q, &self.frame.values(q, &data.rows)?);
            let (Some(model), Some(survey)) = (aggregated.get(q), survey) else {
                continue;
            };
            rows.push(SummaryRow {
                group: group.name.clone(),
                variable: q.to_owned(),
                model_mean: model.mean,
                model_sd: model.std_dev,
                survey_mean: survey.mean,
                survey_sd: survey.std_dev,
                sd_difference: survey.std_dev.zip(model.std_dev).map(|(s, m)| s - m),
                squared_error: (survey.mean - model.mean).powi(2),
            });
        }
        Ok(rows)
    }
}

/// Mean of the squared errors in `rows`, per subgroup, in first-seen order.
pub fn mean_squared_error(rows: &[SummaryRow]) -> Vec<(String, f64)> {
    let mut out: Vec<(String, f64, usize)> = Vec::new();
    for r in rows {
        match out.iter_mut().find(|(g, _, _)| *g == r.group) {
            Some(entry) => {
                entry.1 += r.squared_error;
                entry.2 += 1;
            }
            None => out.push((r.group.clone(), r.squared_error, 1)),
        }
    }
    out.into_iter().map(|(g, sum, n)| (g, sum / n as f64)).collect()
}
