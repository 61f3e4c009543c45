//! Demographic subgroups as data: a name plus a boolean predicate over
//! reference columns.
//!
//! Predicates are checked against the loaded [`ReferenceFrame`] before anything
//! is evaluated, so a typo in a column name stops the run instead of yielding an
//! empty subgroup.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};
use crate::reference::ReferenceFrame;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    Eq { column: String, value: u32 },
    In { column: String, values: Vec<u32> },
    All(Vec<Predicate>),
    Any(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn equals(column: &str, value: u32) -> Self {
        Predicate::Eq { column: column.to_owned(), value }
    }

    /// Columns the predicate reads.
    pub fn fields_required(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            Predicate::Eq { column, .. } | Predicate::In { column, .. } => {
                out.insert(column.as_str());
            }
            Predicate::All(ps) | Predicate::Any(ps) => ps.iter().for_each(|p| p.collect_fields(out)),
            Predicate::Not(p) => p.collect_fields(out),
        }
    }

    /// Resolves column names to indices; unknown columns are a configuration error.
    pub fn compile(&self, frame: &ReferenceFrame) -> Result<Compiled> {
        let lookup = |column: &str| {
            frame
                .column_index(column)
                .ok_or_else(|| EvalError::config(format!("reference data has no column {column}")))
        };
        Ok(match self {
            Predicate::Eq { column, value } => Compiled::In(lookup(column)?, vec![*value]),
            Predicate::In { column, values } => Compiled::In(lookup(column)?, values.clone()),
            Predicate::All(ps) => Compiled::All(ps.iter().map(|p| p.compile(frame)).collect::<Result<_>>()?),
            Predicate::Any(ps) => Compiled::Any(ps.iter().map(|p| p.compile(frame)).collect::<Result<_>>()?),
            Predicate::Not(p) => Compiled::Not(Box::new(p.compile(frame)?)),
        })
    }
}

/// A predicate bound to column indices of one frame.
#[derive(Debug, Clone)]
pub enum Compiled {
    In(usize, Vec<u32>),
    All(Vec<Compiled>),
    Any(Vec<Compiled>),
    Not(Box<Compiled>),
}

impl Compiled {
    /// Missing cells never match a value test.
    pub fn matches(&self, frame: &ReferenceFrame, row: usize) -> bool {
        match self {
            Compiled::In(col, values) => frame.cell(row, *col).is_some_and(|v| values.contains(&v)),
            Compiled::All(ps) => ps.iter().all(|p| p.matches(frame, row)),
            Compiled::Any(ps) => ps.iter().any(|p| p.matches(frame, row)),
            Compiled::Not(p) => !p.matches(frame, row),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Subgroup {
    pub name: String,
    pub predicate: Predicate,
}

impl Subgroup {
    pub fn new(name: &str, predicate: Predicate) -> Self {
        Self { name: name.to_owned(), predicate }
    }

    /// Row indices of the respondents in this subgroup.
    pub fn select(&self, frame: &ReferenceFrame) -> Result<Vec<usize>> {
        let compiled = self.predicate.compile(frame)?;
        Ok((0..frame.row_count())
            .filter(|&r| compiled.matches(frame, r))
            .collect())
    }
}

/// Fails on the first subgroup whose predicate names a column the frame lacks,
/// or on duplicate subgroup names.
pub fn validate(groups: &[Subgroup], frame: &ReferenceFrame) -> Result<()> {
    let mut seen = BTreeSet::new();
    for g in groups {
        if !seen.insert(g.name.as_str()) {
            return Err(EvalError::config(format!("subgroup {} defined twice", g.name)));
        }
        if let Some(missing) = g.predicate.fields_required().into_iter().find(|c| !frame.has_column(c)) {
            return Err(EvalError::config(format!(
                "subgroup {} references column {missing}, which the reference data lacks",
                g.name
            )));
        }
    }
    Ok(())
}

/// Working question set: reference columns that the model answered, minus exclusions,
/// in reference column order.
pub fn align_questions<'a>(
    frame: &'a ReferenceFrame,
    answered: &BTreeSet<&str>,
    excluded: &BTreeSet<String>,
) -> Vec<&'a str> {
    frame
        .columns()
        .iter()
        .map(String::as_str)
        .filter(|c| answered.contains(c) && !excluded.contains(*c))
        .collect()
}
