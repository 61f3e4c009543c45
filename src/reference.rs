//! Survey responses: one row per respondent, one column per question.

use std::collections::HashMap;
use std::path::Path;

use log::debug;

use crate::error::{EvalError, Result};

#[derive(Debug, Clone, Default)]
pub struct ReferenceFrame {
    columns: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Vec<Option<u32>>>,
}

/// Typed cell parse: blanks, negatives, fractions and text become missing.
/// Integral floats ("3.0", written by tools that widen columns with gaps) are accepted.
pub fn parse_cell(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(n) = raw.parse::<u32>() {
        return Some(n);
    }
    let f: f64 = raw.parse().ok()?;
    (f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= f64::from(u32::MAX)).then_some(f as u32)
}

impl ReferenceFrame {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<u32>>>) -> Result<Self> {
        let mut index = HashMap::with_capacity(columns.len());
        for (i, c) in columns.iter().enumerate() {
            if index.insert(c.clone(), i).is_some() {
                return Err(EvalError::config(format!("duplicate reference column {c}")));
            }
        }
        if let Some(bad) = rows.iter().position(|r| r.len() != columns.len()) {
            return Err(EvalError::config(format!(
                "reference row {bad} has {} cells, expected {}",
                rows[bad].len(),
                columns.len()
            )));
        }
        Ok(Self { columns, index, rows })
    }

    pub fn from_csv(path: &Path) -> Result<Self> {
        let mut rdr = csv::Reader::from_path(path).map_err(|e| match e.kind() {
            csv::ErrorKind::Io(_) => EvalError::config(format!(
                "cannot open reference data {}: {e}",
                path.display()
            )),
            _ => EvalError::Csv(e),
        })?;
        let columns: Vec<String> = rdr.headers()?.iter().map(str::to_owned).collect();

        let mut rows = Vec::new();
        let mut unparsed = 0usize;
        for record in rdr.records() {
            let record = record?;
            let row: Vec<Option<u32>> = record
                .iter()
                .map(|cell| {
                    let v = parse_cell(cell);
                    if v.is_none() && !cell.trim().is_empty() {
                        unparsed += 1;
                    }
                    v
                })
                .collect();
            rows.push(row);
        }
        debug!(
            "reference {}: {} rows x {} columns, {unparsed} unparseable cells treated as missing",
            path.display(),
            rows.len(),
            columns.len()
        );
        Self::new(columns, rows)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<u32> {
        self.rows.get(row)?.get(column).copied().flatten()
    }

    /// Non-missing values of `column` over the given rows.
    pub fn values(&self, column: &str, rows: &[usize]) -> Result<Vec<u32>> {
        let col = self
            .column_index(column)
            .ok_or_else(|| EvalError::config(format!("reference has no column {column}")))?;
        Ok(rows.iter().filter_map(|&r| self.cell(r, col)).collect())
    }
}
