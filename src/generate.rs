//! Resumable collection of persona answers into a [`RunMatrix`] file.

use std::path::Path;

use indicatif::ProgressBar;
use log::info;

use crate::codebook::Codebook;
use crate::error::Result;
use crate::responder::{elicit, TextResponder, FAILED_RESPONSE};
use crate::runs::RunMatrix;

pub const SAVE_EVERY: usize = 10;

pub fn run_id(run: usize) -> String {
    format!("run_{run}")
}

pub struct Generation<'a, R> {
    pub responder: &'a R,
    pub persona: &'a str,
    pub codebook: &'a Codebook,
    pub max_attempts: u32,
}

impl<R: TextResponder> Generation<'_, R> {
    /// Cells still to ask for in runs `1..=runs`. Failed answers count as empty.
    pub fn pending(&self, matrix: &RunMatrix, runs: usize) -> usize {
        (1..=runs)
            .map(|run| {
                let id = run_id(run);
                self.codebook
                    .questions()
                    .iter()
                    .filter(|q| is_empty(matrix.get(&id, q)))
                    .count()
            })
            .sum()
    }

    /// Fills every empty cell of runs `1..=runs`, saving to `out` after every
    /// [`SAVE_EVERY`] new answers and at the end of each run that changed.
    /// Returns how many answers were added.
    pub async fn fill(&self, matrix: &mut RunMatrix, runs: usize, out: &Path, bar: &ProgressBar) -> Result<usize> {
        let mut added = 0usize;
        for run in 1..=runs {
            let id = run_id(run);
            let mut dirty = false;
            for question in self.codebook.questions() {
                if !is_empty(matrix.get(&id, question)) {
                    continue;
                }
                let prompt = self.codebook.prompt(question)?;
                let answer = elicit(self.responder, self.persona, &prompt, self.max_attempts).await;
                matrix.insert(&id, question, answer);
                added += 1;
                dirty = true;
                bar.inc(1);

                if added % SAVE_EVERY == 0 {
                    matrix.save(out)?;
                    dirty = false;
                }
            }
            if dirty {
                matrix.save(out)?;
            }
            info!("{id} complete ({added} new answers so far)");
        }
        Ok(added)
    }
}

fn is_empty(cell: Option<&str>) -> bool {
    matches!(cell, None | Some(FAILED_RESPONSE))
}
