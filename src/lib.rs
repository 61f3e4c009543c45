//! Compares persona-conditioned language-model survey answers with real
//! survey responses, per demographic subgroup.

pub mod agreement;
pub mod codebook;
pub mod config;
pub mod distribution;
pub mod error;
pub mod evaluate;
pub mod generate;
pub mod groups;
pub mod logging;
pub mod normalize;
pub mod reference;
pub mod report;
pub mod responder;
pub mod runs;
pub mod stats;

pub use error::{EvalError, Result};
