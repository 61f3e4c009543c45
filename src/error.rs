use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EvalError>;

#[derive(Debug, Error)]
pub enum EvalError {
    /// Misconfiguration (unknown column, unknown question, bad config file).
    /// Aborts the whole batch.
    #[error("configuration error: {0}")]
    Config(String),

    /// An input that one subgroup needs is absent; the subgroup is skipped.
    #[error("missing resource {}", .0.display())]
    MissingResource(PathBuf),

    /// A statistic cannot be computed for this input; the question is skipped.
    #[error("degenerate input: {0}")]
    Degenerate(String),

    #[error("reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("text responder: {0}")]
    Http(#[from] reqwest::Error),

    /// The responder answered, but not with something usable.
    #[error("text responder: {0}")]
    Responder(String),
}

impl EvalError {
    pub fn config(msg: impl Into<String>) -> Self {
        EvalError::Config(msg.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EvalError::Io { path: path.into(), source }
    }

    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        EvalError::Json { path: path.into(), source }
    }

    /// Only configuration errors stop a batch; everything else is reported and skipped.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EvalError::Config(_))
    }
}
