use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SamplerError {
    #[error("{capability} is unavailable: {reason}")]
    Unavailable { capability: String, reason: String },
    #[error("Sampler read error: {0}")]
    Read(#[from] std::io::Error),
    #[error("Sampler span error: {0}")]
    SpanState(&'static str),
    #[error("Unparsable counter value {value:?} in {}", .path.display())]
    Parse { path: PathBuf, value: String },
}

impl SamplerError {
    pub fn unavailable(capability: impl Into<String>, reason: impl ToString) -> Self {
        Self::Unavailable {
            capability: capability.into(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Repetitions must be at least 1")]
    InvalidRepetitions,
    #[error(transparent)]
    Sampler(#[from] SamplerError),
    #[error("Operation failed on run {run}: {source}")]
    Operation {
        run: u32,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("{} has header {found:?}, expected {expected:?}", .path.display())]
    SchemaMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV Error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON Error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("YAML Parsing Error: {0}")]
    Plan(#[from] serde_yml::Error),
}

pub type Result<T> = std::result::Result<T, HarnessError>;
