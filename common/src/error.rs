use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed position `{fen}`: {reason}")]
    Format { fen: String, reason: String },

    #[error("no usable rows {stage}")]
    EmptyDataset { stage: &'static str },

    #[error("validation loss never improved in {epochs} epoch(s); no best checkpoint was written")]
    NoImprovement { epochs: usize },

    #[error("shape mismatch for `{name}`: expected {expected:?}, got {actual:?}")]
    Shape { name: String, expected: Vec<usize>, actual: Vec<usize> },

    #[error("parameter `{0}` missing from state")]
    MissingTensor(String),

    #[error("numeric backend: {0}")]
    Backend(#[from] Box<dyn std::error::Error + Send + Sync>),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn format(fen: &str, reason: impl Into<String>) -> Self {
        Self::Format { fen: fen.to_string(), reason: reason.into() }
    }
}
