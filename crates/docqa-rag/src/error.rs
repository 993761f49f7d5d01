use thiserror::Error;

/// Failure of one query. Rendered to text with [`crate::prompt::ERROR_PREFIX`];
/// never fatal to the process.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("retrieval failed: {0}")]
    Retrieval(String),

    #[error("{0}")]
    Generation(String),

    #[error("generation timed out after {0} ms")]
    Timeout(u128),

    #[error("background task failed: {0}")]
    Task(String),
}

impl RagError {
    pub(crate) fn embedding(e: anyhow::Error) -> Self {
        Self::Embedding(format!("{e:#}"))
    }

    pub(crate) fn retrieval(e: anyhow::Error) -> Self {
        Self::Retrieval(format!("{e:#}"))
    }

    pub(crate) fn generation(e: anyhow::Error) -> Self {
        Self::Generation(format!("{e:#}"))
    }
}

impl From<tokio::task::JoinError> for RagError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Task(e.to_string())
    }
}
