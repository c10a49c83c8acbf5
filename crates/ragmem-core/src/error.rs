use thiserror::Error;

/// Failure taxonomy for the retrieval pipeline.
///
/// `Config` and `Validation` are raised at the call boundary and never
/// retried. `Provider` covers embedding/generation backend failures and is
/// the only retryable variant. `NotFound` covers missing or incompatible
/// persisted state. `EmptyInput` flags blank text where content is required.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Provider failure: {0}")]
    Provider(String),

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Storage failure: {0}")]
    Storage(String),
}

impl Error {
    /// Whether the failed operation may be retried with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Provider(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
