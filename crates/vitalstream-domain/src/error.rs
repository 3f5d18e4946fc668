use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    /// The inbound event is missing required fields or carries values that
    /// cannot be interpreted. Raised before any external call is made.
    #[error("malformed reading: {0}")]
    MalformedReading(String),

    /// A backing service (directory, metric store, or stream) failed
    /// transiently. Retryable at the caller's discretion.
    #[error("repository error: {0}")]
    Repository(#[from] anyhow::Error),
}

pub type IngestResult<T> = Result<T, IngestError>;
