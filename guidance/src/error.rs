//! Error types for the guidance pipeline.

use thiserror::Error;

/// Errors that can occur across the guidance pipeline.
#[derive(Error, Debug)]
pub enum GuidanceError {
    /// The vector index could not be reached or queried. Callers may treat
    /// this as non-fatal and continue with an empty example set.
    #[error("Retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    /// The example store could not be read.
    #[error("Example store error: {0}")]
    Store(String),

    /// The embedding provider rejected or failed the request.
    #[error("Embedding provider error: {0}")]
    Embedding(String),

    /// Topic classification failed.
    #[error("Topic classification failed: {0}")]
    Classification(String),

    /// Advice generation failed.
    #[error("Advice generation failed: {0}")]
    Generation(String),

    /// The chat model returned an envelope no advice text could be
    /// extracted from. Callers treat this as a generation failure.
    #[error("Malformed response envelope: {0}")]
    MalformedEnvelope(String),

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<lancedb::Error> for GuidanceError {
    fn from(e: lancedb::Error) -> Self {
        GuidanceError::RetrievalUnavailable(e.to_string())
    }
}
