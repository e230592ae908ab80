//! Error types shared by the library, the CLI, and the HTTP server.
//!
//! Handlers map [`Error::is_client_error`] to `400` and everything else to
//! `500`. Per-item vectorization failures never surface here; they are folded
//! into the run report instead.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or missing request fields.
    #[error("{0}")]
    InvalidArgument(String),

    /// The example payload cannot be used for schema inference.
    #[error("{0}")]
    InvalidPayload(String),

    #[error("No content available to vectorize")]
    NoContent,

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Source CMS error: {0}")]
    Source(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for errors caused by the caller's input rather than a downstream service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidArgument(_) | Error::InvalidPayload(_) | Error::NoContent
        )
    }

    /// Short machine-readable code used in HTTP error envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidArgument(_) | Error::InvalidPayload(_) | Error::NoContent => {
                "invalid-argument"
            }
            Error::NotFound(_) => "not-found",
            _ => "internal",
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
