//! Error types for collaborator calls.
//!
//! Every failure raised while talking to the document pipeline, the embedding
//! and generation API, the search database or the object store ends up as a
//! [`RouterError`]. The HTTP layer does not classify these further; it turns
//! any of them into a 500 carrying the display string.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RouterError {
    #[error("HTTP request to {service} failed: {source}")]
    Http {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} returned {status}: {body}")]
    Upstream {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("Unexpected response from {service}: {reason}")]
    Decode {
        service: &'static str,
        reason: String,
    },

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("Document '{0}' has no extractable text")]
    NoText(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication with {service} failed: {reason}")]
    Auth {
        service: &'static str,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RouterError {
    pub fn http(service: &'static str, source: reqwest::Error) -> Self {
        Self::Http { service, source }
    }

    pub fn decode(service: &'static str, reason: impl Into<String>) -> Self {
        Self::Decode {
            service,
            reason: reason.into(),
        }
    }
}

pub type RouterResult<T> = Result<T, RouterError>;
