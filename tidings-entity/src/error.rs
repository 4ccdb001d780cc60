use std::num::ParseIntError;

use thiserror::Error;
use tidings_http::HttpError;
use tidings_ogp::OgError;

/// A per-URL failure recorded during enrichment. None of these abort a batch.
#[derive(Debug, Error)]
pub enum EntityError {
    #[error("HEAD {url} failed: {source}")]
    Transport { url: String, source: HttpError },

    #[error("{url}: response has no {header} header")]
    MissingHeader { url: String, header: &'static str },

    #[error("{url}: malformed Content-Type {value:?}: {source}")]
    ContentType {
        url: String,
        value: String,
        source: mime::FromStrError,
    },

    #[error("{url}: malformed Content-Length {value:?}: {source}")]
    ContentLength {
        url: String,
        value: String,
        source: ParseIntError,
    },

    #[error("cannot fetch Open Graph metadata for {url}: {source}")]
    OpenGraph { url: String, source: OgError },

    #[error("{url}: cancelled before completion")]
    Cancelled { url: String },
}

impl EntityError {
    /// The URL the failure belongs to.
    pub fn url(&self) -> &str {
        match self {
            EntityError::Transport { url, .. }
            | EntityError::MissingHeader { url, .. }
            | EntityError::ContentType { url, .. }
            | EntityError::ContentLength { url, .. }
            | EntityError::OpenGraph { url, .. }
            | EntityError::Cancelled { url } => url,
        }
    }
}
