//! Error taxonomy. Nothing here is fatal to a running session.

use thiserror::Error;

/// A poll or command that never produced a usable reply.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("backend answered HTTP {code}")]
    Status { code: u16 },
    #[error("could not decode reply: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("bad endpoint url: {0}")]
    Url(#[from] url::ParseError),
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum CommandError {
    /// The backend replied `success: false`.
    #[error("{0}")]
    Rejected(String),
    /// Refused locally; nothing was sent.
    #[error("{0}")]
    NotAllowed(&'static str),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// One or more sub-panels of a composite poll came back without data.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unavailable: {}", .panels.join(", "))]
pub struct PartialDataError {
    pub panels: Vec<&'static str>,
}

/// What a poll task records as its last error.
#[derive(Debug, Error)]
pub enum PollError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Partial(#[from] PartialDataError),
    /// A single-source endpoint answered with an `error` body.
    #[error("backend reported: {0}")]
    Backend(String),
}
