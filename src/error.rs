//! Error types for rendering, per-item processing and configuration.
//!
//! Failures are split by blast radius:
//! - [`RenderError`]: the rendering collaborator itself failed (page could not
//!   be loaded, browser went away). Fatal to the operation that hit it.
//! - [`ItemError`]: anything that stops a single feed item from being saved.
//!   Always caught at the item boundary and recorded, never run-fatal.
//! - [`ConfigError`]: bad configuration, detected before any work starts.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Failure of a [`crate::render::RenderedPageSource`] operation.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("http request for {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("browser error: {0}")]
    Browser(String),
}

/// Why a single item could not be downloaded.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("timed out after {waited_ms} ms waiting for the media element")]
    RenderTimeout { waited_ms: u64 },

    #[error("unresolvable source")]
    UnsupportedSource { media_url: String },

    #[error("download failed: {0}")]
    Transport(String),

    #[error("response body exceeds {max_bytes} bytes (got {actual})")]
    TooLarge { max_bytes: u64, actual: u64 },

    #[error("could not write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Collaborator(#[from] RenderError),

    #[error("worker panicked: {0}")]
    Panicked(String),
}

impl ItemError {
    /// The taxonomy bucket this error is reported under.
    pub fn kind(&self) -> FailureKind {
        match self {
            ItemError::RenderTimeout { .. } => FailureKind::RenderTimeout,
            ItemError::UnsupportedSource { .. } => FailureKind::UnsupportedSource,
            ItemError::Transport(_) | ItemError::TooLarge { .. } | ItemError::Io { .. } => {
                FailureKind::TransportFailure
            }
            ItemError::Collaborator(_) | ItemError::Panicked(_) => FailureKind::CollaboratorFailure,
        }
    }
}

/// Coarse failure classes shown in the final report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    RenderTimeout,
    UnsupportedSource,
    TransportFailure,
    CollaboratorFailure,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::RenderTimeout => "render timeout",
            FailureKind::UnsupportedSource => "unsupported source",
            FailureKind::TransportFailure => "transport failure",
            FailureKind::CollaboratorFailure => "collaborator failure",
        };
        f.write_str(s)
    }
}

/// Invalid run configuration or site profile.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid feed url `{url}`: {source}")]
    FeedUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("worker count must be at least 1")]
    NoWorkers,

    #[error("wait range {min_ms}..={max_ms} ms is empty")]
    WaitRange { min_ms: u64, max_ms: u64 },

    #[error("could not read profile {path}: {source}")]
    ProfileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse profile {path}: {source}")]
    ProfileParse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("profile `{profile}` has an invalid selector `{selector}`")]
    Selector { profile: String, selector: String },
}
