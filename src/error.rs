//! Errors surfaced by the tracker to its owner.
//!
//! Remote clients never see these: the HTTP surface always answers with the
//! pixel or an empty 404.

use std::io;

/// Errors returned by [`crate::Tracker`] construction and lifecycle calls.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// Invalid configuration, reported by `Tracker::new` before any socket is opened.
    #[error("Invalid tracker configuration: {0}")]
    Config(String),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// `start`/`serve` was called on a tracker that already owns a listener.
    #[error("Tracker is already listening")]
    AlreadyStarted,

    #[error("Server error: {0}")]
    Serve(#[source] io::Error),
}

impl TrackerError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// True for failures to acquire the listener, including a second `start`.
    pub fn is_bind_error(&self) -> bool {
        matches!(self, Self::Bind { .. } | Self::AlreadyStarted)
    }
}
