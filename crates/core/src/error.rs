//! # Errors
//!
//! Failure taxonomy for backend calls and streaming sessions. Malformed
//! individual stream frames are not represented here: the frame parser
//! drops them locally and the stream keeps going.

use thiserror::Error;

/// Errors surfaced to callers of the client and the session manager.
#[derive(Debug, Error)]
pub enum LabError {
    /// A run needs a non-empty topic.
    #[error("research topic must not be empty")]
    EmptyTopic,

    /// One streaming session at a time; the previous run is still in flight.
    #[error("a streaming session is already in flight")]
    SessionBusy,

    /// Transport-level failure (connect, timeout, body read).
    #[error("request to backend failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("backend returned status {status}: {detail}")]
    Api { status: u16, detail: String },
}
