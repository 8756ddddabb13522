//! Error types for the docbatch library.
//!
//! Every failure a user can run into while assembling or submitting a batch
//! is a variant of [`BatchError`]. None of them is fatal: the workflow always
//! lands back in a usable `idle` or `error` state and the batch survives so
//! the user can retry without re-selecting files.
//!
//! Two audiences read these errors:
//!
//! * **Operators** read the `Display` text (via `tracing` logs). It carries
//!   the endpoint, status code and server diagnostic.
//! * **End users** read [`BatchError::user_message`], a short non-technical
//!   sentence per [`FailureKind`]. Server diagnostics never appear there.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the docbatch library.
#[derive(Debug, Error)]
pub enum BatchError {
    // ── Local (no network call made) ──────────────────────────────────────
    /// Submit was attempted with an empty batch.
    #[error("Cannot submit an empty batch: add at least one .docx file first")]
    EmptySubmission,

    /// Admission stopped at the batch capacity.
    #[error("Batch capacity reached: {added} of {offered} offered files were added")]
    CapacityExceeded { added: usize, offered: usize },

    /// The workflow is `loading`; intake and resubmission are refused.
    #[error("A conversion is already in progress")]
    Busy,

    // ── Transfer errors ───────────────────────────────────────────────────
    /// The request never produced a response (refused, DNS, TLS, timeout).
    #[error("Conversion service at '{endpoint}' is unreachable: {reason}")]
    NetworkUnreachable { endpoint: String, reason: String },

    /// A response arrived with a non-2xx status.
    ///
    /// `diagnostic` is the raw response body. It is logged, never shown.
    #[error("Conversion service returned HTTP {status}: {diagnostic}")]
    ServerError { status: u16, diagnostic: String },

    // ── Save errors ───────────────────────────────────────────────────────
    /// The archive could not be written to its destination.
    #[error("Failed to save archive to '{path}': {source}")]
    SaveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Anything else that went wrong during a submission.
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Flat classification of a [`BatchError`], used by status lines and
/// serialised reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    EmptySubmission,
    CapacityExceeded,
    Busy,
    NetworkUnreachable,
    ServerError,
    InvalidConfig,
    UnexpectedError,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::EmptySubmission => "empty-submission",
            FailureKind::CapacityExceeded => "capacity-exceeded",
            FailureKind::Busy => "busy",
            FailureKind::NetworkUnreachable => "network-unreachable",
            FailureKind::ServerError => "server-error",
            FailureKind::InvalidConfig => "invalid-config",
            FailureKind::UnexpectedError => "unexpected-error",
        };
        f.write_str(s)
    }
}

impl BatchError {
    /// The classification this error belongs to.
    ///
    /// Save failures are not a class of their own: from the user's point of
    /// view the conversion simply did not complete.
    pub fn kind(&self) -> FailureKind {
        match self {
            BatchError::EmptySubmission => FailureKind::EmptySubmission,
            BatchError::CapacityExceeded { .. } => FailureKind::CapacityExceeded,
            BatchError::Busy => FailureKind::Busy,
            BatchError::NetworkUnreachable { .. } => FailureKind::NetworkUnreachable,
            BatchError::ServerError { .. } => FailureKind::ServerError,
            BatchError::InvalidConfig(_) => FailureKind::InvalidConfig,
            BatchError::SaveFailed { .. } | BatchError::Unexpected(_) => {
                FailureKind::UnexpectedError
            }
        }
    }

    /// Short, friendly message for the end user.
    pub fn user_message(&self) -> String {
        match self {
            BatchError::EmptySubmission => {
                "Please add at least one .docx file before converting.".to_string()
            }
            BatchError::CapacityExceeded { added: 0, .. } => {
                "No files were added: the batch limit has been reached.".to_string()
            }
            BatchError::CapacityExceeded { added, offered } => format!(
                "Added {added} of {offered} files: the batch limit has been reached."
            ),
            BatchError::Busy => {
                "Please wait for the current conversion to finish.".to_string()
            }
            BatchError::NetworkUnreachable { .. } => {
                "Could not reach the conversion service. Check your connection and try again."
                    .to_string()
            }
            BatchError::ServerError { .. } => {
                "The conversion service could not process these files. Please try again later."
                    .to_string()
            }
            BatchError::InvalidConfig(_) => {
                "The converter is not configured correctly.".to_string()
            }
            BatchError::SaveFailed { .. } | BatchError::Unexpected(_) => {
                "Something went wrong during the conversion. Please try again.".to_string()
            }
        }
    }
}
