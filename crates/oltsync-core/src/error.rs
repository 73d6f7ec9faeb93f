//! Error Types
//!
//! Standardized error taxonomy for the reconciliation engine, plus the
//! `Progress` tag that distinguishes "done" from "retry me later".
//!
//! # Example
//!
//! ```
//! use oltsync_core::{EngineError, Result};
//!
//! fn find_device(serial: &str) -> Result<String> {
//!     if serial.is_empty() {
//!         return Err(EngineError::not_found("AccessDevice", serial));
//!     }
//!     Ok(format!("device {serial}"))
//! }
//! ```

use serde::Serialize;
use thiserror::Error;

/// Standardized error type for all reconciliation paths.
///
/// # Variants
///
/// - `Transport` - connection refused, timeout, bad endpoint; retryable on
///   the next scheduled pass
/// - `Validation` - bad input on a local record; fatal, surfaced on the
///   record's status field, never retried automatically
/// - `NotFound` - a required record or upstream object is missing; fatal
///   unless the caller chose to defer instead
/// - `Inconsistent` - the backend reported something that contradicts local
///   state (serial mismatch, empty provisioning id); fatal and recorded with
///   a distinguishable status/code pair
#[derive(Debug, Clone, Error, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineError {
    /// Transport-level failure talking to an external system.
    #[error("transport failure: {message}")]
    Transport {
        /// Description of the failure, including the endpoint.
        message: String,
    },

    /// A local record failed validation.
    #[error("validation failed: {message}")]
    Validation {
        /// Description of the violated rule.
        message: String,
    },

    /// A required record or upstream object does not exist.
    #[error("{resource} not found: {key}")]
    NotFound {
        /// The kind of thing that was missing (e.g. "EndpointDevice").
        resource: String,
        /// The key that was looked up.
        key: String,
    },

    /// The backend reported state that contradicts local records.
    #[error("backend inconsistency: {message}")]
    Inconsistent {
        /// Description of the contradiction.
        message: String,
    },
}

impl EngineError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            key: key.into(),
        }
    }

    pub fn inconsistent(message: impl Into<String>) -> Self {
        Self::Inconsistent {
            message: message.into(),
        }
    }

    /// Whether the next scheduled pass should retry the same record.
    ///
    /// Only transport failures are retryable; everything else stays failed
    /// until the record is touched again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

/// Convenience result alias used across the engine.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Outcome of a reconciliation entry point that completed without error.
///
/// `Deferred` means a precondition was not yet met (technology profile,
/// sibling record); the scheduler retries the record on the next pass
/// without counting it as a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    /// The record converged; the worker marks it enacted.
    Complete,
    /// A precondition is missing; retry later. Carries the reason for logs.
    Deferred(String),
}

impl Progress {
    pub fn deferred(reason: impl Into<String>) -> Self {
        Self::Deferred(reason.into())
    }

    #[must_use]
    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred(_))
    }
}
