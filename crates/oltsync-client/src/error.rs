//! Client-side error type with the taxonomy the engine cares about.

use thiserror::Error;

use oltsync_core::EngineError;

/// What went wrong talking to an external system.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection refused, timeout, DNS failure.
    #[error("connection failed: {message}")]
    Connection {
        message: String,
    },

    /// The endpoint URL could not be parsed or built.
    #[error("invalid endpoint url: {message}")]
    InvalidUrl {
        message: String,
    },

    /// The remote answered with a non-success status.
    #[error("unexpected status {status} from {operation}: {body}")]
    Status {
        operation: String,
        status: u16,
        body: String,
    },

    /// The remote answered 200 with a payload we could not decode.
    #[error("malformed response from {operation}: {message}")]
    Malformed {
        operation: String,
        message: String,
    },
}

impl ClientError {
    /// Whether this is a connection-level failure (the peer may simply be
    /// gone); deletes degrade to a no-op on these.
    #[must_use]
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }

    pub(crate) fn from_reqwest(operation: &str, err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Malformed {
                operation: operation.to_string(),
                message: err.to_string(),
            }
        } else if err.is_builder() {
            Self::InvalidUrl {
                message: err.to_string(),
            }
        } else {
            Self::Connection {
                message: format!("{operation}: {err}"),
            }
        }
    }
}

impl From<ClientError> for EngineError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Connection { .. } | ClientError::InvalidUrl { .. } => {
                EngineError::transport(err.to_string())
            }
            // Non-2xx from the backend retries on the next scheduled pass.
            ClientError::Status { .. } => EngineError::transport(err.to_string()),
            ClientError::Malformed { .. } => EngineError::inconsistent(err.to_string()),
        }
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;
