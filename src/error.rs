//! Error kinds for sizing, allocation and inventory operations.
//!
//! Every failure the allocator can report is a distinct variant so callers
//! can tell "no space left" apart from a rejected inventory write.

use crate::models::Network;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Non-positive or unsatisfiable host count, or a blank owner.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Malformed or non-canonical CIDR representation.
    #[error("invalid network: {0}")]
    InvalidNetwork(String),

    /// No overlap-free block of the required size is left in the parent.
    #[error("no free /{prefix_len} block left in {parent}")]
    Exhausted { parent: Network, prefix_len: u8 },

    /// Deallocation target has no inventory record.
    #[error("no inventory record for {0}")]
    NotFound(String),

    /// The inventory rejected a call or could not be reached.
    #[error("inventory {operation} failed{}: {message}", http_status(.status))]
    Persistence {
        operation: &'static str,
        status: Option<u16>,
        message: String,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("CSV processing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Short stable label, used in logs and terminal output.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidRequest(_) => "InvalidRequest",
            Error::InvalidNetwork(_) => "InvalidNetwork",
            Error::Exhausted { .. } => "Exhausted",
            Error::NotFound(_) => "NotFound",
            Error::Persistence { .. } => "Persistence",
            Error::Config(_) => "Config",
            Error::Csv(_) => "Csv",
            Error::Io(_) => "Io",
        }
    }

    /// True for transport failures and 5xx answers from the inventory.
    ///
    /// 4xx answers are a rejection of the request itself and are never retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Persistence { status: None, .. } => true,
            Error::Persistence {
                status: Some(code), ..
            } => *code >= 500,
            _ => false,
        }
    }

    /// Wrap a transport-level `reqwest` failure.
    pub fn transport(operation: &'static str, err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("request timed out: {err}")
        } else {
            err.to_string()
        };
        Error::Persistence {
            operation,
            status: err.status().map(|s| s.as_u16()),
            message,
        }
    }
}

fn http_status(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistence_display_with_status() {
        let err = Error::Persistence {
            operation: "create",
            status: Some(400),
            message: "prefix: duplicate".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "inventory create failed (HTTP 400): prefix: duplicate"
        );
        assert_eq!(err.kind(), "Persistence");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_persistence_display_without_status() {
        let err = Error::Persistence {
            operation: "delete",
            status: None,
            message: "connection refused".to_string(),
        };
        assert_eq!(err.to_string(), "inventory delete failed: connection refused");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_server_errors_are_retryable() {
        let err = Error::Persistence {
            operation: "list",
            status: Some(503),
            message: "maintenance".to_string(),
        };
        assert!(err.is_retryable());
        assert!(!Error::NotFound("10.0.0.0/24".to_string()).is_retryable());
    }

    #[test]
    fn test_exhausted_display() {
        let err = Error::Exhausted {
            parent: Network::parse("192.168.0.0/24").unwrap(),
            prefix_len: 26,
        };
        assert_eq!(err.to_string(), "no free /26 block left in 192.168.0.0/24");
        assert_eq!(err.kind(), "Exhausted");
    }
}
