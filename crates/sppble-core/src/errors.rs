//! Error types for the serial-port transport
//!
//! Link-stack boundary failures are reported as [`LinkError`]; everything the
//! transport itself surfaces is an [`SppError`]. Full queues on the byte
//! path are not errors: they show up as short counts and log lines.

use thiserror::Error;

use crate::types::ConnectionId;

// ----------------------------------------------------------------------------
// Link Errors
// ----------------------------------------------------------------------------

/// A boundary call into the link stack reported failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    #[error("{operation} failed with status 0x{status:04X}")]
    Status { operation: &'static str, status: u32 },

    #[error("{operation}: object not found")]
    NotFound { operation: &'static str },

    #[error("{operation}: invalid handle")]
    InvalidHandle { operation: &'static str },
}

impl LinkError {
    pub fn status(operation: &'static str, status: u32) -> Self {
        LinkError::Status { operation, status }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LinkError::NotFound { .. })
    }
}

// ----------------------------------------------------------------------------
// Transport Errors
// ----------------------------------------------------------------------------

/// Errors surfaced by the serial-port transport
#[derive(Error, Debug)]
pub enum SppError {
    #[error("Service bootstrap failed at {step}: {source}")]
    Bootstrap {
        step: &'static str,
        #[source]
        source: LinkError,
    },

    #[error("Advertising failed: {source}")]
    Advertising {
        #[source]
        source: LinkError,
    },

    #[error("Could not close connection {connection}: {source}")]
    TeardownFailed {
        connection: ConnectionId,
        #[source]
        source: LinkError,
    },

    #[error("Connection registry full (capacity: {capacity})")]
    RegistryFull { capacity: usize },

    #[error("Connection {connection} is already registered")]
    DuplicateConnection { connection: ConnectionId },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },
}

impl SppError {
    /// Startup cannot continue past this error
    pub fn is_fatal(&self) -> bool {
        matches!(self, SppError::Bootstrap { .. } | SppError::Config { .. })
    }
}

pub type Result<T> = core::result::Result<T, SppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_error_display() {
        let err = LinkError::status("notify_all", 0x0181);
        assert_eq!(err.to_string(), "notify_all failed with status 0x0181");
        assert!(!err.is_not_found());
        assert!(LinkError::NotFound { operation: "delete_set" }.is_not_found());
    }

    #[test]
    fn test_bootstrap_errors_are_fatal() {
        let err = SppError::Bootstrap {
            step: "commit",
            source: LinkError::status("gattdb_commit", 0x0181),
        };
        assert!(err.is_fatal());
        assert!(!SppError::RegistryFull { capacity: 4 }.is_fatal());

        let dup = SppError::DuplicateConnection {
            connection: ConnectionId(2),
        };
        assert!(!dup.is_fatal());
        assert_eq!(dup.to_string(), "Connection 0x02 is already registered");
    }
}
