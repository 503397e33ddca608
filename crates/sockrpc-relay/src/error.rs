//! Error types for sockrpc-relay

use thiserror::Error;

use sockrpc::TransportError;

/// Result type for relay operations
pub type RelayResult<T> = std::result::Result<T, RelayError>;

/// Main error type for sockrpc-relay
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RelayError {
    /// Invalid command-line or relay configuration
    #[error("Configuration error: {message}")]
    Configuration {
        /// What was wrong
        message: String,
    },

    /// The WebSocket handshake with a client failed
    #[error("Client handshake failed: {message}")]
    Handshake {
        /// Handshake failure detail
        message: String,
    },

    /// Could not connect to the upstream endpoint
    #[error("Upstream connection to {url} failed: {message}")]
    Upstream {
        /// Upstream URL
        url: String,
        /// Connection failure detail
        message: String,
    },

    /// Reader/writer layer error
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RelayError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Process exit code for this error
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration { .. } => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = RelayError::Upstream {
            url: "ws://localhost:1".to_string(),
            message: "refused".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Upstream connection to ws://localhost:1 failed: refused"
        );
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(RelayError::configuration("bad").exit_code(), 2);
        assert_eq!(RelayError::from(TransportError::SocketClosed).exit_code(), 1);
    }
}
