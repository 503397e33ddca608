//! Transport error types.

use thiserror::Error;

use crate::config::LimitsConfig;

/// A specialized `Result` type for socket and connection operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Represents errors that can occur while moving messages over a socket.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportError {
    /// The socket reported an error of its own.
    #[error("Socket error: {0}")]
    Socket(String),

    /// The socket closed with a code other than normal closure.
    #[error("Connection lost: code = {code}, reason = {reason}")]
    ConnectionLost {
        /// The close code reported by the socket
        code: i32,
        /// The close reason reported by the socket
        reason: String,
    },

    /// The socket is closed and cannot carry any more messages.
    #[error("Socket closed")]
    SocketClosed,

    /// The socket rejected an outbound payload.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Failed to serialize or deserialize a message.
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// A listener is already attached to the reader.
    #[error("Reader already has an active listener")]
    AlreadyListening,

    /// Message size exceeds the configured maximum limit.
    #[error(
        "Message size ({size} bytes) exceeds maximum allowed ({max} bytes). \
         If this is expected, raise `LimitsConfig {{ max_message_size: Some(..) }}` \
         or use `LimitsConfig::unlimited()`."
    )]
    MessageTooLarge {
        /// The actual size of the message in bytes
        size: usize,
        /// The maximum allowed size in bytes
        max: usize,
    },

    /// An underlying I/O error occurred.
    #[error("IO error: {0}")]
    Io(String),
}

impl TransportError {
    /// Returns `true` if the error means the socket can no longer send.
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::SocketClosed | Self::ConnectionLost { .. })
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationFailed(err.to_string())
    }
}

/// Validates that a wire payload does not exceed the configured limit.
///
/// # Arguments
///
/// * `size` - The size of the encoded payload in bytes
/// * `limits` - The limits configuration to check against
///
/// # Returns
///
/// `Ok(())` if the size is within limits or no limit is set, otherwise `Err(TransportError::MessageTooLarge)`
pub fn validate_message_size(size: usize, limits: &LimitsConfig) -> TransportResult<()> {
    if let Some(max) = limits.max_message_size
        && size > max
    {
        return Err(TransportError::MessageTooLarge { size, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_size_validation() {
        let limits = LimitsConfig::default().with_max_message_size(1024);
        assert!(validate_message_size(1000, &limits).is_ok());
        assert_eq!(
            validate_message_size(2048, &limits),
            Err(TransportError::MessageTooLarge {
                size: 2048,
                max: 1024
            })
        );
    }

    #[test]
    fn test_unlimited_config() {
        let limits = LimitsConfig::unlimited();
        assert!(validate_message_size(100 * 1024 * 1024, &limits).is_ok());
    }

    #[test]
    fn test_connection_lost_display() {
        let err = TransportError::ConnectionLost {
            code: 1006,
            reason: "abnormal".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Connection lost: code = 1006, reason = abnormal"
        );
        assert!(err.is_closed());
        assert!(!TransportError::Socket("boom".into()).is_closed());
    }

    #[test]
    fn test_serde_error_conversion() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let converted = TransportError::from(err);
        assert!(matches!(converted, TransportError::SerializationFailed(_)));
    }
}
