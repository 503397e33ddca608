//! Connection configuration types.

use serde::{Deserialize, Serialize};

/// What a reader does when `listen` is called while a listener is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListenerPolicy {
    /// Refuse the new listener with `TransportError::AlreadyListening`.
    #[default]
    Reject,
    /// Make the new listener current and log a warning.
    Replace,
}

/// Configuration for message size limits.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum encoded message size in bytes, applied to both directions.
    /// `None` = unlimited
    #[serde(default)]
    pub max_message_size: Option<usize>,
}

impl LimitsConfig {
    /// Create a configuration with no limits.
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            max_message_size: None,
        }
    }

    /// Create a configuration with strict limits for untrusted peers.
    #[must_use]
    pub const fn strict() -> Self {
        Self {
            max_message_size: Some(1024 * 1024), // 1MB
        }
    }

    /// Sets the maximum encoded message size.
    #[must_use]
    pub const fn with_max_message_size(mut self, max: usize) -> Self {
        self.max_message_size = Some(max);
        self
    }
}

/// Configuration shared by a reader/writer pair built over one socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Behaviour of a second `listen` call.
    pub listener_policy: ListenerPolicy,

    /// Close code treated as a clean shutdown. Any other code raises an
    /// error before the close event.
    pub normal_closure_code: i32,

    /// Size limits for inbound and outbound messages.
    pub limits: LimitsConfig,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            listener_policy: ListenerPolicy::default(),
            normal_closure_code: crate::CloseEvent::NORMAL_CLOSURE,
            limits: LimitsConfig::default(),
        }
    }
}

impl ConnectionConfig {
    /// Sets the listener policy.
    #[must_use]
    pub const fn with_listener_policy(mut self, policy: ListenerPolicy) -> Self {
        self.listener_policy = policy;
        self
    }

    /// Sets the close code treated as normal closure.
    #[must_use]
    pub const fn with_normal_closure_code(mut self, code: i32) -> Self {
        self.normal_closure_code = code;
        self
    }

    /// Sets the size limits.
    #[must_use]
    pub fn with_limits(mut self, limits: LimitsConfig) -> Self {
        self.limits = limits;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_config_default() {
        let config = ConnectionConfig::default();
        assert_eq!(config.listener_policy, ListenerPolicy::Reject);
        assert_eq!(config.normal_closure_code, 1000);
        assert_eq!(config.limits.max_message_size, None);
    }

    #[test]
    fn test_connection_config_from_json() {
        let config: ConnectionConfig = serde_json::from_str(
            r#"{"listener_policy":"replace","limits":{"max_message_size":4096}}"#,
        )
        .unwrap();
        assert_eq!(config.listener_policy, ListenerPolicy::Replace);
        assert_eq!(config.normal_closure_code, 1000);
        assert_eq!(config.limits.max_message_size, Some(4096));
    }

    #[test]
    fn test_limits_presets() {
        assert_eq!(LimitsConfig::unlimited().max_message_size, None);
        assert_eq!(LimitsConfig::strict().max_message_size, Some(1024 * 1024));
    }
}
