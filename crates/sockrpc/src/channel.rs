//! String channels carried over a JSON-RPC connection.
//!
//! Some consumers only exchange opaque text but run over the same
//! [`Connection<Value>`] type as JSON-RPC traffic. Every payload is wrapped
//! in a [`ChannelEnvelope`] whose `jsonrpc` field is the sentinel
//! [`CHANNEL_PROTOCOL_VERSION`], so generic dispatch that sees one can
//! recognise it (see [`is_channel_envelope`]) and leave it alone.
//!
//! [`ConnectionChannel::on_message`] takes the connection's single reader
//! listener. With the default [`ListenerPolicy::Reject`] no other consumer
//! can listen on the same connection afterwards.
//!
//! [`ListenerPolicy::Reject`]: sockrpc_traits::ListenerPolicy::Reject
//!
//! Wire shape:
//!
//! ```json
//! { "jsonrpc": "0.0", "content": "<raw string>" }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::trace;

use sockrpc_traits::{Disposable, TransportError, TransportResult};

use crate::connection::Connection;

/// Protocol version tag marking a channel envelope. Never a real JSON-RPC version.
pub const CHANNEL_PROTOCOL_VERSION: &str = "0.0";

/// Close code reported by [`Channel::on_close`], whatever the socket said.
pub const CHANNEL_CLOSE_CODE: i32 = -1;

/// Close reason reported by [`Channel::on_close`].
pub const CHANNEL_CLOSE_REASON: &str = "closed";

/// A text payload wrapped so JSON-RPC dispatch ignores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelEnvelope {
    /// Always [`CHANNEL_PROTOCOL_VERSION`].
    pub jsonrpc: String,
    /// The raw payload.
    pub content: String,
}

impl ChannelEnvelope {
    /// Wraps `content`.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            jsonrpc: CHANNEL_PROTOCOL_VERSION.to_string(),
            content: content.into(),
        }
    }

    /// Converts the envelope into its wire value.
    pub fn into_value(self) -> Value {
        json!({
            "jsonrpc": self.jsonrpc,
            "content": self.content,
        })
    }

    /// Unwraps `value` if it is a channel envelope.
    pub fn from_value(value: Value) -> Option<Self> {
        serde_json::from_value::<Self>(value)
            .ok()
            .filter(|envelope| envelope.jsonrpc == CHANNEL_PROTOCOL_VERSION)
    }
}

/// Returns `true` if `value` carries the channel sentinel version.
pub fn is_channel_envelope(value: &Value) -> bool {
    value.get("jsonrpc").and_then(Value::as_str) == Some(CHANNEL_PROTOCOL_VERSION)
}

/// A text-in, text-out channel.
pub trait Channel: Send + Sync + fmt::Debug {
    /// Sends one payload. Failures are reported through [`Channel::on_error`]
    /// only when they come from the transport; a failed write is reported on
    /// the underlying writer.
    fn send(&self, content: String);

    /// Subscribes to inbound payloads.
    ///
    /// Fails with [`TransportError::AlreadyListening`] if the underlying
    /// reader already has a listener and rejects a second one.
    fn on_message(&self, callback: Box<dyn Fn(String) + Send + Sync>)
    -> TransportResult<Disposable>;

    /// Subscribes to transport errors.
    fn on_error(&self, callback: Box<dyn Fn(&TransportError) + Send + Sync>) -> Disposable;

    /// Subscribes to closure. Always called with `(-1, "closed")`.
    fn on_close(&self, callback: Box<dyn Fn(i32, &str) + Send + Sync>) -> Disposable;

    /// Disposes the underlying connection.
    fn dispose(&self);
}

/// A [`Channel`] over a JSON-RPC connection.
#[derive(Debug)]
pub struct ConnectionChannel {
    connection: Connection<Value>,
}

impl ConnectionChannel {
    /// Wraps `connection`.
    pub fn new(connection: Connection<Value>) -> Self {
        Self { connection }
    }

    /// The wrapped connection.
    pub fn connection(&self) -> &Connection<Value> {
        &self.connection
    }
}

impl Channel for ConnectionChannel {
    fn send(&self, content: String) {
        self.connection
            .writer()
            .write(ChannelEnvelope::new(content).into_value());
    }

    fn on_message(
        &self,
        callback: Box<dyn Fn(String) + Send + Sync>,
    ) -> TransportResult<Disposable> {
        self.connection
            .reader()
            .listen(std::sync::Arc::new(move |value: Value| {
                match ChannelEnvelope::from_value(value) {
                    Some(envelope) => callback(envelope.content),
                    None => trace!("ignoring message without channel envelope"),
                }
            }))
    }

    fn on_error(&self, callback: Box<dyn Fn(&TransportError) + Send + Sync>) -> Disposable {
        self.connection.reader().on_error(callback)
    }

    fn on_close(&self, callback: Box<dyn Fn(i32, &str) + Send + Sync>) -> Disposable {
        self.connection
            .reader()
            .on_close(Box::new(move |_| callback(CHANNEL_CLOSE_CODE, CHANNEL_CLOSE_REASON)))
    }

    fn dispose(&self) {
        self.connection.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_wire_shape() {
        assert_eq!(
            ChannelEnvelope::new("hello").into_value(),
            json!({"jsonrpc": "0.0", "content": "hello"})
        );
    }

    #[test]
    fn test_from_value_requires_sentinel() {
        assert_eq!(
            ChannelEnvelope::from_value(json!({"jsonrpc": "0.0", "content": "x"})),
            Some(ChannelEnvelope::new("x"))
        );
        assert_eq!(
            ChannelEnvelope::from_value(json!({"jsonrpc": "2.0", "content": "x"})),
            None
        );
        assert_eq!(
            ChannelEnvelope::from_value(json!({"jsonrpc": "2.0", "method": "ping"})),
            None
        );
    }

    #[test]
    fn test_is_channel_envelope() {
        assert!(is_channel_envelope(&json!({"jsonrpc": "0.0", "content": ""})));
        assert!(!is_channel_envelope(&json!({"jsonrpc": "2.0", "id": 1})));
        assert!(!is_channel_envelope(&json!("0.0")));
    }

    #[test]
    fn test_channel_takes_the_only_listener() {
        let socket = crate::socket::MemorySocket::detached();
        let channel = ConnectionChannel::new(crate::connection::create_socket_connection(
            socket,
            sockrpc_traits::ConnectionConfig::default(),
        ));
        let _messages = channel.on_message(Box::new(|_| {})).unwrap();

        let other = channel
            .connection()
            .reader()
            .listen(std::sync::Arc::new(|_: Value| {}));
        assert!(matches!(other, Err(TransportError::AlreadyListening)));
        assert!(matches!(
            channel.on_message(Box::new(|_| {})),
            Err(TransportError::AlreadyListening)
        ));
    }
}
