//! Socket-backed message writer.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde::Serialize;
use tracing::{debug, trace, warn};

use sockrpc_traits::{
    AtomicMetrics, Disposable, Emitter, LimitsConfig, MessageWriter, Socket, TransportError,
    TransportResult, WriteError, validate_message_size,
};

/// Serializes messages to JSON text and hands them to a [`Socket`].
///
/// `write` never fails to its caller. Encoding and send failures are
/// counted and reported on the error event with a 1-based sequence number
/// that is never reset. A send rejected with [`TransportError::SocketClosed`]
/// also fires the close event, once. The writer never closes the socket.
pub struct SocketMessageWriter<M> {
    socket: Arc<dyn Socket>,
    limits: LimitsConfig,
    error_count: AtomicU64,
    closed: AtomicBool,
    error_emitter: Emitter<WriteError<M>>,
    close_emitter: Emitter<()>,
    metrics: Arc<AtomicMetrics>,
}

impl<M> SocketMessageWriter<M>
where
    M: Serialize + 'static,
{
    /// Builds a writer over `socket`.
    pub fn new(
        socket: Arc<dyn Socket>,
        limits: LimitsConfig,
        metrics: Arc<AtomicMetrics>,
    ) -> Arc<Self> {
        Arc::new(Self {
            socket,
            limits,
            error_count: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            error_emitter: Emitter::new(),
            close_emitter: Emitter::new(),
            metrics,
        })
    }

    /// Number of failed writes so far.
    pub fn error_count(&self) -> u64 {
        self.error_count.load(Ordering::SeqCst)
    }

    fn send(&self, message: &M) -> TransportResult<usize> {
        let text = serde_json::to_string(message)?;
        validate_message_size(text.len(), &self.limits)?;
        let len = text.len();
        self.socket.send(text)?;
        Ok(len)
    }

    fn fail(&self, error: TransportError, message: M) {
        let count = self.error_count.fetch_add(1, Ordering::SeqCst) + 1;
        self.metrics.write_errors.fetch_add(1, Ordering::Relaxed);
        warn!(count, %error, "failed to write message");

        let socket_closed = matches!(error, TransportError::SocketClosed);
        self.error_emitter.fire(&WriteError {
            error,
            message: Some(message),
            count,
        });

        if socket_closed && !self.closed.swap(true, Ordering::SeqCst) {
            debug!("message writer closed");
            self.close_emitter.fire(&());
        }
    }
}

impl<M> MessageWriter<M> for SocketMessageWriter<M>
where
    M: Serialize + 'static,
{
    fn write(&self, message: M) {
        match self.send(&message) {
            Ok(len) => {
                trace!(bytes = len, "message written");
                self.metrics.record_write(len);
            }
            Err(error) => self.fail(error, message),
        }
    }

    fn end(&self) {}

    fn on_error(&self, listener: Box<dyn Fn(&WriteError<M>) + Send + Sync>) -> Disposable {
        self.error_emitter.event(listener)
    }

    fn on_close(&self, listener: Box<dyn Fn() + Send + Sync>) -> Disposable {
        self.close_emitter.event(move |_| listener())
    }

    fn dispose(&self) {
        self.error_emitter.clear();
        self.close_emitter.clear();
    }
}

impl<M> fmt::Debug for SocketMessageWriter<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketMessageWriter")
            .field("socket", &self.socket)
            .field("error_count", &self.error_count.load(Ordering::SeqCst))
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::socket::MemorySocket;
    use parking_lot::Mutex;
    use serde::Serializer;
    use serde_json::{Value, json};

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("cannot encode"))
        }
    }

    #[test]
    fn test_write_sends_json_text() {
        let socket = MemorySocket::detached();
        let writer = SocketMessageWriter::new(
            socket.clone(),
            LimitsConfig::default(),
            Arc::new(AtomicMetrics::new()),
        );

        writer.write(json!({"jsonrpc": "2.0", "method": "ping"}));

        let sent = socket.take_sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            serde_json::from_str::<Value>(&sent[0]).unwrap(),
            json!({"jsonrpc": "2.0", "method": "ping"})
        );
    }

    #[test]
    fn test_encode_failures_are_numbered() {
        let socket = MemorySocket::detached();
        let writer = SocketMessageWriter::new(
            socket.clone(),
            LimitsConfig::default(),
            Arc::new(AtomicMetrics::new()),
        );
        let counts = Arc::new(Mutex::new(Vec::new()));
        let c = counts.clone();
        let _ = writer.on_error(Box::new(move |failure: &WriteError<Unserializable>| {
            assert!(matches!(failure.error, TransportError::SerializationFailed(_)));
            assert!(failure.message.is_some());
            c.lock().push(failure.count);
        }));

        for _ in 0..3 {
            writer.write(Unserializable);
        }

        assert_eq!(*counts.lock(), vec![1, 2, 3]);
        assert_eq!(writer.error_count(), 3);
        assert!(socket.take_sent().is_empty());
    }

    #[test]
    fn test_closed_socket_fires_close_once() {
        let socket = MemorySocket::detached();
        let writer: Arc<SocketMessageWriter<Value>> = SocketMessageWriter::new(
            socket.clone(),
            LimitsConfig::default(),
            Arc::new(AtomicMetrics::new()),
        );
        let closes = Arc::new(Mutex::new(0));
        let c = closes.clone();
        let _ = writer.on_close(Box::new(move || *c.lock() += 1));

        socket.close(1000, "");
        writer.write(json!(1));
        writer.write(json!(2));

        assert_eq!(*closes.lock(), 1);
        assert_eq!(writer.error_count(), 2);
    }

    #[test]
    fn test_end_is_noop() {
        let socket = MemorySocket::detached();
        let writer: Arc<SocketMessageWriter<Value>> = SocketMessageWriter::new(
            socket.clone(),
            LimitsConfig::default(),
            Arc::new(AtomicMetrics::new()),
        );

        writer.end();
        writer.write(json!("still open"));
        assert_eq!(socket.take_sent().len(), 1);
    }
}
