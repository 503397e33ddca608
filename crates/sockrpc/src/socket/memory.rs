//! In-process socket pair.
//!
//! Sends on one end are delivered synchronously to the other end's message
//! handler on the calling thread. A detached socket has no peer and keeps
//! what it sends in an outbox instead.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, trace};

use sockrpc_traits::{
    CloseEvent, CloseHandler, ErrorHandler, MessageHandler, Socket, TransportError,
    TransportResult,
};

#[derive(Default)]
struct Handlers {
    message: Option<Arc<dyn Fn(String) + Send + Sync>>,
    error: Option<Arc<dyn Fn(TransportError) + Send + Sync>>,
    close: Option<Arc<dyn Fn(CloseEvent) + Send + Sync>>,
}

/// One end of an in-memory socket.
pub struct MemorySocket {
    peer: Mutex<Option<Weak<MemorySocket>>>,
    handlers: Mutex<Handlers>,
    outbox: Mutex<Vec<String>>,
    send_failure: Mutex<Option<TransportError>>,
    closed: AtomicBool,
}

impl MemorySocket {
    fn unconnected() -> Self {
        Self {
            peer: Mutex::new(None),
            handlers: Mutex::new(Handlers::default()),
            outbox: Mutex::new(Vec::new()),
            send_failure: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    /// Creates two connected ends.
    pub fn pair() -> (Arc<Self>, Arc<Self>) {
        let left = Arc::new(Self::unconnected());
        let right = Arc::new(Self::unconnected());
        *left.peer.lock() = Some(Arc::downgrade(&right));
        *right.peer.lock() = Some(Arc::downgrade(&left));
        (left, right)
    }

    /// Creates an end without a peer. Sent payloads collect in the outbox.
    pub fn detached() -> Arc<Self> {
        Arc::new(Self::unconnected())
    }

    /// Delivers an inbound payload to this end's message handler.
    pub fn deliver(&self, text: impl Into<String>) {
        if self.is_closed() {
            trace!("memory socket closed, dropping inbound message");
            return;
        }
        let handler = self.handlers.lock().message.clone();
        match handler {
            Some(handler) => handler(text.into()),
            None => trace!("no message handler installed, dropping inbound message"),
        }
    }

    /// Reports a transport error on this end.
    pub fn emit_error(&self, error: TransportError) {
        let handler = self.handlers.lock().error.clone();
        if let Some(handler) = handler {
            handler(error);
        }
    }

    /// Closes both ends, firing each close handler once.
    pub fn close(&self, code: i32, reason: &str) {
        let event = CloseEvent::new(code, reason);
        self.close_local(event.clone());
        if let Some(peer) = self.peer() {
            peer.close_local(event);
        }
    }

    /// Makes every following `send` fail with `error`, or succeed again with `None`.
    pub fn inject_send_failure(&self, error: Option<TransportError>) {
        *self.send_failure.lock() = error;
    }

    /// Drains the payloads sent by a detached end.
    pub fn take_sent(&self) -> Vec<String> {
        std::mem::take(&mut *self.outbox.lock())
    }

    /// Returns `true` once this end has closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn peer(&self) -> Option<Arc<Self>> {
        self.peer.lock().as_ref().and_then(Weak::upgrade)
    }

    fn close_local(&self, event: CloseEvent) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!(%event, "memory socket closed");
        let handler = self.handlers.lock().close.clone();
        if let Some(handler) = handler {
            handler(event);
        }
    }
}

impl Socket for MemorySocket {
    fn send(&self, text: String) -> TransportResult<()> {
        if self.is_closed() {
            return Err(TransportError::SocketClosed);
        }
        if let Some(error) = self.send_failure.lock().clone() {
            return Err(error);
        }

        let has_peer = self.peer.lock().is_some();
        if !has_peer {
            self.outbox.lock().push(text);
            return Ok(());
        }

        match self.peer() {
            Some(peer) => {
                peer.deliver(text);
                Ok(())
            }
            None => Err(TransportError::SendFailed("peer socket dropped".to_string())),
        }
    }

    fn on_message(&self, handler: MessageHandler) {
        self.handlers.lock().message = Some(Arc::from(handler));
    }

    fn on_error(&self, handler: ErrorHandler) {
        self.handlers.lock().error = Some(Arc::from(handler));
    }

    fn on_close(&self, handler: CloseHandler) {
        self.handlers.lock().close = Some(Arc::from(handler));
    }

    fn dispose(&self) {
        self.close(CloseEvent::NORMAL_CLOSURE, "disposed");
    }
}

impl fmt::Debug for MemorySocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySocket")
            .field("paired", &self.peer.lock().is_some())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_delivers_to_peer() {
        let (left, right) = MemorySocket::pair();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        right.on_message(Box::new(move |text| s.lock().push(text)));

        left.send("hello".to_string()).unwrap();
        assert_eq!(*seen.lock(), vec!["hello".to_string()]);
    }

    #[test]
    fn test_close_reaches_both_ends_once() {
        let (left, right) = MemorySocket::pair();
        let events = Arc::new(Mutex::new(Vec::new()));
        for (name, socket) in [("left", &left), ("right", &right)] {
            let events = events.clone();
            socket.on_close(Box::new(move |event| events.lock().push((name, event.code))));
        }

        left.close(1001, "going away");
        right.close(1000, "");

        assert_eq!(*events.lock(), vec![("left", 1001), ("right", 1001)]);
        assert_eq!(
            left.send("late".to_string()),
            Err(TransportError::SocketClosed)
        );
    }

    #[test]
    fn test_injected_send_failure() {
        let socket = MemorySocket::detached();
        socket.inject_send_failure(Some(TransportError::SendFailed("full".into())));
        assert!(socket.send("x".to_string()).is_err());

        socket.inject_send_failure(None);
        socket.send("y".to_string()).unwrap();
        assert_eq!(socket.take_sent(), vec!["y".to_string()]);
    }

    #[test]
    fn test_dropped_peer_fails_send() {
        let (left, right) = MemorySocket::pair();
        drop(right);
        assert!(matches!(
            left.send("x".to_string()),
            Err(TransportError::SendFailed(_))
        ));
    }
}
