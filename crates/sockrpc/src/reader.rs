//! Socket-backed message reader.
//!
//! The reader subscribes to its socket as soon as it is built. Until a
//! listener is attached every socket event (message, error, close) is kept
//! in a FIFO and replayed, in arrival order, by the first `listen` call.
//!
//! ```text
//! initial ──listen──> listening
//!    │                    │
//!    └──socket close──> closed <──socket close──┘
//! ```
//!
//! A close with any code other than the configured normal-closure code is
//! preceded by a [`TransportError::ConnectionLost`] error event. Once the
//! socket has closed no further events are accepted; buffered events are
//! still replayed once to a late listener. Disposing the reader discards the
//! buffer and stops accepting events as well.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use tracing::{debug, trace, warn};

use sockrpc_traits::{
    AtomicMetrics, CloseEvent, ConnectionConfig, DataCallback, Disposable, Emitter,
    ListenerPolicy, MessageReader, ReaderState, Socket, TransportError, TransportResult,
    validate_message_size,
};

/// A socket event captured for later delivery.
#[derive(Debug)]
enum SocketEvent {
    Message(String),
    Error(TransportError),
    Close(CloseEvent),
}

struct ReaderInner<M> {
    state: ReaderState,
    callback: Option<(u64, DataCallback<M>)>,
    next_listener_id: u64,
    pending: VecDeque<SocketEvent>,
    draining: bool,
    socket_closed: bool,
}

/// Adapts a [`Socket`]'s inbound events into a [`MessageReader`].
pub struct SocketMessageReader<M> {
    inner: Arc<Mutex<ReaderInner<M>>>,
    error_emitter: Emitter<TransportError>,
    close_emitter: Emitter<CloseEvent>,
    config: ConnectionConfig,
    metrics: Arc<AtomicMetrics>,
}

impl<M> SocketMessageReader<M>
where
    M: DeserializeOwned + 'static,
{
    /// Builds a reader and subscribes it to `socket` immediately.
    pub fn new(
        socket: &dyn Socket,
        config: ConnectionConfig,
        metrics: Arc<AtomicMetrics>,
    ) -> Arc<Self> {
        let reader = Arc::new(Self {
            inner: Arc::new(Mutex::new(ReaderInner {
                state: ReaderState::Initial,
                callback: None,
                next_listener_id: 0,
                pending: VecDeque::new(),
                draining: false,
                socket_closed: false,
            })),
            error_emitter: Emitter::new(),
            close_emitter: Emitter::new(),
            config,
            metrics,
        });

        let weak = Arc::downgrade(&reader);
        socket.on_message(Box::new(move |text| {
            if let Some(reader) = weak.upgrade() {
                reader.handle_event(SocketEvent::Message(text));
            }
        }));

        let weak = Arc::downgrade(&reader);
        socket.on_error(Box::new(move |error| {
            if let Some(reader) = weak.upgrade() {
                reader.handle_event(SocketEvent::Error(error));
            }
        }));

        let weak = Arc::downgrade(&reader);
        socket.on_close(Box::new(move |event| {
            if let Some(reader) = weak.upgrade() {
                reader.handle_close(event);
            }
        }));

        reader
    }

    /// Number of events waiting for a listener.
    pub fn pending_len(&self) -> usize {
        self.inner.lock().pending.len()
    }

    fn handle_close(&self, event: CloseEvent) {
        if event.code != self.config.normal_closure_code {
            self.handle_event(SocketEvent::Error(TransportError::ConnectionLost {
                code: event.code,
                reason: event.reason.clone(),
            }));
        }
        self.handle_event(SocketEvent::Close(event));
        self.inner.lock().state = ReaderState::Closed;
    }

    fn handle_event(&self, event: SocketEvent) {
        let live = {
            let mut inner = self.inner.lock();
            if inner.socket_closed {
                trace!(?event, "socket already closed, dropping event");
                return;
            }
            if matches!(event, SocketEvent::Close(_)) {
                inner.socket_closed = true;
            }

            match inner.state {
                ReaderState::Initial => {
                    self.metrics.buffered_events.fetch_add(1, Ordering::Relaxed);
                    inner.pending.push_back(event);
                    None
                }
                ReaderState::Listening if inner.draining => {
                    inner.pending.push_back(event);
                    None
                }
                ReaderState::Listening => Some(event),
                ReaderState::Closed => {
                    trace!(?event, "reader closed, dropping event");
                    None
                }
            }
        };

        if let Some(event) = live {
            self.dispatch(event);
        }
    }

    fn dispatch(&self, event: SocketEvent) {
        match event {
            SocketEvent::Message(text) => self.read_message(&text),
            SocketEvent::Error(error) => self.fire_error(error),
            SocketEvent::Close(event) => {
                debug!(%event, "message reader closed");
                self.close_emitter.fire(&event);
                self.inner.lock().state = ReaderState::Closed;
            }
        }
    }

    fn read_message(&self, text: &str) {
        if let Err(error) = validate_message_size(text.len(), &self.config.limits) {
            self.fire_error(error);
            return;
        }

        let message = match serde_json::from_str::<M>(text) {
            Ok(message) => message,
            Err(error) => {
                self.fire_error(TransportError::from(error));
                return;
            }
        };

        let callback = self
            .inner
            .lock()
            .callback
            .as_ref()
            .map(|(_, callback)| callback.clone());
        match callback {
            Some(callback) => {
                self.metrics.record_read(text.len());
                callback(message);
            }
            None => trace!("no active listener, dropping message"),
        }
    }

    fn fire_error(&self, error: TransportError) {
        self.metrics.read_errors.fetch_add(1, Ordering::Relaxed);
        debug!(%error, "message reader error");
        self.error_emitter.fire(&error);
    }

    /// Replays the pending FIFO until it is empty.
    ///
    /// Live events that arrive while this runs are appended to the same FIFO,
    /// so they are delivered after everything captured before them.
    fn drain(&self) {
        loop {
            let event = {
                let mut inner = self.inner.lock();
                match inner.pending.pop_front() {
                    Some(event) => event,
                    None => {
                        inner.draining = false;
                        return;
                    }
                }
            };
            self.dispatch(event);
        }
    }

    fn listener_handle(&self, id: u64) -> Disposable {
        let weak: Weak<Mutex<ReaderInner<M>>> = Arc::downgrade(&self.inner);
        Disposable::create(move || {
            if let Some(inner) = weak.upgrade() {
                let mut inner = inner.lock();
                if matches!(inner.callback, Some((current, _)) if current == id) {
                    inner.callback = None;
                }
            }
        })
    }
}

impl<M> MessageReader<M> for SocketMessageReader<M>
where
    M: DeserializeOwned + 'static,
{
    fn state(&self) -> ReaderState {
        self.inner.lock().state
    }

    fn listen(&self, callback: DataCallback<M>) -> TransportResult<Disposable> {
        let (id, replay) = {
            let mut inner = self.inner.lock();
            if inner.callback.is_some() {
                match self.config.listener_policy {
                    ListenerPolicy::Reject => return Err(TransportError::AlreadyListening),
                    ListenerPolicy::Replace => {
                        warn!(state = %inner.state, "replacing active message listener");
                    }
                }
            }

            let id = inner.next_listener_id;
            inner.next_listener_id += 1;
            inner.callback = Some((id, callback));
            if inner.state == ReaderState::Initial {
                inner.state = ReaderState::Listening;
            }

            let replay = !inner.draining && !inner.pending.is_empty();
            if replay {
                debug!(
                    events = inner.pending.len(),
                    state = %inner.state,
                    "replaying buffered socket events"
                );
                inner.draining = true;
            }
            (id, replay)
        };

        if replay {
            self.drain();
        }
        Ok(self.listener_handle(id))
    }

    fn on_error(&self, listener: Box<dyn Fn(&TransportError) + Send + Sync>) -> Disposable {
        self.error_emitter.event(listener)
    }

    fn on_close(&self, listener: Box<dyn Fn(&CloseEvent) + Send + Sync>) -> Disposable {
        self.close_emitter.event(listener)
    }

    fn dispose(&self) {
        {
            let mut inner = self.inner.lock();
            inner.callback = None;
            inner.pending.clear();
            inner.socket_closed = true;
            inner.state = ReaderState::Closed;
        }
        debug!("message reader disposed");
        self.error_emitter.clear();
        self.close_emitter.clear();
    }
}

impl<M> fmt::Debug for SocketMessageReader<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("SocketMessageReader")
            .field("state", &inner.state)
            .field("listening", &inner.callback.is_some())
            .field("pending", &inner.pending.len())
            .finish()
    }
}
