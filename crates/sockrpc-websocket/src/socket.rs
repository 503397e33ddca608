//! WebSocket-backed [`Socket`].

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::StreamExt as _;
use futures::stream::BoxStream;
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, trace};

use sockrpc_traits::{
    CloseEvent, CloseHandler, ErrorHandler, MessageHandler, Socket, TransportError,
    TransportResult,
};

use crate::tasks;

/// Close code reported when the peer's close frame carried no status.
pub const NO_STATUS_RECEIVED: i32 = 1005;

/// Close code reported when the connection dropped without a close frame.
pub const ABNORMAL_CLOSURE: i32 = 1006;

pub(crate) type Inbound = BoxStream<'static, Result<Message, WsError>>;

#[derive(Default)]
struct Handlers {
    message: Option<Arc<dyn Fn(String) + Send + Sync>>,
    error: Option<Arc<dyn Fn(TransportError) + Send + Sync>>,
    close: Option<Arc<dyn Fn(CloseEvent) + Send + Sync>>,
}

/// Handler slots shared between the socket and its background tasks.
#[derive(Default)]
pub(crate) struct Shared {
    handlers: Mutex<Handlers>,
    closed: AtomicBool,
}

impl Shared {
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn emit_message(&self, text: String) {
        if self.is_closed() {
            trace!("websocket closed, dropping inbound frame");
            return;
        }
        let handler = self.handlers.lock().message.clone();
        match handler {
            Some(handler) => handler(text),
            None => trace!("no message handler installed, dropping inbound frame"),
        }
    }

    pub(crate) fn emit_error(&self, error: TransportError) {
        if self.is_closed() {
            trace!(%error, "websocket closed, dropping error");
            return;
        }
        let handler = self.handlers.lock().error.clone();
        if let Some(handler) = handler {
            handler(error);
        }
    }

    /// Fires the close handler. Only the first call has any effect.
    pub(crate) fn emit_close(&self, event: CloseEvent) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!(%event, "websocket closed");
        let handler = self.handlers.lock().close.clone();
        if let Some(handler) = handler {
            handler(event);
        }
    }
}

/// A [`Socket`] over a split [`WebSocketStream`].
///
/// `send` queues the frame on an unbounded channel drained by a background
/// writer task, so it never blocks. Inbound frames are read by a pump task
/// spawned by [`WebSocketSocket::start`]; install handlers first.
pub struct WebSocketSocket {
    shared: Arc<Shared>,
    outbound: mpsc::UnboundedSender<Message>,
    inbound: Mutex<Option<Inbound>>,
    pump: Mutex<Option<JoinHandle<()>>>,
    closing: AtomicBool,
}

impl WebSocketSocket {
    /// Wraps `stream` and spawns the outbound writer task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new<S>(stream: WebSocketStream<S>) -> Arc<Self>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (sink, stream) = stream.split();
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared::default());

        // The writer task ends by itself once every sender is dropped.
        drop(tasks::spawn_outbound_task(sink, outbound_rx, shared.clone()));

        Arc::new(Self {
            shared,
            outbound,
            inbound: Mutex::new(Some(stream.boxed())),
            pump: Mutex::new(None),
            closing: AtomicBool::new(false),
        })
    }

    /// Starts delivering inbound frames to the installed handlers.
    ///
    /// Later calls do nothing.
    pub fn start(&self) {
        let Some(inbound) = self.inbound.lock().take() else {
            trace!("websocket pump already started");
            return;
        };
        let handle = tasks::spawn_inbound_pump(inbound, self.shared.clone());
        *self.pump.lock() = Some(handle);
    }

    /// Returns `true` once the connection has closed.
    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }
}

impl Socket for WebSocketSocket {
    fn send(&self, text: String) -> TransportResult<()> {
        if self.closing.load(Ordering::SeqCst) || self.shared.is_closed() {
            return Err(TransportError::SocketClosed);
        }
        self.outbound
            .send(Message::text(text))
            .map_err(|_| TransportError::SocketClosed)
    }

    fn on_message(&self, handler: MessageHandler) {
        self.shared.handlers.lock().message = Some(Arc::from(handler));
    }

    fn on_error(&self, handler: ErrorHandler) {
        self.shared.handlers.lock().error = Some(Arc::from(handler));
    }

    fn on_close(&self, handler: CloseHandler) {
        self.shared.handlers.lock().close = Some(Arc::from(handler));
    }

    fn dispose(&self) {
        if self.closing.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("sending websocket close frame");
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "".into(),
        };
        if self.outbound.send(Message::Close(Some(frame))).is_err() {
            trace!("websocket writer already stopped");
        }
    }
}

impl Drop for WebSocketSocket {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.lock().take() {
            pump.abort();
        }
    }
}

impl fmt::Debug for WebSocketSocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSocketSocket")
            .field("started", &self.inbound.lock().is_none())
            .field("closing", &self.closing.load(Ordering::SeqCst))
            .field("closed", &self.shared.is_closed())
            .finish()
    }
}

/// Maps a received close frame to a [`CloseEvent`].
pub(crate) fn close_event(frame: Option<CloseFrame>) -> CloseEvent {
    match frame {
        Some(frame) => CloseEvent::new(i32::from(u16::from(frame.code)), frame.reason.as_str()),
        None => CloseEvent::new(NO_STATUS_RECEIVED, ""),
    }
}

/// Maps a WebSocket protocol error to a [`TransportError`].
pub(crate) fn transport_error(error: WsError) -> TransportError {
    match error {
        WsError::ConnectionClosed | WsError::AlreadyClosed => TransportError::SocketClosed,
        WsError::Io(error) => TransportError::from(error),
        other => TransportError::Socket(other.to_string()),
    }
}
