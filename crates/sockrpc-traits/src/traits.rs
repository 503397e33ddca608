//! Core capability traits.

use std::fmt;
use std::sync::Arc;

use crate::disposable::Disposable;
use crate::error::{TransportError, TransportResult};
use crate::types::{CloseEvent, ReaderState, WriteError};

/// Handler for inbound text frames.
pub type MessageHandler = Box<dyn Fn(String) + Send + Sync>;

/// Handler for socket-reported errors.
pub type ErrorHandler = Box<dyn Fn(TransportError) + Send + Sync>;

/// Handler for the socket close notification.
pub type CloseHandler = Box<dyn Fn(CloseEvent) + Send + Sync>;

/// Listener receiving decoded messages from a [`MessageReader`].
pub type DataCallback<M> = Arc<dyn Fn(M) + Send + Sync>;

/// A bidirectional text-message socket.
///
/// Each `on_*` registration replaces the previous handler of the same
/// kind. The socket belongs to whoever created it; readers and writers
/// only hold a reference.
pub trait Socket: Send + Sync + fmt::Debug {
    /// Sends one text payload. An `Err` means the payload was not sent.
    fn send(&self, text: String) -> TransportResult<()>;

    /// Installs the handler for inbound text payloads.
    fn on_message(&self, handler: MessageHandler);

    /// Installs the handler for transport errors.
    fn on_error(&self, handler: ErrorHandler);

    /// Installs the handler for the close notification.
    fn on_close(&self, handler: CloseHandler);

    /// Releases the socket, closing it if still open.
    fn dispose(&self);
}

/// The inbound half of a message connection.
pub trait MessageReader<M>: Send + Sync + fmt::Debug {
    /// Returns the current lifecycle state.
    fn state(&self) -> ReaderState;

    /// Attaches the message listener and replays anything buffered before it.
    ///
    /// Disposing the returned handle detaches `callback` if it is still the
    /// current listener.
    fn listen(&self, callback: DataCallback<M>) -> TransportResult<Disposable>;

    /// Subscribes to transport errors.
    fn on_error(&self, listener: Box<dyn Fn(&TransportError) + Send + Sync>) -> Disposable;

    /// Subscribes to the close notification.
    fn on_close(&self, listener: Box<dyn Fn(&CloseEvent) + Send + Sync>) -> Disposable;

    /// Drops every subscriber and the current listener.
    fn dispose(&self);
}

/// The outbound half of a message connection.
pub trait MessageWriter<M>: Send + Sync + fmt::Debug {
    /// Writes one message. Failures are reported through [`MessageWriter::on_error`].
    fn write(&self, message: M);

    /// Signals the end of output.
    fn end(&self);

    /// Subscribes to write failures.
    fn on_error(&self, listener: Box<dyn Fn(&WriteError<M>) + Send + Sync>) -> Disposable;

    /// Subscribes to the writer's close notification.
    fn on_close(&self, listener: Box<dyn Fn() + Send + Sync>) -> Disposable;

    /// Drops every subscriber.
    fn dispose(&self);
}
