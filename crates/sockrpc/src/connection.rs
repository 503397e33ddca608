//! Reader/writer pairs with a shared lifecycle.
//!
//! A [`Connection`] closes when either its reader or its writer closes,
//! whichever comes first; `on_close` callbacks run exactly once. The
//! connection itself owns nothing beyond the teardown callback handed to
//! [`Connection::new`].

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use sockrpc_traits::{
    AtomicMetrics, ConnectionConfig, ConnectionMetrics, Disposable, DisposableCollection,
    MessageReader, MessageWriter, Socket, TransportResult,
};

use crate::reader::SocketMessageReader;
use crate::writer::SocketMessageWriter;

type Teardown = Box<dyn FnOnce() + Send>;

/// A message reader and writer treated as one unit.
pub struct Connection<M> {
    reader: Arc<dyn MessageReader<M>>,
    writer: Arc<dyn MessageWriter<M>>,
    dispose_on_close: DisposableCollection,
    on_dispose: Mutex<Option<Teardown>>,
    metrics: Option<Arc<AtomicMetrics>>,
}

impl<M: 'static> Connection<M> {
    /// Pairs `reader` and `writer`. `on_dispose` runs on the first
    /// [`Connection::dispose`] call.
    pub fn new(
        reader: Arc<dyn MessageReader<M>>,
        writer: Arc<dyn MessageWriter<M>>,
        on_dispose: impl FnOnce() + Send + 'static,
    ) -> Self {
        let dispose_on_close = DisposableCollection::new();

        let group = dispose_on_close.clone();
        let _ = reader.on_close(Box::new(move |_| group.dispose()));
        let group = dispose_on_close.clone();
        let _ = writer.on_close(Box::new(move || group.dispose()));

        Self {
            reader,
            writer,
            dispose_on_close,
            on_dispose: Mutex::new(Some(Box::new(on_dispose))),
            metrics: None,
        }
    }

    /// Attaches the counters the reader and writer update.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<AtomicMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// The inbound half.
    pub fn reader(&self) -> &Arc<dyn MessageReader<M>> {
        &self.reader
    }

    /// The outbound half.
    pub fn writer(&self) -> &Arc<dyn MessageWriter<M>> {
        &self.writer
    }

    /// Writes every inbound message, unchanged, to `to`'s writer.
    pub fn forward(&self, to: &Connection<M>) -> TransportResult<Disposable> {
        self.forward_with(to, |message| message)
    }

    /// Writes `map(message)` to `to`'s writer for every inbound message.
    ///
    /// The write happens inside the inbound callback; there is no
    /// backpressure. Write failures surface on `to`'s writer error event.
    pub fn forward_with<N: 'static>(
        &self,
        to: &Connection<N>,
        map: impl Fn(M) -> N + Send + Sync + 'static,
    ) -> TransportResult<Disposable> {
        let writer = to.writer.clone();
        self.reader.listen(Arc::new(move |input| {
            let output = map(input);
            writer.write(output);
        }))
    }

    /// Runs `callback` once, when the reader or the writer closes.
    pub fn on_close(&self, callback: impl FnOnce() + Send + 'static) -> Disposable {
        self.dispose_on_close.push(callback)
    }

    /// Returns `true` once the reader or the writer has closed.
    pub fn is_closed(&self) -> bool {
        self.dispose_on_close.is_disposed()
    }

    /// Snapshot of the reader/writer counters, if attached.
    pub fn metrics(&self) -> ConnectionMetrics {
        self.metrics
            .as_ref()
            .map(|metrics| metrics.snapshot())
            .unwrap_or_default()
    }

    /// Runs the teardown callback. Later calls do nothing.
    pub fn dispose(&self) {
        let teardown = self.on_dispose.lock().take();
        if let Some(teardown) = teardown {
            debug!("disposing connection");
            teardown();
        }
    }
}

impl<M> fmt::Debug for Connection<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("reader", &self.reader)
            .field("writer", &self.writer)
            .field("closed", &self.dispose_on_close.is_disposed())
            .finish()
    }
}

/// Builds a connection that reads from and writes to `socket`.
///
/// The reader subscribes to the socket before this returns, so nothing the
/// socket emits afterwards is lost. Disposing the connection disposes the
/// socket.
pub fn create_socket_connection<M>(
    socket: Arc<dyn Socket>,
    config: ConnectionConfig,
) -> Connection<M>
where
    M: Serialize + DeserializeOwned + 'static,
{
    let metrics = Arc::new(AtomicMetrics::new());
    let reader = SocketMessageReader::<M>::new(socket.as_ref(), config.clone(), metrics.clone());
    let writer = SocketMessageWriter::<M>::new(socket.clone(), config.limits, metrics.clone());

    debug!(?socket, "socket connection created");
    Connection::new(reader, writer, move || socket.dispose()).with_metrics(metrics)
}
