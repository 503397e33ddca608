//! Background tasks driving a WebSocket stream.
//!
//! Each socket runs two tasks: the outbound writer, which owns the sink half
//! and drains the send queue, and the inbound pump, which owns the stream
//! half and turns frames into handler calls.

use std::sync::Arc;

use futures::stream::SplitSink;
use futures::{SinkExt as _, StreamExt as _};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, trace, warn};

use sockrpc_traits::{CloseEvent, TransportError};

use crate::socket::{ABNORMAL_CLOSURE, Inbound, Shared, close_event, transport_error};

/// Spawns the task that writes queued frames to `sink`.
///
/// The task stops after sending a close frame, after the first send
/// failure, or once the queue's senders are gone.
pub(crate) fn spawn_outbound_task<S>(
    mut sink: SplitSink<WebSocketStream<S>, Message>,
    mut queue: mpsc::UnboundedReceiver<Message>,
    shared: Arc<Shared>,
) -> JoinHandle<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(frame) = queue.recv().await {
            let is_close = matches!(frame, Message::Close(_));
            if let Err(error) = sink.send(frame).await {
                if shared.is_closed() {
                    trace!(%error, "websocket already closed, dropping frame");
                } else {
                    warn!(%error, "failed to send websocket frame");
                    shared.emit_error(transport_error(error));
                }
                break;
            }
            if is_close {
                break;
            }
        }

        if let Err(error) = sink.close().await {
            trace!(%error, "websocket sink close failed");
        }
        debug!("websocket writer task terminated");
    })
}

/// Spawns the task that reads frames from `inbound` until the connection ends.
pub(crate) fn spawn_inbound_pump(mut inbound: Inbound, shared: Arc<Shared>) -> JoinHandle<()> {
    tokio::spawn(async move {
        debug!("websocket pump started");

        while let Some(frame) = inbound.next().await {
            match frame {
                Ok(Message::Text(text)) => {
                    trace!(bytes = text.len(), "websocket text frame received");
                    shared.emit_message(text.as_str().to_owned());
                }
                Ok(Message::Binary(data)) => match String::from_utf8(data.to_vec()) {
                    Ok(text) => shared.emit_message(text),
                    Err(error) => shared.emit_error(TransportError::SerializationFailed(format!(
                        "binary frame is not valid UTF-8: {error}"
                    ))),
                },
                Ok(Message::Close(frame)) => {
                    // Keep polling so the close reply is flushed.
                    shared.emit_close(close_event(frame));
                }
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {
                    trace!("websocket control frame received");
                }
                Err(error) => {
                    if shared.is_closed() {
                        trace!(%error, "websocket stream ended after close");
                    } else {
                        let reason = error.to_string();
                        warn!(%reason, "websocket transport failure");
                        shared.emit_error(transport_error(error));
                        shared.emit_close(CloseEvent::new(ABNORMAL_CLOSURE, reason));
                    }
                    break;
                }
            }
        }

        shared.emit_close(CloseEvent::new(ABNORMAL_CLOSURE, "connection dropped"));
        debug!("websocket pump terminated");
    })
}
