//! Connections over WebSocket streams.

use serde::Serialize;
use serde::de::DeserializeOwned;
use sockrpc::{Connection, ConnectionConfig, create_socket_connection};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::WebSocketStream;

use crate::socket::WebSocketSocket;

/// Builds a message connection over `stream` and starts reading from it.
///
/// Must be called from within a tokio runtime. Inbound frames that arrive
/// before a listener is attached are buffered by the connection's reader.
pub fn create_websocket_connection<M, S>(
    stream: WebSocketStream<S>,
    config: ConnectionConfig,
) -> Connection<M>
where
    M: Serialize + DeserializeOwned + 'static,
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let socket = WebSocketSocket::new(stream);
    let connection = create_socket_connection(socket.clone(), config);
    socket.start();
    connection
}
