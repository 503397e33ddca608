//! Integration tests for sockrpc-websocket
//!
//! Runs real WebSocket handshakes over loopback TCP and drives the
//! resulting connections through the sockrpc reader/writer layer.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use sockrpc::{CloseEvent, Connection, ConnectionConfig, TransportError, WriteError};
use sockrpc_websocket::create_websocket_connection;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, accept_async, connect_async};

const WAIT: Duration = Duration::from_secs(5);

type ServerStream = WebSocketStream<TcpStream>;
type ClientStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn stream_pair() -> (ServerStream, ClientStream) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = async {
        let (tcp, _) = listener.accept().await.unwrap();
        accept_async(tcp).await.unwrap()
    };
    let client = async { connect_async(format!("ws://{addr}")).await.unwrap().0 };

    tokio::join!(server, client)
}

async fn connection_pair() -> (Connection<Value>, Connection<Value>) {
    let (server, client) = stream_pair().await;
    (
        create_websocket_connection(server, ConnectionConfig::default()),
        create_websocket_connection(client, ConnectionConfig::default()),
    )
}

fn subscribe(connection: &Connection<Value>) -> mpsc::UnboundedReceiver<Value> {
    let (tx, rx) = mpsc::unbounded_channel();
    let _listener = connection
        .reader()
        .listen(Arc::new(move |message| {
            let _ = tx.send(message);
        }))
        .unwrap();
    rx
}

fn subscribe_close(connection: &Connection<Value>) -> mpsc::UnboundedReceiver<CloseEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    let _ = connection
        .reader()
        .on_close(Box::new(move |event: &CloseEvent| {
            let _ = tx.send(event.clone());
        }));
    rx
}

#[tokio::test]
async fn test_messages_cross_the_wire() {
    let (server, client) = connection_pair().await;
    let mut inbound = subscribe(&server);

    let request = json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"});
    client.writer().write(request.clone());

    let received = timeout(WAIT, inbound.recv()).await.unwrap();
    assert_eq!(received, Some(request));
}

#[tokio::test]
async fn test_messages_before_listen_are_buffered() {
    let (server, client) = connection_pair().await;

    for id in 1..=3 {
        client.writer().write(json!({"id": id}));
    }
    // Give the pump time to read every frame before anyone listens.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut inbound = subscribe(&server);
    for id in 1..=3 {
        let received = timeout(WAIT, inbound.recv()).await.unwrap();
        assert_eq!(received, Some(json!({"id": id})));
    }
}

#[tokio::test]
async fn test_echo_by_forwarding_to_self() {
    let (server, client) = connection_pair().await;
    let _echo = server.forward(&server).unwrap();
    let mut replies = subscribe(&client);

    client.writer().write(json!({"method": "ping"}));

    let reply = timeout(WAIT, replies.recv()).await.unwrap();
    assert_eq!(reply, Some(json!({"method": "ping"})));
}

#[tokio::test]
async fn test_dispose_sends_normal_close() {
    let (server, client) = connection_pair().await;
    let mut closes = subscribe_close(&server);
    let _inbound = subscribe(&server);

    client.dispose();

    let event = timeout(WAIT, closes.recv()).await.unwrap().unwrap();
    assert_eq!(event.code, CloseEvent::NORMAL_CLOSURE);
    assert!(server.is_closed());
}

#[tokio::test]
async fn test_write_after_dispose_reports_closed_socket() {
    let (_server, client) = connection_pair().await;
    let (tx, mut failures) = mpsc::unbounded_channel();
    let _ = client
        .writer()
        .on_error(Box::new(move |failure: &WriteError<Value>| {
            let _ = tx.send((failure.error.clone(), failure.count));
        }));

    client.dispose();
    client.writer().write(json!("too late"));

    let failure = timeout(WAIT, failures.recv()).await.unwrap();
    assert_eq!(failure, Some((TransportError::SocketClosed, 1)));
    assert!(client.is_closed());
}

#[tokio::test]
async fn test_dropped_peer_is_abnormal_close() {
    let (server, client) = stream_pair().await;
    let server: Connection<Value> =
        create_websocket_connection(server, ConnectionConfig::default());
    let mut closes = subscribe_close(&server);
    let _inbound = subscribe(&server);

    drop(client);

    let event = timeout(WAIT, closes.recv()).await.unwrap().unwrap();
    assert_ne!(event.code, CloseEvent::NORMAL_CLOSURE);
}
