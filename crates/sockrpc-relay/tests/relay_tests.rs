//! Integration tests for sockrpc-relay
//!
//! Starts an echo upstream and a relay on loopback ports and drives a
//! WebSocket client through the relay.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use sockrpc::{Connection, ConnectionConfig};
use sockrpc_relay::{Relay, RelayConfig, RelayError};
use sockrpc_websocket::create_websocket_connection;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::{accept_async, connect_async};

const WAIT: Duration = Duration::from_secs(5);

/// Upstream that echoes every message and reports when a session closes.
async fn spawn_echo_upstream() -> (SocketAddr, mpsc::UnboundedReceiver<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (closed_tx, closed_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((tcp, _)) = listener.accept().await {
            let closed_tx = closed_tx.clone();
            tokio::spawn(async move {
                let stream = accept_async(tcp).await.unwrap();
                let connection: Arc<Connection<Value>> = Arc::new(create_websocket_connection(
                    stream,
                    ConnectionConfig::default(),
                ));
                let (done_tx, done_rx) = oneshot::channel();
                let _ = connection.on_close(move || {
                    let _ = done_tx.send(());
                });
                let _echo = connection.forward(&connection).unwrap();
                let _ = done_rx.await;
                let _ = closed_tx.send(());
            });
        }
    });

    (addr, closed_rx)
}

async fn spawn_relay(upstream: SocketAddr) -> (SocketAddr, oneshot::Sender<()>) {
    let config = RelayConfig::new(&format!("ws://{upstream}")).unwrap();
    let relay = Relay::bind("127.0.0.1:0".parse().unwrap(), config)
        .await
        .unwrap();
    let addr = relay.local_addr().unwrap();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    tokio::spawn(relay.serve_until(async {
        let _ = stop_rx.await;
    }));
    (addr, stop_tx)
}

async fn connect_client(relay: SocketAddr) -> (Connection<Value>, mpsc::UnboundedReceiver<Value>) {
    let (stream, _) = connect_async(format!("ws://{relay}")).await.unwrap();
    let connection: Connection<Value> =
        create_websocket_connection(stream, ConnectionConfig::default());
    let (tx, rx) = mpsc::unbounded_channel();
    let _listener = connection
        .reader()
        .listen(Arc::new(move |message| {
            let _ = tx.send(message);
        }))
        .unwrap();
    (connection, rx)
}

#[tokio::test]
async fn test_relay_round_trip() {
    let (upstream, _closed) = spawn_echo_upstream().await;
    let (relay, _stop) = spawn_relay(upstream).await;
    let (client, mut replies) = connect_client(relay).await;

    let requests = [
        json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"}),
        json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
        json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
    ];
    for request in &requests {
        client.writer().write(request.clone());
    }

    for request in requests {
        let reply = timeout(WAIT, replies.recv()).await.unwrap();
        assert_eq!(reply, Some(request));
    }
}

#[tokio::test]
async fn test_client_close_closes_upstream() {
    let (upstream, mut upstream_closed) = spawn_echo_upstream().await;
    let (relay, _stop) = spawn_relay(upstream).await;
    let (client, mut replies) = connect_client(relay).await;

    // Make sure the session is fully established first.
    client.writer().write(json!({"id": 1}));
    timeout(WAIT, replies.recv()).await.unwrap();

    client.dispose();

    timeout(WAIT, upstream_closed.recv()).await.unwrap();
}

#[tokio::test]
async fn test_sessions_are_independent() {
    let (upstream, _closed) = spawn_echo_upstream().await;
    let (relay, _stop) = spawn_relay(upstream).await;
    let (first, mut first_replies) = connect_client(relay).await;
    let (second, mut second_replies) = connect_client(relay).await;

    first.writer().write(json!("first"));
    second.writer().write(json!("second"));

    assert_eq!(
        timeout(WAIT, first_replies.recv()).await.unwrap(),
        Some(json!("first"))
    );
    assert_eq!(
        timeout(WAIT, second_replies.recv()).await.unwrap(),
        Some(json!("second"))
    );
}

#[tokio::test]
async fn test_bind_rejects_address_in_use() {
    let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = taken.local_addr().unwrap();
    let config = RelayConfig::new("ws://127.0.0.1:1").unwrap();

    let result = Relay::bind(addr, config).await;
    assert!(matches!(result, Err(RelayError::Io(_))));
}
