//! Client/upstream relay sessions.
//!
//! Every accepted client gets its own upstream connection. Messages are
//! forwarded unchanged in both directions, and when either side closes the
//! other is disposed.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use sockrpc::{Connection, ConnectionConfig};
use sockrpc_websocket::create_websocket_connection;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, connect_async};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{RelayError, RelayResult};

/// How long a session waits for the second side to close after the first.
pub const CLOSE_GRACE: Duration = Duration::from_secs(5);

/// Relay settings shared by every session.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// WebSocket endpoint each client is relayed to
    pub upstream: Url,
    /// Reader/writer settings for both sides
    pub connection: ConnectionConfig,
}

impl RelayConfig {
    /// Validates `upstream` and builds a config with default connection settings.
    pub fn new(upstream: &str) -> RelayResult<Self> {
        let upstream = Url::parse(upstream)
            .map_err(|error| RelayError::configuration(format!("invalid upstream URL: {error}")))?;
        if !matches!(upstream.scheme(), "ws" | "wss") {
            return Err(RelayError::configuration(format!(
                "upstream URL must use ws:// or wss://, got {}://",
                upstream.scheme()
            )));
        }
        Ok(Self {
            upstream,
            connection: ConnectionConfig::default(),
        })
    }

    /// Sets the reader/writer settings.
    #[must_use]
    pub fn with_connection(mut self, connection: ConnectionConfig) -> Self {
        self.connection = connection;
        self
    }
}

/// A bound relay listener.
#[derive(Debug)]
pub struct Relay {
    listener: TcpListener,
    config: Arc<RelayConfig>,
}

impl Relay {
    /// Binds the client-facing listener.
    pub async fn bind(addr: SocketAddr, config: RelayConfig) -> RelayResult<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            config: Arc::new(config),
        })
    }

    /// The address clients connect to.
    pub fn local_addr(&self) -> RelayResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts clients until `shutdown` completes.
    pub async fn serve_until(self, shutdown: impl Future<Output = ()>) -> RelayResult<()> {
        tokio::pin!(shutdown);
        info!(
            listen = %self.local_addr()?,
            upstream = %self.config.upstream,
            "relay listening"
        );

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("relay shutting down");
                    return Ok(());
                }
                accepted = self.listener.accept() => {
                    let (tcp, peer) = accepted?;
                    let config = self.config.clone();
                    tokio::spawn(async move {
                        if let Err(error) = relay_client(tcp, peer, config).await {
                            warn!(%peer, %error, "relay session failed");
                        }
                    });
                }
            }
        }
    }

    /// Accepts clients until the process receives Ctrl-C.
    pub async fn serve(self) -> RelayResult<()> {
        self.serve_until(async {
            if let Err(error) = tokio::signal::ctrl_c().await {
                warn!(%error, "failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await
    }
}

async fn relay_client(
    tcp: TcpStream,
    peer: SocketAddr,
    config: Arc<RelayConfig>,
) -> RelayResult<()> {
    let client_stream = accept_async(tcp).await.map_err(|error| RelayError::Handshake {
        message: error.to_string(),
    })?;
    let (upstream_stream, _) = connect_async(config.upstream.as_str())
        .await
        .map_err(|error| RelayError::Upstream {
            url: config.upstream.to_string(),
            message: error.to_string(),
        })?;
    info!(%peer, "relay session opened");

    let client: Arc<Connection<Value>> = Arc::new(create_websocket_connection(
        client_stream,
        config.connection.clone(),
    ));
    let upstream: Arc<Connection<Value>> = Arc::new(create_websocket_connection(
        upstream_stream,
        config.connection.clone(),
    ));

    let (closed_tx, mut closed_rx) = mpsc::unbounded_channel();
    link_close(&client, &upstream, "client", closed_tx.clone());
    link_close(&upstream, &client, "upstream", closed_tx);

    let _to_upstream = client.forward(&upstream)?;
    let _to_client = upstream.forward(&client)?;

    if let Some(side) = closed_rx.recv().await {
        debug!(%peer, side, "relay side closed");
    }
    if tokio::time::timeout(CLOSE_GRACE, closed_rx.recv()).await.is_err() {
        warn!(%peer, "other relay side did not close in time");
    }

    let metrics = client.metrics();
    info!(
        %peer,
        to_upstream = metrics.messages_read,
        to_client = metrics.messages_written,
        "relay session closed"
    );
    Ok(())
}

/// Disposes `other` when `side` closes and reports the closure on `closed`.
fn link_close(
    side: &Arc<Connection<Value>>,
    other: &Arc<Connection<Value>>,
    name: &'static str,
    closed: mpsc::UnboundedSender<&'static str>,
) {
    let other = Arc::downgrade(other);
    let _ = side.on_close(move || {
        if let Some(other) = other.upgrade() {
            other.dispose();
        }
        let _ = closed.send(name);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_accepts_websocket_urls() {
        assert!(RelayConfig::new("ws://127.0.0.1:9000").is_ok());
        assert!(RelayConfig::new("wss://example.com/rpc").is_ok());
    }

    #[test]
    fn test_config_rejects_other_schemes() {
        let error = RelayConfig::new("http://example.com").unwrap_err();
        assert!(matches!(error, RelayError::Configuration { .. }));
        assert!(RelayConfig::new("not a url").is_err());
    }
}
