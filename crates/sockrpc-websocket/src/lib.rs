//! # sockrpc WebSocket Adapter
//!
//! Exposes an established `tokio-tungstenite` [`WebSocketStream`] as a
//! sockrpc [`Socket`](sockrpc_traits::Socket), so JSON-RPC readers, writers
//! and connections can run over it.
//!
//! The adapter does no handshaking of its own: accept or connect with
//! `tokio-tungstenite` first, then hand the stream over.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use serde_json::Value;
//! use sockrpc::ConnectionConfig;
//! use sockrpc_websocket::create_websocket_connection;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (stream, _response) = tokio_tungstenite::connect_async("ws://localhost:8080").await?;
//! let connection = create_websocket_connection::<Value, _>(stream, ConnectionConfig::default());
//! connection.writer().write(serde_json::json!({"jsonrpc": "2.0", "method": "ping"}));
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! sockrpc-websocket/
//! ├── socket.rs      # WebSocketSocket and handler dispatch
//! ├── tasks.rs       # Inbound pump and outbound writer tasks
//! └── connection.rs  # Connection construction
//! ```
//!
//! [`WebSocketStream`]: tokio_tungstenite::WebSocketStream

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all
)]
#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::must_use_candidate
)]

pub mod connection;
pub mod socket;
mod tasks;

// Re-export main types for convenience
pub use connection::create_websocket_connection;
pub use socket::WebSocketSocket;
