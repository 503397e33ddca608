//! # sockrpc
//!
//! JSON-RPC message plumbing over text sockets.
//!
//! A [`Socket`] delivers and accepts whole text frames. This crate turns one
//! into a typed message stream:
//!
//! - [`SocketMessageReader`] decodes inbound frames and buffers every socket
//!   event until a listener is attached, so nothing emitted between socket
//!   creation and `listen` is lost.
//! - [`SocketMessageWriter`] encodes outbound messages. Failures never reach
//!   the caller of `write`; they are reported on the writer's error event
//!   with a running count.
//! - [`Connection`] pairs a reader and a writer, closes once when either
//!   half closes, and can forward messages to another connection.
//! - [`ConnectionChannel`] carries plain strings over a JSON-RPC connection
//!   inside a `{"jsonrpc": "0.0", "content": ...}` envelope.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use serde_json::{Value, json};
//! use sockrpc::{ConnectionConfig, MemorySocket, create_socket_connection};
//!
//! let (left, right) = MemorySocket::pair();
//! let client = create_socket_connection::<Value>(left, ConnectionConfig::default());
//! let server = create_socket_connection::<Value>(right, ConnectionConfig::default());
//!
//! let _listener = server.reader().listen(Arc::new(|message| {
//!     println!("received {message}");
//! }))?;
//! client.writer().write(json!({"jsonrpc": "2.0", "method": "ping"}));
//! ```
//!
//! ## Architecture
//!
//! ```text
//! sockrpc/
//! ├── reader.rs      # Buffering socket reader
//! ├── writer.rs      # Socket writer with numbered errors
//! ├── connection.rs  # Reader/writer pairing, forwarding, close-once
//! ├── channel.rs     # String channel envelope
//! └── socket/        # In-memory socket pair
//! ```

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

pub mod channel;
pub mod connection;
pub mod reader;
pub mod socket;
pub mod writer;

// Re-export main types for convenience
pub use channel::{
    CHANNEL_CLOSE_CODE, CHANNEL_CLOSE_REASON, CHANNEL_PROTOCOL_VERSION, Channel, ChannelEnvelope,
    ConnectionChannel, is_channel_envelope,
};
pub use connection::{Connection, create_socket_connection};
pub use reader::SocketMessageReader;
pub use socket::MemorySocket;
pub use writer::SocketMessageWriter;

// Re-export the shared traits so adapters only need this crate
pub use sockrpc_traits::{
    AtomicMetrics, CloseEvent, ConnectionConfig, ConnectionMetrics, DataCallback, Disposable,
    DisposableCollection, Emitter, LimitsConfig, ListenerPolicy, MessageReader, MessageWriter,
    ReaderState, Socket, TransportError, TransportResult, WriteError,
};
