//! # sockrpc-relay
//!
//! Relays WebSocket JSON-RPC clients to an upstream WebSocket endpoint.
//! Each client is paired with a fresh upstream connection; messages flow
//! through unchanged in both directions, and closing either side closes
//! the other.
//!
//! ```text
//! client ──ws──> relay ──ws──> upstream
//!        <──────       <──────
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all
)]
#![deny(unsafe_code)]

pub mod cli;
pub mod error;
pub mod relay;

pub use error::{RelayError, RelayResult};
pub use relay::{Relay, RelayConfig};
