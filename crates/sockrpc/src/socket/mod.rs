//! Socket providers shipped with the crate.
//!
//! Network-backed sockets live in their own crates (`sockrpc-websocket`);
//! this module only carries the in-process pair used for local bridges
//! and tests.

mod memory;

pub use memory::MemorySocket;
pub use sockrpc_traits::Socket;
