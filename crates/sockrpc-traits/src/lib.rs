//! # sockrpc Traits
//!
//! Core capability traits and types shared by every sockrpc crate.
//! This crate provides the abstractions that socket adapters and the
//! reader/writer/connection layer depend on.
//!
//! ## Overview
//!
//! This crate defines:
//! - **Traits**: [`Socket`], [`MessageReader`], [`MessageWriter`]
//! - **Lifecycle**: [`Disposable`], [`DisposableCollection`], [`Emitter`]
//! - **Types**: [`CloseEvent`], [`WriteError`], [`ReaderState`]
//! - **Errors**: [`TransportError`], [`TransportResult`]
//! - **Config**: [`ConnectionConfig`], [`LimitsConfig`], [`ListenerPolicy`]
//! - **Metrics**: [`ConnectionMetrics`], [`AtomicMetrics`]
//!
//! ## Usage
//!
//! Socket providers implement [`Socket`] and hand it to the reader/writer
//! layer in the `sockrpc` crate:
//!
//! ```rust,ignore
//! use sockrpc_traits::{CloseEvent, Socket, TransportResult};
//!
//! #[derive(Debug)]
//! struct MySocket { /* ... */ }
//!
//! impl Socket for MySocket {
//!     fn send(&self, text: String) -> TransportResult<()> { /* ... */ }
//!     // ... handler registration and dispose
//! }
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

mod config;
mod disposable;
mod error;
mod events;
mod metrics;
mod traits;
mod types;

// Re-export all public items
pub use config::{ConnectionConfig, LimitsConfig, ListenerPolicy};
pub use disposable::{Disposable, DisposableCollection};
pub use error::{TransportError, TransportResult};
pub use events::Emitter;
pub use metrics::{AtomicMetrics, ConnectionMetrics};
pub use traits::{
    CloseHandler, DataCallback, ErrorHandler, MessageHandler, MessageReader, MessageWriter, Socket,
};
pub use types::{CloseEvent, ReaderState, WriteError};

// Re-export validation functions
pub use error::validate_message_size;
