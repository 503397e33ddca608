//! Connection metrics types.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// A serializable snapshot of a connection's counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionMetrics {
    /// Messages delivered to the reader's listener.
    pub messages_read: u64,

    /// Messages handed to the socket by the writer.
    pub messages_written: u64,

    /// Encoded bytes received by the reader.
    pub bytes_read: u64,

    /// Encoded bytes handed to the socket by the writer.
    pub bytes_written: u64,

    /// Error events raised by the reader.
    pub read_errors: u64,

    /// Failed writes.
    pub write_errors: u64,

    /// Events captured before a listener was attached.
    pub buffered_events: u64,
}

/// Lock-free counters shared by a reader and a writer.
#[derive(Debug, Default)]
pub struct AtomicMetrics {
    /// Messages delivered to the reader's listener (atomic counter).
    pub messages_read: AtomicU64,

    /// Messages handed to the socket (atomic counter).
    pub messages_written: AtomicU64,

    /// Encoded bytes received (atomic counter).
    pub bytes_read: AtomicU64,

    /// Encoded bytes sent (atomic counter).
    pub bytes_written: AtomicU64,

    /// Reader error events (atomic counter).
    pub read_errors: AtomicU64,

    /// Failed writes (atomic counter).
    pub write_errors: AtomicU64,

    /// Events buffered before `listen` (atomic counter).
    pub buffered_events: AtomicU64,
}

impl AtomicMetrics {
    /// Creates a new `AtomicMetrics` instance with all counters initialized to zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one message delivered to a listener.
    pub fn record_read(&self, bytes: usize) {
        self.messages_read.fetch_add(1, Ordering::Relaxed);
        self.bytes_read.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Records one message handed to the socket.
    pub fn record_write(&self, bytes: usize) {
        self.messages_written.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Creates a serializable `ConnectionMetrics` snapshot from the current atomic values.
    pub fn snapshot(&self) -> ConnectionMetrics {
        ConnectionMetrics {
            messages_read: self.messages_read.load(Ordering::Relaxed),
            messages_written: self.messages_written.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            read_errors: self.read_errors.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
            buffered_events: self.buffered_events.load(Ordering::Relaxed),
        }
    }

    /// Resets all atomic metric counters to zero.
    pub fn reset(&self) {
        self.messages_read.store(0, Ordering::Relaxed);
        self.messages_written.store(0, Ordering::Relaxed);
        self.bytes_read.store(0, Ordering::Relaxed);
        self.bytes_written.store(0, Ordering::Relaxed);
        self.read_errors.store(0, Ordering::Relaxed);
        self.write_errors.store(0, Ordering::Relaxed);
        self.buffered_events.store(0, Ordering::Relaxed);
    }
}
