//! Command-line interface for sockrpc-relay

use std::net::SocketAddr;

use clap::{Parser, ValueEnum};
use sockrpc::{ConnectionConfig, LimitsConfig, ListenerPolicy};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::error::RelayResult;
use crate::relay::{Relay, RelayConfig};

/// What a reader does when a second listener is attached
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    /// Refuse the second listener
    Reject,
    /// Drop the current listener in favour of the new one
    Replace,
}

impl From<PolicyArg> for ListenerPolicy {
    fn from(policy: PolicyArg) -> Self {
        match policy {
            PolicyArg::Reject => Self::Reject,
            PolicyArg::Replace => Self::Replace,
        }
    }
}

/// sockrpc-relay - WebSocket JSON-RPC relay
///
/// Accepts WebSocket clients and relays each one to its own connection to
/// an upstream WebSocket endpoint.
#[derive(Parser, Debug)]
#[command(
    name = "sockrpc-relay",
    version,
    about = "Relay WebSocket JSON-RPC clients to an upstream endpoint",
    author
)]
pub struct Cli {
    /// Address to accept clients on
    #[arg(long, env = "SOCKRPC_RELAY_LISTEN", default_value = "127.0.0.1:9000")]
    pub listen: SocketAddr,

    /// Upstream WebSocket URL (ws:// or wss://)
    #[arg(long, env = "SOCKRPC_RELAY_UPSTREAM")]
    pub upstream: String,

    /// Enable verbose logging (-v, -vv, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Behaviour when a reader gets a second listener
    #[arg(
        long,
        value_enum,
        env = "SOCKRPC_RELAY_LISTENER_POLICY",
        default_value = "reject"
    )]
    pub listener_policy: PolicyArg,

    /// Largest message accepted or sent, in bytes (unlimited when unset)
    #[arg(long, env = "SOCKRPC_RELAY_MAX_MESSAGE_SIZE")]
    pub max_message_size: Option<usize>,
}

impl Cli {
    /// Runs the relay until Ctrl-C.
    ///
    /// # Errors
    ///
    /// Returns `RelayError` if the configuration is invalid or the listener
    /// cannot be bound.
    pub async fn execute(self) -> RelayResult<()> {
        self.init_tracing();
        let config = self.relay_config()?;
        Relay::bind(self.listen, config).await?.serve().await
    }

    /// Builds the relay settings from the parsed flags.
    pub fn relay_config(&self) -> RelayResult<RelayConfig> {
        let limits = LimitsConfig {
            max_message_size: self.max_message_size,
        };
        let connection = ConnectionConfig::default()
            .with_listener_policy(self.listener_policy.into())
            .with_limits(limits);
        Ok(RelayConfig::new(&self.upstream)?.with_connection(connection))
    }

    fn level(&self) -> Level {
        if self.quiet {
            return Level::ERROR;
        }
        match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }

    /// Initialize tracing; `RUST_LOG` overrides the verbosity flags
    fn init_tracing(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level().as_str().to_lowercase()));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .init();
    }
}
