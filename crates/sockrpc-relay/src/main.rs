//! sockrpc-relay CLI entry point

#![warn(clippy::all)]

use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = sockrpc_relay::cli::Cli::parse();

    if let Err(error) = cli.execute().await {
        eprintln!("error: {error}");
        std::process::exit(error.exit_code());
    }
}
