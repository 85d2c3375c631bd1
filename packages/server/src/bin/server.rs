//! Room/session broker server for Hiroba.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin hiroba-server -- --bind 127.0.0.1:8080
//! ```

use std::net::SocketAddr;

use clap::Parser;

use hiroba_shared::logger::setup_logger;

#[derive(Debug, Parser)]
#[command(name = "hiroba-server", about = "Room-based chat broker server")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: SocketAddr,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    // Run the server
    if let Err(e) = hiroba_server::run(args.bind).await {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }
}
