//! Interactive chat client for Hiroba.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin hiroba-client -- --server 127.0.0.1:8080 --id alice
//! ```

use clap::Parser;

use hiroba_shared::logger::setup_logger;

#[derive(Debug, Parser)]
#[command(name = "hiroba-client", about = "Room-based chat client")]
struct Args {
    /// Server address (host:port)
    #[arg(long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Self-chosen client identity
    #[arg(long)]
    id: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Keep the default quiet so log lines do not fight the prompt.
    setup_logger(env!("CARGO_BIN_NAME"), "warn");

    if let Err(e) = hiroba_client::run_client(&args.server, &args.id).await {
        tracing::error!("Client error: {e}");
        std::process::exit(1);
    }
}
