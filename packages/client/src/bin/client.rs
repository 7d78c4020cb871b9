//! Terminal client for the Yakata chat hub.
//!
//! Logs in (registering the username on first use), connects to the
//! WebSocket and sends typed lines to the current house. Automatically
//! reconnects on disconnection (max 5 attempts with 5 second interval),
//! except when the credentials are rejected.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin yakata-client -- --username alice --password secret
//! cargo run --bin yakata-client -- -u bob -p hunter2 --url http://127.0.0.1:8080
//! ```

use clap::Parser;

use yakata_client::{ClientOptions, run_client};
use yakata_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "yakata-client")]
#[command(about = "Terminal client for the Yakata house/room chat hub", long_about = None)]
struct Args {
    #[arg(short = 'u', long, env = "YAKATA_USERNAME")]
    username: String,

    #[arg(short = 'p', long, env = "YAKATA_PASSWORD", hide_env_values = true)]
    password: String,

    /// HTTP base URL of the server
    #[arg(long, env = "YAKATA_URL", default_value = "http://127.0.0.1:8080")]
    url: String,
}

#[tokio::main]
async fn main() {
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();
    let options = ClientOptions {
        url: args.url,
        username: args.username,
        password: args.password,
    };

    if let Err(e) = run_client(options).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
