//! Yakata hub server.
//!
//! Clients log in over HTTP, connect to `/ws?bearer=<token>` and join houses
//! and rooms to chat.
//!
//! Run with:
//! ```not_rust
//! YAKATA_JWT_SECRET=change-me cargo run --bin yakata-server
//! cargo run --bin yakata-server -- --host 0.0.0.0 --port 3000 --jwt-secret change-me
//! ```

use std::sync::Arc;

use clap::Parser;
use yakata_server::{
    config::ServerArgs,
    domain::PresenceBridge,
    hub::ServerHandle,
    infrastructure::{
        auth::JwtTokenService,
        pubsub::{DisabledBridge, LocalBridge},
        repository::{InMemoryHouseRepository, InMemoryUserRepository},
    },
    ui::Server,
    usecase::LoginUseCase,
};
use yakata_shared::logger::setup_logger;

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = ServerArgs::parse();
    if let Err(e) = run(args).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: ServerArgs) -> Result<(), Box<dyn std::error::Error>> {
    let hub_config = Arc::new(args.hub_config()?);
    tracing::info!(
        "Outbound queue {} frames, overflow policy '{}'",
        hub_config.outbound_capacity,
        hub_config.overflow_policy
    );

    // Initialize dependencies in order:
    // 1. Repositories
    // 2. Token service
    // 3. Hub
    // 4. UseCases
    // 5. Server

    // 1. Create Repositories (in-memory database)
    let user_repository = Arc::new(InMemoryUserRepository::new());
    let house_repository = Arc::new(InMemoryHouseRepository::new());

    // 2. Create token service
    let tokens = Arc::new(JwtTokenService::new(&args.jwt_secret, args.token_ttl()));

    // 3. Start the hub
    let bridge: Arc<dyn PresenceBridge> = if args.pubsub {
        tracing::info!("Presence bridge enabled");
        Arc::new(LocalBridge::new())
    } else {
        Arc::new(DisabledBridge)
    };
    let hub = ServerHandle::spawn(
        user_repository.clone(),
        house_repository,
        bridge,
        hub_config.clone(),
    )
    .await?;

    // 4. Create UseCases
    let login_usecase = Arc::new(LoginUseCase::new(user_repository, tokens.clone()));

    // 5. Create and run the server
    let server = Server::new(hub, hub_config, tokens, login_usecase);
    server.run(args.host, args.port).await
}
