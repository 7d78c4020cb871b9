//! Client execution logic with reconnection support.

use std::time::Duration;

use super::{
    domain::{should_attempt_reconnect, should_exit_immediately},
    error::ClientError,
    session::run_client_session,
    state::ChatState,
    ui::spawn_line_reader,
};

const MAX_RECONNECT_ATTEMPTS: u32 = 5;
const RECONNECT_INTERVAL_SECS: u64 = 5;

/// Where and as whom to connect
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// HTTP base URL of the server, e.g. `http://127.0.0.1:8080`
    pub url: String,
    pub username: String,
    pub password: String,
}

/// Run the client with reconnection logic
pub async fn run_client(options: ClientOptions) -> Result<(), ClientError> {
    let http = reqwest::Client::new();
    let prompt = format!("{}> ", options.username);
    let mut input_rx = spawn_line_reader(prompt.clone());
    let mut state = ChatState::new(options.username.clone());
    let mut reconnect_count = 0;

    loop {
        tracing::info!(
            "Attempting to connect to {} as '{}' (attempt {}/{})",
            options.url,
            options.username,
            reconnect_count + 1,
            MAX_RECONNECT_ATTEMPTS
        );

        let error =
            match run_client_session(&http, &options, &prompt, &mut state, &mut input_rx).await {
                Ok(()) => {
                    tracing::info!("Client session ended normally");
                    return Ok(());
                }
                Err(e) => e,
            };

        if should_exit_immediately(&error) {
            tracing::error!("{}. Exiting.", error);
            return Err(error);
        }

        tracing::warn!("Connection lost: {}", error);
        reconnect_count += 1;

        if !should_attempt_reconnect(&error, reconnect_count, MAX_RECONNECT_ATTEMPTS) {
            tracing::error!(
                "Failed to reconnect after {} attempts. Exiting.",
                MAX_RECONNECT_ATTEMPTS
            );
            return Err(error);
        }

        tracing::info!(
            "Reconnecting in {} seconds... (attempt {}/{})",
            RECONNECT_INTERVAL_SECS,
            reconnect_count + 1,
            MAX_RECONNECT_ATTEMPTS
        );

        tokio::time::sleep(Duration::from_secs(RECONNECT_INTERVAL_SECS)).await;
    }
}
