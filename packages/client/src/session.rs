//! One WebSocket connection: login, connect, then pump frames and input.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{self, protocol::Message},
};
use yakata_shared::{
    protocol::{WireMessage, split_frame},
    time::now_millis,
};

use crate::{
    command::Command,
    error::ClientError,
    formatter::MessageFormatter,
    login::{login, websocket_url},
    runner::ClientOptions,
    state::{ChatState, Outcome},
};

use super::ui::redisplay_prompt;

/// Run one connection until the user quits (`Ok`) or the connection fails.
///
/// `state` survives the call so memberships can be restored on reconnect.
pub async fn run_client_session(
    http: &reqwest::Client,
    options: &ClientOptions,
    prompt: &str,
    state: &mut ChatState,
    input_rx: &mut mpsc::UnboundedReceiver<String>,
) -> Result<(), ClientError> {
    let token = login(http, &options.url, &options.username, &options.password).await?;
    let url = websocket_url(&options.url, &token)?;

    let (ws_stream, _) = match connect_async(&url).await {
        Ok(result) => result,
        Err(tungstenite::Error::Http(response)) if response.status().as_u16() == 401 => {
            return Err(ClientError::Unauthorized);
        }
        Err(e) => return Err(ClientError::ConnectionError(e.to_string())),
    };

    tracing::info!("Connected to chat server!");
    println!(
        "\nYou are '{}'. Type /help for commands. Press Ctrl+C to exit.\n",
        options.username
    );

    let (mut write, mut read) = ws_stream.split();

    for message in state.rejoin() {
        let json = message.to_json()?;
        write
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| ClientError::ConnectionError(e.to_string()))?;
    }

    loop {
        tokio::select! {
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    for line in split_frame(text.as_str()) {
                        let output = match WireMessage::from_json(line) {
                            Ok(message) => {
                                state.apply(&message);
                                MessageFormatter::format_incoming(&message, state, now_millis())
                            }
                            Err(_) => Some(MessageFormatter::format_raw_message(line)),
                        };
                        if let Some(output) = output {
                            print!("{}", output);
                            redisplay_prompt(prompt);
                        }
                    }
                }
                Some(Ok(Message::Binary(data))) => {
                    print!("{}", MessageFormatter::format_binary_message(data.len()));
                    redisplay_prompt(prompt);
                }
                Some(Ok(Message::Close(_))) | None => {
                    tracing::info!("Server closed the connection");
                    return Err(ClientError::ConnectionError("Connection closed".to_string()));
                }
                Some(Err(e)) => {
                    tracing::warn!("WebSocket read error: {}", e);
                    return Err(ClientError::ConnectionError(e.to_string()));
                }
                Some(Ok(_)) => {}
            },
            line = input_rx.recv() => {
                let Some(line) = line else {
                    write.send(Message::Close(None)).await.ok();
                    return Ok(());
                };
                match state.handle(Command::parse(&line)) {
                    Outcome::Send(message) => {
                        let json = message.to_json()?;
                        if let Err(e) = write.send(Message::Text(json.into())).await {
                            tracing::warn!("Failed to send message: {}", e);
                            return Err(ClientError::ConnectionError(e.to_string()));
                        }
                    }
                    Outcome::Print(text) => {
                        println!("{}", text);
                        redisplay_prompt(prompt);
                    }
                    Outcome::Nothing => {}
                }
            }
        }
    }
}
