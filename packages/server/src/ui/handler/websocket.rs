//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use serde::Deserialize;

use crate::{
    domain::User,
    hub::{Frame, FrameSink, FrameStream, Session, TransportError},
    ui::state::AppState,
};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub bearer: Option<String>,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let user = match state.authenticator.authenticate(query.bearer.as_deref()) {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!("Rejecting WebSocket upgrade: {}", e);
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    tracing::info!("Upgrading connection for '{}'", user.name);
    let max_size = state.hub_config.max_message_size;
    Ok(ws
        .max_message_size(max_size)
        .max_frame_size(max_size)
        .on_upgrade(move |socket| handle_socket(socket, state, user)))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, user: User) {
    let name = user.name.clone();
    let session = match Session::connect(state.server.clone(), user, state.hub_config.clone()).await
    {
        Ok(session) => session,
        Err(e) => {
            tracing::error!("Failed to open session for '{}': {}", name, e);
            return;
        }
    };

    let (sender, receiver) = socket.split();
    session.run(frame_stream(receiver), frame_sink(sender)).await;
}

/// Adapt the inbound half of the socket to transport frames.
fn frame_stream(receiver: SplitStream<WebSocket>) -> FrameStream {
    receiver
        .map(|message| match message {
            Ok(Message::Text(text)) => Ok(Frame::Text(text.as_str().to_owned())),
            // decoded like text; invalid payloads are dropped by the session
            Ok(Message::Binary(bytes)) => Ok(Frame::Text(String::from_utf8_lossy(&bytes).into_owned())),
            Ok(Message::Ping(_)) => Ok(Frame::Ping),
            Ok(Message::Pong(_)) => Ok(Frame::Pong),
            Ok(Message::Close(_)) => Ok(Frame::Close),
            Err(e) => Err(TransportError::Read(e.to_string())),
        })
        .boxed()
}

/// Adapt the outbound half of the socket to transport frames.
fn frame_sink(sender: SplitSink<WebSocket, Message>) -> FrameSink {
    let sink = sender
        .sink_map_err(|e| TransportError::Write(e.to_string()))
        .with(|frame: Frame| async move {
            Ok::<_, TransportError>(match frame {
                Frame::Text(text) => Message::Text(text.into()),
                Frame::Ping => Message::Ping(Default::default()),
                Frame::Pong => Message::Pong(Default::default()),
                Frame::Close => Message::Close(None),
            })
        });
    Box::pin(sink)
}
