//! Transport boundary of a client session.
//!
//! A session reads [`Frame`]s from a [`FrameStream`] and writes them to a
//! [`FrameSink`]. The WebSocket handler adapts axum's socket to these types;
//! [`channel_transport`] provides an in-memory pair for embedding and tests.

use std::{pin::Pin, time::Duration};

use futures_util::{
    Sink, StreamExt,
    sink,
    stream::{self, BoxStream},
};
use thiserror::Error;
use tokio::sync::mpsc;

/// A transport frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    /// Keep-alive probe
    Ping,
    /// Keep-alive response
    Pong,
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("read failed: {0}")]
    Read(String),

    #[error("write failed: {0}")]
    Write(String),

    #[error("write did not complete within {0:?}")]
    WriteTimeout(Duration),

    #[error("no frame received within {0:?}")]
    ReadTimeout(Duration),
}

pub type FrameStream = BoxStream<'static, Result<Frame, TransportError>>;
pub type FrameSink = Pin<Box<dyn Sink<Frame, Error = TransportError> + Send>>;

/// The remote end of an in-memory transport.
pub struct PeerTransport {
    inbound: Option<mpsc::Sender<Result<Frame, TransportError>>>,
    outbound: mpsc::Receiver<Frame>,
}

impl PeerTransport {
    /// Send a text frame to the session.
    pub async fn send_text(&self, text: impl Into<String>) -> bool {
        self.send_frame(Frame::Text(text.into())).await
    }

    pub async fn send_frame(&self, frame: Frame) -> bool {
        match &self.inbound {
            Some(tx) => tx.send(Ok(frame)).await.is_ok(),
            None => false,
        }
    }

    /// Make the session's next read fail.
    pub async fn fail(&self, reason: impl Into<String>) -> bool {
        match &self.inbound {
            Some(tx) => tx
                .send(Err(TransportError::Read(reason.into())))
                .await
                .is_ok(),
            None => false,
        }
    }

    /// End the inbound stream (EOF). Frames written by the session can still
    /// be received afterwards.
    pub fn hang_up(&mut self) {
        self.inbound = None;
    }

    /// Next frame written by the session, `None` once the session released
    /// the transport.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.outbound.recv().await
    }
}

/// Build an in-memory transport: the session half (stream + sink) and the
/// peer half.
pub fn channel_transport(capacity: usize) -> (FrameStream, FrameSink, PeerTransport) {
    let (inbound_tx, inbound_rx) = mpsc::channel(capacity);
    let (outbound_tx, outbound_rx) = mpsc::channel(capacity);

    let stream = stream::unfold(inbound_rx, |mut rx| async move {
        rx.recv().await.map(|frame| (frame, rx))
    })
    .boxed();

    let sink = sink::unfold(outbound_tx, |tx, frame: Frame| async move {
        tx.send(frame)
            .await
            .map_err(|_| TransportError::Write("peer went away".to_string()))?;
        Ok::<_, TransportError>(tx)
    });

    let peer = PeerTransport {
        inbound: Some(inbound_tx),
        outbound: outbound_rx,
    };
    (stream, Box::pin(sink), peer)
}
