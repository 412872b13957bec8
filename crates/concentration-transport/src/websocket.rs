//! WebSocket transport implementation using `tokio-tungstenite`.
//!
//! Each protocol line is sent as one text frame. Received text and binary
//! frames may hold several `\n`-separated lines; the extra lines are queued
//! for the following reads. Ping/pong frames are skipped.

use std::collections::VecDeque;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::{Connection, ConnectionId, DEFAULT_MAX_LINE_LENGTH, TransportError, decode_line};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A client-side WebSocket connection carrying protocol lines.
pub struct WebSocketConnection {
    id: ConnectionId,
    sink: Mutex<SplitSink<WsStream, Message>>,
    inbox: Mutex<Inbox>,
    max_line_length: usize,
}

/// The read half plus lines already received but not yet handed out.
struct Inbox {
    stream: SplitStream<WsStream>,
    pending: VecDeque<Vec<u8>>,
}

impl WebSocketConnection {
    /// Connects to a WebSocket endpoint such as `ws://127.0.0.1:5000`.
    pub async fn connect(url: &str) -> Result<Self, TransportError> {
        let (ws, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| {
                TransportError::ConnectFailed(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    e,
                ))
            })?;

        let (sink, stream) = ws.split();
        let id = ConnectionId::next();
        tracing::info!(%id, url, "WebSocket connected");

        Ok(Self {
            id,
            sink: Mutex::new(sink),
            inbox: Mutex::new(Inbox {
                stream,
                pending: VecDeque::new(),
            }),
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        })
    }

    /// Sets the longest line, in bytes, that
    /// [`Connection::recv_line`] will accept. Zero is raised to one.
    pub fn with_max_line_length(mut self, max: usize) -> Self {
        self.max_line_length = max.max(1);
        self
    }
}

/// Splits a frame payload into lines. A trailing `\n` does not start
/// another line.
fn split_frame(payload: &[u8]) -> VecDeque<Vec<u8>> {
    let payload = payload.strip_suffix(b"\n").unwrap_or(payload);
    payload.split(|b| *b == b'\n').map(<[u8]>::to_vec).collect()
}

impl Connection for WebSocketConnection {
    async fn send_line(&self, line: &str) -> Result<(), TransportError> {
        let msg = Message::Text(line.to_owned().into());
        self.sink.lock().await.send(msg).await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    async fn recv_line(&self) -> Result<Option<String>, TransportError> {
        let mut inbox = self.inbox.lock().await;
        let bytes = loop {
            if let Some(line) = inbox.pending.pop_front() {
                break line;
            }
            let payload = match inbox.stream.next().await {
                Some(Ok(Message::Text(text))) => text.as_str().as_bytes().to_vec(),
                Some(Ok(Message::Binary(data))) => data.to_vec(),
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // skip ping/pong/frame
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(std::io::Error::new(
                        std::io::ErrorKind::ConnectionReset,
                        e,
                    )));
                }
            };
            inbox.pending = split_frame(&payload);
        };

        let line = decode_line(&bytes);
        if line.len() > self.max_line_length {
            let prefix = line.chars().take(32).collect();
            tracing::warn!(id = %self.id, limit = self.max_line_length, "discarded over-long line");
            return Err(TransportError::LineTooLong {
                limit: self.max_line_length,
                prefix,
            });
        }
        Ok(Some(line))
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.sink.lock().await.close().await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
