//! Newline-delimited text over a byte stream (TCP in production,
//! `tokio::io::duplex` in tests).

use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::Mutex;

use crate::{Connection, ConnectionId, DEFAULT_MAX_LINE_LENGTH, TransportError, decode_line};

/// A [`Connection`] over a reader/writer pair. Lines are terminated by
/// `\n` on send; `\n` or `\r\n` are accepted on receive.
///
/// Received bytes that are not UTF-8 are replaced with U+FFFD rather than
/// failing the read. Lines longer than the configured limit are skipped
/// and reported as [`TransportError::LineTooLong`].
pub struct StreamConnection<R, W> {
    id: ConnectionId,
    peer_addr: Option<String>,
    max_line_length: usize,
    reader: Mutex<BufReader<R>>,
    writer: Mutex<W>,
}

/// A line connection over a TCP socket.
pub type TcpConnection = StreamConnection<OwnedReadHalf, OwnedWriteHalf>;

impl<R, W> StreamConnection<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// Wraps an already-split reader and writer.
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            id: ConnectionId::next(),
            peer_addr: None,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            reader: Mutex::new(BufReader::new(reader)),
            writer: Mutex::new(writer),
        }
    }

    /// Sets the longest line, in bytes without its terminator, that
    /// [`Connection::recv_line`] will accept. Zero is raised to one.
    pub fn with_max_line_length(mut self, max: usize) -> Self {
        self.max_line_length = max.max(1);
        self
    }

    /// The longest line this connection accepts.
    pub fn max_line_length(&self) -> usize {
        self.max_line_length
    }

    /// The remote address, when known.
    pub fn peer_addr(&self) -> Option<&str> {
        self.peer_addr.as_deref()
    }
}

impl TcpConnection {
    /// Opens a TCP connection to `addr` (e.g. `"127.0.0.1:5000"`).
    pub async fn connect(addr: &str) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(TransportError::ConnectFailed)?;
        let conn = Self::from_stream(stream);
        tracing::info!(id = %conn.id, addr, "connected");
        Ok(conn)
    }

    /// Wraps an established TCP stream.
    pub fn from_stream(stream: TcpStream) -> Self {
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(error = %e, "could not disable Nagle");
        }
        let peer_addr = stream.peer_addr().ok().map(|a| a.to_string());
        let (read_half, write_half) = stream.into_split();
        let mut conn = Self::new(read_half, write_half);
        conn.peer_addr = peer_addr;
        conn
    }
}

impl<R, W> Connection for StreamConnection<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn send_line(&self, line: &str) -> Result<(), TransportError> {
        let mut writer = self.writer.lock().await;
        writer
            .write_all(line.as_bytes())
            .await
            .map_err(TransportError::SendFailed)?;
        writer
            .write_all(b"\n")
            .await
            .map_err(TransportError::SendFailed)?;
        writer.flush().await.map_err(TransportError::SendFailed)
    }

    async fn recv_line(&self) -> Result<Option<String>, TransportError> {
        let mut reader = self.reader.lock().await;
        let limit = self.max_line_length;
        // Two bytes of slack for a `\r\n` terminator.
        let mut buf = Vec::new();
        let read = (&mut *reader)
            .take(limit as u64 + 2)
            .read_until(b'\n', &mut buf)
            .await
            .map_err(TransportError::ReceiveFailed)?;
        if read == 0 {
            return Ok(None);
        }
        if buf.len() > limit + 1 && buf.last() != Some(&b'\n') {
            skip_rest_of_line(&mut *reader, limit).await?;
        }

        let content = buf.strip_suffix(b"\n").unwrap_or(&buf[..]);
        let content = content.strip_suffix(b"\r").unwrap_or(content);
        if content.len() > limit {
            let prefix = String::from_utf8_lossy(&content[..PREFIX_LEN.min(content.len())]);
            tracing::warn!(id = %self.id, limit, "discarded over-long line");
            return Err(TransportError::LineTooLong {
                limit,
                prefix: prefix.into_owned(),
            });
        }

        Ok(Some(decode_line(content)))
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.writer
            .lock()
            .await
            .shutdown()
            .await
            .map_err(TransportError::SendFailed)
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

/// How much of an over-long line is kept for the error report.
const PREFIX_LEN: usize = 32;

/// Reads and drops bytes up to and including the next `\n`, at most
/// `chunk` bytes at a time.
async fn skip_rest_of_line<B>(reader: &mut B, chunk: usize) -> Result<(), TransportError>
where
    B: AsyncBufRead + Unpin,
{
    let mut scratch = Vec::new();
    loop {
        scratch.clear();
        let read = (&mut *reader)
            .take(chunk as u64)
            .read_until(b'\n', &mut scratch)
            .await
            .map_err(TransportError::ReceiveFailed)?;
        if read == 0 || scratch.last() == Some(&b'\n') {
            return Ok(());
        }
    }
}
