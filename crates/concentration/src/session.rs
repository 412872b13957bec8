//! Session builder and handle.
//!
//! A session is one game against one server. Building it reads the board
//! announcement, sets up the [`GameState`], emits the board-creation
//! notification and then hands the connection to the listener loop.

use std::sync::Arc;

use concentration_model::{AssetId, AssetResolver, GameState, StateSnapshot, StaticAssets};
use concentration_notify::{Affinity, NotificationHub, Subscriber};
use concentration_protocol::{Codec, ServerMessage, TextCodec};
use concentration_transport::{Connection, ConnectionId, TcpConnection, WebSocketConnection};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::listener::{Listener, spawn_reader};
use crate::{
    ClientConfig, ConcentrationError, DiagnosticSink, GatewayError, RevealGateway, TracingSink,
};

/// How many names the default resolver generates: enough for a 32 × 32
/// board.
const GENERATED_ASSETS: usize = 512;

/// Builder for configuring and starting a [`Session`].
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
///
/// use concentration::prelude::*;
///
/// # async fn demo() -> Result<(), ConcentrationError> {
/// let session = Session::builder()
///     .assets(StaticAssets::numbered(50))
///     .subscribe(
///         Arc::new(|n: &Notification| println!("{:?}", n.kind)),
///         Affinity::Caller,
///     )
///     .connect_tcp("127.0.0.1:5000")
///     .await?;
///
/// session.request_reveal(0, 0).await?;
/// let final_state = session.join().await?;
/// println!("{final_state}");
/// # Ok(())
/// # }
/// ```
pub struct SessionBuilder {
    config: ClientConfig,
    assets: Arc<dyn AssetResolver>,
    hub: NotificationHub,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl SessionBuilder {
    /// Creates a builder with default settings: [`ClientConfig::default`],
    /// generated asset names, no subscribers and a [`TracingSink`].
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            assets: Arc::new(StaticAssets::numbered(GENERATED_ASSETS)),
            hub: NotificationHub::new(),
            diagnostics: Arc::new(TracingSink),
        }
    }

    /// Sets the client configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets where card assets come from.
    pub fn assets(mut self, resolver: impl AssetResolver + 'static) -> Self {
        self.assets = Arc::new(resolver);
        self
    }

    /// Registers a subscriber before the session starts, so it also sees
    /// the board-creation notification.
    pub fn subscribe(self, subscriber: Arc<dyn Subscriber>, affinity: Affinity) -> Self {
        self.hub.subscribe(subscriber, affinity);
        self
    }

    /// Sets the diagnostic sink.
    pub fn diagnostics(mut self, sink: impl DiagnosticSink) -> Self {
        self.diagnostics = Arc::new(sink);
        self
    }

    /// Connects over TCP and starts the session.
    pub async fn connect_tcp(self, addr: &str) -> Result<Session<TcpConnection>, ConcentrationError> {
        let conn = TcpConnection::connect(addr)
            .await?
            .with_max_line_length(self.config.max_line_length);
        self.start(conn).await
    }

    /// Connects over WebSocket and starts the session.
    pub async fn connect_websocket(
        self,
        url: &str,
    ) -> Result<Session<WebSocketConnection>, ConcentrationError> {
        let conn = WebSocketConnection::connect(url)
            .await?
            .with_max_line_length(self.config.max_line_length);
        self.start(conn).await
    }

    /// Starts a session on an established connection.
    ///
    /// Waits for the first line, which must be `BOARD_DIM <n>`, then spawns
    /// the listener.
    ///
    /// # Errors
    ///
    /// - [`ConcentrationError::Handshake`] if the first line is anything
    ///   else or the stream ends first
    /// - [`ConcentrationError::Model`] if the board can't be set up
    /// - [`ConcentrationError::Transport`] if reading fails
    pub async fn start<C: Connection>(self, conn: C) -> Result<Session<C>, ConcentrationError> {
        let config = self.config.validated();
        let conn = Arc::new(conn);
        let conn_id = conn.id();
        let codec = TextCodec;

        let first = match conn.recv_line().await {
            Err(e) if !e.is_fatal() => {
                return Err(ConcentrationError::Handshake(format!(
                    "unreadable first line: {e}"
                )));
            }
            other => other?,
        };
        let dimension = match first {
            None => {
                return Err(ConcentrationError::Handshake(
                    "connection closed before the board was announced".into(),
                ));
            }
            Some(line) => match codec.decode::<ServerMessage>(&line) {
                Ok(ServerMessage::BoardAnnounced { dimension }) => dimension,
                Ok(other) => {
                    return Err(ConcentrationError::Handshake(format!(
                        "expected BOARD_DIM, got {}",
                        other.opcode()
                    )));
                }
                Err(e) => {
                    return Err(ConcentrationError::Handshake(format!(
                        "unreadable first line: {e}"
                    )));
                }
            },
        };

        let face_down = AssetId::new(config.face_down_asset.clone());
        let state = GameState::new(dimension, self.assets.as_ref(), face_down)?;
        tracing::info!(%conn_id, dimension, "board announced");

        let (snapshot_tx, snapshots) = watch::channel(state.snapshot());
        self.hub.notify(&state.board_created()).await;

        let (inbound, reader) = spawn_reader(Arc::clone(&conn), config.inbound_capacity);
        let listener = Listener {
            conn_id,
            state,
            inbound,
            hub: self.hub.clone(),
            diagnostics: Arc::clone(&self.diagnostics),
            snapshots: snapshot_tx,
            codec,
        };
        let listener = tokio::spawn(listener.run());

        Ok(Session {
            conn_id,
            gateway: RevealGateway::new(Arc::clone(&conn), dimension, self.diagnostics),
            conn,
            hub: self.hub,
            snapshots,
            reader,
            listener: Some(listener),
        })
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running game session.
///
/// Dropping the session stops its background tasks. Use
/// [`join`](Self::join) to wait for the game to end, or
/// [`shutdown`](Self::shutdown) to leave early.
pub struct Session<C: Connection> {
    conn_id: ConnectionId,
    conn: Arc<C>,
    gateway: RevealGateway<C>,
    hub: NotificationHub,
    snapshots: watch::Receiver<StateSnapshot>,
    reader: JoinHandle<()>,
    listener: Option<JoinHandle<Result<StateSnapshot, ConcentrationError>>>,
}

impl Session<TcpConnection> {
    /// Creates a new builder.
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }
}

impl<C: Connection> Session<C> {
    /// The connection this session runs on.
    pub fn id(&self) -> ConnectionId {
        self.conn_id
    }

    /// Board side length.
    pub fn dimension(&self) -> u32 {
        self.gateway.dimension()
    }

    /// A gateway handle for issuing reveal requests from other tasks.
    pub fn gateway(&self) -> RevealGateway<C> {
        self.gateway.clone()
    }

    /// Shorthand for `self.gateway().request_reveal(row, col)`.
    pub async fn request_reveal(&self, row: i64, col: i64) -> Result<(), GatewayError> {
        self.gateway.request_reveal(row, col).await
    }

    /// The hub, for subscribing after the session has started.
    pub fn hub(&self) -> &NotificationHub {
        &self.hub
    }

    /// The latest published state.
    pub fn snapshot(&self) -> StateSnapshot {
        self.snapshots.borrow().clone()
    }

    /// A receiver that sees every published state.
    pub fn snapshots(&self) -> watch::Receiver<StateSnapshot> {
        self.snapshots.clone()
    }

    /// `true` once the listener has stopped, for any reason.
    pub fn is_finished(&self) -> bool {
        self.listener.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Waits for the game to end.
    ///
    /// # Errors
    ///
    /// The transport error that stopped the listener, or
    /// [`ConcentrationError::Listener`] if its task died.
    pub async fn join(mut self) -> Result<StateSnapshot, ConcentrationError> {
        let Some(listener) = self.listener.take() else {
            return Ok(self.snapshot());
        };
        let result = listener.await?;
        match &result {
            Ok(snapshot) => tracing::info!(conn_id = %self.conn_id, %snapshot, "session finished"),
            Err(e) => tracing::error!(conn_id = %self.conn_id, error = %e, "session failed"),
        }
        result
    }

    /// Stops the background tasks and closes the connection.
    pub async fn shutdown(mut self) {
        self.abort();
        if let Err(e) = self.conn.close().await {
            tracing::debug!(conn_id = %self.conn_id, error = %e, "close failed");
        }
        tracing::info!(conn_id = %self.conn_id, "session shut down");
    }

    fn abort(&mut self) {
        self.reader.abort();
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}

impl<C: Connection> Drop for Session<C> {
    fn drop(&mut self) {
        self.abort();
    }
}

impl<C: Connection> std::fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("conn_id", &self.conn_id)
            .field("dimension", &self.dimension())
            .field("finished", &self.is_finished())
            .finish()
    }
}
