//! The listener loop: the only writer of [`GameState`].
//!
//! Two tasks cooperate:
//!
//! ```text
//!  reader task ──Result<line>──▶ [bounded mpsc] ──▶ listener task
//!  (Connection::recv_line)                          (decode → apply → notify)
//! ```
//!
//! The reader does nothing but pull lines off the connection. The listener
//! blocks for one line, then drains whatever else is already queued
//! without blocking, and processes the batch in order. The two `CARD` lines
//! of a turn usually arrive together and are handled in one pass.

use std::sync::Arc;

use concentration_model::{Applied, GameState, StateSnapshot};
use concentration_notify::NotificationHub;
use concentration_protocol::{Codec, ProtocolError, ServerMessage, TextCodec};
use concentration_transport::{Connection, ConnectionId, TransportError};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::{ConcentrationError, Diagnostic, DiagnosticSink};

type Inbound = Result<String, TransportError>;

/// Spawns the reader task for `conn`.
///
/// The task ends after forwarding the first fatal transport error or end
/// of stream, or when the listener drops its receiver.
pub(crate) fn spawn_reader<C: Connection>(
    conn: Arc<C>,
    capacity: usize,
) -> (mpsc::Receiver<Inbound>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(capacity);
    let handle = tokio::spawn(async move {
        let conn_id = conn.id();
        loop {
            let item = match conn.recv_line().await {
                Ok(Some(line)) => Ok(line),
                Ok(None) => Err(TransportError::ConnectionClosed(
                    "server closed the connection".into(),
                )),
                Err(e) => Err(e),
            };
            let stop = matches!(&item, Err(e) if e.is_fatal());
            if tx.send(item).await.is_err() {
                tracing::trace!(%conn_id, "listener gone, reader stopping");
                break;
            }
            if stop {
                break;
            }
        }
    });
    (rx, handle)
}

/// What the loop should do after one line.
enum Step {
    Continue,
    Finished,
}

pub(crate) struct Listener {
    pub(crate) conn_id: ConnectionId,
    pub(crate) state: GameState,
    pub(crate) inbound: mpsc::Receiver<Inbound>,
    pub(crate) hub: NotificationHub,
    pub(crate) diagnostics: Arc<dyn DiagnosticSink>,
    pub(crate) snapshots: watch::Sender<StateSnapshot>,
    pub(crate) codec: TextCodec,
}

impl Listener {
    /// Runs until `GAME_OVER` (returns the final snapshot) or a transport
    /// failure (returns the error).
    pub(crate) async fn run(mut self) -> Result<StateSnapshot, ConcentrationError> {
        let conn_id = self.conn_id;
        tracing::debug!(%conn_id, "listener started");

        let mut batch = Vec::new();
        loop {
            tracing::trace!(%conn_id, "awaiting line");
            let Some(first) = self.inbound.recv().await else {
                return Err(TransportError::ConnectionClosed("reader task stopped".into()).into());
            };
            batch.push(first);
            while let Ok(item) = self.inbound.try_recv() {
                batch.push(item);
            }
            tracing::trace!(%conn_id, lines = batch.len(), "batch drained");

            let total = batch.len();
            for (index, item) in batch.drain(..).enumerate() {
                let line = match item {
                    Ok(line) => line,
                    Err(TransportError::LineTooLong { limit, prefix }) => {
                        let reason = format!("line longer than {limit} bytes");
                        tracing::debug!(%conn_id, limit, "over-long line skipped");
                        self.diagnostics
                            .report(Diagnostic::Malformed(ProtocolError::malformed(&prefix, reason)));
                        continue;
                    }
                    Err(e) => {
                        tracing::error!(%conn_id, error = %e, "transport failure, listener stopping");
                        return Err(e.into());
                    }
                };
                if let Step::Finished = self.process(&line).await {
                    let remaining = total - index - 1;
                    if remaining > 0 {
                        tracing::debug!(%conn_id, remaining, "lines after game over discarded");
                    }
                    tracing::info!(%conn_id, "game over, listener stopped");
                    return Ok(self.state.snapshot());
                }
            }
        }
    }

    async fn process(&mut self, line: &str) -> Step {
        let message: ServerMessage = match self.codec.decode(line) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!(conn_id = %self.conn_id, error = %e, "decode failed");
                self.diagnostics.report(Diagnostic::Malformed(e));
                return Step::Continue;
            }
        };
        tracing::debug!(conn_id = %self.conn_id, ?message, "decoded");

        match self.state.apply(&message) {
            Applied::Changed(notifications) => {
                self.snapshots.send_replace(self.state.snapshot());
                for notification in &notifications {
                    self.hub.notify(notification).await;
                }
            }
            Applied::Diagnostic(message) => {
                self.diagnostics.report(Diagnostic::ServerError { message });
            }
            Applied::Ignored(reason) => {
                tracing::debug!(conn_id = %self.conn_id, reason, "message ignored");
            }
        }

        if self.state.is_terminal() {
            Step::Finished
        } else {
            Step::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use concentration_model::{AssetId, Notification, NotificationKind, StaticAssets};
    use concentration_notify::Affinity;
    use concentration_transport::StreamConnection;
    use tokio::io::{AsyncWriteExt, DuplexStream, duplex};

    use crate::ChannelSink;

    struct Harness {
        server: DuplexStream,
        notifications: Arc<Mutex<Vec<Notification>>>,
        diagnostics: mpsc::UnboundedReceiver<Diagnostic>,
        snapshots: watch::Receiver<StateSnapshot>,
        task: JoinHandle<Result<StateSnapshot, ConcentrationError>>,
    }

    /// Starts a listener on a fresh 4x4 board, fed from the returned
    /// `server` stream.
    fn start(capacity: usize) -> Harness {
        start_with_limit(capacity, concentration_transport::DEFAULT_MAX_LINE_LENGTH)
    }

    fn start_with_limit(capacity: usize, max_line_length: usize) -> Harness {
        let (server, client) = duplex(1024);
        let (read, write) = tokio::io::split(client);
        let conn = Arc::new(StreamConnection::new(read, write).with_max_line_length(max_line_length));

        let state = GameState::new(4, &StaticAssets::numbered(8), AssetId::new("back.png")).unwrap();
        let (snap_tx, snapshots) = watch::channel(state.snapshot());
        let (sink, diagnostics) = ChannelSink::new();

        let hub = NotificationHub::new();
        let notifications = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&notifications);
        hub.subscribe(
            Arc::new(move |n: &Notification| log.lock().unwrap().push(n.clone())),
            Affinity::Caller,
        );

        let (inbound, _reader) = spawn_reader(Arc::clone(&conn), capacity);
        let listener = Listener {
            conn_id: conn.id(),
            state,
            inbound,
            hub,
            diagnostics: Arc::new(sink),
            snapshots: snap_tx,
            codec: TextCodec,
        };

        Harness {
            server,
            notifications,
            diagnostics,
            snapshots,
            task: tokio::spawn(listener.run()),
        }
    }

    #[tokio::test]
    async fn test_turn_then_game_over() {
        let mut h = start(8);
        h.server
            .write_all(b"CARD 0 0 A\nCARD 1 1 A\nMATCH 0 0 1 1\nGAME_OVER\n")
            .await
            .unwrap();

        let snapshot = h.task.await.unwrap().unwrap();
        assert_eq!(snapshot.moves, 2);
        assert_eq!(snapshot.matches, 1);
        assert!(snapshot.terminal);
        assert_eq!(*h.snapshots.borrow_and_update(), snapshot);

        let kinds: Vec<_> = h.notifications.lock().unwrap().iter().map(|n| n.kind).collect();
        assert_eq!(
            kinds,
            vec![
                NotificationKind::Revealed,
                NotificationKind::Revealed,
                NotificationKind::Matched,
                NotificationKind::Matched,
                NotificationKind::GameOver,
            ]
        );
    }

    #[tokio::test]
    async fn test_malformed_line_is_reported_and_skipped() {
        let mut h = start(8);
        h.server
            .write_all(b"CARD 0 0\nHELLO\nCARD 0 0 A\nGAME_OVER\n")
            .await
            .unwrap();

        let snapshot = h.task.await.unwrap().unwrap();
        assert_eq!(snapshot.moves, 1);

        assert!(matches!(h.diagnostics.try_recv().unwrap(), Diagnostic::Malformed(_)));
        assert!(matches!(h.diagnostics.try_recv().unwrap(), Diagnostic::Malformed(_)));
        assert!(h.diagnostics.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_is_reported_and_skipped() {
        let mut h = start(8);
        h.server
            .write_all(b"CARD 0 0 A\n\xff\nCARD 0 1 \xff\nCARD 1 1 A\nGAME_OVER\n")
            .await
            .unwrap();

        let snapshot = h.task.await.unwrap().unwrap();
        assert!(snapshot.terminal);
        assert_eq!(snapshot.moves, 2);

        assert!(matches!(h.diagnostics.try_recv().unwrap(), Diagnostic::Malformed(_)));
        assert!(matches!(h.diagnostics.try_recv().unwrap(), Diagnostic::Malformed(_)));
        assert!(h.diagnostics.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_over_long_line_is_reported_and_skipped() {
        let mut h = start_with_limit(8, 16);
        h.server
            .write_all(b"ERROR this message is far too long to accept\nCARD 0 0 A\nGAME_OVER\n")
            .await
            .unwrap();

        let snapshot = h.task.await.unwrap().unwrap();
        assert_eq!(snapshot.moves, 1);

        match h.diagnostics.try_recv().unwrap() {
            Diagnostic::Malformed(ProtocolError::MalformedMessage { line, reason }) => {
                assert!(line.starts_with("ERROR this"));
                assert!(reason.contains("16 bytes"));
            }
            other => panic!("expected Malformed, got {other:?}"),
        }
        assert!(h.diagnostics.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_server_error_goes_to_diagnostics_only() {
        let mut h = start(8);
        h.server
            .write_all(b"ERROR not your turn\nGAME_OVER\n")
            .await
            .unwrap();

        h.task.await.unwrap().unwrap();
        assert_eq!(
            h.diagnostics.try_recv().unwrap(),
            Diagnostic::ServerError {
                message: "not your turn".into()
            }
        );
        // Only the game-over notification.
        assert_eq!(h.notifications.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_end_of_stream_before_game_over_is_a_transport_failure() {
        let mut h = start(8);
        h.server.write_all(b"CARD 0 0 A\n").await.unwrap();
        drop(h.server);

        let err = h.task.await.unwrap().unwrap_err();
        assert!(err.is_transport());
        // Lines read before the failure were still applied.
        assert_eq!(h.snapshots.borrow().moves, 1);
    }

    #[tokio::test]
    async fn test_lines_after_game_over_are_not_applied() {
        let mut h = start(8);
        h.server
            .write_all(b"CARD 0 0 A\nGAME_OVER\nCARD 0 1 B\nMATCH 0 0 0 1\n")
            .await
            .unwrap();

        let snapshot = h.task.await.unwrap().unwrap();
        assert_eq!(snapshot.moves, 1);
        assert_eq!(snapshot.matches, 0);
    }

    #[tokio::test]
    async fn test_tiny_inbound_buffer_still_processes_everything() {
        let mut h = start(1);
        let mut script = String::new();
        for col in 0..4 {
            script.push_str(&format!("CARD 0 {col} A\n"));
        }
        script.push_str("GAME_OVER\n");
        h.server.write_all(script.as_bytes()).await.unwrap();

        let snapshot = h.task.await.unwrap().unwrap();
        assert_eq!(snapshot.moves, 4);
    }

    #[tokio::test]
    async fn test_snapshots_follow_each_change() {
        let mut h = start(8);
        let mut rx = h.snapshots.clone();

        h.server.write_all(b"CARD 2 2 C\n").await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().moves, 1);

        h.server.write_all(b"GAME_OVER\n").await.unwrap();
        h.task.await.unwrap().unwrap();
        assert!(h.snapshots.borrow().terminal);
    }
}
