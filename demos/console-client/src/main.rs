//! Terminal front-end for a Concentration server.
//!
//! ```text
//! console-client [host] [port]
//! ```
//!
//! Connects over TCP (default `127.0.0.1 5000`), draws the board on every
//! change, and reads moves from stdin as `row col`. Set `RUST_LOG=debug`
//! to watch the protocol.

use std::sync::{Arc, Mutex};

use concentration::prelude::*;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: &str = "5000";

/// Keeps a text copy of the board and prints it after every change.
///
/// Runs on its own dispatch context, so printing never interleaves with
/// the listener.
#[derive(Default)]
struct BoardPrinter {
    cells: Mutex<Vec<Vec<Option<AssetId>>>>,
}

impl BoardPrinter {
    fn render(cells: &[Vec<Option<AssetId>>], snapshot: &StateSnapshot) -> String {
        let mut out = String::new();
        for row in cells {
            let line: Vec<String> = row
                .iter()
                .map(|cell| match cell {
                    Some(asset) => format!("{:>12}", asset.as_str()),
                    None => format!("{:>12}", "·"),
                })
                .collect();
            out.push_str(&line.join(" "));
            out.push('\n');
        }
        out.push_str(&snapshot.to_string());
        out
    }
}

impl Subscriber for BoardPrinter {
    fn update(&self, notification: &Notification) {
        let mut cells = self.cells.lock().unwrap_or_else(|e| e.into_inner());

        match (notification.kind, notification.cell) {
            (NotificationKind::BoardCreate { dimension }, _) => {
                let n = dimension as usize;
                *cells = vec![vec![None; n]; n];
            }
            (NotificationKind::Revealed | NotificationKind::Matched, Some(cell)) => {
                if let Some(slot) = slot(&mut cells, cell) {
                    *slot = notification.asset.clone();
                }
            }
            (NotificationKind::NotMatched, Some(cell)) => {
                if let Some(slot) = slot(&mut cells, cell) {
                    *slot = None;
                }
            }
            _ => {}
        }

        println!("{}", Self::render(&cells, &notification.snapshot));
    }
}

fn slot(cells: &mut [Vec<Option<AssetId>>], cell: Cell) -> Option<&mut Option<AssetId>> {
    cells
        .get_mut(cell.row as usize)
        .and_then(|row| row.get_mut(cell.col as usize))
}

/// Parses a move typed as `row col`.
fn parse_move(input: &str) -> Option<(i64, i64)> {
    let mut parts = input.split_whitespace();
    let row = parts.next()?.parse().ok()?;
    let col = parts.next()?.parse().ok()?;
    parts.next().is_none().then_some((row, col))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = args.next().unwrap_or_else(|| DEFAULT_PORT.to_string());
    let addr = format!("{host}:{port}");

    let config = ClientConfig::default();
    let (board_ctx, runner) = DispatchContext::new("board", config.context_config());
    let board_thread = runner.spawn_thread()?;

    let (diagnostics, mut diagnostic_rx) = ChannelSink::new();
    tokio::spawn(async move {
        while let Some(diagnostic) = diagnostic_rx.recv().await {
            eprintln!("! {diagnostic}");
        }
    });

    tracing::info!(%addr, "connecting");
    let session = Session::builder()
        .config(config)
        .diagnostics(diagnostics)
        .subscribe(Arc::new(BoardPrinter::default()), Affinity::Context(board_ctx))
        .connect_tcp(&addr)
        .await?;
    eprintln!(
        "{0}x{0} board. Enter moves as `row col`.",
        session.dimension()
    );

    // Stdin is read on a plain thread so a pending read can't hold up
    // runtime shutdown when the game ends.
    let (move_tx, mut move_rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { break };
            if move_tx.send(line).is_err() {
                break;
            }
        }
    });

    let gateway = session.gateway();
    let input = tokio::spawn(async move {
        while let Some(line) = move_rx.recv().await {
            let Some((row, col)) = parse_move(&line) else {
                eprintln!("! expected `row col`");
                continue;
            };
            match gateway.request_reveal(row, col).await {
                // Already reported through the diagnostic sink.
                Ok(()) | Err(GatewayError::OutOfBounds { .. }) => {}
                Err(e) => {
                    tracing::error!(error = %e, "could not send move");
                    break;
                }
            }
        }
    });

    let result = session.join().await;
    input.abort();
    // The session held the last handle to the board context; once the
    // runner drains its queue the thread exits.
    match tokio::task::spawn_blocking(move || board_thread.join()).await {
        Ok(Ok(())) => {}
        _ => tracing::warn!("board thread did not stop cleanly"),
    }

    let final_state = result?;
    println!("game over. {final_state}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_move() {
        assert_eq!(parse_move("2 3"), Some((2, 3)));
        assert_eq!(parse_move("  0   1 "), Some((0, 1)));
        assert_eq!(parse_move("-1 4"), Some((-1, 4)));
        assert_eq!(parse_move("2"), None);
        assert_eq!(parse_move("2 3 4"), None);
        assert_eq!(parse_move("a b"), None);
    }

    #[test]
    fn test_board_printer_tracks_cells() {
        let printer = BoardPrinter::default();
        let snapshot = StateSnapshot {
            dimension: 2,
            ..StateSnapshot::default()
        };
        let note = |cell, kind, asset: Option<&str>| Notification {
            cell,
            kind,
            asset: asset.map(AssetId::new),
            snapshot: snapshot.clone(),
        };

        printer.update(&note(None, NotificationKind::BoardCreate { dimension: 2 }, None));
        printer.update(&note(Some(Cell::new(0, 1)), NotificationKind::Revealed, Some("cat.png")));
        assert_eq!(
            printer.cells.lock().unwrap()[0][1],
            Some(AssetId::new("cat.png"))
        );

        printer.update(&note(Some(Cell::new(0, 1)), NotificationKind::NotMatched, Some("pokeball.png")));
        assert_eq!(printer.cells.lock().unwrap()[0][1], None);

        // Out-of-range cells from a confused server are ignored.
        printer.update(&note(Some(Cell::new(9, 9)), NotificationKind::Revealed, Some("owl.png")));
    }

    #[test]
    fn test_render_includes_status_line() {
        let cells = vec![vec![None, Some(AssetId::new("a.png"))]];
        let snapshot = StateSnapshot {
            dimension: 2,
            moves: 3,
            matches: 1,
            ..StateSnapshot::default()
        };
        let out = BoardPrinter::render(&cells, &snapshot);
        assert!(out.contains("a.png"));
        assert!(out.ends_with("Moves: 3  Matches: 1  OK"));
    }
}
