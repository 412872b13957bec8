//! Integration tests for thread-affine delivery through the hub.

use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

use concentration_model::{AssetId, Notification, NotificationKind, StateSnapshot};
use concentration_notify::{Affinity, ContextConfig, DispatchContext, NotificationHub};
use concentration_protocol::Cell;

fn revealed(row: u32, col: u32) -> Notification {
    Notification {
        cell: Some(Cell::new(row, col)),
        kind: NotificationKind::Revealed,
        asset: Some(AssetId::new("cat.png")),
        snapshot: StateSnapshot {
            dimension: 4,
            moves: 1,
            ..StateSnapshot::default()
        },
    }
}

// =========================================================================
// Marshalling onto a context thread
// =========================================================================

#[tokio::test]
async fn test_context_subscriber_runs_on_its_thread() {
    let hub = NotificationHub::new();
    let (ui, runner) = DispatchContext::new("ui", ContextConfig::default());
    let handle = runner.spawn_thread().unwrap();

    let (tx, rx) = std_mpsc::channel();
    let tx = Mutex::new(tx);
    hub.subscribe(
        Arc::new(move |n: &Notification| {
            let thread_name = thread::current().name().map(str::to_owned);
            tx.lock().unwrap().send((thread_name, n.cell)).unwrap();
        }),
        Affinity::Context(ui.clone()),
    );

    assert_eq!(hub.notify(&revealed(2, 3)).await, 1);

    let (thread_name, cell) = rx.recv().unwrap();
    assert_eq!(thread_name.as_deref(), Some("ui"));
    assert_eq!(cell, Some(Cell::new(2, 3)));

    drop(hub);
    drop(ui);
    handle.join().unwrap();
}

#[tokio::test]
async fn test_mixed_affinities_all_receive_in_order() {
    let hub = NotificationHub::new();
    let (ui, runner) = DispatchContext::new("ui-mixed", ContextConfig::default().with_capacity(1));
    let handle = runner.spawn_thread().unwrap();

    let inline = Arc::new(Mutex::new(Vec::new()));
    let marshalled = Arc::new(Mutex::new(Vec::new()));

    let log = Arc::clone(&inline);
    hub.subscribe(
        Arc::new(move |n: &Notification| log.lock().unwrap().push(n.cell)),
        Affinity::Caller,
    );
    let log = Arc::clone(&marshalled);
    hub.subscribe(
        Arc::new(move |n: &Notification| log.lock().unwrap().push(n.cell)),
        Affinity::Context(ui.clone()),
    );

    for col in 0..4 {
        hub.notify(&revealed(0, col)).await;
    }

    // Stop the runner so every queued job has executed.
    drop(hub);
    drop(ui);
    handle.join().unwrap();

    let expected: Vec<_> = (0..4).map(|c| Some(Cell::new(0, c))).collect();
    assert_eq!(*inline.lock().unwrap(), expected);
    assert_eq!(*marshalled.lock().unwrap(), expected);
}

#[test]
fn test_notify_from_context_thread_runs_inline() {
    let hub = NotificationHub::new();
    let (ui, runner) = DispatchContext::new("ui-inline", ContextConfig::default());

    let calls = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&calls);
    hub.subscribe(
        Arc::new(move |_: &Notification| *counter.lock().unwrap() += 1),
        Affinity::Context(ui.clone()),
    );

    // Drive the hub from inside a job that is itself on the context thread.
    let handle = runner.spawn_thread().unwrap();
    let (done_tx, done_rx) = std_mpsc::channel();
    let inner_hub = hub.clone();
    let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
    rt.block_on(ui.dispatch(move || {
        let local = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let delivered = local.block_on(inner_hub.notify(&revealed(1, 1)));
        done_tx.send(delivered).unwrap();
    }))
    .unwrap();

    assert_eq!(done_rx.recv().unwrap(), 1);
    assert_eq!(*calls.lock().unwrap(), 1);

    drop(hub);
    drop(ui);
    handle.join().unwrap();
}
