//! Execution contexts for thread-affine subscribers.
//!
//! Some subscribers may only be called from one particular thread (a UI
//! thread, typically). A [`DispatchContext`] is the handle other threads use
//! to queue work for that thread; the matching [`ContextRunner`] is what the
//! thread itself runs to execute the queue.
//!
//! ```text
//!  listener task ──dispatch(job)──▶ [bounded mpsc] ──▶ ContextRunner (UI thread)
//! ```
//!
//! The runner records the id of the thread it runs on, which is how
//! [`DispatchContext::is_current`] knows when a job can be run inline
//! instead of queued.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};
use std::thread::{self, ThreadId};

use tokio::sync::mpsc;

use crate::{ContextConfig, NotifyError};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Sending side of an execution context. Cheap to clone.
#[derive(Clone)]
pub struct DispatchContext {
    name: Arc<str>,
    sender: mpsc::Sender<Job>,
    thread: Arc<OnceLock<ThreadId>>,
}

/// Receiving side of an execution context. Run it on the thread the
/// context stands for.
pub struct ContextRunner {
    name: Arc<str>,
    receiver: mpsc::Receiver<Job>,
    thread: Arc<OnceLock<ThreadId>>,
}

impl DispatchContext {
    /// Creates a context and its runner. Nothing executes until the runner
    /// is started.
    pub fn new(name: impl Into<String>, config: ContextConfig) -> (Self, ContextRunner) {
        let config = config.validated();
        let name: Arc<str> = Arc::from(name.into());
        let thread = Arc::new(OnceLock::new());
        let (sender, receiver) = mpsc::channel(config.capacity);

        let context = Self {
            name: Arc::clone(&name),
            sender,
            thread: Arc::clone(&thread),
        };
        let runner = ContextRunner {
            name,
            receiver,
            thread,
        };
        (context, runner)
    }

    /// The name given at creation, used in logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `true` if the caller is already running on this context's thread.
    ///
    /// Always `false` before the runner has started.
    pub fn is_current(&self) -> bool {
        self.thread.get() == Some(&thread::current().id())
    }

    /// `true` once the runner has stopped (or was dropped without running).
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Queues `job` to run on the context's thread.
    ///
    /// Resolves once the job is queued, not when it has run. Waits for room
    /// when the queue is full.
    ///
    /// # Errors
    ///
    /// [`NotifyError::ContextClosed`] if the runner is gone.
    pub async fn dispatch<F>(&self, job: F) -> Result<(), NotifyError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.sender
            .send(Box::new(job))
            .await
            .map_err(|_| NotifyError::ContextClosed(self.name.to_string()))
    }
}

impl std::fmt::Debug for DispatchContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchContext")
            .field("name", &self.name)
            .field("bound", &self.thread.get().is_some())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl ContextRunner {
    /// The context's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs queued jobs on the current thread until every
    /// [`DispatchContext`] clone is dropped.
    ///
    /// Blocks the thread. Must not be called from inside an async runtime.
    pub fn run_blocking(mut self) {
        self.bind();
        while let Some(job) = self.receiver.blocking_recv() {
            self.execute(job);
        }
        tracing::debug!(context = %self.name, "dispatch context stopped");
    }

    /// Async variant of [`run_blocking`](Self::run_blocking).
    ///
    /// The context is bound to the thread this future is first polled on,
    /// so run it where it cannot migrate: a current-thread runtime or a
    /// `LocalSet`.
    pub async fn run(mut self) {
        self.bind();
        while let Some(job) = self.receiver.recv().await {
            self.execute(job);
        }
        tracing::debug!(context = %self.name, "dispatch context stopped");
    }

    /// Starts a dedicated OS thread, named after the context, that runs
    /// [`run_blocking`](Self::run_blocking).
    pub fn spawn_thread(self) -> std::io::Result<thread::JoinHandle<()>> {
        thread::Builder::new()
            .name(self.name.to_string())
            .spawn(move || self.run_blocking())
    }

    fn bind(&self) {
        let id = thread::current().id();
        if self.thread.set(id).is_err() {
            tracing::warn!(context = %self.name, "dispatch context already bound");
        }
        tracing::debug!(context = %self.name, thread = ?id, "dispatch context running");
    }

    fn execute(&self, job: Job) {
        // A panicking subscriber must not take the whole context down.
        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            tracing::error!(context = %self.name, "dispatched job panicked");
        }
    }
}
