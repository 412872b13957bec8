//! Error types for the notification layer.

/// Errors that can occur while delivering a notification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotifyError {
    /// The runner behind a dispatch context has stopped, so the job
    /// could not be queued.
    #[error("dispatch context {0:?} is closed")]
    ContextClosed(String),
}
