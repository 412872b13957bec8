//! Notification fan-out for the Concentration client.
//!
//! The listener loop hands every [`Notification`](concentration_model::Notification)
//! to a [`NotificationHub`], which calls each registered [`Subscriber`] in
//! registration order.
//!
//! Subscribers that must run on a particular thread register with
//! [`Affinity::Context`]. The hub checks whether it is already on that
//! thread and, if not, queues the call through the context's
//! [`DispatchContext`]:
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use concentration_model::Notification;
//! use concentration_notify::{Affinity, ContextConfig, DispatchContext, NotificationHub};
//!
//! let hub = NotificationHub::new();
//! let (ui, runner) = DispatchContext::new("ui", ContextConfig::default());
//! runner.spawn_thread().unwrap();
//!
//! hub.subscribe(
//!     Arc::new(|n: &Notification| println!("{:?} {}", n.kind, n.snapshot)),
//!     Affinity::Context(ui),
//! );
//! ```

mod config;
mod context;
mod error;
mod hub;

pub use config::ContextConfig;
pub use context::{ContextRunner, DispatchContext};
pub use error::NotifyError;
pub use hub::{Affinity, NotificationHub, Subscriber};
