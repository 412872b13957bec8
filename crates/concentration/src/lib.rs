//! # Concentration
//!
//! Client engine for the Concentration matching game.
//!
//! The server owns the game. This crate keeps a local mirror of it by
//! reading the server's line protocol in the background, applying each
//! message to a [`GameState`](concentration_model::GameState) and telling
//! presentation layers what changed. User moves go the other way through a
//! [`RevealGateway`], which checks them against the board before sending.
//!
//! ```text
//! server ──lines──▶ reader ──▶ listener ──▶ GameState ──▶ NotificationHub ──▶ subscribers
//!    ▲                                          │
//!    └────── REVEAL r c ◀── RevealGateway       └──▶ watch<StateSnapshot>
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use concentration::prelude::*;
//!
//! # async fn demo() -> Result<(), ConcentrationError> {
//! let session = Session::builder()
//!     .connect_tcp("127.0.0.1:5000")
//!     .await?;
//! session.request_reveal(0, 0).await?;
//! let final_state = session.join().await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod diagnostics;
mod error;
mod gateway;
mod listener;
mod session;

pub use config::ClientConfig;
pub use diagnostics::{ChannelSink, Diagnostic, DiagnosticSink, TracingSink};
pub use error::ConcentrationError;
pub use gateway::{GatewayError, RevealGateway};
pub use session::{Session, SessionBuilder};

pub use concentration_model as model;
pub use concentration_notify as notify;
pub use concentration_protocol as protocol;
pub use concentration_transport as transport;

/// Everything a front-end usually needs, in one import.
pub mod prelude {
    pub use crate::{
        ChannelSink, ClientConfig, ConcentrationError, Diagnostic, DiagnosticSink, GatewayError,
        RevealGateway, Session, SessionBuilder, TracingSink,
    };
    pub use concentration_model::{
        AssetId, AssetResolver, Notification, NotificationKind, StateSnapshot, StaticAssets,
    };
    pub use concentration_notify::{
        Affinity, ContextConfig, ContextRunner, DispatchContext, NotificationHub, Subscriber,
    };
    pub use concentration_protocol::Cell;
    pub use concentration_transport::{Connection, StreamConnection, TcpConnection};
}
