//! Client configuration.

use concentration_model::DEFAULT_FACE_DOWN;
use concentration_notify::ContextConfig;
use concentration_transport::DEFAULT_MAX_LINE_LENGTH;
use serde::{Deserialize, Serialize};

/// Configuration for a [`Session`](crate::Session).
///
/// Every field has a sensible default, so most callers only touch the
/// builder setters they care about:
///
/// ```
/// use concentration::ClientConfig;
///
/// let config = ClientConfig::default()
///     .with_inbound_capacity(16)
///     .with_face_down_asset("back.png");
/// assert_eq!(config.face_down_asset, "back.png");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Lines the reader task may buffer before it waits for the listener.
    pub inbound_capacity: usize,

    /// Queue size for dispatch contexts created from this config.
    pub dispatch_capacity: usize,

    /// Asset shown on face-down cards. Never assigned to a letter.
    pub face_down_asset: String,

    /// Longest inbound line, in bytes. Longer lines are dropped and
    /// reported as malformed.
    pub max_line_length: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            inbound_capacity: 32,
            dispatch_capacity: 64,
            face_down_asset: DEFAULT_FACE_DOWN.to_string(),
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

impl ClientConfig {
    /// Sets the inbound line buffer size.
    pub fn with_inbound_capacity(mut self, capacity: usize) -> Self {
        self.inbound_capacity = capacity;
        self
    }

    /// Sets the dispatch queue size.
    pub fn with_dispatch_capacity(mut self, capacity: usize) -> Self {
        self.dispatch_capacity = capacity;
        self
    }

    /// Sets the face-down asset.
    pub fn with_face_down_asset(mut self, asset: impl Into<String>) -> Self {
        self.face_down_asset = asset.into();
        self
    }

    /// Sets the inbound line length limit.
    pub fn with_max_line_length(mut self, max: usize) -> Self {
        self.max_line_length = max;
        self
    }

    /// Returns a copy with capacities and the line limit raised to at
    /// least 1.
    pub fn validated(mut self) -> Self {
        if self.inbound_capacity == 0 {
            tracing::warn!("inbound capacity 0 raised to 1");
            self.inbound_capacity = 1;
        }
        if self.dispatch_capacity == 0 {
            tracing::warn!("dispatch capacity 0 raised to 1");
            self.dispatch_capacity = 1;
        }
        if self.max_line_length == 0 {
            tracing::warn!("max line length 0 raised to 1");
            self.max_line_length = 1;
        }
        self
    }

    /// The [`ContextConfig`] for dispatch contexts serving this client.
    pub fn context_config(&self) -> ContextConfig {
        ContextConfig::default().with_capacity(self.dispatch_capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.inbound_capacity, 32);
        assert_eq!(config.dispatch_capacity, 64);
        assert_eq!(config.face_down_asset, "pokeball.png");
        assert_eq!(config.max_line_length, 4096);
    }

    #[test]
    fn test_validated_clamps_zero_capacities() {
        let config = ClientConfig::default()
            .with_inbound_capacity(0)
            .with_dispatch_capacity(0)
            .with_max_line_length(0)
            .validated();
        assert_eq!(config.inbound_capacity, 1);
        assert_eq!(config.dispatch_capacity, 1);
        assert_eq!(config.max_line_length, 1);
    }

    #[test]
    fn test_context_config_uses_dispatch_capacity() {
        let config = ClientConfig::default().with_dispatch_capacity(5);
        assert_eq!(config.context_config().capacity, 5);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{ "face_down_asset": "back.png" }"#).unwrap();
        assert_eq!(config.face_down_asset, "back.png");
        assert_eq!(config.inbound_capacity, 32);
    }
}
