//! Dispatch context configuration.

use serde::{Deserialize, Serialize};

/// Configuration for a [`DispatchContext`](crate::DispatchContext).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextConfig {
    /// How many jobs may wait in the context's queue. When the queue is
    /// full, the listener waits for room before delivering further.
    pub capacity: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self { capacity: 64 }
    }
}

impl ContextConfig {
    /// Sets the queue capacity.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Returns a copy with values forced into a usable range. A Tokio
    /// channel can't be built with zero capacity.
    pub fn validated(mut self) -> Self {
        if self.capacity == 0 {
            tracing::warn!("dispatch capacity 0 raised to 1");
            self.capacity = 1;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_config_default() {
        assert_eq!(ContextConfig::default().capacity, 64);
    }

    #[test]
    fn test_validated_clamps_zero_capacity() {
        let config = ContextConfig::default().with_capacity(0).validated();
        assert_eq!(config.capacity, 1);
    }

    #[test]
    fn test_validated_keeps_valid_capacity() {
        let config = ContextConfig::default().with_capacity(8).validated();
        assert_eq!(config.capacity, 8);
    }

    #[test]
    fn test_context_config_json_shape() {
        let json = serde_json::to_value(ContextConfig::default()).unwrap();
        assert_eq!(json, serde_json::json!({ "capacity": 64 }));
    }
}
