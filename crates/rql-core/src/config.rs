//! Engine configuration
//!
//! Encoding defaults are resolved once at startup and handed to a builder
//! factory, rather than living in process-wide mutable state. A per-builder
//! option still overrides the configured default.

use serde::{Deserialize, Serialize};

/// Engine-wide defaults for the RQL builder
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RqlConfig {
    /// Percent-encode values twice so they survive both the client
    /// serialization and the server's own decode pass
    pub double_encode: bool,
}

impl Default for RqlConfig {
    fn default() -> Self {
        Self {
            double_encode: true,
        }
    }
}

impl RqlConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        let parse_bool = |v: String| v == "true" || v == "1" || v == "yes";

        if let Ok(v) = std::env::var("RQL_DOUBLE_ENCODE") {
            config.double_encode = parse_bool(v);
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RqlConfig::default();
        assert!(config.double_encode);
    }
}
