//! Build parameters.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Hard limit on tree depth.
///
/// Traversal keeps a fixed stack of `2 * MAX_SUPPORTED_DEPTH + 1` entries:
/// every level pops one node and pushes at most three.
pub const MAX_SUPPORTED_DEPTH: usize = 256;

/// Tree construction parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccelConfig {
    /// Nodes with this many items or fewer become leaves
    pub leaf_threshold: usize,
    /// Upper bound on candidate split positions per axis
    pub max_split_tries: usize,
    /// Nodes at this depth become leaves
    pub max_depth: usize,
    /// Item count above which the three axes are evaluated in parallel
    pub parallel_split_threshold: usize,
}

impl Default for AccelConfig {
    fn default() -> Self {
        Self {
            leaf_threshold: 4,
            max_split_tries: 200,
            max_depth: 200,
            parallel_split_threshold: 70,
        }
    }
}

impl AccelConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.leaf_threshold == 0 {
            return Err(ConfigError::LeafThreshold);
        }
        if self.max_split_tries < 2 {
            return Err(ConfigError::SplitTries(self.max_split_tries));
        }
        if self.max_depth == 0 || self.max_depth > MAX_SUPPORTED_DEPTH {
            return Err(ConfigError::MaxDepth {
                depth: self.max_depth,
                limit: MAX_SUPPORTED_DEPTH,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = AccelConfig::default();
        assert_eq!(config.leaf_threshold, 4);
        assert_eq!(config.max_split_tries, 200);
        assert_eq!(config.max_depth, 200);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let base = AccelConfig::default();

        let config = AccelConfig { leaf_threshold: 0, ..base };
        assert_eq!(config.validate(), Err(ConfigError::LeafThreshold));

        let config = AccelConfig { max_split_tries: 1, ..base };
        assert_eq!(config.validate(), Err(ConfigError::SplitTries(1)));

        for depth in [0, MAX_SUPPORTED_DEPTH + 1] {
            let config = AccelConfig { max_depth: depth, ..base };
            assert_eq!(
                config.validate(),
                Err(ConfigError::MaxDepth {
                    depth,
                    limit: MAX_SUPPORTED_DEPTH
                })
            );
        }

        let config = AccelConfig { max_depth: MAX_SUPPORTED_DEPTH, ..base };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_serde_fills_missing_fields() {
        let config: AccelConfig = serde_json::from_str(r#"{ "leaf_threshold": 8 }"#).unwrap();
        assert_eq!(config.leaf_threshold, 8);
        assert_eq!(config.max_split_tries, 200);
        assert_eq!(config.parallel_split_threshold, 70);

        let json = serde_json::to_string(&AccelConfig::default()).unwrap();
        let back: AccelConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, AccelConfig::default());
    }
}
