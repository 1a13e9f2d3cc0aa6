//! Container configuration.

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

/// Default limit on nested synchronous factory calls.
pub const DEFAULT_MAX_DEPTH: usize = 1024;

/// Resolution settings shared by a registry and every scope built from it.
///
/// # Examples
///
/// ```rust
/// use keyed_di::{ContainerOptions, Registry};
///
/// let registry = Registry::with_options(
///     ContainerOptions::default().max_depth(64),
/// );
/// assert_eq!(registry.options().max_depth, 64);
/// assert!(registry.options().detect_cycles);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ContainerOptions {
    /// Maximum number of factories executing synchronously inside one another
    pub max_depth: usize,
    /// Report a factory that re-enters its own token as `DiError::Circular`
    pub detect_cycles: bool,
}

impl ContainerOptions {
    /// Sets the nested factory limit.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Enables or disables cycle detection.
    pub fn detect_cycles(mut self, enabled: bool) -> Self {
        self.detect_cycles = enabled;
        self
    }

    /// Parses options from JSON; missing fields take their defaults.
    #[cfg(feature = "config")]
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            detect_cycles: true,
        }
    }
}

#[cfg(all(test, feature = "config"))]
mod tests {
    use super::*;

    #[test]
    fn json_fills_missing_fields() {
        let options = ContainerOptions::from_json(r#"{ "max_depth": 8 }"#).unwrap();
        assert_eq!(options.max_depth, 8);
        assert!(options.detect_cycles);
    }

    #[test]
    fn json_rejects_wrong_types() {
        assert!(ContainerOptions::from_json(r#"{ "detect_cycles": "yes" }"#).is_err());
    }
}
