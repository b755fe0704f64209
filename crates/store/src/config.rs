use serde::{Deserialize, Serialize};

/// Immutable store configuration, captured once at construction.
///
/// Missing keys fall back to the defaults: enabled, 10 entries, bound enforced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// When false, checkpoint and restore calls are refused with `Disabled`.
    pub enabled: bool,
    /// Maximum retained checkpoints. Zero disables the bound.
    pub max_history: usize,
    /// Gates whether `max_history` is enforced at all.
    pub auto_cleanup: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_history: 10,
            auto_cleanup: true,
        }
    }
}

impl StoreConfig {
    /// A bounded configuration retaining at most `max_history` entries.
    pub fn with_capacity(max_history: usize) -> Self {
        Self {
            max_history,
            ..Self::default()
        }
    }

    /// An enabled configuration that never evicts.
    pub fn unbounded() -> Self {
        Self {
            auto_cleanup: false,
            ..Self::default()
        }
    }

    /// A configuration that refuses checkpoint and restore calls.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// The enforced bound, if any.
    pub fn capacity(&self) -> Option<usize> {
        (self.auto_cleanup && self.max_history > 0).then_some(self.max_history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = StoreConfig::default();
        assert!(config.enabled);
        assert_eq!(config.capacity(), Some(10));
    }

    #[test]
    fn zero_or_cleanup_off_disables_bound() {
        assert_eq!(StoreConfig::with_capacity(0).capacity(), None);
        assert_eq!(StoreConfig::unbounded().capacity(), None);
    }

    #[test]
    fn partial_config_uses_defaults() {
        let config: StoreConfig = serde_json::from_str(r#"{"max_history": 3}"#).unwrap();
        assert_eq!(config.capacity(), Some(3));
        assert!(config.enabled);
    }
}
