//! Per-store configuration.
//!
//! `StoreConfig` deserializes with defaults for every field, so it can be
//! embedded in a host application's config file:
//!
//! ```toml
//! [store]
//! debug = true
//! max_notify_depth = 8
//! ```
//!
//! `GRANULE_DEBUG` and `GRANULE_MAX_NOTIFY_DEPTH` override through
//! [`StoreConfig::from_env`].

use serde::{Deserialize, Deserializer, Serialize};

/// Default bound on nested notification passes.
pub const DEFAULT_MAX_NOTIFY_DEPTH: usize = 32;

pub const ENV_DEBUG: &str = "GRANULE_DEBUG";
pub const ENV_MAX_NOTIFY_DEPTH: &str = "GRANULE_MAX_NOTIFY_DEPTH";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Emit `tracing` debug events for path updates and notifications.
    pub debug: bool,
    /// How many notification passes may be nested through callbacks that
    /// call `set` again. The outermost pass counts as one, so zero is
    /// rejected when deserializing and raised to one by the store.
    #[serde(deserialize_with = "deserialize_depth")]
    pub max_notify_depth: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            debug: false,
            max_notify_depth: DEFAULT_MAX_NOTIFY_DEPTH,
        }
    }
}

impl StoreConfig {
    /// Defaults overridden by `GRANULE_DEBUG` / `GRANULE_MAX_NOTIFY_DEPTH`.
    pub fn from_env() -> Self {
        Self::default().merge_env(|key| std::env::var(key).ok())
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Sets the nesting bound. Values below one are raised to one.
    pub fn with_max_notify_depth(mut self, depth: usize) -> Self {
        self.max_notify_depth = depth.max(1);
        self
    }

    fn merge_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(raw) = lookup(ENV_DEBUG) {
            self.debug = parse_flag(&raw);
        }
        if let Some(raw) = lookup(ENV_MAX_NOTIFY_DEPTH) {
            match raw.trim().parse::<usize>() {
                Ok(0) => tracing::warn!(
                    target: "granule::config",
                    value = %raw,
                    "ignoring GRANULE_MAX_NOTIFY_DEPTH, it must be at least 1"
                ),
                Ok(depth) => self.max_notify_depth = depth,
                Err(_) => tracing::warn!(
                    target: "granule::config",
                    value = %raw,
                    "ignoring unparsable GRANULE_MAX_NOTIFY_DEPTH"
                ),
            }
        }
        self
    }
}

fn deserialize_depth<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    match usize::deserialize(deserializer)? {
        0 => Err(serde::de::Error::custom("max_notify_depth must be at least 1")),
        depth => Ok(depth),
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert!(!config.debug);
        assert_eq!(config.max_notify_depth, DEFAULT_MAX_NOTIFY_DEPTH);
    }

    #[test]
    fn test_env_overrides() {
        let config = StoreConfig::default().merge_env(|key| match key {
            ENV_DEBUG => Some("on".to_string()),
            ENV_MAX_NOTIFY_DEPTH => Some(" 4 ".to_string()),
            _ => None,
        });
        assert!(config.debug);
        assert_eq!(config.max_notify_depth, 4);
    }

    #[test]
    fn test_env_bad_depth_keeps_default() {
        let config = StoreConfig::default().merge_env(|key| match key {
            ENV_MAX_NOTIFY_DEPTH => Some("lots".to_string()),
            _ => None,
        });
        assert_eq!(config.max_notify_depth, DEFAULT_MAX_NOTIFY_DEPTH);
        assert!(!config.debug);
    }

    #[test]
    fn test_zero_depth_is_refused() {
        let config = StoreConfig::default().merge_env(|key| match key {
            ENV_MAX_NOTIFY_DEPTH => Some("0".to_string()),
            _ => None,
        });
        assert_eq!(config.max_notify_depth, DEFAULT_MAX_NOTIFY_DEPTH);

        let err = toml::from_str::<StoreConfig>("max_notify_depth = 0").unwrap_err();
        assert!(err.to_string().contains("at least 1"), "{err}");
        assert!(serde_json::from_value::<StoreConfig>(
            serde_json::json!({"max_notify_depth": 0})
        )
        .is_err());

        assert_eq!(StoreConfig::default().with_max_notify_depth(0).max_notify_depth, 1);
    }

    #[test]
    fn test_flag_parsing() {
        assert!(parse_flag("TRUE"));
        assert!(parse_flag("1"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("off"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn test_deserialize_partial_toml() {
        let config: StoreConfig = toml::from_str("debug = true").unwrap();
        assert!(config.debug);
        assert_eq!(config.max_notify_depth, DEFAULT_MAX_NOTIFY_DEPTH);
    }

    #[test]
    fn test_deserialize_json() {
        let config: StoreConfig =
            serde_json::from_value(serde_json::json!({"max_notify_depth": 2})).unwrap();
        assert_eq!(config, StoreConfig::default().with_max_notify_depth(2));
    }
}
