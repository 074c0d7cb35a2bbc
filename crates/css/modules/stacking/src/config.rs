//! Runtime configuration of the incremental maintainer.
//!
//! Configuration can be loaded from environment variables or constructed
//! programmatically.

use core::time::Duration;
use std::env;

const DEFAULT_DEBOUNCE_MS: u64 = 100;
const DEFAULT_WATCHED_ATTRIBUTES: [&str; 3] = ["style", "class", "id"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StackingConfig {
    /// Quiet period after the last relevant mutation before a rescan runs
    pub debounce_ms: u64,
    /// Lowercase attribute names whose changes schedule a rescan
    pub watched_attributes: Vec<String>,
}

impl Default for StackingConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            watched_attributes: DEFAULT_WATCHED_ATTRIBUTES
                .iter()
                .map(|name| (*name).to_owned())
                .collect(),
        }
    }
}

impl StackingConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads the following environment variables:
    /// - `STACKING_DEBOUNCE_MS`: debounce period in milliseconds (default: 100, minimum 1)
    /// - `STACKING_WATCHED_ATTRIBUTES`: comma-separated attribute names (default: `style,class,id`)
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`StackingConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let debounce_ms = lookup("STACKING_DEBOUNCE_MS")
            .and_then(|val| val.trim().parse::<u64>().ok())
            .unwrap_or(defaults.debounce_ms)
            .max(1);
        let watched_attributes = lookup("STACKING_WATCHED_ATTRIBUTES")
            .map(|val| {
                val.split(',')
                    .map(|name| name.trim().to_ascii_lowercase())
                    .filter(|name| !name.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|names| !names.is_empty())
            .unwrap_or(defaults.watched_attributes);
        Self {
            debounce_ms,
            watched_attributes,
        }
    }

    #[must_use]
    pub const fn with_debounce_ms(mut self, debounce_ms: u64) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }

    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Whether a change of attribute `name` should schedule a rescan.
    pub fn watches(&self, name: &str) -> bool {
        self.watched_attributes
            .iter()
            .any(|watched| watched.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_unset_or_invalid() {
        let config = StackingConfig::from_lookup(|key| {
            (key == "STACKING_DEBOUNCE_MS").then(|| "soon".to_owned())
        });
        assert_eq!(config, StackingConfig::default());
        assert_eq!(config.debounce(), Duration::from_millis(100));
        assert!(config.watches("CLASS"));
        assert!(!config.watches("data-x"));
    }

    #[test]
    fn reads_overrides() {
        let config = StackingConfig::from_lookup(|key| match key {
            "STACKING_DEBOUNCE_MS" => Some("0".to_owned()),
            "STACKING_WATCHED_ATTRIBUTES" => Some(" Style , data-layer,".to_owned()),
            _ => None,
        });
        assert_eq!(config.debounce_ms, 1);
        assert_eq!(config.watched_attributes, vec!["style", "data-layer"]);
    }
}
