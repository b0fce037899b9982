use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{Error, Result};

pub const DEFAULT_TRANSITION_LOCK_MS: u64 = 300;
pub const DEFAULT_AUTO_ADVANCE_DELAY_MS: u64 = 500;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ControllerConfig {
    /// Move to the next step after a complete/skip
    pub auto_advance: bool,
    pub allow_navigation: bool,
    pub allow_skipping: bool,
    pub allow_editing: bool,
    pub allow_deletion: bool,
    pub allow_reordering: bool,
    /// How long navigation stays locked after an index change
    pub transition_lock_ms: u64,
    /// Must not be shorter than the lock window when auto-advance is on,
    /// otherwise an advance right after a navigation is dropped by the lock.
    pub auto_advance_delay_ms: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            auto_advance: false,
            allow_navigation: true,
            allow_skipping: true,
            allow_editing: true,
            allow_deletion: true,
            allow_reordering: false,
            transition_lock_ms: DEFAULT_TRANSITION_LOCK_MS,
            auto_advance_delay_ms: DEFAULT_AUTO_ADVANCE_DELAY_MS,
        }
    }
}

impl ControllerConfig {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from `STEPPER_*` keys resolved through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            auto_advance: parse_flag(&lookup, "STEPPER_AUTO_ADVANCE", defaults.auto_advance),
            allow_navigation: parse_flag(
                &lookup,
                "STEPPER_ALLOW_NAVIGATION",
                defaults.allow_navigation,
            ),
            allow_skipping: parse_flag(&lookup, "STEPPER_ALLOW_SKIPPING", defaults.allow_skipping),
            allow_editing: parse_flag(&lookup, "STEPPER_ALLOW_EDITING", defaults.allow_editing),
            allow_deletion: parse_flag(&lookup, "STEPPER_ALLOW_DELETION", defaults.allow_deletion),
            allow_reordering: parse_flag(
                &lookup,
                "STEPPER_ALLOW_REORDERING",
                defaults.allow_reordering,
            ),
            transition_lock_ms: parse_millis(
                &lookup,
                "STEPPER_TRANSITION_LOCK_MS",
                defaults.transition_lock_ms,
            ),
            auto_advance_delay_ms: parse_millis(
                &lookup,
                "STEPPER_AUTO_ADVANCE_DELAY_MS",
                defaults.auto_advance_delay_ms,
            ),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.transition_lock_ms == 0 {
            return Err(Error::Config(
                "transition_lock_ms must be greater than zero".to_string(),
            ));
        }
        if self.auto_advance && self.auto_advance_delay_ms < self.transition_lock_ms {
            return Err(Error::Config(format!(
                "auto_advance_delay_ms ({}) must not be shorter than transition_lock_ms ({})",
                self.auto_advance_delay_ms, self.transition_lock_ms
            )));
        }
        Ok(())
    }

    pub fn with_auto_advance(mut self, auto_advance: bool) -> Self {
        self.auto_advance = auto_advance;
        self
    }

    pub fn transition_lock(&self) -> Duration {
        Duration::from_millis(self.transition_lock_ms)
    }

    pub fn auto_advance_delay(&self) -> Duration {
        Duration::from_millis(self.auto_advance_delay_ms)
    }
}

fn parse_flag<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => {
                warn!("{} has invalid value '{}', using default {}", key, raw, default);
                default
            }
        },
    }
}

fn parse_millis<F>(lookup: &F, key: &str, default: u64) -> u64
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}ms", key, raw, default);
            default
        }),
    }
}
