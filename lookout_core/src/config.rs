// Copyright 2026 the Lookout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scheduler configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::time::Duration;

/// Configuration for the dispatcher and stats bridge.
///
/// Every field has a default, so a JSON document only needs to name the
/// fields it overrides:
///
/// ```
/// # use lookout_core::SchedulerConfig;
/// let config = SchedulerConfig::from_json(r#"{ "admission_control": true }"#).unwrap();
/// assert_eq!(config.frame_budget_ms, 16.0);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Wall-clock budget for one notification round, in milliseconds.
    pub frame_budget_ms: f64,
    /// Whether expensive listeners may be skipped on non-idle ticks.
    pub admission_control: bool,
    /// Upper bound on how long a stats export waits for an idle opportunity,
    /// in milliseconds.
    pub bridge_timeout_ms: f64,
}

impl SchedulerConfig {
    /// One 60 Hz frame.
    pub const DEFAULT_FRAME_BUDGET_MS: f64 = 16.0;
    /// Default bridge export timeout.
    pub const DEFAULT_BRIDGE_TIMEOUT_MS: f64 = 300.0;

    /// Notifies every relevant listener on every tick.
    #[must_use]
    pub const fn eager() -> Self {
        Self {
            frame_budget_ms: Self::DEFAULT_FRAME_BUDGET_MS,
            admission_control: false,
            bridge_timeout_ms: Self::DEFAULT_BRIDGE_TIMEOUT_MS,
        }
    }

    /// Skips expensive, low-urgency listeners under load.
    #[must_use]
    pub const fn adaptive() -> Self {
        Self {
            admission_control: true,
            ..Self::eager()
        }
    }

    /// Parses and validates a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()
    }

    /// Checks that all durations are usable.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if !self.frame_budget_ms.is_finite() || self.frame_budget_ms <= 0.0 {
            return Err(ConfigError::InvalidFrameBudget(self.frame_budget_ms));
        }
        if !self.bridge_timeout_ms.is_finite() || self.bridge_timeout_ms < 0.0 {
            return Err(ConfigError::InvalidBridgeTimeout(self.bridge_timeout_ms));
        }
        Ok(self)
    }

    /// The bridge timeout as a [`Duration`].
    #[must_use]
    pub fn bridge_timeout(&self) -> Duration {
        Duration::from_millis_f64(self.bridge_timeout_ms)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::eager()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_one_frame() {
        let c = SchedulerConfig::default();
        assert_eq!(c.frame_budget_ms, 16.0);
        assert!(!c.admission_control);
        assert_eq!(c.bridge_timeout(), Duration::from_millis(300));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let c = SchedulerConfig::from_json(r#"{"frame_budget_ms": 8.0}"#).unwrap();
        assert_eq!(c.frame_budget_ms, 8.0);
        assert_eq!(c.bridge_timeout_ms, 300.0);
    }

    #[test]
    fn rejects_bad_budget_and_unknown_fields() {
        assert!(matches!(
            SchedulerConfig::from_json(r#"{"frame_budget_ms": 0}"#),
            Err(ConfigError::InvalidFrameBudget(_))
        ));
        assert!(matches!(
            SchedulerConfig::from_json(r#"{"budget": 3}"#),
            Err(ConfigError::Parse(_))
        ));
    }
}
