// Copyright 2026 the Lookout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Listener priority tiers.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParsePriorityError;

/// How urgently a listener wants to run on every tick.
///
/// Priority never affects invocation order, only the probability of being
/// admitted when the frame budget is under pressure.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Expensive listeners may be skipped for up to 64 consecutive ticks.
    Low,
    /// Expensive listeners may be skipped for up to 16 consecutive ticks.
    #[default]
    Normal,
    /// Expensive listeners may be skipped for up to 4 consecutive ticks.
    High,
    /// Never skipped.
    Highest,
}

impl Priority {
    /// The number of consecutive skips after which a listener of this
    /// priority is forced to run.
    #[must_use]
    pub const fn max_iterations(self) -> u32 {
        match self {
            Self::Highest => 0,
            Self::High => 4,
            Self::Normal => 16,
            Self::Low => 64,
        }
    }

    /// Returns the lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Highest => "highest",
            Self::High => "high",
            Self::Normal => "normal",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ParsePriorityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "highest" => Ok(Self::Highest),
            "high" => Ok(Self::High),
            "normal" => Ok(Self::Normal),
            "low" => Ok(Self::Low),
            other => Err(ParsePriorityError(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caps_per_tier() {
        assert_eq!(Priority::Highest.max_iterations(), 0);
        assert_eq!(Priority::High.max_iterations(), 4);
        assert_eq!(Priority::Normal.max_iterations(), 16);
        assert_eq!(Priority::Low.max_iterations(), 64);
    }

    #[test]
    fn parses_names_and_rejects_others() {
        assert_eq!("high".parse::<Priority>(), Ok(Priority::High));
        assert_eq!(
            "urgent".parse::<Priority>(),
            Err(ParsePriorityError("urgent".into()))
        );
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&Priority::Highest).unwrap();
        assert_eq!(json, "\"highest\"");
        let back: Priority = serde_json::from_str("\"low\"").unwrap();
        assert_eq!(back, Priority::Low);
    }
}
