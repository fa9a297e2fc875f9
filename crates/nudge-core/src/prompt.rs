//! Prompt kinds and their default threshold tables.
//!
//! Each prompt runs its own scheduler instance with its own rules. Rules
//! overlap on purpose: a short high-intensity path for power users and a
//! longer low-intensity path for patient browsers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::engagement::ThresholdRule;
use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    /// "Star us on GitHub"
    Star,
    /// "Sponsor us"
    Sponsor,
    /// Progressive web app install prompt
    PwaInstall,
}

impl PromptKind {
    pub const ALL: [PromptKind; 3] = [PromptKind::Star, PromptKind::Sponsor, PromptKind::PwaInstall];

    /// Key used for config sections and persisted flags.
    pub fn as_str(self) -> &'static str {
        match self {
            PromptKind::Star => "star",
            PromptKind::Sponsor => "sponsor",
            PromptKind::PwaInstall => "pwa",
        }
    }

    pub fn default_thresholds(self) -> Vec<ThresholdRule> {
        match self {
            PromptKind::Star => vec![
                ThresholdRule::new("standard", 45, 5.0).requiring_interaction(),
                ThresholdRule::new("highActivity", 20, 12.0).requiring_interaction(),
                ThresholdRule::new("powerUser", 90, 15.0).requiring_interaction(),
                ThresholdRule::new("extended", 120, 8.0).requiring_interaction(),
            ],
            // Sponsor shows later than star so the two rarely compete.
            PromptKind::Sponsor => vec![
                ThresholdRule::new("highEngagement", 50, 12.0),
                ThresholdRule::new("standard", 75, 8.0).requiring_interaction(),
                ThresholdRule::new("extended", 120, 10.0).requiring_interaction(),
                ThresholdRule::new("powerUser", 150, 15.0),
            ],
            PromptKind::PwaInstall => vec![ThresholdRule::new("delayed", 3, 0.0)],
        }
    }
}

impl fmt::Display for PromptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromptKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "star" | "github" => Ok(PromptKind::Star),
            "sponsor" => Ok(PromptKind::Sponsor),
            "pwa" | "pwa_install" => Ok(PromptKind::PwaInstall),
            other => Err(ConfigError::UnknownPrompt(other.to_string())),
        }
    }
}

/// What the user did with a shown prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptOutcome {
    /// Converted (starred, sponsored, installed). Persisted.
    Accepted,
    /// Closed for good. Persisted.
    Dismissed,
    /// Hidden for this session only. Not persisted.
    Later,
}

impl FromStr for PromptOutcome {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accepted" | "accept" => Ok(PromptOutcome::Accepted),
            "dismissed" | "dismiss" => Ok(PromptOutcome::Dismissed),
            "later" => Ok(PromptOutcome::Later),
            other => Err(ConfigError::InvalidValue {
                key: "outcome".to_string(),
                message: format!("expected accepted, dismissed or later, got '{other}'"),
            }),
        }
    }
}
