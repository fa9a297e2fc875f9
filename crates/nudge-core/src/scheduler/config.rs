//! Per-instance scheduler configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::engagement::{
    default_engagement_scores, default_quality_scores, default_throttle_ms, DecayMode,
    DecayScheduler, QualityClassifier, ThresholdRule, ThrottleGate, ACTIVITY_TIMEOUT_SECS,
    DECAY_RATE, DEFAULT_THROTTLE_MS, HISTORY_CAPACITY,
};
use crate::error::ValidationError;
use crate::prompt::PromptKind;

/// Scoring, throttling and decay settings shared by every prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Base score per raw interaction kind.
    #[serde(default = "default_engagement_scores")]
    pub engagement_scores: BTreeMap<String, f64>,
    /// Score per domain quality action.
    #[serde(default = "default_quality_scores")]
    pub quality_scores: BTreeMap<String, f64>,
    /// Minimum interval between accepted events, per kind.
    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: BTreeMap<String, u64>,
    /// Window for kinds missing from `throttle_ms`.
    #[serde(default = "default_fallback_throttle_ms")]
    pub default_throttle_ms: u64,
    #[serde(default = "default_activity_timeout_secs")]
    pub activity_timeout_secs: u64,
    #[serde(default = "default_decay_rate")]
    pub decay_rate: f64,
    #[serde(default = "default_true")]
    pub use_exponential_decay: bool,
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    #[serde(default = "default_evaluation_interval_ms")]
    pub evaluation_interval_ms: u64,
}

fn default_fallback_throttle_ms() -> u64 {
    DEFAULT_THROTTLE_MS
}
fn default_activity_timeout_secs() -> u64 {
    ACTIVITY_TIMEOUT_SECS
}
fn default_decay_rate() -> f64 {
    DECAY_RATE
}
fn default_true() -> bool {
    true
}
fn default_history_capacity() -> usize {
    HISTORY_CAPACITY
}
fn default_evaluation_interval_ms() -> u64 {
    1_000
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            engagement_scores: default_engagement_scores(),
            quality_scores: default_quality_scores(),
            throttle_ms: default_throttle_ms(),
            default_throttle_ms: DEFAULT_THROTTLE_MS,
            activity_timeout_secs: ACTIVITY_TIMEOUT_SECS,
            decay_rate: DECAY_RATE,
            use_exponential_decay: true,
            history_capacity: HISTORY_CAPACITY,
            evaluation_interval_ms: default_evaluation_interval_ms(),
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(self.decay_rate > 0.0 && self.decay_rate < 1.0) {
            return Err(ValidationError::DecayRateOutOfRange(self.decay_rate));
        }
        if self.activity_timeout_secs == 0 {
            return Err(ValidationError::ZeroActivityTimeout);
        }
        if self.evaluation_interval_ms == 0 {
            return Err(ValidationError::ZeroEvaluationInterval);
        }
        if self.history_capacity == 0 {
            return Err(ValidationError::ZeroHistoryCapacity);
        }
        for (key, &value) in self.engagement_scores.iter().chain(&self.quality_scores) {
            if !value.is_finite() || value < 0.0 {
                return Err(ValidationError::InvalidScore {
                    key: key.clone(),
                    value,
                });
            }
        }
        Ok(())
    }

    pub fn decay_mode(&self) -> DecayMode {
        DecayMode::from_config(self.use_exponential_decay, self.decay_rate)
    }

    pub fn classifier(&self) -> QualityClassifier {
        QualityClassifier::new(self.engagement_scores.clone(), self.quality_scores.clone())
    }

    pub fn throttle_gate(&self) -> ThrottleGate {
        ThrottleGate::new(self.throttle_ms.clone(), self.default_throttle_ms)
    }

    pub fn decay_scheduler(&self) -> DecayScheduler {
        DecayScheduler::new(self.decay_mode(), self.activity_timeout_secs.saturating_mul(1000))
    }
}

/// Everything one scheduler instance needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(flatten)]
    pub scoring: ScoringConfig,
    /// Ordered rule list, most permissive first.
    pub thresholds: Vec<ThresholdRule>,
    /// Fire immediately on start, ignoring persisted flags.
    #[serde(default)]
    pub force_show: bool,
}

impl SchedulerConfig {
    pub fn new(scoring: ScoringConfig, thresholds: Vec<ThresholdRule>) -> Self {
        Self {
            scoring,
            thresholds,
            force_show: false,
        }
    }

    pub fn for_prompt(prompt: PromptKind) -> Self {
        Self::new(ScoringConfig::default(), prompt.default_thresholds())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.scoring.validate()?;
        if self.thresholds.is_empty() {
            return Err(ValidationError::EmptyCollection("thresholds".to_string()));
        }
        for rule in &self.thresholds {
            rule.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        for prompt in PromptKind::ALL {
            SchedulerConfig::for_prompt(prompt).validate().unwrap();
        }
    }

    #[test]
    fn decay_rate_must_be_open_interval() {
        for rate in [0.0, 1.0, 1.5, -0.1, f64::NAN] {
            let scoring = ScoringConfig {
                decay_rate: rate,
                ..Default::default()
            };
            assert!(matches!(
                scoring.validate(),
                Err(ValidationError::DecayRateOutOfRange(_))
            ));
        }
    }

    #[test]
    fn negative_score_is_rejected() {
        let mut scoring = ScoringConfig::default();
        scoring.engagement_scores.insert("click".into(), -1.0);
        assert_eq!(
            scoring.validate(),
            Err(ValidationError::InvalidScore {
                key: "click".into(),
                value: -1.0
            })
        );
    }

    #[test]
    fn empty_rule_list_is_rejected() {
        let config = SchedulerConfig::new(ScoringConfig::default(), Vec::new());
        assert!(matches!(
            config.validate(),
            Err(ValidationError::EmptyCollection(_))
        ));
    }

    #[test]
    fn linear_mode_selected_by_flag() {
        let scoring = ScoringConfig {
            use_exponential_decay: false,
            ..Default::default()
        };
        assert_eq!(scoring.decay_mode(), DecayMode::Linear);
        assert_eq!(scoring.decay_scheduler().timeout_ms(), 30_000);
    }

    #[test]
    fn huge_activity_timeout_saturates() {
        let scoring = ScoringConfig {
            activity_timeout_secs: u64::MAX,
            ..Default::default()
        };
        scoring.validate().unwrap();
        let mut decay = scoring.decay_scheduler();
        assert_eq!(decay.timeout_ms(), u64::MAX);
        decay.arm(1_000);
        assert_eq!(decay.deadline_ms(), Some(u64::MAX));
    }
}
