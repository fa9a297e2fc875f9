//! Threshold rules and the one-shot trigger evaluator.
//!
//! Each evaluation derives a weighted score from the raw engagement score
//! and checks the ordered rule list. The first rule that matches fires the
//! trigger; after that the evaluator is spent.

use serde::{Deserialize, Serialize};

use super::state::EngagementState;
use crate::error::ValidationError;

/// Bonus per quality interaction applied to the raw score.
pub const QUALITY_BONUS_PER_INTERACTION: f64 = 0.1;

/// Ceiling of the time-on-task bonus.
pub const MAX_TIME_BONUS: f64 = 5.0;

/// A named combination of elapsed time and weighted score that fires the trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRule {
    pub name: String,
    pub min_elapsed_secs: u64,
    pub min_weighted_score: f64,
    #[serde(default)]
    pub requires_prior_interaction: bool,
    /// Quality interactions required before the rule may match.
    #[serde(default)]
    pub min_quality_interactions: u32,
}

impl ThresholdRule {
    pub fn new(name: impl Into<String>, min_elapsed_secs: u64, min_weighted_score: f64) -> Self {
        Self {
            name: name.into(),
            min_elapsed_secs,
            min_weighted_score,
            requires_prior_interaction: false,
            min_quality_interactions: 0,
        }
    }

    pub fn requiring_interaction(mut self) -> Self {
        self.requires_prior_interaction = true;
        self
    }

    pub fn with_min_quality(mut self, count: u32) -> Self {
        self.min_quality_interactions = count;
        self
    }

    pub fn matches(&self, elapsed_secs: u64, weighted: f64, state: &EngagementState) -> bool {
        elapsed_secs >= self.min_elapsed_secs
            && weighted >= self.min_weighted_score
            && (!self.requires_prior_interaction || state.has_interacted())
            && state.quality_count() >= self.min_quality_interactions
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::InvalidRule {
                name: self.name.clone(),
                message: "name must not be empty".to_string(),
            });
        }
        if !self.min_weighted_score.is_finite() || self.min_weighted_score < 0.0 {
            return Err(ValidationError::InvalidRule {
                name: self.name.clone(),
                message: format!(
                    "min_weighted_score must be finite and non-negative, got {}",
                    self.min_weighted_score
                ),
            });
        }
        Ok(())
    }
}

/// Session start, from which elapsed time is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClock {
    pub started_at_ms: u64,
}

impl SessionClock {
    pub fn start(now_ms: u64) -> Self {
        Self {
            started_at_ms: now_ms,
        }
    }

    /// Whole seconds since start.
    pub fn elapsed_secs(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.started_at_ms) / 1000
    }
}

/// Components of a weighted score, kept for logging and events.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedScore {
    pub value: f64,
    pub base: f64,
    pub quality_multiplier: f64,
    pub velocity: f64,
    pub time_bonus: f64,
}

/// `score * (1 + 0.1 * quality_count) * velocity + min(5, elapsed / 60)`.
pub fn weighted_score(state: &EngagementState, elapsed_secs: u64, now_ms: u64) -> WeightedScore {
    let base = state.score();
    let quality_multiplier = 1.0 + state.quality_count() as f64 * QUALITY_BONUS_PER_INTERACTION;
    let velocity = state.velocity(now_ms);
    let time_bonus = (elapsed_secs as f64 / 60.0).min(MAX_TIME_BONUS);

    WeightedScore {
        value: base * quality_multiplier * velocity + time_bonus,
        base,
        quality_multiplier,
        velocity,
        time_bonus,
    }
}

/// Why and when the trigger fired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub rule: String,
    pub elapsed_secs: u64,
    pub weighted: WeightedScore,
    pub at_ms: u64,
}

/// Checks the rule list and fires at most once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerEvaluator {
    rules: Vec<ThresholdRule>,
    fired: bool,
}

impl TriggerEvaluator {
    pub fn new(rules: Vec<ThresholdRule>) -> Self {
        Self {
            rules,
            fired: false,
        }
    }

    pub fn rules(&self) -> &[ThresholdRule] {
        &self.rules
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// One evaluation pass. Returns the trigger the first time a rule
    /// matches and `None` on every call after that.
    pub fn evaluate(
        &mut self,
        state: &EngagementState,
        clock: &SessionClock,
        now_ms: u64,
    ) -> Option<Trigger> {
        if self.fired {
            return None;
        }

        let elapsed_secs = clock.elapsed_secs(now_ms);
        let weighted = weighted_score(state, elapsed_secs, now_ms);
        let rule = self
            .rules
            .iter()
            .find(|rule| rule.matches(elapsed_secs, weighted.value, state))?;

        self.fired = true;
        Some(Trigger {
            rule: rule.name.clone(),
            elapsed_secs,
            weighted,
            at_ms: now_ms,
        })
    }

    /// Fire unconditionally, used for forced prompts.
    pub fn force(&mut self, rule: &str, state: &EngagementState, clock: &SessionClock, now_ms: u64) -> Option<Trigger> {
        if self.fired {
            return None;
        }
        self.fired = true;
        let elapsed_secs = clock.elapsed_secs(now_ms);
        Some(Trigger {
            rule: rule.to_string(),
            elapsed_secs,
            weighted: weighted_score(state, elapsed_secs, now_ms),
            at_ms: now_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engagement::quality::InteractionKind;

    fn high_activity() -> ThresholdRule {
        ThresholdRule::new("highActivity", 20, 12.0).requiring_interaction()
    }

    #[test]
    fn elapsed_is_whole_seconds() {
        let clock = SessionClock::start(1_000);
        assert_eq!(clock.elapsed_secs(1_999), 0);
        assert_eq!(clock.elapsed_secs(21_000), 20);
        assert_eq!(clock.elapsed_secs(500), 0);
    }

    #[test]
    fn weighted_score_combines_all_terms() {
        let mut state = EngagementState::new();
        state.record(InteractionKind::Click, 0, 10.0);
        // 10 * 1.1 * 1.0 + 120 / 60
        let weighted = weighted_score(&state, 120, 5_000);
        assert!((weighted.value - 13.0).abs() < 1e-9);
        assert_eq!(weighted.time_bonus, 2.0);
    }

    #[test]
    fn time_bonus_is_capped() {
        let state = EngagementState::new();
        let weighted = weighted_score(&state, 3_600, 0);
        assert_eq!(weighted.value, MAX_TIME_BONUS);
    }

    #[test]
    fn rule_needs_elapsed_time() {
        let mut state = EngagementState::new();
        state.record(InteractionKind::Click, 0, 20.0);
        let mut evaluator = TriggerEvaluator::new(vec![high_activity()]);
        let clock = SessionClock::start(0);
        assert!(evaluator.evaluate(&state, &clock, 19_000).is_none());
        let trigger = evaluator.evaluate(&state, &clock, 20_000).unwrap();
        assert_eq!(trigger.rule, "highActivity");
        assert_eq!(trigger.elapsed_secs, 20);
    }

    #[test]
    fn prior_interaction_requirement() {
        let state = EngagementState::new();
        let clock = SessionClock::start(0);
        let mut strict = TriggerEvaluator::new(vec![ThresholdRule::new("idle", 10, 0.0).requiring_interaction()]);
        assert!(strict.evaluate(&state, &clock, 60_000).is_none());
        let mut lenient = TriggerEvaluator::new(vec![ThresholdRule::new("idle", 10, 0.0)]);
        assert!(lenient.evaluate(&state, &clock, 60_000).is_some());
    }

    #[test]
    fn quality_requirement() {
        let mut state = EngagementState::new();
        state.record(InteractionKind::Scroll, 0, 0.8);
        let clock = SessionClock::start(0);
        let rule = ThresholdRule::new("sponsor", 0, 0.0).with_min_quality(2);
        let mut evaluator = TriggerEvaluator::new(vec![rule]);
        assert!(evaluator.evaluate(&state, &clock, 1_000).is_none());
    }

    #[test]
    fn first_matching_rule_wins_and_fires_once() {
        let mut state = EngagementState::new();
        state.record(InteractionKind::Click, 0, 20.0);
        let clock = SessionClock::start(0);
        let mut evaluator = TriggerEvaluator::new(vec![
            ThresholdRule::new("slow", 120, 8.0),
            high_activity(),
            ThresholdRule::new("any", 0, 0.0),
        ]);
        let trigger = evaluator.evaluate(&state, &clock, 30_000).unwrap();
        assert_eq!(trigger.rule, "highActivity");
        assert!(evaluator.has_fired());
        assert!(evaluator.evaluate(&state, &clock, 200_000).is_none());
        assert!(evaluator.force("forced", &state, &clock, 200_000).is_none());
    }

    #[test]
    fn validate_rejects_bad_rules() {
        assert!(ThresholdRule::new("", 0, 1.0).validate().is_err());
        assert!(ThresholdRule::new("x", 0, f64::NAN).validate().is_err());
        assert!(ThresholdRule::new("x", 0, -1.0).validate().is_err());
        assert!(high_activity().validate().is_ok());
    }
}
