//! Inactivity decay.
//!
//! Every accepted interaction re-arms a countdown. When the countdown runs
//! out the score is decayed and the countdown re-arms, so an idle user
//! keeps cooling off one step per timeout interval.

use serde::{Deserialize, Serialize};

use super::state::EngagementState;

/// Default idle interval before a decay step.
pub const ACTIVITY_TIMEOUT_SECS: u64 = 30;

/// Default exponential decay multiplier (5% per interval).
pub const DECAY_RATE: f64 = 0.95;

/// How one decay step transforms the score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DecayMode {
    /// `score * rate`, approaching zero asymptotically
    Exponential { rate: f64 },
    /// `score - 1`, reaching zero after `ceil(score)` steps
    Linear,
}

impl DecayMode {
    pub fn from_config(use_exponential: bool, rate: f64) -> Self {
        if use_exponential {
            DecayMode::Exponential { rate }
        } else {
            DecayMode::Linear
        }
    }

    /// One decay step. Never returns a negative score.
    pub fn apply(self, score: f64) -> f64 {
        let next = match self {
            DecayMode::Exponential { rate } => score * rate,
            DecayMode::Linear => score - 1.0,
        };
        next.max(0.0)
    }
}

impl Default for DecayMode {
    fn default() -> Self {
        DecayMode::Exponential { rate: DECAY_RATE }
    }
}

/// A decay step that was applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecayStep {
    /// Deadline at which the step was due.
    pub at_ms: u64,
    pub score_before: f64,
    pub score_after: f64,
}

/// Countdown that decides when decay steps are due.
#[derive(Debug, Clone, Serialize)]
pub struct DecayScheduler {
    mode: DecayMode,
    timeout_ms: u64,
    deadline_ms: Option<u64>,
}

impl DecayScheduler {
    pub fn new(mode: DecayMode, timeout_ms: u64) -> Self {
        Self {
            mode,
            timeout_ms: timeout_ms.max(1),
            deadline_ms: None,
        }
    }

    pub fn mode(&self) -> DecayMode {
        self.mode
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    pub fn deadline_ms(&self) -> Option<u64> {
        self.deadline_ms
    }

    pub fn is_armed(&self) -> bool {
        self.deadline_ms.is_some()
    }

    /// (Re)start the countdown from `now_ms`.
    pub fn arm(&mut self, now_ms: u64) {
        self.deadline_ms = Some(now_ms.saturating_add(self.timeout_ms));
    }

    pub fn disarm(&mut self) {
        self.deadline_ms = None;
    }

    /// Apply every step whose deadline is at or before `now_ms`.
    ///
    /// A late caller catches up on all missed intervals. The countdown stops
    /// re-arming once the score is exactly zero.
    pub fn run_due(&mut self, state: &mut EngagementState, now_ms: u64) -> Vec<DecayStep> {
        let mut steps = Vec::new();
        while let Some(deadline) = self.deadline_ms {
            if deadline > now_ms {
                break;
            }
            let score_before = state.score();
            let score_after = state.decay(self.mode);
            steps.push(DecayStep {
                at_ms: deadline,
                score_before,
                score_after,
            });
            self.deadline_ms = if score_after > 0.0 {
                Some(deadline.saturating_add(self.timeout_ms))
            } else {
                None
            };
        }
        steps
    }
}

impl Default for DecayScheduler {
    fn default() -> Self {
        Self::new(DecayMode::default(), ACTIVITY_TIMEOUT_SECS * 1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engagement::quality::InteractionKind;

    fn state_with_score(score: f64) -> EngagementState {
        let mut state = EngagementState::new();
        state.record(InteractionKind::Click, 0, score);
        state
    }

    #[test]
    fn exponential_step_multiplies() {
        assert!((DecayMode::default().apply(10.0) - 9.5).abs() < 1e-9);
    }

    #[test]
    fn linear_step_never_goes_negative() {
        assert_eq!(DecayMode::Linear.apply(0.4), 0.0);
        assert_eq!(DecayMode::Linear.apply(3.0), 2.0);
    }

    #[test]
    fn unarmed_countdown_does_nothing() {
        let mut state = state_with_score(5.0);
        let mut decay = DecayScheduler::default();
        assert!(decay.run_due(&mut state, 1_000_000).is_empty());
        assert_eq!(state.score(), 5.0);
    }

    #[test]
    fn step_waits_for_full_timeout() {
        let mut state = state_with_score(10.0);
        let mut decay = DecayScheduler::default();
        decay.arm(0);
        assert!(decay.run_due(&mut state, 29_999).is_empty());
        let steps = decay.run_due(&mut state, 30_000);
        assert_eq!(steps.len(), 1);
        assert!((state.score() - 9.5).abs() < 1e-9);
        assert_eq!(decay.deadline_ms(), Some(60_000));
    }

    #[test]
    fn late_call_catches_up() {
        let mut state = state_with_score(10.0);
        let mut decay = DecayScheduler::default();
        decay.arm(0);
        let steps = decay.run_due(&mut state, 95_000);
        assert_eq!(steps.len(), 3);
        assert_eq!(
            steps.iter().map(|s| s.at_ms).collect::<Vec<_>>(),
            vec![30_000, 60_000, 90_000]
        );
        assert!((state.score() - 10.0 * 0.95f64.powi(3)).abs() < 1e-9);
    }

    #[test]
    fn linear_mode_stops_at_zero() {
        let mut state = state_with_score(2.5);
        let mut decay = DecayScheduler::new(DecayMode::Linear, 30_000);
        decay.arm(0);
        let steps = decay.run_due(&mut state, 10 * 30_000);
        assert_eq!(steps.len(), 3);
        assert_eq!(state.score(), 0.0);
        assert!(!decay.is_armed());
    }

    #[test]
    fn rearm_pushes_deadline_out() {
        let mut decay = DecayScheduler::default();
        decay.arm(0);
        decay.arm(20_000);
        assert_eq!(decay.deadline_ms(), Some(50_000));
    }
}
