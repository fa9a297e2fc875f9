//! Engagement state and the score accumulator.
//!
//! [`EngagementState`] is a plain value. Accumulation (`record`) and decay
//! (`decay`) are its only writers of `score`; nothing else touches it.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::decay::DecayMode;
use super::quality::InteractionKind;
use super::velocity::velocity;

/// Default bound on the interaction history.
pub const HISTORY_CAPACITY: usize = 50;

/// Deltas at or above this count as quality interactions even for raw input.
pub const QUALITY_DELTA: f64 = 3.0;

/// A recorded interaction. `score` is the delta it contributed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionEvent {
    pub kind: InteractionKind,
    pub at_ms: u64,
    pub score: f64,
}

impl InteractionEvent {
    pub fn new(kind: InteractionKind, at_ms: u64, score: f64) -> Self {
        Self { kind, at_ms, score }
    }
}

/// Read-only summary of an [`EngagementState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementMetrics {
    /// Score rounded to one decimal.
    pub score: f64,
    pub interaction_count: u64,
    pub quality_count: u32,
    pub interactions_per_minute: f64,
    /// Seconds since the first accepted interaction.
    pub secs_since_first: u64,
    pub has_interacted: bool,
}

/// Built only through its constructors so `capacity` is never zero.
#[derive(Debug, Clone, Serialize)]
pub struct EngagementState {
    score: f64,
    history: VecDeque<InteractionEvent>,
    capacity: usize,
    quality_count: u32,
    interaction_count: u64,
    first_activity_ms: Option<u64>,
    last_activity_ms: Option<u64>,
}

impl EngagementState {
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            score: 0.0,
            history: VecDeque::with_capacity(capacity),
            capacity,
            quality_count: 0,
            interaction_count: 0,
            first_activity_ms: None,
            last_activity_ms: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn history(&self) -> &VecDeque<InteractionEvent> {
        &self.history
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn quality_count(&self) -> u32 {
        self.quality_count
    }

    pub fn interaction_count(&self) -> u64 {
        self.interaction_count
    }

    pub fn has_interacted(&self) -> bool {
        self.interaction_count > 0
    }

    pub fn last_activity_ms(&self) -> Option<u64> {
        self.last_activity_ms
    }

    /// Velocity multiplier as seen at `now_ms`.
    pub fn velocity(&self, now_ms: u64) -> f64 {
        velocity(&self.history, now_ms)
    }

    pub fn metrics(&self, now_ms: u64) -> EngagementMetrics {
        let secs_since_first = self
            .first_activity_ms
            .map(|first| now_ms.saturating_sub(first) / 1000)
            .unwrap_or(0);
        let minutes = self
            .first_activity_ms
            .map(|first| now_ms.saturating_sub(first) as f64 / 60_000.0)
            .unwrap_or(0.0);
        let interactions_per_minute = if minutes > 0.0 {
            round_tenth(self.interaction_count as f64 / minutes)
        } else {
            0.0
        };

        EngagementMetrics {
            score: round_tenth(self.score),
            interaction_count: self.interaction_count,
            quality_count: self.quality_count,
            interactions_per_minute,
            secs_since_first,
            has_interacted: self.has_interacted(),
        }
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Accumulate one accepted interaction.
    ///
    /// `base_score` comes from the quality classifier; the velocity
    /// multiplier is computed from the history *before* this event is added.
    /// Returns the recorded event carrying its delta.
    pub fn record(&mut self, kind: InteractionKind, now_ms: u64, base_score: f64) -> InteractionEvent {
        let base = if base_score.is_finite() {
            base_score.max(0.0)
        } else {
            0.0
        };
        let delta = base * velocity(&self.history, now_ms);

        self.score += delta;
        self.interaction_count += 1;
        if kind.is_quality() || delta >= QUALITY_DELTA {
            self.quality_count += 1;
        }
        self.first_activity_ms.get_or_insert(now_ms);
        self.last_activity_ms = Some(now_ms);

        let event = InteractionEvent::new(kind, now_ms, delta);
        while self.history.len() >= self.capacity.max(1) {
            self.history.pop_front();
        }
        self.history.push_back(event.clone());
        event
    }

    /// Apply one decay step. Returns the new score.
    pub fn decay(&mut self, mode: DecayMode) -> f64 {
        self.score = mode.apply(self.score);
        self.score
    }

    /// Forget everything, as if no interaction had happened.
    pub fn reset(&mut self) {
        *self = Self::with_capacity(self.capacity);
    }
}

impl Default for EngagementState {
    fn default() -> Self {
        Self::new()
    }
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
