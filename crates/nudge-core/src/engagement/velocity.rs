//! Interaction velocity estimation.
//!
//! Looks at the density of the most recent interactions and returns a
//! multiplier for how actively the user is engaging right now. This is not
//! decay: stale activity is only mildly penalized here, the timer-driven
//! decay lives in [`super::decay`].

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::state::InteractionEvent;

/// Number of trailing history entries inspected.
pub const VELOCITY_WINDOW: usize = 5;

const BURST_SPAN_MS: u64 = 2_000;
const BRISK_SPAN_MS: u64 = 5_000;
const COOLING_GAP_MS: u64 = 10_000;

/// Engagement pace bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VelocityTier {
    /// Five interactions inside two seconds
    Burst,
    /// Three or more interactions inside five seconds
    Brisk,
    /// Nothing notable either way
    Steady,
    /// More than ten seconds since the last interaction
    Cooling,
}

impl VelocityTier {
    pub fn multiplier(self) -> f64 {
        match self {
            VelocityTier::Burst => 1.5,
            VelocityTier::Brisk => 1.2,
            VelocityTier::Steady => 1.0,
            VelocityTier::Cooling => 0.8,
        }
    }
}

/// Classify the pace of `history` as seen at `now_ms`.
pub fn velocity_tier(history: &VecDeque<InteractionEvent>, now_ms: u64) -> VelocityTier {
    if history.len() < 2 {
        return VelocityTier::Steady;
    }

    let count = history.len().min(VELOCITY_WINDOW);
    let oldest = &history[history.len() - count];
    let span = now_ms.saturating_sub(oldest.at_ms);

    if span < BURST_SPAN_MS && count >= VELOCITY_WINDOW {
        return VelocityTier::Burst;
    }
    if span < BRISK_SPAN_MS && count >= 3 {
        return VelocityTier::Brisk;
    }

    match history.back() {
        Some(last) if now_ms.saturating_sub(last.at_ms) > COOLING_GAP_MS => VelocityTier::Cooling,
        _ => VelocityTier::Steady,
    }
}

/// Velocity multiplier for `history` at `now_ms`.
pub fn velocity(history: &VecDeque<InteractionEvent>, now_ms: u64) -> f64 {
    velocity_tier(history, now_ms).multiplier()
}
