//! Engagement scoring pipeline.
//!
//! ```text
//! event -> ThrottleGate -> QualityClassifier -> velocity -> EngagementState
//!                                                              |
//!                                         DecayScheduler <-----+-----> TriggerEvaluator
//! ```
//!
//! Everything here is synchronous and takes explicit millisecond
//! timestamps. Timers live in [`crate::scheduler`].

mod decay;
mod quality;
mod state;
mod throttle;
mod trigger;
mod velocity;

pub use decay::{DecayMode, DecayScheduler, DecayStep, ACTIVITY_TIMEOUT_SECS, DECAY_RATE};
pub use quality::{
    default_engagement_scores, default_quality_scores, InteractionKind, QualityAction,
    QualityClassifier, NEUTRAL_SCORE,
};
pub use state::{EngagementMetrics, EngagementState, InteractionEvent, HISTORY_CAPACITY, QUALITY_DELTA};
pub use throttle::{default_throttle_ms, ThrottleGate, DEFAULT_THROTTLE_MS};
pub use trigger::{
    weighted_score, SessionClock, ThresholdRule, Trigger, TriggerEvaluator, WeightedScore,
    MAX_TIME_BONUS,
};
pub use velocity::{velocity, velocity_tier, VelocityTier, VELOCITY_WINDOW};
