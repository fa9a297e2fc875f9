//! Nudge scheduler state machine.
//!
//! The scheduler does not own timers. Every command takes an explicit
//! `now_ms` (epoch milliseconds) and the caller is responsible for calling
//! `tick()` about once per second; [`super::driver`] does that with tokio
//! timers.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> Fired -> Stopped
//!   |        |                  ^
//!   |        +------------------+
//!   +-> Suppressed (persisted flag present, never arms anything)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut scheduler = NudgeScheduler::new("star", config, gate)?;
//! scheduler.start(now);
//! scheduler.record_interaction(InteractionKind::Click, now);
//! // Once per second:
//! for event in scheduler.tick(now) { /* Triggered fires once */ }
//! scheduler.stop(now);
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::config::SchedulerConfig;
use crate::engagement::{
    DecayScheduler, EngagementMetrics, EngagementState, InteractionKind, QualityAction,
    QualityClassifier, SessionClock, ThrottleGate, Trigger, TriggerEvaluator,
};
use crate::error::ValidationError;
use crate::events::{timestamp, Event, SuppressReason};
use crate::prompt::PromptOutcome;
use crate::storage::{FlagKind, PersistenceGate};

/// Rule name reported for forced prompts.
pub const FORCED_RULE: &str = "forced";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    /// Constructed, not started yet.
    Idle,
    /// Accepting interactions, decaying, evaluating.
    Running,
    /// A persisted flag said the prompt is done for this user.
    Suppressed,
    /// Trigger fired; waiting for the prompt to be resolved.
    Fired,
    /// Torn down. Terminal.
    Stopped,
}

/// One-shot engagement gate for a single prompt.
#[derive(Debug)]
pub struct NudgeScheduler {
    prompt: String,
    session_id: Uuid,
    state: SchedulerState,
    force_show: bool,
    evaluation_interval_ms: u64,
    suppressed_by: Option<SuppressReason>,
    throttle: ThrottleGate,
    classifier: QualityClassifier,
    engagement: EngagementState,
    decay: DecayScheduler,
    evaluator: TriggerEvaluator,
    clock: Option<SessionClock>,
    trigger: Option<Trigger>,
    outcome: Option<PromptOutcome>,
    gate: PersistenceGate,
}

impl NudgeScheduler {
    /// Validate `config` and read the persisted flags once.
    ///
    /// If a flag is present the scheduler is born `Suppressed` (unless
    /// `force_show` is set) and every later command is a no-op.
    pub fn new(
        prompt: impl Into<String>,
        config: SchedulerConfig,
        gate: PersistenceGate,
    ) -> Result<Self, ValidationError> {
        config.validate()?;
        let prompt = prompt.into();

        let suppressed_by = gate.read().suppressing_flag().map(|flag| match flag {
            FlagKind::Triggered => SuppressReason::Triggered,
            FlagKind::Dismissed => SuppressReason::Dismissed,
            FlagKind::Accepted => SuppressReason::Accepted,
        });
        let state = if suppressed_by.is_some() && !config.force_show {
            SchedulerState::Suppressed
        } else {
            SchedulerState::Idle
        };

        Ok(Self {
            session_id: Uuid::new_v4(),
            state,
            force_show: config.force_show,
            evaluation_interval_ms: config.scoring.evaluation_interval_ms,
            suppressed_by,
            throttle: config.scoring.throttle_gate(),
            classifier: config.scoring.classifier(),
            engagement: EngagementState::with_capacity(config.scoring.history_capacity),
            decay: config.scoring.decay_scheduler(),
            evaluator: TriggerEvaluator::new(config.thresholds),
            clock: None,
            trigger: None,
            outcome: None,
            gate,
            prompt,
        })
    }

    /// A scheduler that never runs, for prompts switched off in config.
    pub fn disabled(prompt: impl Into<String>, config: SchedulerConfig) -> Result<Self, ValidationError> {
        let mut scheduler = Self::new(prompt, config, PersistenceGate::in_memory(""))?;
        scheduler.state = SchedulerState::Suppressed;
        scheduler.suppressed_by = Some(SuppressReason::Disabled);
        scheduler.force_show = false;
        Ok(scheduler)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SchedulerState::Running
    }

    pub fn has_fired(&self) -> bool {
        self.evaluator.has_fired()
    }

    pub fn trigger(&self) -> Option<&Trigger> {
        self.trigger.as_ref()
    }

    pub fn outcome(&self) -> Option<PromptOutcome> {
        self.outcome
    }

    pub fn suppressed_by(&self) -> Option<SuppressReason> {
        self.suppressed_by
    }

    pub fn engagement(&self) -> &EngagementState {
        &self.engagement
    }

    pub fn metrics(&self, now_ms: u64) -> EngagementMetrics {
        self.engagement.metrics(now_ms)
    }

    pub fn evaluation_interval_ms(&self) -> u64 {
        self.evaluation_interval_ms
    }

    /// When the next decay step is due, if one is armed.
    pub fn next_decay_ms(&self) -> Option<u64> {
        if self.is_running() {
            self.decay.deadline_ms()
        } else {
            None
        }
    }

    pub fn elapsed_secs(&self, now_ms: u64) -> Option<u64> {
        self.clock.map(|clock| clock.elapsed_secs(now_ms))
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start the session clock. A forced prompt fires right here.
    pub fn start(&mut self, now_ms: u64) -> Vec<Event> {
        match self.state {
            SchedulerState::Idle => {
                self.state = SchedulerState::Running;
                let clock = SessionClock::start(now_ms);
                self.clock = Some(clock);
                tracing::debug!(prompt = %self.prompt, session = %self.session_id, "scheduler started");

                let mut events = vec![Event::SchedulerStarted {
                    prompt: self.prompt.clone(),
                    session_id: self.session_id,
                    at: timestamp(now_ms),
                }];
                if self.force_show {
                    let forced = self.evaluator.force(FORCED_RULE, &self.engagement, &clock, now_ms);
                    if let Some(trigger) = forced {
                        events.push(self.fire(trigger, now_ms));
                    }
                }
                events
            }
            SchedulerState::Suppressed => {
                let reason = self.suppressed_by.unwrap_or(SuppressReason::Disabled);
                tracing::debug!(prompt = %self.prompt, ?reason, "scheduler suppressed");
                vec![Event::SchedulerSuppressed {
                    prompt: self.prompt.clone(),
                    reason,
                    at: timestamp(now_ms),
                }]
            }
            _ => Vec::new(),
        }
    }

    /// Feed one raw interaction. Returns `None` when the scheduler is not
    /// running or the throttle gate dropped the event.
    pub fn record_interaction(&mut self, kind: InteractionKind, now_ms: u64) -> Option<Event> {
        if !self.is_running() {
            return None;
        }
        if !self.throttle.accept(&kind, now_ms) {
            tracing::trace!(prompt = %self.prompt, kind = %kind, "interaction throttled");
            return None;
        }

        let base = self.classifier.score(&kind);
        let recorded = self.engagement.record(kind, now_ms, base);
        self.decay.arm(now_ms);
        tracing::debug!(
            prompt = %self.prompt,
            kind = %recorded.kind,
            delta = recorded.score,
            score = self.engagement.score(),
            "interaction accepted"
        );

        Some(Event::InteractionAccepted {
            prompt: self.prompt.clone(),
            kind: recorded.kind,
            delta: recorded.score,
            score: self.engagement.score(),
            at: timestamp(now_ms),
        })
    }

    /// Feed one domain action (algorithm selected, sort started, ...).
    pub fn record_quality(&mut self, action: QualityAction, now_ms: u64) -> Option<Event> {
        self.record_interaction(InteractionKind::Quality(action), now_ms)
    }

    /// Apply every decay step due at `now_ms`.
    pub fn run_decay(&mut self, now_ms: u64) -> Vec<Event> {
        if !self.is_running() {
            return Vec::new();
        }
        self.decay
            .run_due(&mut self.engagement, now_ms)
            .into_iter()
            .map(|step| {
                tracing::debug!(
                    prompt = %self.prompt,
                    before = step.score_before,
                    after = step.score_after,
                    "engagement decayed"
                );
                Event::DecayApplied {
                    prompt: self.prompt.clone(),
                    score_before: step.score_before,
                    score_after: step.score_after,
                    at: timestamp(step.at_ms),
                }
            })
            .collect()
    }

    /// One evaluator pass. Returns `Event::Triggered` the first time a
    /// rule matches; the scheduler then stops evaluating and decaying.
    pub fn evaluate(&mut self, now_ms: u64) -> Option<Event> {
        if !self.is_running() {
            return None;
        }
        let clock = self.clock?;
        let trigger = self.evaluator.evaluate(&self.engagement, &clock, now_ms)?;
        Some(self.fire(trigger, now_ms))
    }

    /// Call periodically: decay first, then evaluation.
    pub fn tick(&mut self, now_ms: u64) -> Vec<Event> {
        let mut events = self.run_decay(now_ms);
        events.extend(self.evaluate(now_ms));
        events
    }

    /// Record what the user did with the prompt.
    ///
    /// `Dismissed` is also accepted before the trigger fired (the user
    /// opted out another way). It moves the scheduler straight to
    /// `Stopped`; no `SchedulerStopped` event follows.
    pub fn resolve(&mut self, outcome: PromptOutcome, now_ms: u64) -> Option<Event> {
        if self.outcome.is_some() {
            return None;
        }
        match (self.state, outcome) {
            (SchedulerState::Fired, _) => {}
            (SchedulerState::Idle | SchedulerState::Running, PromptOutcome::Dismissed) => {
                self.halt();
            }
            _ => return None,
        }

        let at = timestamp(now_ms);
        match outcome {
            PromptOutcome::Accepted => {
                self.gate.record(FlagKind::Accepted, at);
            }
            PromptOutcome::Dismissed => {
                self.gate.record(FlagKind::Dismissed, at);
            }
            PromptOutcome::Later => {}
        }
        self.outcome = Some(outcome);
        tracing::info!(prompt = %self.prompt, ?outcome, "prompt resolved");

        Some(Event::PromptResolved {
            prompt: self.prompt.clone(),
            outcome,
            at,
        })
    }

    /// Tear down: disarm decay, drop the session clock. Idempotent; only
    /// the first call returns an event.
    pub fn stop(&mut self, now_ms: u64) -> Option<Event> {
        match self.state {
            SchedulerState::Stopped | SchedulerState::Suppressed => None,
            _ => {
                self.halt();
                tracing::debug!(prompt = %self.prompt, fired = self.has_fired(), "scheduler stopped");
                Some(Event::SchedulerStopped {
                    prompt: self.prompt.clone(),
                    session_id: self.session_id,
                    fired: self.has_fired(),
                    at: timestamp(now_ms),
                })
            }
        }
    }

    /// Forget accumulated engagement and throttle history.
    pub fn reset_engagement(&mut self) {
        self.engagement.reset();
        self.throttle.reset();
        self.decay.disarm();
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn fire(&mut self, trigger: Trigger, now_ms: u64) -> Event {
        self.state = SchedulerState::Fired;
        self.decay.disarm();
        self.clock = None;
        let at = timestamp(now_ms);
        self.gate.record(FlagKind::Triggered, at);
        tracing::info!(
            prompt = %self.prompt,
            rule = %trigger.rule,
            weighted = trigger.weighted.value,
            elapsed_secs = trigger.elapsed_secs,
            "nudge triggered"
        );
        self.trigger = Some(trigger.clone());
        Event::Triggered {
            prompt: self.prompt.clone(),
            trigger,
            at,
        }
    }

    fn halt(&mut self) {
        self.state = SchedulerState::Stopped;
        self.decay.disarm();
        self.clock = None;
    }
}
