//! Async driver: owns a [`NudgeScheduler`] on a tokio task and supplies
//! the periodic evaluation tick and the inactivity countdown.
//!
//! Inputs arrive on an unbounded channel. A `watch` channel carries the
//! shutdown signal; dropping the [`SchedulerHandle`] also shuts the task
//! down. Time is read from `tokio::time::Instant`, so paused-clock tests
//! drive the whole loop deterministically.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};

use super::engine::{NudgeScheduler, SchedulerState};
use super::sink::{dispatch, PresentationSink};
use crate::engagement::{InteractionKind, QualityAction};
use crate::events::{self, Event};
use crate::prompt::PromptOutcome;

/// Messages accepted by a running driver.
#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerInput {
    Interaction(InteractionKind),
    Quality(QualityAction),
    Resolve(PromptOutcome),
}

/// Longest delay handed to a tokio timer. Later deadlines never fire.
const MAX_TIMER_DELAY: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Maps the tokio clock onto epoch milliseconds.
#[derive(Debug, Clone, Copy)]
struct DriverClock {
    origin: Instant,
    origin_ms: u64,
}

impl DriverClock {
    fn new() -> Self {
        Self {
            origin: Instant::now(),
            origin_ms: events::now_ms(),
        }
    }

    fn now_ms(&self) -> u64 {
        self.origin_ms + self.origin.elapsed().as_millis() as u64
    }

    fn instant_at(&self, at_ms: u64) -> Instant {
        let offset = Duration::from_millis(at_ms.saturating_sub(self.origin_ms));
        self.origin + offset.min(MAX_TIMER_DELAY)
    }
}

/// Control side of a spawned scheduler.
#[derive(Debug)]
pub struct SchedulerHandle {
    inputs: mpsc::UnboundedSender<SchedulerInput>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<NudgeScheduler>,
}

impl SchedulerHandle {
    /// Returns `false` once the scheduler task has exited.
    pub fn send(&self, input: SchedulerInput) -> bool {
        self.inputs.send(input).is_ok()
    }

    pub fn interact(&self, kind: InteractionKind) -> bool {
        self.send(SchedulerInput::Interaction(kind))
    }

    pub fn quality(&self, action: QualityAction) -> bool {
        self.send(SchedulerInput::Quality(action))
    }

    pub fn resolve(&self, outcome: PromptOutcome) -> bool {
        self.send(SchedulerInput::Resolve(outcome))
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signal shutdown and hand the scheduler back. `None` if the task
    /// panicked or was cancelled.
    pub async fn stop(self) -> Option<NudgeScheduler> {
        let _ = self.shutdown.send(true);
        match self.task.await {
            Ok(scheduler) => Some(scheduler),
            Err(e) => {
                tracing::error!(error = %e, "scheduler task failed");
                None
            }
        }
    }
}

/// Start `scheduler` on the current tokio runtime.
pub fn spawn_scheduler<S>(scheduler: NudgeScheduler, sink: S) -> SchedulerHandle
where
    S: PresentationSink + 'static,
{
    let (inputs, rx) = mpsc::unbounded_channel();
    let (shutdown, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(run(scheduler, sink, rx, shutdown_rx));
    SchedulerHandle {
        inputs,
        shutdown,
        task,
    }
}

async fn run<S: PresentationSink>(
    mut scheduler: NudgeScheduler,
    mut sink: S,
    mut inputs: mpsc::UnboundedReceiver<SchedulerInput>,
    mut shutdown: watch::Receiver<bool>,
) -> NudgeScheduler {
    let clock = DriverClock::new();
    emit(&mut sink, scheduler.start(clock.now_ms()));
    if scheduler.state() == SchedulerState::Suppressed {
        return scheduler;
    }

    let period = Duration::from_millis(scheduler.evaluation_interval_ms()).min(MAX_TIMER_DELAY);
    let mut evaluation = interval_at(Instant::now() + period, period);
    evaluation.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let running = scheduler.is_running();
        let decay_at = scheduler.next_decay_ms().map(|ms| clock.instant_at(ms));

        tokio::select! {
            biased;

            input = inputs.recv() => {
                let Some(input) = input else {
                    tracing::debug!(prompt = %scheduler.prompt(), "input channel closed");
                    break;
                };
                let now = clock.now_ms();
                let event = match input {
                    SchedulerInput::Interaction(kind) => scheduler.record_interaction(kind, now),
                    SchedulerInput::Quality(action) => scheduler.record_quality(action, now),
                    SchedulerInput::Resolve(outcome) => scheduler.resolve(outcome, now),
                };
                emit(&mut sink, event);
                if scheduler.state() == SchedulerState::Stopped {
                    break;
                }
            }
            _ = shutdown.changed() => {
                break;
            }
            _ = sleep_until(decay_at.unwrap_or_else(Instant::now)), if decay_at.is_some() => {
                emit(&mut sink, scheduler.run_decay(clock.now_ms()));
            }
            _ = evaluation.tick(), if running => {
                emit(&mut sink, scheduler.evaluate(clock.now_ms()));
            }
        }
    }

    emit(&mut sink, scheduler.stop(clock.now_ms()));
    scheduler
}

fn emit<S: PresentationSink>(sink: &mut S, events: impl IntoIterator<Item = Event>) {
    for event in events {
        dispatch(sink, &event);
    }
}
