//! Offline replay of an interaction script.
//!
//! The script is a JSON array of steps with offsets from session start:
//!
//! ```json
//! [
//!   { "at_ms": 0, "kind": "click" },
//!   { "at_ms": 1500, "quality": "sortingStart" },
//!   { "at_ms": 50000, "resolve": "later" }
//! ]
//! ```
//!
//! Evaluation ticks are interleaved at the configured interval, exactly as
//! the async driver would deliver them. Every event is printed as one JSON
//! line.

use std::io::Read;
use std::path::PathBuf;

use clap::Args;
use nudge_core::events::{now_ms, Event};
use nudge_core::{Config, InteractionKind, NudgeScheduler, PromptKind, PromptOutcome, QualityAction};
use serde::Deserialize;

#[derive(Args)]
pub struct SimulateArgs {
    /// Script file, or "-" for stdin
    script: PathBuf,
    /// Prompt to schedule: star, sponsor or pwa
    #[arg(long, default_value = "star")]
    prompt: PromptKind,
    /// Keep ticking this many seconds after session start
    #[arg(long, default_value_t = 180)]
    duration_secs: u64,
    /// Fire immediately on start
    #[arg(long)]
    force: bool,
    /// Read and write the real flag file instead of an in-memory one
    #[arg(long)]
    persist: bool,
    /// Print an engagement summary line at the end
    #[arg(long)]
    metrics: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScriptStep {
    pub at_ms: u64,
    #[serde(flatten)]
    pub input: StepInput,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepInput {
    Kind(InteractionKind),
    Quality(QualityAction),
    Resolve(PromptOutcome),
}

pub fn run(args: SimulateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let content = if args.script.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(&args.script)
            .map_err(|e| format!("cannot read {}: {e}", args.script.display()))?
    };
    let steps: Vec<ScriptStep> = serde_json::from_str(&content)?;

    let config = Config::load_or_default();
    let mut scheduler =
        super::build_scheduler(&config, args.prompt.as_str(), args.force, !args.persist)?;

    let start = now_ms();
    let events = replay(&mut scheduler, steps, start, start + args.duration_secs * 1000);
    for event in &events {
        println!("{}", serde_json::to_string(event)?);
    }
    if args.metrics {
        let end = start + args.duration_secs * 1000;
        println!("{}", serde_json::to_string(&scheduler.metrics(end))?);
    }
    Ok(())
}

/// Drive `scheduler` through `steps` and evaluation ticks until `end_ms`.
pub fn replay(
    scheduler: &mut NudgeScheduler,
    mut steps: Vec<ScriptStep>,
    start_ms: u64,
    end_ms: u64,
) -> Vec<Event> {
    steps.sort_by_key(|step| step.at_ms);
    let interval = scheduler.evaluation_interval_ms();
    let mut events = scheduler.start(start_ms);
    let mut next_tick = start_ms + interval;

    for step in steps {
        let at = start_ms + step.at_ms;
        while next_tick <= at {
            events.extend(scheduler.tick(next_tick));
            next_tick += interval;
        }
        // Catch up on decay that fell between the last tick and this step.
        events.extend(scheduler.run_decay(at));
        let event = match step.input {
            StepInput::Kind(kind) => scheduler.record_interaction(kind, at),
            StepInput::Quality(action) => scheduler.record_quality(action, at),
            StepInput::Resolve(outcome) => scheduler.resolve(outcome, at),
        };
        events.extend(event);
    }

    while next_tick <= end_ms {
        events.extend(scheduler.tick(next_tick));
        next_tick += interval;
    }
    events.extend(scheduler.stop(end_ms));
    events
}
