//! Live scheduler on the async driver.
//!
//! One input per stdin line:
//! - an interaction kind: `click`, `scroll`, `keydown`, `pointermove`,
//!   `quality:sortingStart`, ...
//! - `resolve accepted|dismissed|later`
//! - `quit`
//!
//! Events are printed to stdout as JSON lines.

use std::io::{BufRead, Write};
use std::time::Duration;

use clap::Args;
use nudge_core::scheduler::{spawn_scheduler, PresentationSink, SchedulerInput};
use nudge_core::{Config, Event, InteractionKind, PromptKind, Trigger};
use tokio::sync::mpsc;

#[derive(Args)]
pub struct WatchArgs {
    /// Prompt to schedule: star, sponsor or pwa
    #[arg(long, default_value = "star")]
    prompt: PromptKind,
    /// Stop after this many seconds even without input
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Fire immediately on start
    #[arg(long)]
    force: bool,
    /// Keep flags in memory instead of the flag file
    #[arg(long)]
    ephemeral: bool,
}

/// Writes every event as a JSON line. Write failures (a closed pipe) are
/// logged and dropped.
struct JsonLineSink<W> {
    out: W,
}

impl<W: Write + Send> PresentationSink for JsonLineSink<W> {
    fn on_trigger(&mut self, trigger: &Trigger) {
        tracing::info!(rule = %trigger.rule, "show prompt");
    }

    fn on_event(&mut self, event: &Event) {
        let line = match serde_json::to_string(event) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "could not encode event");
                return;
            }
        };
        if let Err(e) = writeln!(self.out, "{line}").and_then(|()| self.out.flush()) {
            tracing::warn!(error = %e, "could not write event");
        }
    }
}

enum Line {
    Input(SchedulerInput),
    Quit,
}

fn parse_line(line: &str) -> Result<Option<Line>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    if line == "quit" || line == "exit" {
        return Ok(Some(Line::Quit));
    }
    if let Some(outcome) = line.strip_prefix("resolve") {
        let outcome = outcome.trim().parse().map_err(|e| format!("{e}"))?;
        return Ok(Some(Line::Input(SchedulerInput::Resolve(outcome))));
    }
    Ok(Some(Line::Input(SchedulerInput::Interaction(
        InteractionKind::from(line),
    ))))
}

pub fn run(args: WatchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let scheduler = super::build_scheduler(&config, args.prompt.as_str(), args.force, args.ephemeral)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let handle = spawn_scheduler(scheduler, JsonLineSink { out: std::io::stdout() });

        let (lines_tx, mut lines) = mpsc::unbounded_channel();
        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if lines_tx.send(line).is_err() {
                    break;
                }
            }
        });

        let deadline = async {
            match args.timeout_secs {
                Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                line = lines.recv() => {
                    let Some(line) = line else { break };
                    match parse_line(&line) {
                        Ok(Some(Line::Input(input))) => {
                            if !handle.send(input) {
                                break;
                            }
                        }
                        Ok(Some(Line::Quit)) => break,
                        Ok(None) => {}
                        Err(e) => eprintln!("error: {e}"),
                    }
                }
                _ = &mut deadline => break,
            }
        }

        match handle.stop().await {
            Some(_) => Ok(()),
            None => Err::<(), Box<dyn std::error::Error>>("scheduler task failed".into()),
        }
    })
}
