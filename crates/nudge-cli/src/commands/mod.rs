pub mod config;
pub mod flags;
pub mod simulate;
pub mod watch;

use nudge_core::{Config, JsonFileFlagStore, NudgeScheduler, PersistenceGate};

/// Build the scheduler for `prompt` from the on-disk config and flag file.
///
/// `ephemeral` keeps flags in memory so nothing is written.
pub(crate) fn build_scheduler(
    config: &Config,
    prompt: &str,
    force: bool,
    ephemeral: bool,
) -> Result<NudgeScheduler, Box<dyn std::error::Error>> {
    let mut scheduler_config = config.scheduler_config(prompt)?;
    scheduler_config.force_show |= force;

    if !config.prompt_enabled(prompt) && !scheduler_config.force_show {
        return Ok(NudgeScheduler::disabled(prompt, scheduler_config)?);
    }

    let gate = if ephemeral {
        PersistenceGate::in_memory(prompt)
    } else {
        PersistenceGate::new(prompt, Box::new(JsonFileFlagStore::open_default()?))
    };
    Ok(NudgeScheduler::new(prompt, scheduler_config, gate)?)
}
