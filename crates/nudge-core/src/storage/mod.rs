mod config;
pub mod flags;

pub use config::{Config, PromptConfig};
pub use flags::{
    flag_key, FlagKind, FlagStore, JsonFileFlagStore, MemoryFlagStore, PersistedFlags,
    PersistenceGate,
};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/nudge[-dev]/` based on NUDGE_ENV.
///
/// Set NUDGE_ENV=dev to use the development data directory. NUDGE_HOME
/// replaces `~/.config` as the base directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = match std::env::var_os("NUDGE_HOME") {
        Some(home) => PathBuf::from(home),
        None => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config"),
    };

    let env = std::env::var("NUDGE_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("nudge-dev")
    } else {
        base_dir.join("nudge")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
