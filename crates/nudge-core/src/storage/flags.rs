//! Persisted prompt flags.
//!
//! Keys follow `{prompt}-triggered`, `{prompt}-dismissed` and
//! `{prompt}-accepted`, each holding the time it was written. The store is an
//! external collaborator; [`PersistenceGate`] turns its failures into
//! "flag absent" on read and best-effort on write so a broken store never
//! stops a scheduler.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagKind {
    Triggered,
    Dismissed,
    Accepted,
}

impl FlagKind {
    pub const ALL: [FlagKind; 3] = [FlagKind::Triggered, FlagKind::Dismissed, FlagKind::Accepted];

    pub fn suffix(self) -> &'static str {
        match self {
            FlagKind::Triggered => "triggered",
            FlagKind::Dismissed => "dismissed",
            FlagKind::Accepted => "accepted",
        }
    }
}

pub fn flag_key(prompt: &str, kind: FlagKind) -> String {
    format!("{prompt}-{}", kind.suffix())
}

/// Key-value store holding flag timestamps.
pub trait FlagStore: Send {
    fn get(&self, key: &str) -> Result<Option<DateTime<Utc>>, StorageError>;

    fn set(&mut self, key: &str, at: DateTime<Utc>) -> Result<(), StorageError>;

    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// Session-only store. Used when nothing should outlive the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryFlagStore {
    flags: BTreeMap<String, DateTime<Utc>>,
}

impl MemoryFlagStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_flag(mut self, key: impl Into<String>, at: DateTime<Utc>) -> Self {
        self.flags.insert(key.into(), at);
        self
    }
}

impl FlagStore for MemoryFlagStore {
    fn get(&self, key: &str) -> Result<Option<DateTime<Utc>>, StorageError> {
        Ok(self.flags.get(key).copied())
    }

    fn set(&mut self, key: &str, at: DateTime<Utc>) -> Result<(), StorageError> {
        self.flags.insert(key.to_string(), at);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.flags.remove(key);
        Ok(())
    }
}

/// JSON object of key -> RFC 3339 timestamp, rewritten on every change.
#[derive(Debug, Clone)]
pub struct JsonFileFlagStore {
    path: PathBuf,
}

impl JsonFileFlagStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `flags.json` in the data directory.
    pub fn open_default() -> Result<Self, crate::error::ConfigError> {
        Ok(Self::new(super::data_dir()?.join("flags.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load_all(&self) -> Result<BTreeMap<String, DateTime<Utc>>, StorageError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(StorageError::ReadFailed {
                    path: self.path.clone(),
                    message: e.to_string(),
                })
            }
        };
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        let raw: BTreeMap<String, serde_json::Value> =
            serde_json::from_str(&content).map_err(|e| StorageError::ReadFailed {
                path: self.path.clone(),
                message: e.to_string(),
            })?;
        raw.into_iter()
            .map(|(key, value)| {
                let at = value
                    .as_str()
                    .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                    .map(|at| at.with_timezone(&Utc));
                match at {
                    Some(at) => Ok((key, at)),
                    None => Err(StorageError::Corrupt {
                        key,
                        value: value.to_string(),
                    }),
                }
            })
            .collect()
    }

    fn write_all(&self, flags: &BTreeMap<String, DateTime<Utc>>) -> Result<(), StorageError> {
        let write_failed = |message: String| StorageError::WriteFailed {
            path: self.path.clone(),
            message,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| write_failed(e.to_string()))?;
        }
        let content = serde_json::to_string_pretty(flags).map_err(|e| write_failed(e.to_string()))?;
        std::fs::write(&self.path, content).map_err(|e| write_failed(e.to_string()))
    }
}

impl FlagStore for JsonFileFlagStore {
    fn get(&self, key: &str) -> Result<Option<DateTime<Utc>>, StorageError> {
        Ok(self.load_all()?.get(key).copied())
    }

    fn set(&mut self, key: &str, at: DateTime<Utc>) -> Result<(), StorageError> {
        let mut flags = self.load_all()?;
        flags.insert(key.to_string(), at);
        self.write_all(&flags)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        let mut flags = self.load_all()?;
        if flags.remove(key).is_some() {
            self.write_all(&flags)?;
        }
        Ok(())
    }
}

/// Flags of one prompt, as read at scheduler construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedFlags {
    pub triggered_at: Option<DateTime<Utc>>,
    pub dismissed_at: Option<DateTime<Utc>>,
    pub accepted_at: Option<DateTime<Utc>>,
}

impl PersistedFlags {
    pub fn triggered(&self) -> bool {
        self.triggered_at.is_some()
    }

    pub fn dismissed(&self) -> bool {
        self.dismissed_at.is_some()
    }

    pub fn accepted(&self) -> bool {
        self.accepted_at.is_some()
    }

    /// The first flag that keeps a scheduler from running, if any.
    pub fn suppressing_flag(&self) -> Option<FlagKind> {
        if self.dismissed() {
            Some(FlagKind::Dismissed)
        } else if self.accepted() {
            Some(FlagKind::Accepted)
        } else if self.triggered() {
            Some(FlagKind::Triggered)
        } else {
            None
        }
    }
}

/// Prompt-scoped view of a [`FlagStore`] with the swallow-errors policy.
pub struct PersistenceGate {
    prompt: String,
    store: Box<dyn FlagStore>,
}

impl PersistenceGate {
    pub fn new(prompt: impl Into<String>, store: Box<dyn FlagStore>) -> Self {
        Self {
            prompt: prompt.into(),
            store,
        }
    }

    /// In-memory gate with no flags set.
    pub fn in_memory(prompt: impl Into<String>) -> Self {
        Self::new(prompt, Box::new(MemoryFlagStore::new()))
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Read every flag. A failing read counts as "absent".
    pub fn read(&self) -> PersistedFlags {
        PersistedFlags {
            triggered_at: self.read_one(FlagKind::Triggered),
            dismissed_at: self.read_one(FlagKind::Dismissed),
            accepted_at: self.read_one(FlagKind::Accepted),
        }
    }

    fn read_one(&self, kind: FlagKind) -> Option<DateTime<Utc>> {
        let key = flag_key(&self.prompt, kind);
        match self.store.get(&key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "flag read failed, treating as absent");
                None
            }
        }
    }

    /// Best-effort write. Returns whether the store accepted it.
    pub fn record(&mut self, kind: FlagKind, at: DateTime<Utc>) -> bool {
        let key = flag_key(&self.prompt, kind);
        match self.store.set(&key, at) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "flag write failed, continuing in memory");
                false
            }
        }
    }

    /// Remove every flag of this prompt. Errors propagate; this is an
    /// administrative action, not part of scheduling.
    pub fn clear(&mut self) -> Result<(), StorageError> {
        for kind in FlagKind::ALL {
            self.store.remove(&flag_key(&self.prompt, kind))?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for PersistenceGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceGate")
            .field("prompt", &self.prompt)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Store that fails every operation, like disabled browser storage.
    pub(crate) struct BrokenStore;

    impl FlagStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<DateTime<Utc>>, StorageError> {
            Err(StorageError::Unavailable("storage disabled".into()))
        }

        fn set(&mut self, _key: &str, _at: DateTime<Utc>) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("quota exceeded".into()))
        }

        fn remove(&mut self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("storage disabled".into()))
        }
    }

    #[test]
    fn keys_are_prompt_scoped() {
        assert_eq!(flag_key("star", FlagKind::Triggered), "star-triggered");
        assert_eq!(flag_key("sponsor", FlagKind::Dismissed), "sponsor-dismissed");
    }

    #[test]
    fn gate_reads_what_it_records() {
        let mut gate = PersistenceGate::in_memory("star");
        assert_eq!(gate.read().suppressing_flag(), None);
        let at = Utc::now();
        assert!(gate.record(FlagKind::Dismissed, at));
        let flags = gate.read();
        assert_eq!(flags.dismissed_at, Some(at));
        assert_eq!(flags.suppressing_flag(), Some(FlagKind::Dismissed));
        gate.clear().unwrap();
        assert_eq!(gate.read(), PersistedFlags::default());
    }

    #[test]
    fn prompts_do_not_see_each_other() {
        let store = MemoryFlagStore::new().with_flag("star-triggered", Utc::now());
        let gate = PersistenceGate::new("sponsor", Box::new(store));
        assert!(!gate.read().triggered());
    }

    #[test]
    fn broken_store_degrades_gracefully() {
        let mut gate = PersistenceGate::new("star", Box::new(BrokenStore));
        assert_eq!(gate.read(), PersistedFlags::default());
        assert!(!gate.record(FlagKind::Triggered, Utc::now()));
        assert!(gate.clear().is_err());
    }

    #[test]
    fn json_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("flags.json");
        let at = Utc::now();

        let mut store = JsonFileFlagStore::new(&path);
        assert_eq!(store.get("star-dismissed").unwrap(), None);
        store.set("star-dismissed", at).unwrap();

        let reopened = JsonFileFlagStore::new(&path);
        assert_eq!(reopened.get("star-dismissed").unwrap(), Some(at));
    }

    #[test]
    fn json_store_reports_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flags.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = JsonFileFlagStore::new(&path);
        assert!(matches!(
            store.get("star-triggered"),
            Err(StorageError::ReadFailed { .. })
        ));
    }

    #[test]
    fn json_store_names_corrupt_flag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flags.json");
        std::fs::write(&path, r#"{"star-dismissed": "yes"}"#).unwrap();
        let store = JsonFileFlagStore::new(&path);

        let err = store.get("star-dismissed").unwrap_err();
        assert!(matches!(&err, StorageError::Corrupt { key, .. } if key == "star-dismissed"));
        assert_eq!(err.to_string(), r#"Corrupt value for flag 'star-dismissed': "yes""#);

        let gate = PersistenceGate::new("star", Box::new(store));
        assert!(!gate.read().dismissed());
    }
}
