//! Per-kind throttle gate.
//!
//! Bounds the accepted event rate for each interaction kind regardless of
//! how bursty the input is (pointer-move floods in particular).

use std::collections::{BTreeMap, HashMap};

use super::quality::InteractionKind;

/// Window applied to kinds with no configured entry.
pub const DEFAULT_THROTTLE_MS: u64 = 200;

pub fn default_throttle_ms() -> BTreeMap<String, u64> {
    BTreeMap::from([
        ("click".to_string(), 200),
        ("scroll".to_string(), 100),
        ("keydown".to_string(), 150),
        ("pointermove".to_string(), 500),
    ])
}

/// Drops events arriving faster than their kind's minimum interval.
///
/// Owned by one scheduler instance; two prompts never share a gate.
#[derive(Debug, Clone)]
pub struct ThrottleGate {
    windows_ms: BTreeMap<String, u64>,
    fallback_ms: u64,
    last_accepted: HashMap<InteractionKind, u64>,
}

impl ThrottleGate {
    pub fn new(windows_ms: BTreeMap<String, u64>, fallback_ms: u64) -> Self {
        Self {
            windows_ms,
            fallback_ms,
            last_accepted: HashMap::new(),
        }
    }

    pub fn window_ms(&self, kind: &InteractionKind) -> u64 {
        self.windows_ms
            .get(&kind.key())
            .copied()
            .unwrap_or(self.fallback_ms)
    }

    /// Returns `true` and records `now_ms` when the event may pass.
    /// A dropped event leaves the gate untouched.
    pub fn accept(&mut self, kind: &InteractionKind, now_ms: u64) -> bool {
        let window = self.window_ms(kind);
        if let Some(&last) = self.last_accepted.get(kind) {
            if now_ms.saturating_sub(last) < window {
                return false;
            }
        }
        self.last_accepted.insert(kind.clone(), now_ms);
        true
    }

    pub fn last_accepted(&self, kind: &InteractionKind) -> Option<u64> {
        self.last_accepted.get(kind).copied()
    }

    pub fn reset(&mut self) {
        self.last_accepted.clear();
    }
}

impl Default for ThrottleGate {
    fn default() -> Self {
        Self::new(default_throttle_ms(), DEFAULT_THROTTLE_MS)
    }
}
