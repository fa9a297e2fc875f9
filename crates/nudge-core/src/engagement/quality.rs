//! Interaction kinds and the quality classifier.
//!
//! Raw input (pointer, keyboard, scroll) is cheap and noisy; domain actions
//! such as starting a sort are deliberate and score several times higher.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Score used for any kind or action missing from the score tables.
pub const NEUTRAL_SCORE: f64 = 1.0;

const QUALITY_PREFIX: &str = "quality:";

/// A domain-meaningful action reported by application logic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QualityAction {
    AlgorithmSelect,
    SortingStart,
    SortingPause,
    ArraySizeChange,
    SpeedChange,
    TabSwitch,
    /// Any action the host reports that has no dedicated variant.
    Other(String),
}

impl QualityAction {
    pub fn as_str(&self) -> &str {
        match self {
            QualityAction::AlgorithmSelect => "algorithmSelect",
            QualityAction::SortingStart => "sortingStart",
            QualityAction::SortingPause => "sortingPause",
            QualityAction::ArraySizeChange => "arraySizeChange",
            QualityAction::SpeedChange => "speedChange",
            QualityAction::TabSwitch => "tabSwitch",
            QualityAction::Other(name) => name,
        }
    }
}

impl From<String> for QualityAction {
    fn from(value: String) -> Self {
        match value.as_str() {
            "algorithmSelect" => QualityAction::AlgorithmSelect,
            "sortingStart" => QualityAction::SortingStart,
            "sortingPause" => QualityAction::SortingPause,
            "arraySizeChange" => QualityAction::ArraySizeChange,
            "speedChange" => QualityAction::SpeedChange,
            "tabSwitch" => QualityAction::TabSwitch,
            _ => QualityAction::Other(value),
        }
    }
}

impl From<&str> for QualityAction {
    fn from(value: &str) -> Self {
        QualityAction::from(value.to_string())
    }
}

impl From<QualityAction> for String {
    fn from(value: QualityAction) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for QualityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type of an interaction event.
///
/// Parsing never fails: anything unrecognised becomes [`InteractionKind::Other`]
/// and is scored neutrally rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InteractionKind {
    Click,
    Scroll,
    Keydown,
    PointerMove,
    Quality(QualityAction),
    Other(String),
}

impl InteractionKind {
    /// Key used in the score and throttle tables.
    pub fn key(&self) -> String {
        match self {
            InteractionKind::Click => "click".to_string(),
            InteractionKind::Scroll => "scroll".to_string(),
            InteractionKind::Keydown => "keydown".to_string(),
            InteractionKind::PointerMove => "pointermove".to_string(),
            InteractionKind::Quality(action) => format!("{QUALITY_PREFIX}{action}"),
            InteractionKind::Other(name) => name.clone(),
        }
    }

    pub fn quality_action(&self) -> Option<&QualityAction> {
        match self {
            InteractionKind::Quality(action) => Some(action),
            _ => None,
        }
    }

    pub fn is_quality(&self) -> bool {
        matches!(self, InteractionKind::Quality(_))
    }
}

impl From<String> for InteractionKind {
    fn from(value: String) -> Self {
        if let Some(action) = value.strip_prefix(QUALITY_PREFIX) {
            return InteractionKind::Quality(QualityAction::from(action));
        }
        match value.as_str() {
            "click" => InteractionKind::Click,
            "scroll" => InteractionKind::Scroll,
            "keydown" => InteractionKind::Keydown,
            // Older hosts report pointer movement as mousemove.
            "pointermove" | "mousemove" => InteractionKind::PointerMove,
            _ => InteractionKind::Other(value),
        }
    }
}

impl From<&str> for InteractionKind {
    fn from(value: &str) -> Self {
        InteractionKind::from(value.to_string())
    }
}

impl From<InteractionKind> for String {
    fn from(value: InteractionKind) -> Self {
        value.key()
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

pub fn default_engagement_scores() -> BTreeMap<String, f64> {
    BTreeMap::from([
        ("click".to_string(), 2.5),
        ("keydown".to_string(), 1.5),
        ("scroll".to_string(), 0.8),
        ("pointermove".to_string(), 0.2),
    ])
}

pub fn default_quality_scores() -> BTreeMap<String, f64> {
    BTreeMap::from([
        ("algorithmSelect".to_string(), 5.0),
        ("sortingStart".to_string(), 6.0),
        ("sortingPause".to_string(), 4.0),
        ("arraySizeChange".to_string(), 3.0),
        ("speedChange".to_string(), 3.0),
        ("tabSwitch".to_string(), 2.0),
    ])
}

/// Maps an interaction to its base score.
#[derive(Debug, Clone)]
pub struct QualityClassifier {
    engagement_scores: BTreeMap<String, f64>,
    quality_scores: BTreeMap<String, f64>,
}

impl QualityClassifier {
    pub fn new(
        engagement_scores: BTreeMap<String, f64>,
        quality_scores: BTreeMap<String, f64>,
    ) -> Self {
        Self {
            engagement_scores,
            quality_scores,
        }
    }

    /// Base score for a raw kind, optionally qualified by a domain action.
    ///
    /// Lookup order: quality score, then the raw kind's score, then
    /// [`NEUTRAL_SCORE`].
    pub fn score_with(&self, kind: &InteractionKind, quality: Option<&QualityAction>) -> f64 {
        quality
            .and_then(|action| self.quality_scores.get(action.as_str()))
            .or_else(|| self.engagement_scores.get(&kind.key()))
            .copied()
            .unwrap_or(NEUTRAL_SCORE)
    }

    /// Base score for a recorded kind. Quality notifications originate from
    /// clicks in the host UI, so a missing quality score falls back to the
    /// click score.
    pub fn score(&self, kind: &InteractionKind) -> f64 {
        match kind {
            InteractionKind::Quality(action) => {
                self.score_with(&InteractionKind::Click, Some(action))
            }
            raw => self.score_with(raw, None),
        }
    }
}

impl Default for QualityClassifier {
    fn default() -> Self {
        Self::new(default_engagement_scores(), default_quality_scores())
    }
}
