//! # Nudge Core Library
//!
//! This library decides *when* to show an engagement prompt (star the
//! repository, sponsor the project, install the app) based on how the user
//! actually interacts with the host application. Presentation is left to
//! the caller; the core only emits a single trigger per session.
//!
//! ## Architecture
//!
//! - **Engagement**: throttling, quality classification, velocity, score
//!   accumulation and inactivity decay. Pure and synchronous, driven by
//!   explicit millisecond timestamps
//! - **Scheduler**: a tick-driven state machine per prompt, plus an async
//!   tokio driver that supplies the timers
//! - **Storage**: persisted prompt flags and TOML-based configuration
//!
//! ## Key Components
//!
//! - [`NudgeScheduler`]: One-shot engagement gate for a prompt
//! - [`spawn_scheduler`]: Runs a scheduler on a tokio task
//! - [`PersistenceGate`]: Cross-session flags that suppress a prompt
//! - [`Config`]: Application configuration management

pub mod engagement;
pub mod scheduler;
pub mod storage;
pub mod prompt;
pub mod events;
pub mod error;

pub use engagement::{
    EngagementMetrics, EngagementState, InteractionKind, QualityAction, ThresholdRule, Trigger,
};
pub use scheduler::{
    spawn_scheduler, NudgeScheduler, PresentationSink, SchedulerConfig, SchedulerHandle,
    SchedulerInput, SchedulerState, ScoringConfig,
};
pub use storage::{Config, FlagStore, JsonFileFlagStore, MemoryFlagStore, PersistenceGate};
pub use prompt::{PromptKind, PromptOutcome};
pub use events::Event;
pub use error::{ConfigError, CoreError, StorageError, ValidationError};
