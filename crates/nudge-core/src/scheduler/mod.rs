mod config;
mod driver;
mod engine;
mod sink;

pub use config::{SchedulerConfig, ScoringConfig};
pub use driver::{spawn_scheduler, SchedulerHandle, SchedulerInput};
pub use engine::{NudgeScheduler, SchedulerState, FORCED_RULE};
pub use sink::{dispatch, NullSink, PresentationSink};
