//! Presentation side of the scheduler.

use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::engagement::Trigger;
use crate::events::Event;

/// Receives the trigger (and, optionally, every other event).
///
/// Implemented for any `FnMut(&Trigger)` closure.
pub trait PresentationSink: Send {
    fn on_trigger(&mut self, trigger: &Trigger);

    fn on_event(&mut self, _event: &Event) {}
}

impl<F> PresentationSink for F
where
    F: FnMut(&Trigger) + Send,
{
    fn on_trigger(&mut self, trigger: &Trigger) {
        self(trigger)
    }
}

/// Sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl PresentationSink for NullSink {
    fn on_trigger(&mut self, _trigger: &Trigger) {}
}

/// Hand `event` to `sink`. A panicking sink is logged and swallowed so the
/// scheduler state stays consistent.
pub fn dispatch(sink: &mut dyn PresentationSink, event: &Event) {
    let result = catch_unwind(AssertUnwindSafe(|| {
        sink.on_event(event);
        if let Some(trigger) = event.trigger() {
            sink.on_trigger(trigger);
        }
    }));
    if result.is_err() {
        tracing::error!(prompt = %event.prompt(), "presentation sink panicked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engagement::WeightedScore;
    use crate::events::timestamp;

    fn triggered() -> Event {
        Event::Triggered {
            prompt: "star".into(),
            trigger: Trigger {
                rule: "standard".into(),
                elapsed_secs: 45,
                weighted: WeightedScore {
                    value: 6.0,
                    base: 5.0,
                    quality_multiplier: 1.0,
                    velocity: 1.0,
                    time_bonus: 1.0,
                },
                at_ms: 45_000,
            },
            at: timestamp(45_000),
        }
    }

    #[test]
    fn closure_receives_trigger() {
        let mut seen = Vec::new();
        let mut sink = |trigger: &Trigger| seen.push(trigger.rule.clone());
        dispatch(&mut sink, &triggered());
        assert_eq!(seen, vec!["standard".to_string()]);
    }

    struct PanickingSink;

    impl PresentationSink for PanickingSink {
        fn on_trigger(&mut self, _trigger: &Trigger) {
            panic!("render failed");
        }
    }

    #[test]
    fn panicking_sink_is_contained() {
        dispatch(&mut PanickingSink, &triggered());
    }
}
