//! End-to-end scheduling scenarios on the tick engine.
//!
//! Every test drives `NudgeScheduler` with explicit timestamps, the same way
//! the async driver does, so timing is exact.

use nudge_core::engagement::{EngagementState, InteractionKind, QualityAction, ThresholdRule};
use nudge_core::events::{timestamp, Event};
use nudge_core::scheduler::{NudgeScheduler, SchedulerConfig, SchedulerState, ScoringConfig};
use nudge_core::storage::{JsonFileFlagStore, MemoryFlagStore, PersistenceGate};
use nudge_core::{PromptKind, PromptOutcome};

const T0: u64 = 1_700_000_000_000;

fn never_fires() -> ThresholdRule {
    ThresholdRule::new("never", 0, 1e9)
}

fn start(rule: ThresholdRule, gate: PersistenceGate) -> NudgeScheduler {
    let config = SchedulerConfig::new(ScoringConfig::default(), vec![rule]);
    let mut scheduler = NudgeScheduler::new("star", config, gate).unwrap();
    scheduler.start(T0);
    scheduler
}

#[test]
fn test_throttled_click_burst() {
    let mut scheduler = start(never_fires(), PersistenceGate::in_memory("star"));

    let accepted: Vec<u64> = [0, 50, 100, 150, 200]
        .into_iter()
        .filter(|offset| {
            scheduler
                .record_interaction(InteractionKind::Click, T0 + offset)
                .is_some()
        })
        .collect();

    assert_eq!(accepted, vec![0, 200]);
    assert_eq!(scheduler.engagement().interaction_count(), 2);
}

#[test]
fn test_active_user_reaches_high_activity_rule() {
    let rule = ThresholdRule::new("highActivity", 20, 12.0).requiring_interaction();
    let mut scheduler = start(rule, PersistenceGate::in_memory("star"));

    for offset in [0, 400, 800, 1_200, 1_600, 2_000] {
        assert!(scheduler
            .record_interaction(InteractionKind::Click, T0 + offset)
            .is_some());
    }
    // Three plain clicks, then three at the brisk pace.
    assert!((scheduler.engagement().score() - 16.5).abs() < 1e-9);
    assert_eq!(scheduler.engagement().quality_count(), 3);

    for second in 1..20 {
        assert!(scheduler.tick(T0 + second * 1_000).is_empty(), "fired at {second}s");
    }

    let event = scheduler.evaluate(T0 + 21_000).expect("rule should match at 21s");
    let trigger = event.trigger().unwrap();
    assert_eq!(trigger.rule, "highActivity");
    assert_eq!(trigger.elapsed_secs, 21);
    assert!(trigger.weighted.value >= 12.0);
    assert_eq!(scheduler.state(), SchedulerState::Fired);
}

#[test]
fn test_rapid_clicks_earn_burst_multiplier() {
    let mut scheduler = start(never_fires(), PersistenceGate::in_memory("star"));

    let mut last = None;
    for offset in [0, 300, 600, 900, 1_200, 1_500] {
        last = scheduler.record_interaction(InteractionKind::Click, T0 + offset);
        assert!(last.is_some());
    }
    // Five prior clicks within 1.5 s: 2.5 × 1.5.
    match last {
        Some(Event::InteractionAccepted { delta, score, .. }) => {
            assert!((delta - 3.75).abs() < 1e-9);
            assert!((score - 17.25).abs() < 1e-9);
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert!((scheduler.engagement().score() - 17.25).abs() < 1e-9);
}

#[test]
fn test_idle_user_decays_every_timeout() {
    let mut scheduler = start(never_fires(), PersistenceGate::in_memory("star"));
    scheduler.record_interaction(InteractionKind::Click, T0);
    let s0 = scheduler.engagement().score();

    assert!(scheduler.tick(T0 + 29_999).is_empty());
    for n in 1..=10 {
        let events = scheduler.tick(T0 + n * 30_000);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Event::DecayApplied { .. }));
        let expected = s0 * 0.95_f64.powi(n as i32);
        assert!((scheduler.engagement().score() - expected).abs() < 1e-9);
    }
}

#[test]
fn test_late_tick_catches_up_on_missed_decay() {
    let mut scheduler = start(never_fires(), PersistenceGate::in_memory("star"));
    scheduler.record_interaction(InteractionKind::Click, T0);

    let events = scheduler.run_decay(T0 + 5 * 30_000);
    assert_eq!(events.len(), 5);
    assert!((scheduler.engagement().score() - 2.5 * 0.95_f64.powi(5)).abs() < 1e-9);
    assert_eq!(scheduler.next_decay_ms(), Some(T0 + 6 * 30_000));
}

#[test]
fn test_new_interaction_restarts_countdown() {
    let mut scheduler = start(never_fires(), PersistenceGate::in_memory("star"));
    scheduler.record_interaction(InteractionKind::Click, T0);
    scheduler.record_interaction(InteractionKind::Keydown, T0 + 20_000);

    assert!(scheduler.run_decay(T0 + 30_000).is_empty());
    assert_eq!(scheduler.run_decay(T0 + 50_000).len(), 1);
}

#[test]
fn test_dismissed_prompt_stays_quiet() {
    let store = MemoryFlagStore::new().with_flag("star-dismissed", timestamp(T0 - 86_400_000));
    let mut scheduler = start(
        ThresholdRule::new("any", 0, 0.0),
        PersistenceGate::new("star", Box::new(store)),
    );

    assert_eq!(scheduler.state(), SchedulerState::Suppressed);
    assert!(scheduler.record_interaction(InteractionKind::Click, T0).is_none());
    assert_eq!(scheduler.next_decay_ms(), None);
    for minute in 0..10 {
        assert!(scheduler.tick(T0 + minute * 60_000).is_empty());
    }
    assert!(!scheduler.has_fired());
}

#[test]
fn test_stop_before_match_prevents_trigger() {
    let mut scheduler = start(
        ThresholdRule::new("standard", 45, 5.0).requiring_interaction(),
        PersistenceGate::in_memory("star"),
    );
    scheduler.record_interaction(InteractionKind::Click, T0);
    scheduler.record_quality(QualityAction::SortingStart, T0 + 1_000);

    assert!(matches!(
        scheduler.stop(T0 + 10_000),
        Some(Event::SchedulerStopped { fired: false, .. })
    ));
    assert!(scheduler.tick(T0 + 3_600_000).is_empty());
    assert!(!scheduler.has_fired());
}

#[test]
fn test_trigger_is_remembered_across_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flags.json");

    let mut first = start(
        ThresholdRule::new("any", 1, 0.0),
        PersistenceGate::new("star", Box::new(JsonFileFlagStore::new(&path))),
    );
    assert_eq!(first.tick(T0 + 1_000).len(), 1);
    first.resolve(PromptOutcome::Later, T0 + 2_000);
    first.stop(T0 + 3_000);

    let second = start(
        ThresholdRule::new("any", 1, 0.0),
        PersistenceGate::new("star", Box::new(JsonFileFlagStore::new(&path))),
    );
    assert_eq!(second.state(), SchedulerState::Suppressed);

    let other_prompt = NudgeScheduler::new(
        "sponsor",
        SchedulerConfig::for_prompt(PromptKind::Sponsor),
        PersistenceGate::new("sponsor", Box::new(JsonFileFlagStore::new(&path))),
    )
    .unwrap();
    assert_eq!(other_prompt.state(), SchedulerState::Idle);
}

#[test]
fn test_pwa_prompt_fires_after_three_seconds() {
    let mut scheduler = NudgeScheduler::new(
        "pwa",
        SchedulerConfig::for_prompt(PromptKind::PwaInstall),
        PersistenceGate::in_memory("pwa"),
    )
    .unwrap();
    scheduler.start(T0);

    assert!(scheduler.tick(T0 + 2_000).is_empty());
    let events = scheduler.tick(T0 + 3_000);
    assert_eq!(events[0].trigger().map(|t| t.rule.as_str()), Some("delayed"));
}

#[test]
fn test_star_preset_requires_interaction() {
    let mut scheduler = NudgeScheduler::new(
        "star",
        SchedulerConfig::for_prompt(PromptKind::Star),
        PersistenceGate::in_memory("star"),
    )
    .unwrap();
    scheduler.start(T0);

    // Time bonus alone reaches 5 after five minutes, but nobody clicked.
    for second in 1..=600 {
        assert!(scheduler.tick(T0 + second * 1_000).is_empty());
    }
    assert_eq!(scheduler.engagement().score(), EngagementState::new().score());
}
