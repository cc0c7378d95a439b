use evo_domain::events::{EngineNotice, MilestoneEvent};
use evo_domain::view::{Durability, ProfileView};
use evo_kernel::clock::ManualClock;
use evo_milestones::Threshold;
use evo_domain::snapshot::Snapshot;
use evo_persistence::{MemoryStore, PersistenceError, PersistenceStore};
use evo_progression::ProgressionProfile;
use evo_progression::growth::apply_growth;
use evo_scheduler::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

fn drain<T: Clone>(rx: &mut broadcast::Receiver<Arc<T>>) -> Vec<T> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push((*event).clone());
    }
    events
}

fn scheduler(store: &MemoryStore, clock: &ManualClock) -> TickScheduler<MemoryStore> {
    SchedulerBuilder::new()
        .store(store.clone())
        .clock(clock.clone())
        .thresholds([Threshold { domain: "power".into(), value: 100.5 }])
        .build()
        .unwrap()
}

fn power(scheduler: &TickScheduler<MemoryStore>) -> f64 {
    scheduler.view().unwrap().value_of("power")
}

#[tokio::test]
async fn test_start_with_empty_store_creates_and_saves() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(1_000);
    let mut scheduler = scheduler(&store, &clock);
    let mut notices = scheduler.bus().subscribe::<EngineNotice>().unwrap();

    let result = scheduler.start().await.unwrap();

    assert!(!result.applied);
    assert_eq!(scheduler.state(), EngineState::Running);
    assert_eq!(store.save_count(), 1);
    assert_eq!(store.snapshot().unwrap().birth_time, 1_000);
    assert_eq!(
        drain(&mut notices),
        vec![EngineNotice::Reconciled { elapsed_seconds: 0.0, applied: false }]
    );
}

#[tokio::test]
async fn test_start_with_corrupt_store_falls_back_to_fresh_profile() {
    let store = MemoryStore::new();
    store.put_raw(b"not a snapshot at all, just noise".to_vec());
    let clock = ManualClock::new(5_000);
    let mut scheduler = scheduler(&store, &clock);
    let mut notices = scheduler.bus().subscribe::<EngineNotice>().unwrap();

    scheduler.start().await.unwrap();

    assert!(drain(&mut notices).contains(&EngineNotice::PersistenceCorrupt));
    assert_eq!(scheduler.profile().unwrap().level(), 1);
    assert!((power(&scheduler) - 100.0).abs() < f64::EPSILON);
    // The noise has been replaced by a readable snapshot.
    assert_eq!(store.snapshot().unwrap().last_seen, 5_000);
}

/// Reads fail as if the disk were unreachable; writes go through to the inner store.
#[derive(Debug, Clone)]
struct UnreadableStore(MemoryStore);

impl PersistenceStore for UnreadableStore {
    async fn try_load(&self) -> Result<Option<Snapshot>, PersistenceError> {
        Err(PersistenceError::Unavailable { message: "disk unreachable".into(), context: None })
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<(), PersistenceError> {
        self.0.save(snapshot).await
    }
}

#[tokio::test]
async fn test_start_with_unreadable_store_keeps_the_saved_profile() {
    let mut stored = ProgressionProfile::new(1_699_990_000_000).to_snapshot();
    stored.experience = 17.5;
    let inner = MemoryStore::with_snapshot(&stored).unwrap();
    let before = inner.raw();
    let clock = ManualClock::new(1_700_000_000_000);
    let mut scheduler = SchedulerBuilder::new()
        .store(UnreadableStore(inner.clone()))
        .clock(clock)
        .build()
        .unwrap();
    let mut notices = scheduler.bus().subscribe::<EngineNotice>().unwrap();

    let result = scheduler.start().await;

    assert!(matches!(result, Err(SchedulerError::Persistence { .. })));
    assert_eq!(scheduler.state(), EngineState::Idle);
    assert!(scheduler.profile().is_none());
    assert_eq!(inner.save_count(), 0);
    assert_eq!(inner.raw(), before);
    assert_eq!(inner.snapshot().unwrap().birth_time, 1_699_990_000_000);
    assert!(!drain(&mut notices).contains(&EngineNotice::PersistenceCorrupt));
}

#[tokio::test]
async fn test_start_reconciles_offline_hour_once() {
    let stored = ProgressionProfile::new(0).to_snapshot();
    let store = MemoryStore::with_snapshot(&stored).unwrap();
    let clock = ManualClock::new(3_600_000);
    let mut scheduler = scheduler(&store, &clock);
    let mut milestones = scheduler.bus().subscribe::<MilestoneEvent>().unwrap();

    let result = scheduler.start().await.unwrap();

    assert!(result.applied);
    assert!((result.elapsed_seconds - 3600.0).abs() < f64::EPSILON);
    assert_eq!(scheduler.profile().unwrap().last_seen(), 3_600_000);

    let expected = apply_growth(100.0, 1.0e-4, 3600.0).unwrap().value;
    assert!((power(&scheduler) - expected).abs() <= expected * 1e-12);

    assert_eq!(
        drain(&mut milestones),
        vec![MilestoneEvent::Threshold { domain: "power".into(), value: 100.5 }]
    );
    let saved = store.snapshot().unwrap();
    assert_eq!(saved.last_seen, 3_600_000);
}

#[tokio::test]
async fn test_tick_credits_measured_time() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(0);
    let mut scheduler = scheduler(&store, &clock);
    scheduler.start().await.unwrap();

    clock.advance_secs(2.0);
    let outcome = scheduler.tick().unwrap().unwrap();

    assert!((outcome.elapsed_seconds - 2.0).abs() < f64::EPSILON);
    assert_eq!(scheduler.profile().unwrap().last_seen(), 2_000);
    assert!(power(&scheduler) > 100.0);

    let published = scheduler.bus().latest::<ProfileView>().unwrap();
    assert_eq!(published.last_seen, 2_000);
}

#[tokio::test]
async fn test_tick_is_ignored_unless_running() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(0);
    let mut scheduler = scheduler(&store, &clock);

    assert!(scheduler.tick().unwrap().is_none());

    scheduler.start().await.unwrap();
    scheduler.suspend().await.unwrap();
    clock.advance_secs(10.0);

    assert!(scheduler.tick().unwrap().is_none());
    assert_eq!(scheduler.profile().unwrap().last_seen(), 0);
}

#[tokio::test]
async fn test_backwards_clock_grants_nothing_and_warns_once() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(10_000);
    let mut scheduler = scheduler(&store, &clock);
    scheduler.start().await.unwrap();
    let mut notices = scheduler.bus().subscribe::<EngineNotice>().unwrap();
    let before = scheduler.view().unwrap();

    clock.set(5_000);
    assert!(scheduler.tick().unwrap().is_none());
    assert!(scheduler.tick().unwrap().is_none());

    assert_eq!(drain(&mut notices), vec![EngineNotice::ClockSkewWarning { seconds: 5.0 }]);
    let after = scheduler.view().unwrap();
    assert_eq!(after.last_seen, 10_000);
    assert_eq!(after.domains, before.domains);

    // Once the clock catches up, growth resumes from the old `last_seen`.
    clock.set(11_000);
    let outcome = scheduler.tick().unwrap().unwrap();
    assert!((outcome.elapsed_seconds - 1.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_suspended_time_is_reconciled_on_resume() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(0);
    let mut scheduler = scheduler(&store, &clock);
    scheduler.start().await.unwrap();

    clock.advance_secs(3.0);
    scheduler.suspend().await.unwrap();
    assert_eq!(scheduler.state(), EngineState::Suspended);
    assert_eq!(store.save_count(), 2);
    assert_eq!(store.snapshot().unwrap().last_seen, 3_000);

    clock.advance_secs(600.0);
    let result = scheduler.resume().await.unwrap();

    assert!(result.applied);
    assert!((result.elapsed_seconds - 600.0).abs() < f64::EPSILON);
    assert_eq!(scheduler.state(), EngineState::Running);
    assert_eq!(scheduler.profile().unwrap().last_seen(), 603_000);
}

#[tokio::test]
async fn test_short_suspension_is_left_for_the_next_tick() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(0);
    let mut scheduler = scheduler(&store, &clock);
    scheduler.start().await.unwrap();
    scheduler.suspend().await.unwrap();

    clock.advance_secs(2.0);
    let result = scheduler.resume().await.unwrap();
    assert!(!result.applied);
    assert_eq!(scheduler.profile().unwrap().last_seen(), 0);

    let outcome = scheduler.tick().unwrap().unwrap();
    assert!((outcome.elapsed_seconds - 2.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_illegal_transitions_are_rejected() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(0);
    let mut scheduler = scheduler(&store, &clock);

    assert!(matches!(scheduler.suspend().await, Err(SchedulerError::InvalidTransition { .. })));
    assert!(matches!(scheduler.resume().await, Err(SchedulerError::InvalidTransition { .. })));

    scheduler.start().await.unwrap();
    assert!(matches!(scheduler.start().await, Err(SchedulerError::InvalidTransition { .. })));
    assert!(matches!(scheduler.resume().await, Err(SchedulerError::InvalidTransition { .. })));
    assert_eq!(scheduler.state(), EngineState::Running);
}

#[tokio::test]
async fn test_stop_flushes_exactly_once() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(0);
    let mut scheduler = scheduler(&store, &clock);
    scheduler.start().await.unwrap();

    clock.advance_secs(1.0);
    assert_eq!(scheduler.stop().await, StopReport::Flushed);
    assert_eq!(store.save_count(), 2);
    assert_eq!(store.snapshot().unwrap().last_seen, 1_000);

    assert_eq!(scheduler.stop().await, StopReport::AlreadyStopped);
    assert_eq!(store.save_count(), 2);
    assert!(matches!(scheduler.start().await, Err(SchedulerError::InvalidTransition { .. })));
}

#[tokio::test]
async fn test_stop_before_start_leaves_store_alone() {
    let stored = ProgressionProfile::new(0).to_snapshot();
    let store = MemoryStore::with_snapshot(&stored).unwrap();
    let clock = ManualClock::new(999_000);
    let mut scheduler = scheduler(&store, &clock);

    assert_eq!(scheduler.stop().await, StopReport::NotStarted);
    assert_eq!(store.save_count(), 0);
    assert_eq!(store.snapshot().unwrap(), stored);
}

#[tokio::test]
async fn test_failed_save_degrades_then_recovers() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(0);
    let mut scheduler = scheduler(&store, &clock);
    scheduler.start().await.unwrap();
    let mut notices = scheduler.bus().subscribe::<EngineNotice>().unwrap();

    store.fail_writes(true);
    let err = scheduler.save().await.unwrap_err();
    assert!(matches!(err, SchedulerError::Persistence { .. }));
    assert_eq!(scheduler.durability(), Durability::Degraded);
    assert_eq!(scheduler.bus().latest::<ProfileView>().unwrap().durability, Durability::Degraded);
    assert!(matches!(
        drain(&mut notices).as_slice(),
        [EngineNotice::PersistenceWriteFailure { .. }]
    ));

    // Ticking carries on while degraded.
    clock.advance_secs(1.0);
    assert!(scheduler.tick().unwrap().is_some());

    store.fail_writes(false);
    scheduler.save().await.unwrap();
    assert_eq!(scheduler.durability(), Durability::Durable);
    assert_eq!(store.snapshot().unwrap().last_seen, 1_000);
}

#[tokio::test]
async fn test_stop_reports_failed_flush() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(0);
    let mut scheduler = scheduler(&store, &clock);
    scheduler.start().await.unwrap();

    store.fail_writes(true);
    assert!(matches!(scheduler.stop().await, StopReport::FlushFailed { .. }));
    assert_eq!(scheduler.state(), EngineState::Stopped);
    assert_eq!(scheduler.stop().await, StopReport::AlreadyStopped);
}

#[test]
fn test_zero_interval_is_rejected() {
    let result = SchedulerBuilder::new().store(MemoryStore::new()).tick_interval(Duration::ZERO).build();
    assert!(matches!(result, Err(SchedulerError::InvalidConfiguration { .. })));

    let result = SchedulerBuilder::new().store(MemoryStore::new()).save_interval(Duration::ZERO).build();
    assert!(matches!(result, Err(SchedulerError::InvalidConfiguration { .. })));
}
