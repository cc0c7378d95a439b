use evo_domain::events::{EngineNotice, MilestoneEvent};
use evo_kernel::clock::ManualClock;
use evo_milestones::Threshold;
use evo_persistence::MemoryStore;
use evo_scheduler::*;
use std::time::Duration;
use tokio::time::sleep;

async fn spawn(store: &MemoryStore, clock: &ManualClock) -> EngineHandle {
    SchedulerBuilder::new()
        .store(store.clone())
        .clock(clock.clone())
        .thresholds([Threshold { domain: "power".into(), value: 100.5 }])
        .build()
        .unwrap()
        .spawn()
        .await
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_ticks_follow_the_interval() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(0);
    let handle = spawn(&store, &clock).await;
    assert_eq!(handle.current_profile().last_seen, 0);

    clock.advance_secs(1.0);
    sleep(Duration::from_millis(1_500)).await;
    assert_eq!(handle.current_profile().last_seen, 1_000);

    clock.advance_secs(1.0);
    sleep(Duration::from_secs(1)).await;
    assert_eq!(handle.current_profile().last_seen, 2_000);
    assert!(handle.current_profile().value_of("power") > 100.0);

    assert_eq!(handle.stop().await, StopReport::Flushed);
}

#[tokio::test(start_paused = true)]
async fn test_watch_profile_sees_each_tick() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(0);
    let handle = spawn(&store, &clock).await;
    let mut profile = handle.watch_profile();

    clock.advance_secs(1.0);
    profile.changed().await.unwrap();
    assert_eq!(profile.borrow_and_update().last_seen, 1_000);

    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_periodic_save() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(0);
    let handle = spawn(&store, &clock).await;
    assert_eq!(store.save_count(), 1);

    sleep(Duration::from_secs(31)).await;
    assert_eq!(store.save_count(), 2);

    sleep(Duration::from_secs(30)).await;
    assert_eq!(store.save_count(), 3);

    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_failed_periodic_save_is_retried() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(0);
    let handle = spawn(&store, &clock).await;
    let mut notices = handle.subscribe_notices().unwrap();

    store.fail_writes(true);
    sleep(Duration::from_secs(31)).await;
    assert_eq!(store.save_count(), 1);
    assert!(notices.try_recv().is_ok());
    assert_eq!(handle.current_profile().durability, evo_domain::view::Durability::Degraded);

    store.fail_writes(false);
    sleep(Duration::from_secs(30)).await;
    assert_eq!(store.save_count(), 2);
    assert_eq!(handle.current_profile().durability, evo_domain::view::Durability::Durable);

    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_suspend_and_resume_through_the_handle() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(0);
    let handle = spawn(&store, &clock).await;
    let mut milestones = handle.subscribe_milestones().unwrap();

    handle.suspend().await.unwrap();
    assert!(matches!(handle.suspend().await, Err(SchedulerError::InvalidTransition { .. })));

    clock.advance_secs(120.0);
    sleep(Duration::from_secs(5)).await;
    assert_eq!(handle.current_profile().last_seen, 0, "no ticks while suspended");

    handle.resume().await.unwrap();
    assert_eq!(handle.current_profile().last_seen, 120_000);
    let event = milestones.try_recv().unwrap();
    assert_eq!(*event, MilestoneEvent::Threshold { domain: "power".into(), value: 100.5 });

    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_stop_is_idempotent_and_closes_the_engine() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(0);
    let handle = spawn(&store, &clock).await;
    let other = handle.clone();

    assert_eq!(handle.stop().await, StopReport::Flushed);
    assert_eq!(other.stop().await, StopReport::AlreadyStopped);
    assert_eq!(store.save_count(), 2);

    assert!(matches!(handle.resume().await, Err(SchedulerError::Closed { .. })));
    assert!(matches!(other.save().await, Err(SchedulerError::Closed { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_dropping_every_handle_flushes() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(0);
    let handle = spawn(&store, &clock).await;

    clock.advance_secs(4.0);
    drop(handle);
    sleep(Duration::from_millis(10)).await;

    assert_eq!(store.save_count(), 2);
    assert_eq!(store.snapshot().unwrap().last_seen, 4_000);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_every_handle_with_failing_store_still_exits() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(0);
    let handle = spawn(&store, &clock).await;
    let mut notices = handle.subscribe_notices().unwrap();

    store.fail_writes(true);
    clock.advance_secs(4.0);
    drop(handle);

    let mut failures = Vec::new();
    while let Ok(notice) = notices.recv().await {
        if let EngineNotice::PersistenceWriteFailure { message } = &*notice {
            failures.push(message.clone());
        }
    }

    // The channel closes once the loop has exited and released the bus.
    assert_eq!(failures.len(), 1);
    assert_eq!(store.save_count(), 1);
    assert_eq!(store.snapshot().unwrap().last_seen, 0);
}
