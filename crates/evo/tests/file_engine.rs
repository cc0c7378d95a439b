use evo::domain::config::{CompressionKind, EngineConfig, ThresholdConfig};
use evo::domain::constants::SNAPSHOT_FILE;
use evo::events::EventBus;
use evo::kernel::clock::ManualClock;
use evo::{StopReport, file_engine};
use tempfile::TempDir;

fn config(dir: &TempDir, compression: CompressionKind) -> EngineConfig {
    let mut config = EngineConfig::default();
    config.storage.data_dir = dir.path().join("data");
    config.storage.compression = compression;
    config.thresholds = vec![ThresholdConfig { domain: "power".into(), value: 150.0 }];
    config
}

#[tokio::test]
async fn test_profile_survives_restart() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir, CompressionKind::Lz4);
    let clock = ManualClock::new(0);

    let mut engine = file_engine(&config, clock.clone(), EventBus::new()).await.unwrap();
    assert_eq!(engine.store().storage().compression(), evo::features::persistence::Compression::Lz4);
    engine.start().await.unwrap();
    clock.advance_secs(2.0);
    engine.tick().unwrap();
    assert_eq!(engine.stop().await, StopReport::Flushed);
    let saved = engine.view().unwrap();
    assert!(dir.path().join("data").join(SNAPSHOT_FILE).is_file());

    let mut restarted = file_engine(&config, clock.clone(), EventBus::new()).await.unwrap();
    let result = restarted.start().await.unwrap();

    assert!(!result.applied);
    let restored = restarted.view().unwrap();
    assert_eq!(restored.domains, saved.domains);
    assert_eq!(restored.last_seen, 2_000);
}

#[tokio::test]
async fn test_configured_thresholds_reach_the_notifier() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir, CompressionKind::None);
    let clock = ManualClock::new(0);

    let mut engine = file_engine(&config, clock.clone(), EventBus::new()).await.unwrap();
    engine.start().await.unwrap();
    engine.stop().await;

    // 100 * 1.0001^t crosses 150 after roughly 4055 seconds.
    clock.advance_secs(5_000.0);
    let bus = EventBus::new();
    let mut milestones = bus.subscribe::<evo::domain::events::MilestoneEvent>().unwrap();
    let mut engine = file_engine(&config, clock, bus).await.unwrap();
    engine.start().await.unwrap();

    let event = milestones.try_recv().unwrap();
    assert_eq!(
        *event,
        evo::domain::events::MilestoneEvent::Threshold { domain: "power".into(), value: 150.0 }
    );
}
