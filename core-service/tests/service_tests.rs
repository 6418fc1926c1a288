//! Integration tests for the core service façade
//!
//! These tests verify:
//! - Configuration checks at construction
//! - Players created by the service share its settings and event bus
//! - Statistics and overlay text derived from stored settings

use std::sync::Arc;

use bridge_desktop::MemoryBackend;
use bridge_traits::{
    ContentInfo, ManualClock, MediaSource, PlaybackSnapshot, StorageTier, SystemClock,
};
use core_playback::PlaybackSignal;
use core_runtime::events::{CoreEvent, SavingsEvent, WatchEvent};
use core_runtime::{CoreConfig, TrackerConfig, WritePolicy};
use core_service::{CoreError, CoreService};
use core_settings::WatchSession;
use mockall::mock;

mock! {
    pub Media {}

    impl MediaSource for Media {
        fn snapshot(&self) -> Option<PlaybackSnapshot>;
        fn current_content(&self) -> Option<ContentInfo>;
    }
}

const T0: i64 = 1_700_000_000_000;

fn service(clock: Arc<ManualClock>) -> CoreService {
    let config = CoreConfig::builder()
        .primary_store(Arc::new(MemoryBackend::native(StorageTier::Primary)))
        .secondary_store(Arc::new(MemoryBackend::native(StorageTier::Secondary)))
        .fallback_store(Arc::new(MemoryBackend::text(StorageTier::Fallback)))
        .clock(clock)
        .write_policy(WritePolicy::AwaitAll)
        .build()
        .unwrap();
    CoreService::new(config).unwrap()
}

#[test]
fn test_requires_a_storage_tier() {
    let config = CoreConfig {
        primary: None,
        secondary: None,
        fallback: None,
        clock: Arc::new(SystemClock),
        tracker: TrackerConfig::default(),
        write_policy: WritePolicy::AwaitPrimary,
        event_buffer_size: 16,
        redact_history: true,
    };

    let err = CoreService::new(config).err().unwrap();
    assert!(matches!(err, CoreError::CapabilityMissing { .. }));
}

#[test]
fn test_partial_tiers_accepted() {
    let config = CoreConfig::builder()
        .fallback_store(Arc::new(MemoryBackend::text(StorageTier::Fallback)))
        .build()
        .unwrap();
    let core = CoreService::new(config).unwrap();
    assert_eq!(core.available_tiers(), vec![StorageTier::Fallback]);
}

#[tokio::test(start_paused = true)]
async fn test_player_uses_service_settings_and_events() {
    let clock = Arc::new(ManualClock::from_millis(T0));
    let core = service(clock.clone());
    let mut events = core.subscribe();

    let mut media = MockMedia::new();
    let positions = Arc::new(std::sync::Mutex::new(0.0));
    let position = positions.clone();
    media
        .expect_snapshot()
        .returning(move || Some(PlaybackSnapshot::new(*position.lock().unwrap(), 600.0, 2.0)));
    media
        .expect_current_content()
        .times(1)
        .returning(|| Some(ContentInfo::new("abc123").with_channel("Channel")));

    let player = core.player(Arc::new(media));
    player.handle(PlaybackSignal::Play).await.unwrap();

    *positions.lock().unwrap() = 6.0;
    clock.advance_millis(45_000);
    player.handle(PlaybackSignal::Ended).await.unwrap();

    let settings = core.settings();
    assert_eq!(settings.global_time_saved().await, 3.0);
    assert_eq!(settings.watch_sessions().await.len(), 1);

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert!(seen
        .iter()
        .any(|e| matches!(e, CoreEvent::Savings(SavingsEvent::Flushed { .. }))));
    assert!(seen
        .iter()
        .any(|e| matches!(e, CoreEvent::Watch(WatchEvent::SessionCommitted { .. }))));
}

#[tokio::test(start_paused = true)]
async fn test_filtered_subscription_sees_only_watch_events() {
    let clock = Arc::new(ManualClock::from_millis(T0));
    let core = service(clock.clone());
    let mut watch_events = core.subscribe_where(|event| matches!(event, CoreEvent::Watch(_)));

    let mut media = MockMedia::new();
    media
        .expect_snapshot()
        .returning(|| Some(PlaybackSnapshot::new(0.0, 600.0, 2.0)));
    media
        .expect_current_content()
        .returning(|| Some(ContentInfo::new("abc123")));

    let player = core.player(Arc::new(media));
    player.handle(PlaybackSignal::Play).await.unwrap();
    player
        .handle(PlaybackSignal::PositionSample { position: 6.0, rate: 2.0 })
        .await
        .unwrap();
    clock.advance_millis(30_000);
    player.handle(PlaybackSignal::Ended).await.unwrap();

    let mut seen = Vec::new();
    while let Some(Ok(event)) = watch_events.try_recv() {
        seen.push(event);
    }
    assert!(!seen.is_empty());
    assert!(seen.iter().all(|e| matches!(e, CoreEvent::Watch(_))));
    assert!(seen
        .iter()
        .any(|e| matches!(e, CoreEvent::Watch(WatchEvent::SessionCommitted { .. }))));
}

#[tokio::test]
async fn test_watch_stats_use_service_clock() {
    let clock = Arc::new(ManualClock::from_millis(T0));
    let core = service(clock.clone());
    let settings = core.settings();

    for (start_offset, secs) in [(3_600_000_i64, 600_i64), (10 * 86_400_000, 300)] {
        let start = T0 - start_offset;
        settings
            .append_session(&WatchSession {
                content_id: format!("id-{start}"),
                title: "Title".into(),
                channel: "Channel".into(),
                start_time: start,
                end_time: Some(start + secs * 1000),
            })
            .await
            .unwrap();
    }

    let stats = core.watch_stats().await;
    assert_eq!(stats.total, 900);
    assert_eq!(stats.last_day, 600);
    assert_eq!(stats.last_week, 600);
    assert_eq!(stats.last_month, 900);
    assert_eq!(stats.top_channels, vec![("Channel".to_string(), 900)]);
}

#[tokio::test]
async fn test_overlay_label_follows_settings() {
    let core = service(Arc::new(ManualClock::from_millis(T0)));
    let snapshot = PlaybackSnapshot::new(0.0, 600.0, 2.0);

    let label = core.overlay_label(&snapshot).await.unwrap();
    assert!(label.starts_with("5:00 | "), "{label}");

    core.settings().set_show_end_time(false).await.unwrap();
    assert_eq!(core.overlay_label(&snapshot).await.unwrap(), "5:00");

    let live = PlaybackSnapshot::new(0.0, f64::INFINITY, 1.0);
    assert!(core.overlay_label(&live).await.is_none());
}
