//! Replay a recorded list of player signals against an in-memory core.
//!
//! Run with:
//! ```bash
//! cargo run -p core-service --example replay_signals -- signals.json
//! ```
//!
//! The file holds a JSON array of steps such as
//! `{ "atMs": 0, "position": 0.0, "rate": 2.0, "signal": { "type": "play" } }`.
//! Without a file a short built-in viewing is replayed.

use std::sync::Arc;

use anyhow::{Context, Result};
use bridge_desktop::{ManualMediaSource, MemoryBackend};
use bridge_traits::{ContentInfo, ManualClock, PlaybackSnapshot, StorageTier};
use core_playback::display::{format_duration, format_long_duration};
use core_playback::PlaybackSignal;
use core_runtime::logging::{LogFormat, LoggingConfig};
use core_runtime::events::{CoreEvent, WatchEvent};
use core_runtime::{CoreConfig, WritePolicy};
use core_service::CoreService;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Step {
    at_ms: i64,
    position: f64,
    rate: f64,
    signal: PlaybackSignal,
}

fn builtin() -> Vec<Step> {
    let step = |at_ms, position, rate, signal| Step {
        at_ms,
        position,
        rate,
        signal,
    };
    vec![
        step(0, 0.0, 2.0, PlaybackSignal::Play),
        step(4_000, 8.0, 2.0, PlaybackSignal::PositionSample { position: 8.0, rate: 2.0 }),
        step(8_000, 16.0, 2.0, PlaybackSignal::PositionSample { position: 16.0, rate: 2.0 }),
        step(12_000, 24.0, 2.0, PlaybackSignal::Pause),
        step(20_000, 24.0, 1.5, PlaybackSignal::Play),
        step(26_000, 33.0, 1.5, PlaybackSignal::Ended),
    ]
}

#[tokio::main]
async fn main() -> Result<()> {
    let steps = match std::env::args().nth(1) {
        Some(path) => {
            let text = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            serde_json::from_str(&text).context("parsing signal steps")?
        }
        None => builtin(),
    };

    let start = chrono::Utc::now().timestamp_millis();
    let clock = Arc::new(ManualClock::from_millis(start));
    let config = CoreConfig::builder()
        .primary_store(Arc::new(MemoryBackend::native(StorageTier::Primary)))
        .fallback_store(Arc::new(MemoryBackend::text(StorageTier::Fallback)))
        .clock(clock.clone())
        .write_policy(WritePolicy::AwaitAll)
        .redact_history(false)
        .build()?;
    let core = CoreService::with_logging(
        config,
        LoggingConfig::default().with_format(LogFormat::Compact),
    )?;

    let media = Arc::new(ManualMediaSource::with_content(
        ContentInfo::new("dQw4w9WgXcQ").with_title("Replay").with_channel("Local"),
    ));
    let mut commits = core.subscribe_where(|event| {
        matches!(event, CoreEvent::Watch(WatchEvent::SessionCommitted { .. }))
    });
    let player = core.player(media.clone());

    for step in steps {
        clock.set(
            chrono::DateTime::from_timestamp_millis(start + step.at_ms)
                .context("timestamp out of range")?,
        );
        media.set_snapshot(Some(PlaybackSnapshot::new(step.position, 600.0, step.rate)));
        player.handle(step.signal).await?;
    }
    player.shutdown().await?;

    while let Some(Ok(event)) = commits.try_recv() {
        println!("{}", event.description());
    }

    let settings = core.settings();
    println!(
        "Time saved: {}",
        format_long_duration(settings.global_time_saved().await)
    );
    let stats = core.watch_stats().await;
    println!(
        "Sessions: {}, watched {}",
        settings.watch_sessions().await.len(),
        format_duration(stats.total)
    );
    Ok(())
}
