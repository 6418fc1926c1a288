//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (storage tiers, media
//! source, clock) into the shared Rust core. Desktop tools typically enable
//! the `desktop-shims` feature (which depends on `bridge-desktop`), whereas
//! WebAssembly builds for the extension enable the `wasm` feature and rely on
//! the adapters from `bridge-wasm`.
//!
//! ```ignore
//! use core_service::CoreService;
//! use core_runtime::CoreConfig;
//!
//! let core = CoreService::new(CoreConfig::builder().build()?)?;
//! let player = core.player(media_source);
//! player.handle(PlaybackSignal::Play).await?;
//! ```

pub mod error;
#[cfg(all(feature = "wasm", target_arch = "wasm32"))]
pub mod wasm;

pub use error::{CoreError, Result};

use std::sync::Arc;

use bridge_traits::{Clock, MediaSource, PlaybackSnapshot, StorageTier};
use chrono::Local;
use core_playback::{aggregate_stats, AdjustedTime, PlayerTracker, WatchStats};
use core_runtime::events::{EventBus, EventStream, Receiver};
use core_runtime::logging::{init_logging, LoggingConfig};
use core_runtime::{CoreConfig, CoreEvent, TrackerConfig};
use core_settings::{Reconciler, SettingsService, TieredStore};
use tracing::info;

#[cfg(all(feature = "wasm", target_arch = "wasm32"))]
pub use bridge_wasm::WasmBridgeConfig;
#[cfg(all(feature = "wasm", target_arch = "wasm32"))]
use bridge_wasm::{build_wasm_bridges, WasmBridgeSet};

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    store: Arc<TieredStore>,
    settings: Arc<SettingsService>,
    events: EventBus,
    clock: Arc<dyn Clock>,
    tracker: TrackerConfig,
}

impl CoreService {
    /// Create a new service from a validated configuration.
    ///
    /// Fails when no storage tier is configured at all.
    pub fn new(config: CoreConfig) -> Result<Self> {
        config.validate()?;
        if config.tiers().is_empty() {
            return Err(CoreError::CapabilityMissing {
                capability: "storage".into(),
                message: "no storage tier configured".into(),
            });
        }

        let events = EventBus::new(config.event_buffer_size);
        let store = Arc::new(TieredStore::from_config(&config));
        let reconciler = Reconciler::new(Arc::clone(&store)).with_events(events.clone());
        let settings =
            SettingsService::new(Arc::new(reconciler)).with_events(events.clone());

        info!(
            tiers = ?store.available_tiers(),
            policy = ?config.write_policy,
            "Core service ready"
        );

        Ok(Self {
            store,
            settings: Arc::new(settings),
            events,
            clock: config.clock,
            tracker: config.tracker,
        })
    }

    /// Initialize logging, honoring the configured history redaction, then
    /// create the service.
    pub fn with_logging(config: CoreConfig, logging: LoggingConfig) -> Result<Self> {
        init_logging(logging.with_history_redaction(config.redact_history))?;
        Self::new(config)
    }

    /// Typed settings, time-saved total and watch history.
    pub fn settings(&self) -> Arc<SettingsService> {
        Arc::clone(&self.settings)
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Subscribe to core events.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.events.subscribe()
    }

    /// Subscribe to the core events matching `predicate`, e.g. only watch
    /// history changes for a statistics view.
    pub fn subscribe_where<F>(&self, predicate: F) -> EventStream
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        EventStream::new(self.events.subscribe()).filter(predicate)
    }

    /// Tiers usable right now.
    pub fn available_tiers(&self) -> Vec<StorageTier> {
        self.store.available_tiers()
    }

    /// Tracker for one player, sharing this service's settings and events.
    pub fn player(&self, media: Arc<dyn MediaSource>) -> PlayerTracker {
        PlayerTracker::new(
            Arc::clone(&self.settings),
            media,
            Arc::clone(&self.clock),
            self.tracker,
            Some(self.events.clone()),
        )
    }

    /// Statistics over the stored watch history.
    pub async fn watch_stats(&self) -> WatchStats {
        let sessions = self.settings.watch_sessions().await;
        aggregate_stats(&sessions, self.clock.now())
    }

    /// Overlay text for a player snapshot, honoring the display settings.
    ///
    /// `None` while the media has no finite duration.
    pub async fn overlay_label(&self, snapshot: &PlaybackSnapshot) -> Option<String> {
        let adjusted = AdjustedTime::from_snapshot(snapshot)?;
        let (show_end_time, use_24_hour) =
            futures::join!(self.settings.show_end_time(), self.settings.use_24_hour());
        let now = self.clock.now().with_timezone(&Local);
        Some(adjusted.label(&now, show_end_time, use_24_hour))
    }
}

/// Desktop bootstrap: SQLite files in the platform data directory for the
/// primary and secondary tiers, an in-memory string tier as fallback.
#[cfg(all(feature = "desktop-shims", not(target_arch = "wasm32")))]
pub async fn bootstrap_desktop(logging: Option<LoggingConfig>) -> Result<CoreService> {
    use bridge_desktop::{MemoryBackend, SqliteBackend};

    let primary = SqliteBackend::open_default(StorageTier::Primary).await?;
    let secondary = SqliteBackend::open_default(StorageTier::Secondary).await?;
    let config = CoreConfig::builder()
        .primary_store(Arc::new(primary))
        .secondary_store(Arc::new(secondary))
        .fallback_store(Arc::new(MemoryBackend::text(StorageTier::Fallback)))
        .build()?;

    match logging {
        Some(logging) => CoreService::with_logging(config, logging),
        None => CoreService::new(config),
    }
}

/// Convenience bootstrapper for WebAssembly hosts.
///
/// Returns the service together with the page's media source.
#[cfg(all(feature = "wasm", target_arch = "wasm32"))]
pub fn bootstrap_wasm(
    config: WasmBridgeConfig,
) -> Result<(CoreService, Arc<dyn MediaSource>)> {
    let bridges: WasmBridgeSet = build_wasm_bridges(config);
    let media = bridges.media();

    let mut builder = CoreConfig::builder().clock(bridges.clock);
    if let Some(primary) = bridges.primary {
        builder = builder.primary_store(primary);
    }
    if let Some(secondary) = bridges.secondary {
        builder = builder.secondary_store(secondary);
    }
    if let Some(fallback) = bridges.fallback {
        builder = builder.fallback_store(fallback);
    }

    Ok((CoreService::new(builder.build()?)?, media))
}
