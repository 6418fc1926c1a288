//! # Core Configuration Module
//!
//! Provides configuration management for the pace core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! holding the injected storage tiers, the wall clock, tracker timings and
//! persistence policy. Validation is fail-fast: a bad timing or a backend
//! registered under the wrong tier is rejected by [`CoreConfigBuilder::build`].
//!
//! ## Storage tiers
//!
//! - `Primary` - synchronizing store (optional)
//! - `Secondary` - local persistent store (optional)
//! - `Fallback` - in-page string store (optional)
//!
//! Every tier is optional; with none at all the core still runs on defaults.
//! When the `desktop-shims` feature is enabled and no tier is provided,
//! in-memory desktop backends are injected so native tools work out of the
//! box.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .primary_store(Arc::new(SyncStorage::new()))
//!     .fallback_store(Arc::new(PageStorage::new()))
//!     .tick_interval(Duration::from_secs(5))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{Clock, StorageBackend, StorageTier, SystemClock};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::events::DEFAULT_EVENT_BUFFER_SIZE;

/// Default interval between savings ticks.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(5);
/// Position jumps at or above this many seconds are treated as seeks.
pub const DEFAULT_OUTLIER_THRESHOLD_SECS: f64 = 10.0;
/// Sessions must last strictly longer than this to be recorded.
pub const DEFAULT_MIN_SESSION_MS: i64 = 5_000;
/// How long a paused session may stay open before it is ended.
pub const DEFAULT_PAUSE_GRACE: Duration = Duration::from_secs(15);

/// How far a write waits before returning to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritePolicy {
    /// Await the most preferred available tier; write the rest in the
    /// background.
    #[default]
    AwaitPrimary,
    /// Await every tier.
    AwaitAll,
}

/// Timings for savings accumulation and session recording.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerConfig {
    /// Period of the accumulate-and-flush tick
    pub tick_interval: Duration,
    /// Exclusive upper bound on a position delta that counts as playback
    pub outlier_threshold_secs: f64,
    /// Exclusive lower bound on a recorded session's length
    pub min_session_ms: i64,
    /// Delay between a pause and the deferred session end
    pub pause_grace: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            outlier_threshold_secs: DEFAULT_OUTLIER_THRESHOLD_SECS,
            min_session_ms: DEFAULT_MIN_SESSION_MS,
            pause_grace: DEFAULT_PAUSE_GRACE,
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval.is_zero() {
            return Err(Error::Config(
                "Tick interval must be greater than zero".to_string(),
            ));
        }

        if !self.outlier_threshold_secs.is_finite() || self.outlier_threshold_secs <= 0.0 {
            return Err(Error::Config(format!(
                "Outlier threshold must be a positive number of seconds, got {}",
                self.outlier_threshold_secs
            )));
        }

        if self.min_session_ms < 0 {
            return Err(Error::Config(format!(
                "Minimum session length cannot be negative, got {}ms",
                self.min_session_ms
            )));
        }

        Ok(())
    }
}

/// Core configuration.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Synchronizing store
    pub primary: Option<Arc<dyn StorageBackend>>,

    /// Local persistent store
    pub secondary: Option<Arc<dyn StorageBackend>>,

    /// In-page string store
    pub fallback: Option<Arc<dyn StorageBackend>>,

    /// Wall clock for session timestamps
    pub clock: Arc<dyn Clock>,

    /// Tracker timings
    pub tracker: TrackerConfig,

    /// How writes are awaited
    pub write_policy: WritePolicy,

    /// Event bus buffer per subscriber
    pub event_buffer_size: usize,

    /// Redact watch-history fields in logs
    pub redact_history: bool,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field(
                "primary",
                &self.primary.as_ref().map(|_| "StorageBackend { ... }"),
            )
            .field(
                "secondary",
                &self.secondary.as_ref().map(|_| "StorageBackend { ... }"),
            )
            .field(
                "fallback",
                &self.fallback.as_ref().map(|_| "StorageBackend { ... }"),
            )
            .field("clock", &"Clock { ... }")
            .field("tracker", &self.tracker)
            .field("write_policy", &self.write_policy)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("redact_history", &self.redact_history)
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Configured backends in preference order.
    pub fn tiers(&self) -> Vec<Arc<dyn StorageBackend>> {
        [&self.primary, &self.secondary, &self.fallback]
            .into_iter()
            .flatten()
            .cloned()
            .collect()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        self.tracker.validate()?;

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        for (slot, backend) in [
            (StorageTier::Primary, &self.primary),
            (StorageTier::Secondary, &self.secondary),
            (StorageTier::Fallback, &self.fallback),
        ] {
            if let Some(backend) = backend {
                if backend.tier() != slot {
                    return Err(Error::Config(format!(
                        "Backend serving the {} tier was registered as {}",
                        backend.tier(),
                        slot
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_tiers() -> [Option<Arc<dyn StorageBackend>>; 3] {
    use bridge_desktop::MemoryBackend;

    [
        Some(Arc::new(MemoryBackend::native(StorageTier::Primary))),
        Some(Arc::new(MemoryBackend::native(StorageTier::Secondary))),
        Some(Arc::new(MemoryBackend::text(StorageTier::Fallback))),
    ]
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_tiers() -> [Option<Arc<dyn StorageBackend>>; 3] {
    [None, None, None]
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    primary: Option<Arc<dyn StorageBackend>>,
    secondary: Option<Arc<dyn StorageBackend>>,
    fallback: Option<Arc<dyn StorageBackend>>,
    clock: Option<Arc<dyn Clock>>,
    tracker: TrackerConfig,
    write_policy: WritePolicy,
    event_buffer_size: Option<usize>,
    redact_history: Option<bool>,
}

impl CoreConfigBuilder {
    /// Sets the synchronizing store.
    pub fn primary_store(mut self, store: Arc<dyn StorageBackend>) -> Self {
        self.primary = Some(store);
        self
    }

    /// Sets the local persistent store.
    pub fn secondary_store(mut self, store: Arc<dyn StorageBackend>) -> Self {
        self.secondary = Some(store);
        self
    }

    /// Sets the in-page fallback store.
    pub fn fallback_store(mut self, store: Arc<dyn StorageBackend>) -> Self {
        self.fallback = Some(store);
        self
    }

    /// Places a backend in the slot of the tier it reports.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let builder = detected_backends
    ///     .into_iter()
    ///     .fold(CoreConfig::builder(), |b, backend| b.storage_backend(backend));
    /// ```
    pub fn storage_backend(self, store: Arc<dyn StorageBackend>) -> Self {
        match store.tier() {
            StorageTier::Primary => self.primary_store(store),
            StorageTier::Secondary => self.secondary_store(store),
            StorageTier::Fallback => self.fallback_store(store),
        }
    }

    /// Sets the wall clock. Defaults to [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Replaces all tracker timings at once.
    pub fn tracker_config(mut self, tracker: TrackerConfig) -> Self {
        self.tracker = tracker;
        self
    }

    /// Default: 5 seconds
    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.tracker.tick_interval = interval;
        self
    }

    /// Default: 10 seconds
    pub fn outlier_threshold_secs(mut self, secs: f64) -> Self {
        self.tracker.outlier_threshold_secs = secs;
        self
    }

    /// Default: 5000 ms
    pub fn min_session_ms(mut self, millis: i64) -> Self {
        self.tracker.min_session_ms = millis;
        self
    }

    /// Default: 15 seconds
    pub fn pause_grace(mut self, grace: Duration) -> Self {
        self.tracker.pause_grace = grace;
        self
    }

    pub fn write_policy(mut self, policy: WritePolicy) -> Self {
        self.write_policy = policy;
        self
    }

    /// Default: [`DEFAULT_EVENT_BUFFER_SIZE`]
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Default: `true`
    pub fn redact_history(mut self, redact: bool) -> Self {
        self.redact_history = Some(redact);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// Returns an error if a timing is out of range or a backend was placed
    /// in a slot that does not match its tier.
    pub fn build(self) -> Result<CoreConfig> {
        let (primary, secondary, fallback) =
            if self.primary.is_none() && self.secondary.is_none() && self.fallback.is_none() {
                let [primary, secondary, fallback] = provide_default_tiers();
                if primary.is_none() && secondary.is_none() && fallback.is_none() {
                    warn!("No storage tier configured; settings will not persist");
                } else {
                    warn!("No storage tier configured; using in-memory desktop tiers");
                }
                (primary, secondary, fallback)
            } else {
                (self.primary, self.secondary, self.fallback)
            };

        let config = CoreConfig {
            primary,
            secondary,
            fallback,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            tracker: self.tracker,
            write_policy: self.write_policy,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            redact_history: self.redact_history.unwrap_or(true),
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use serde_json::Value;

    struct StubBackend(StorageTier);

    #[async_trait]
    impl StorageBackend for StubBackend {
        fn tier(&self) -> StorageTier {
            self.0
        }

        async fn get(&self, _key: &str) -> BridgeResult<Option<Value>> {
            Ok(None)
        }

        async fn set(&self, _key: &str, _value: Value) -> BridgeResult<()> {
            Ok(())
        }

        async fn remove(&self, _key: &str) -> BridgeResult<()> {
            Ok(())
        }

        async fn clear(&self) -> BridgeResult<()> {
            Ok(())
        }
    }

    fn stub(tier: StorageTier) -> Arc<dyn StorageBackend> {
        Arc::new(StubBackend(tier))
    }

    #[test]
    fn test_defaults() {
        let config = CoreConfig::builder()
            .primary_store(stub(StorageTier::Primary))
            .build()
            .unwrap();

        assert_eq!(config.tracker, TrackerConfig::default());
        assert_eq!(config.tracker.tick_interval, Duration::from_secs(5));
        assert_eq!(config.tracker.outlier_threshold_secs, 10.0);
        assert_eq!(config.tracker.min_session_ms, 5_000);
        assert_eq!(config.tracker.pause_grace, Duration::from_secs(15));
        assert_eq!(config.write_policy, WritePolicy::AwaitPrimary);
        assert_eq!(config.event_buffer_size, DEFAULT_EVENT_BUFFER_SIZE);
        assert!(config.redact_history);
        assert_eq!(config.tiers().len(), 1);
    }

    #[test]
    fn test_storage_backend_slots_by_tier() {
        let config = CoreConfig::builder()
            .storage_backend(stub(StorageTier::Fallback))
            .storage_backend(stub(StorageTier::Primary))
            .build()
            .unwrap();

        let tiers: Vec<_> = config.tiers().iter().map(|b| b.tier()).collect();
        assert_eq!(tiers, vec![StorageTier::Primary, StorageTier::Fallback]);
        assert!(config.secondary.is_none());
    }

    #[test]
    fn test_rejects_misplaced_backend() {
        let result = CoreConfig::builder()
            .primary_store(stub(StorageTier::Fallback))
            .build();

        assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("fallback")));
    }

    #[test]
    fn test_rejects_zero_tick_interval() {
        let result = CoreConfig::builder()
            .primary_store(stub(StorageTier::Primary))
            .tick_interval(Duration::ZERO)
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_bad_outlier_threshold() {
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let result = CoreConfig::builder()
                .primary_store(stub(StorageTier::Primary))
                .outlier_threshold_secs(bad)
                .build();
            assert!(matches!(result, Err(Error::Config(_))), "accepted {bad}");
        }
    }

    #[test]
    fn test_rejects_negative_min_session() {
        let result = CoreConfig::builder()
            .primary_store(stub(StorageTier::Primary))
            .min_session_ms(-1)
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_zero_event_buffer() {
        let result = CoreConfig::builder()
            .primary_store(stub(StorageTier::Primary))
            .event_buffer_size(0)
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[cfg(feature = "desktop-shims")]
    #[test]
    fn test_build_with_desktop_defaults() {
        let config = CoreConfig::builder().build().unwrap();
        let tiers: Vec<_> = config.tiers().iter().map(|b| b.tier()).collect();
        assert_eq!(tiers, StorageTier::ALL.to_vec());
        assert_eq!(
            config.fallback.as_ref().unwrap().encoding(),
            bridge_traits::ValueEncoding::Text
        );
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_build_without_tiers() {
        let config = CoreConfig::builder().build().unwrap();
        assert!(config.tiers().is_empty());
    }

    #[test]
    fn test_config_debug_hides_backends() {
        let config = CoreConfig::builder()
            .primary_store(stub(StorageTier::Primary))
            .write_policy(WritePolicy::AwaitAll)
            .build()
            .unwrap();
        let debug = format!("{:?}", config);
        assert!(debug.contains("StorageBackend { ... }"));
        assert!(debug.contains("AwaitAll"));
    }
}
