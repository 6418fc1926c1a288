//! # Savings Tracker
//!
//! Drives a [`SavingsAccumulator`] from playback signals and persists its
//! output.
//!
//! While tracking, a spawned task wakes every `tick_interval`, samples the
//! media source and flushes pending savings into the persisted global total.
//! Pause or end stops the task after a final sample and flush, so at most one
//! tick interval of savings is lost to a crash.
//!
//! A flush is a locked read-modify-write on the global total (see
//! [`SettingsService::add_time_saved`]). If no tier accepts the write the
//! amount is kept and retried on the next flush.

use std::sync::{Arc, Weak};

use bridge_traits::{MediaSource, TrackerId};
use core_async::task::{self, TaskHandle};
use core_async::time::sleep;
use core_runtime::events::{CoreEvent, EventBus, SavingsEvent};
use core_runtime::TrackerConfig;
use core_settings::SettingsService;
use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::accumulator::{SavingsAccumulator, TrackingState};
use crate::error::Result;

struct TrackerInner {
    id: TrackerId,
    settings: Arc<SettingsService>,
    media: Arc<dyn MediaSource>,
    config: TrackerConfig,
    accumulator: Mutex<SavingsAccumulator>,
    tick_task: Mutex<Option<TaskHandle>>,
    /// Held for a whole flush: serializes flushes and keeps the tick task
    /// from being aborted while an amount is in flight.
    flush_lock: core_async::sync::Mutex<()>,
    events: Option<EventBus>,
}

/// Time-saved tracking for one player.
pub struct SavingsTracker {
    inner: Arc<TrackerInner>,
}

impl SavingsTracker {
    pub fn new(
        settings: Arc<SettingsService>,
        media: Arc<dyn MediaSource>,
        config: TrackerConfig,
    ) -> Self {
        Self::build(settings, media, config, None)
    }

    pub fn with_events(
        settings: Arc<SettingsService>,
        media: Arc<dyn MediaSource>,
        config: TrackerConfig,
        events: EventBus,
    ) -> Self {
        Self::build(settings, media, config, Some(events))
    }

    fn build(
        settings: Arc<SettingsService>,
        media: Arc<dyn MediaSource>,
        config: TrackerConfig,
        events: Option<EventBus>,
    ) -> Self {
        Self {
            inner: Arc::new(TrackerInner {
                id: TrackerId::new(),
                settings,
                media,
                accumulator: Mutex::new(SavingsAccumulator::new(config.outlier_threshold_secs)),
                config,
                tick_task: Mutex::new(None),
                flush_lock: core_async::sync::Mutex::new(()),
                events,
            }),
        }
    }

    pub fn id(&self) -> TrackerId {
        self.inner.id
    }

    pub fn state(&self) -> TrackingState {
        self.inner.accumulator.lock().state()
    }

    /// Unflushed savings in seconds.
    pub fn session_saved(&self) -> f64 {
        self.inner.accumulator.lock().session_saved()
    }

    /// Savings since tracking last started.
    pub fn session_total(&self) -> f64 {
        self.inner.accumulator.lock().session_total()
    }

    /// Playback started or resumed.
    ///
    /// Pending savings, whether from a running tracker or from a final flush
    /// that failed, are flushed before the state is reset. An amount that
    /// still cannot be written is carried into the new run.
    #[instrument(skip(self), fields(tracker = %self.inner.id))]
    pub async fn start(&self) {
        self.inner.halt_ticking().await;
        if self.inner.accumulator.lock().session_saved() > 0.0 {
            if let Err(e) = self.inner.flush().await {
                warn!(error = %e, "Flush before restart failed; savings carried over");
            }
        }

        {
            let mut acc = self.inner.accumulator.lock();
            let carried = acc.take_pending();
            acc.start();
            acc.restore_pending(carried);
        }
        self.inner.sample_media();
        self.inner.start_ticking();

        debug!("Tracking started");
        self.inner.emit(SavingsEvent::TrackingStarted);
    }

    /// Playback paused or ended: final sample, flush, stop.
    #[instrument(skip(self), fields(tracker = %self.inner.id))]
    pub async fn stop(&self) {
        self.inner.halt_ticking().await;
        if !self.inner.accumulator.lock().is_tracking() {
            return;
        }

        self.inner.sample_media();
        if let Err(e) = self.inner.flush().await {
            warn!(error = %e, "Final flush failed; savings kept for the next flush");
        }

        let session_total = {
            let mut acc = self.inner.accumulator.lock();
            acc.stop();
            acc.session_total()
        };
        debug!(session_total, "Tracking stopped");
        self.inner.emit(SavingsEvent::TrackingStopped { session_total });
    }

    /// Position or rate changed (`timeupdate`, `ratechange`).
    pub fn sample(&self, position: f64, rate: f64) -> f64 {
        self.inner.accumulator.lock().sample(position, rate)
    }

    /// One tick: sample the media source and flush.
    pub async fn tick(&self) -> Result<f64> {
        self.inner.tick().await
    }

    /// Persist pending savings. Returns the amount flushed.
    pub async fn flush(&self) -> Result<f64> {
        self.inner.flush().await
    }

    /// Whether the periodic task is running.
    pub fn is_ticking(&self) -> bool {
        self.inner
            .tick_task
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_aborted())
    }
}

impl Drop for SavingsTracker {
    fn drop(&mut self) {
        self.inner.stop_ticking();
    }
}

impl TrackerInner {
    fn sample_media(&self) {
        if let Some(snapshot) = self.media.snapshot() {
            self.accumulator
                .lock()
                .sample(snapshot.position, snapshot.rate);
        }
    }

    async fn tick(&self) -> Result<f64> {
        self.sample_media();
        self.flush().await
    }

    async fn flush(&self) -> Result<f64> {
        let _guard = self.flush_lock.lock().await;

        let amount = self.accumulator.lock().take_pending();
        if amount <= 0.0 {
            return Ok(0.0);
        }

        match self.settings.add_time_saved(amount).await {
            Ok(global_total) => {
                info!(tracker = %self.id, amount, global_total, "Flushed time saved");
                self.emit(SavingsEvent::Flushed {
                    amount,
                    global_total,
                });
                Ok(amount)
            }
            Err(e) => {
                self.accumulator.lock().restore_pending(amount);
                Err(e.into())
            }
        }
    }

    fn start_ticking(self: &Arc<Self>) {
        let weak: Weak<TrackerInner> = Arc::downgrade(self);
        let interval = self.config.tick_interval;

        let handle = task::spawn(async move {
            loop {
                sleep(interval).await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                if let Err(e) = inner.tick().await {
                    warn!(tracker = %inner.id, error = %e, "Periodic flush failed");
                }
            }
        });

        if let Some(previous) = self.tick_task.lock().replace(handle) {
            previous.abort();
        }
    }

    /// Stop the periodic task without cutting a flush short.
    ///
    /// A tick holds `flush_lock` from taking the pending amount until the
    /// write settles, so the task is only aborted between flushes.
    async fn halt_ticking(&self) {
        let _guard = self.flush_lock.lock().await;
        self.stop_ticking();
    }

    fn stop_ticking(&self) {
        if let Some(handle) = self.tick_task.lock().take() {
            handle.abort();
        }
    }

    fn emit(&self, event: SavingsEvent) {
        if let Some(bus) = &self.events {
            let _ = bus.emit(CoreEvent::Savings(event));
        }
    }
}
