//! # Player Tracker
//!
//! Routes host playback signals to the savings tracker and the session
//! recorder of one player. The host forwards media element events
//! (`play`, `pause`, `ended`, `timeupdate`, `ratechange`), SPA navigations and
//! page unload as [`PlaybackSignal`]s.

use std::sync::Arc;

use bridge_traits::{Clock, MediaSource};
use core_runtime::events::EventBus;
use core_runtime::TrackerConfig;
use core_settings::SettingsService;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::savings::SavingsTracker;
use crate::session::{SessionEnd, WatchRecorder};

/// Host-observed playback event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlaybackSignal {
    Play,
    Pause,
    Ended,
    /// `timeupdate` or `ratechange`
    PositionSample { position: f64, rate: f64 },
    /// The page moved to other content without reloading.
    Navigated,
    /// The page is going away.
    Unload,
}

pub struct PlayerTracker {
    media: Arc<dyn MediaSource>,
    savings: SavingsTracker,
    recorder: WatchRecorder,
}

impl PlayerTracker {
    pub fn new(
        settings: Arc<SettingsService>,
        media: Arc<dyn MediaSource>,
        clock: Arc<dyn Clock>,
        config: TrackerConfig,
        events: Option<EventBus>,
    ) -> Self {
        let (savings, recorder) = match events {
            Some(bus) => (
                SavingsTracker::with_events(
                    Arc::clone(&settings),
                    Arc::clone(&media),
                    config,
                    bus.clone(),
                ),
                WatchRecorder::with_events(settings, clock, config, bus),
            ),
            None => (
                SavingsTracker::new(Arc::clone(&settings), Arc::clone(&media), config),
                WatchRecorder::new(settings, clock, config),
            ),
        };
        Self {
            media,
            savings,
            recorder,
        }
    }

    pub fn savings(&self) -> &SavingsTracker {
        &self.savings
    }

    pub fn recorder(&self) -> &WatchRecorder {
        &self.recorder
    }

    /// Apply one playback signal.
    ///
    /// Savings failures are absorbed (the amount is retried later); a failed
    /// session append is returned.
    pub async fn handle(&self, signal: PlaybackSignal) -> Result<()> {
        debug!(?signal, "Playback signal");
        match signal {
            PlaybackSignal::Play => {
                self.savings.start().await;
                self.resume_session().await?;
            }
            PlaybackSignal::Pause => {
                self.savings.stop().await;
                self.recorder.on_pause();
            }
            PlaybackSignal::Ended => {
                self.savings.stop().await;
                self.recorder.end_session().await?;
            }
            PlaybackSignal::PositionSample { position, rate } => {
                self.savings.sample(position, rate);
            }
            PlaybackSignal::Navigated => {
                if let Err(e) = self.savings.flush().await {
                    warn!(error = %e, "Flush on navigation failed");
                }
                self.recorder.on_navigate().await?;
                let playing = self.media.snapshot().is_some_and(|s| !s.paused);
                if playing {
                    self.resume_session().await?;
                }
            }
            PlaybackSignal::Unload => {
                self.savings.stop().await;
                self.recorder.on_navigate().await?;
            }
        }
        Ok(())
    }

    async fn resume_session(&self) -> Result<()> {
        match self.media.current_content() {
            Some(content) => {
                self.recorder.on_play(&content).await?;
            }
            None => debug!("No content identity; session not started"),
        }
        Ok(())
    }

    /// Flush savings and close the session; used on shutdown.
    pub async fn shutdown(&self) -> Result<SessionEnd> {
        self.savings.stop().await;
        self.recorder.end_session().await
    }
}
