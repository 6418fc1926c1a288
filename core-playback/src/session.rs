//! # Watch-Session Recorder
//!
//! Records one [`WatchSession`] per viewing of a piece of content:
//!
//! ```text
//!              start_session(id)
//!  NoSession ────────────────────> Active{id, start}
//!      ▲                              │
//!      └──────── end_session() ───────┘
//!                 (append if > min_session_ms)
//! ```
//!
//! Starting a different content id ends the active session first. A pause
//! schedules a deferred end after the grace period; playing the same content
//! again before it fires cancels it. Each scheduled end carries a generation
//! number and only acts if no newer play, pause or end happened since, so a
//! timer that fires late cannot end a session it does not own.

use std::sync::{Arc, Weak};

use bridge_traits::{Clock, ContentInfo};
use core_async::task::{self, TaskHandle};
use core_async::time::sleep;
use core_runtime::events::{CoreEvent, EventBus, WatchEvent};
use core_runtime::logging::redact_if_sensitive;
use core_runtime::TrackerConfig;
use core_settings::{SettingsService, WatchSession};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::Result;

#[derive(Default)]
struct RecorderState {
    active: Option<WatchSession>,
    generation: u64,
    pending_end: Option<TaskHandle>,
}

impl RecorderState {
    /// Invalidate any scheduled end.
    fn cancel_pending(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if let Some(handle) = self.pending_end.take() {
            handle.abort();
        }
    }
}

struct RecorderInner {
    settings: Arc<SettingsService>,
    clock: Arc<dyn Clock>,
    config: TrackerConfig,
    state: Mutex<RecorderState>,
    events: Option<EventBus>,
}

/// Outcome of ending a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// Long enough; appended to history.
    Committed(WatchSession),
    /// Too short; dropped.
    Discarded(WatchSession),
    /// No session was active.
    NoSession,
}

pub struct WatchRecorder {
    inner: Arc<RecorderInner>,
}

impl WatchRecorder {
    pub fn new(settings: Arc<SettingsService>, clock: Arc<dyn Clock>, config: TrackerConfig) -> Self {
        Self::build(settings, clock, config, None)
    }

    pub fn with_events(
        settings: Arc<SettingsService>,
        clock: Arc<dyn Clock>,
        config: TrackerConfig,
        events: EventBus,
    ) -> Self {
        Self::build(settings, clock, config, Some(events))
    }

    fn build(
        settings: Arc<SettingsService>,
        clock: Arc<dyn Clock>,
        config: TrackerConfig,
        events: Option<EventBus>,
    ) -> Self {
        Self {
            inner: Arc::new(RecorderInner {
                settings,
                clock,
                config,
                state: Mutex::new(RecorderState::default()),
                events,
            }),
        }
    }

    /// The session currently open, if any.
    pub fn active_session(&self) -> Option<WatchSession> {
        self.inner.state.lock().active.clone()
    }

    /// Whether a deferred end is scheduled.
    pub fn has_pending_end(&self) -> bool {
        self.inner.state.lock().pending_end.is_some()
    }

    /// Open a session for `content` unless one is already open for it.
    ///
    /// Returns `true` when a new session was started.
    pub async fn start_session(&self, content: &ContentInfo) -> Result<bool> {
        self.inner.start_session(content).await
    }

    /// Close the active session now.
    pub async fn end_session(&self) -> Result<SessionEnd> {
        self.inner.end_session().await
    }

    /// Playback started: cancel a pending end and make sure a session for
    /// `content` is open.
    pub async fn on_play(&self, content: &ContentInfo) -> Result<bool> {
        self.inner.state.lock().cancel_pending();
        self.inner.start_session(content).await
    }

    /// Playback paused: end the session after the grace period unless play
    /// resumes first.
    pub fn on_pause(&self) {
        let weak: Weak<RecorderInner> = Arc::downgrade(&self.inner);
        let grace = self.inner.config.pause_grace;

        let mut state = self.inner.state.lock();
        if state.active.is_none() {
            return;
        }
        state.cancel_pending();
        let generation = state.generation;

        let handle = task::spawn(async move {
            sleep(grace).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let current = {
                let mut state = inner.state.lock();
                if state.generation != generation {
                    None
                } else {
                    // This task is finishing; forget its handle
                    state.pending_end = None;
                    Some(())
                }
            };
            if current.is_some() {
                debug!("Pause grace period elapsed");
                if let Err(e) = inner.end_session().await {
                    warn!(error = %e, "Deferred session end failed");
                }
            }
        });
        state.pending_end = Some(handle);
    }

    /// Navigation or page unload: end immediately.
    pub async fn on_navigate(&self) -> Result<SessionEnd> {
        self.inner.end_session().await
    }
}

impl Drop for WatchRecorder {
    fn drop(&mut self) {
        self.inner.state.lock().cancel_pending();
    }
}

impl RecorderInner {
    async fn start_session(&self, content: &ContentInfo) -> Result<bool> {
        if content.content_id.is_empty() {
            return Err(crate::error::PlaybackError::NoContent);
        }

        let same = self
            .state
            .lock()
            .active
            .as_ref()
            .is_some_and(|s| s.content_id == content.content_id);
        if same {
            return Ok(false);
        }

        self.end_session().await?;

        let session = WatchSession::start(content, self.clock.unix_timestamp_millis());
        debug!(
            content_id = %redact_if_sensitive("content_id", &session.content_id),
            "Watch session started"
        );
        self.state.lock().active = Some(session);
        self.emit(WatchEvent::SessionStarted {
            content_id: content.content_id.clone(),
        });
        Ok(true)
    }

    async fn end_session(&self) -> Result<SessionEnd> {
        let session = {
            let mut state = self.state.lock();
            state.cancel_pending();
            state.active.take()
        };
        let Some(mut session) = session else {
            return Ok(SessionEnd::NoSession);
        };

        session.end_time = Some(self.clock.unix_timestamp_millis());
        let duration_ms = session.duration_ms().unwrap_or(0);
        let content_id = session.content_id.clone();

        if duration_ms <= self.config.min_session_ms {
            debug!(duration_ms, "Watch session too short, discarded");
            self.emit(WatchEvent::SessionDiscarded {
                content_id,
                duration_ms,
            });
            return Ok(SessionEnd::Discarded(session));
        }

        self.settings.append_session(&session).await?;
        info!(
            content_id = %redact_if_sensitive("content_id", &content_id),
            title = %redact_if_sensitive("title", &session.title),
            duration_ms,
            "Watch session recorded"
        );
        self.emit(WatchEvent::SessionCommitted {
            content_id,
            duration_ms,
        });
        Ok(SessionEnd::Committed(session))
    }

    fn emit(&self, event: WatchEvent) {
        if let Some(bus) = &self.events {
            let _ = bus.emit(CoreEvent::Watch(event));
        }
    }
}
