//! Media source bridge.
//!
//! The host owns the actual player (an `HTMLVideoElement` in the browser, a
//! scripted source in tests). The core only needs to sample it: where the
//! playhead is, how long the media is, how fast it plays, and what content is
//! loaded.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::platform::PlatformSendSync;

/// Point-in-time view of the player.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    /// Current media position in seconds.
    pub position: f64,
    /// Media duration in seconds (may be `NaN`/infinite for live streams).
    pub duration: f64,
    /// Playback rate (1.0 = normal speed).
    pub rate: f64,
    /// Whether the player is paused.
    pub paused: bool,
}

impl PlaybackSnapshot {
    pub fn new(position: f64, duration: f64, rate: f64) -> Self {
        Self {
            position,
            duration,
            rate,
            paused: false,
        }
    }

    pub fn paused(mut self, paused: bool) -> Self {
        self.paused = paused;
        self
    }
}

/// Identity and display metadata of the content being played.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentInfo {
    /// Stable content identifier (e.g. the `v` query parameter of a watch URL).
    pub content_id: String,
    /// Display title, empty when unknown.
    pub title: String,
    /// Channel / uploader name, empty when unknown.
    pub channel: String,
}

impl ContentInfo {
    pub fn new(content_id: impl Into<String>) -> Self {
        Self {
            content_id: content_id.into(),
            title: String::new(),
            channel: String::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }
}

/// Media playback source sampled by the tracking core.
///
/// Implementations return `None` when no player is present (e.g. the page
/// has not rendered one yet); the core treats that as "nothing to sample".
pub trait MediaSource: PlatformSendSync {
    /// Current playback state, if a player exists.
    fn snapshot(&self) -> Option<PlaybackSnapshot>;

    /// Content currently loaded, if it can be identified.
    fn current_content(&self) -> Option<ContentInfo>;
}

/// Identifier of one tracked player instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackerId(Uuid);

impl TrackerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TrackerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TrackerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
