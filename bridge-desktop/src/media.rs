//! Scripted media source for native hosts.

use bridge_traits::playback::{ContentInfo, MediaSource, PlaybackSnapshot};
use std::sync::RwLock;

/// Media source whose state is pushed by the host.
///
/// Native tools replaying a player log, and tests, drive the tracker through
/// this instead of a real player element.
#[derive(Debug, Default)]
pub struct ManualMediaSource {
    snapshot: RwLock<Option<PlaybackSnapshot>>,
    content: RwLock<Option<ContentInfo>>,
}

impl ManualMediaSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(content: ContentInfo) -> Self {
        let source = Self::default();
        source.set_content(Some(content));
        source
    }

    pub fn set_snapshot(&self, snapshot: Option<PlaybackSnapshot>) {
        *self.snapshot.write().unwrap_or_else(|e| e.into_inner()) = snapshot;
    }

    pub fn set_content(&self, content: Option<ContentInfo>) {
        *self.content.write().unwrap_or_else(|e| e.into_inner()) = content;
    }

    /// Move the playhead, keeping the rest of the snapshot.
    pub fn seek(&self, position: f64) {
        let mut guard = self.snapshot.write().unwrap_or_else(|e| e.into_inner());
        if let Some(snapshot) = guard.as_mut() {
            snapshot.position = position;
        }
    }
}

impl MediaSource for ManualMediaSource {
    fn snapshot(&self) -> Option<PlaybackSnapshot> {
        *self.snapshot.read().unwrap_or_else(|e| e.into_inner())
    }

    fn current_content(&self) -> Option<ContentInfo> {
        self.content
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
