//! # Playback Tracking Module
//!
//! Turns playback signals of a media player into persisted time-saved totals
//! and watch history.
//!
//! ## Overview
//!
//! This module handles:
//! - Time-saved accumulation with outlier rejection ([`accumulator`])
//! - Periodic flushing of savings into settings ([`savings`])
//! - Watch-session recording with a pause grace period ([`session`])
//! - Routing of host playback signals ([`tracker`])
//! - Adjusted-time math and overlay formatting ([`display`])
//! - Watch statistics ([`stats`])

pub mod accumulator;
pub mod display;
pub mod error;
pub mod savings;
pub mod session;
pub mod stats;
pub mod tracker;

pub use accumulator::{saved_between, SavingsAccumulator, TrackingState};
pub use display::AdjustedTime;
pub use error::{PlaybackError, Result};
pub use savings::SavingsTracker;
pub use session::{SessionEnd, WatchRecorder};
pub use stats::{aggregate_stats, WatchStats};
pub use tracker::{PlaybackSignal, PlayerTracker};
