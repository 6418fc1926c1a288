//! # Time-Saved Accumulator
//!
//! Pure state machine computing the wall time saved by playing faster than
//! 1x. Between two samples the media advanced `delta` seconds, which took
//! `delta / rate` seconds to watch; the difference is time saved.
//!
//! ```text
//!            start()                     stop()
//!   Idle ───────────────> Tracking ───────────────> Idle
//!                          │    ▲
//!                 sample() └────┘
//! ```
//!
//! Deltas outside `(0, outlier_threshold)` are seeks or rewinds and count for
//! nothing. The rate of the *previous* sample applies to the interval, since
//! that is the rate the interval was played at.

use serde::{Deserialize, Serialize};

/// Whether savings are being accumulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackingState {
    Idle,
    Tracking,
}

/// Savings of one tracked player.
#[derive(Debug, Clone)]
pub struct SavingsAccumulator {
    state: TrackingState,
    outlier_threshold: f64,
    last_position: Option<f64>,
    last_rate: Option<f64>,
    /// Saved but not yet flushed
    session_saved: f64,
    /// Saved since the last `start()`, regardless of flushes
    session_total: f64,
}

impl SavingsAccumulator {
    pub fn new(outlier_threshold_secs: f64) -> Self {
        Self {
            state: TrackingState::Idle,
            outlier_threshold: outlier_threshold_secs,
            last_position: None,
            last_rate: None,
            session_saved: 0.0,
            session_total: 0.0,
        }
    }

    pub fn state(&self) -> TrackingState {
        self.state
    }

    pub fn is_tracking(&self) -> bool {
        self.state == TrackingState::Tracking
    }

    /// Unflushed savings in seconds.
    pub fn session_saved(&self) -> f64 {
        self.session_saved
    }

    /// Savings since tracking last started, for display.
    pub fn session_total(&self) -> f64 {
        self.session_total
    }

    /// Enter `Tracking` with a clean slate. Callers flush any pending amount
    /// first; it is discarded here.
    pub fn start(&mut self) {
        self.state = TrackingState::Tracking;
        self.last_position = None;
        self.last_rate = None;
        self.session_saved = 0.0;
        self.session_total = 0.0;
    }

    /// Return to `Idle`. Pending savings stay until taken.
    pub fn stop(&mut self) {
        self.state = TrackingState::Idle;
    }

    /// Feed one playback sample. Returns the seconds saved by this sample.
    ///
    /// Ignored while idle. The first sample after `start()` only records the
    /// baseline.
    pub fn sample(&mut self, position: f64, rate: f64) -> f64 {
        if !self.is_tracking() || !position.is_finite() {
            return 0.0;
        }

        let saved = match (self.last_position, self.last_rate) {
            (Some(last_position), Some(last_rate)) => {
                saved_between(last_position, position, last_rate, self.outlier_threshold)
            }
            _ => 0.0,
        };

        self.last_position = Some(position);
        self.last_rate = Some(rate);

        if saved > 0.0 {
            self.session_saved += saved;
            self.session_total += saved;
        }
        saved
    }

    /// Take the pending amount for flushing.
    pub fn take_pending(&mut self) -> f64 {
        std::mem::take(&mut self.session_saved)
    }

    /// Put back an amount whose flush did not persist.
    pub fn restore_pending(&mut self, amount: f64) {
        if amount > 0.0 {
            self.session_saved += amount;
        }
    }
}

/// Seconds saved playing from `from` to `to` at `rate`.
///
/// Zero for seeks (`delta` outside `(0, outlier_threshold)`) and for rates
/// that are not finite and positive.
pub fn saved_between(from: f64, to: f64, rate: f64, outlier_threshold: f64) -> f64 {
    if !rate.is_finite() || rate <= 0.0 {
        return 0.0;
    }
    let delta = to - from;
    if !(delta > 0.0 && delta < outlier_threshold) {
        return 0.0;
    }
    let saved = delta - delta / rate;
    if saved > 0.0 {
        saved
    } else {
        0.0
    }
}
