//! Adjusted-time math and the text shown in the overlay.

use bridge_traits::PlaybackSnapshot;
use chrono::{DateTime, Duration, Local, TimeZone, Timelike};

/// Remaining time of the current media, in seconds, at the current rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjustedTime {
    /// Media time left (`duration - position`).
    pub remaining: f64,
    /// Wall time left at the current rate (`remaining / rate`).
    pub adjusted_remaining: f64,
    /// Wall time the current rate saves over the rest of the media.
    pub time_saved: f64,
}

impl AdjustedTime {
    /// `None` for live streams (no finite duration) and unusable rates.
    pub fn compute(position: f64, duration: f64, rate: f64) -> Option<Self> {
        if !duration.is_finite() || !position.is_finite() || !rate.is_finite() || rate <= 0.0 {
            return None;
        }
        let remaining = (duration - position).max(0.0);
        let adjusted_remaining = remaining / rate;
        Some(Self {
            remaining,
            adjusted_remaining,
            time_saved: (remaining - adjusted_remaining).max(0.0),
        })
    }

    pub fn from_snapshot(snapshot: &PlaybackSnapshot) -> Option<Self> {
        Self::compute(snapshot.position, snapshot.duration, snapshot.rate)
    }

    /// Overlay label: `"m:ss"` or `"m:ss | <end time>"`.
    pub fn label<Tz: TimeZone>(&self, now: &DateTime<Tz>, show_end_time: bool, use_24_hour: bool) -> String {
        let left = format_time(self.adjusted_remaining);
        if show_end_time {
            format!(
                "{} | {}",
                left,
                format_end_time(now, self.adjusted_remaining, use_24_hour)
            )
        } else {
            left
        }
    }

    /// [`AdjustedTime::label`] against the local clock.
    pub fn label_now(&self, show_end_time: bool, use_24_hour: bool) -> String {
        self.label(&Local::now(), show_end_time, use_24_hour)
    }
}

fn whole_seconds(seconds: f64) -> u64 {
    if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    }
}

/// `m:ss`, minutes unbounded. Negative and non-finite input show `0:00`.
pub fn format_time(seconds: f64) -> String {
    let total = whole_seconds(seconds);
    format!("{}:{:02}", total / 60, total % 60)
}

/// `+m:ss saved`
pub fn format_time_saved(seconds: f64) -> String {
    format!("+{} saved", format_time(seconds))
}

/// Clock time `seconds_from_now` after `now`: `HH:MM` or `h:MM AM`.
pub fn format_end_time<Tz: TimeZone>(now: &DateTime<Tz>, seconds_from_now: f64, use_24_hour: bool) -> String {
    let offset_ms = if seconds_from_now.is_finite() {
        (seconds_from_now * 1000.0) as i64
    } else {
        0
    };
    let end = now.clone() + Duration::milliseconds(offset_ms);
    let (hour, minute) = (end.hour(), end.minute());

    if use_24_hour {
        format!("{:02}:{:02}", hour, minute)
    } else {
        let suffix = if hour >= 12 { "PM" } else { "AM" };
        let h12 = match hour % 12 {
            0 => 12,
            h => h,
        };
        format!("{}:{:02} {}", h12, minute, suffix)
    }
}

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;
const MONTH: u64 = 30 * DAY;
const YEAR: u64 = 365 * DAY;

/// Compact long duration such as `1y 2mo 3d 4h 5m`.
///
/// Zero units are omitted; minutes are always shown when nothing larger is.
/// A month is 30 days and a year 365.
pub fn format_long_duration(seconds: f64) -> String {
    let mut rest = whole_seconds(seconds);
    let mut parts = Vec::new();

    for (unit, suffix) in [(YEAR, "y"), (MONTH, "mo"), (DAY, "d"), (HOUR, "h")] {
        let count = rest / unit;
        if count > 0 {
            parts.push(format!("{}{}", count, suffix));
        }
        rest -= count * unit;
    }

    let minutes = rest / MINUTE;
    if minutes > 0 || parts.is_empty() {
        parts.push(format!("{}m", minutes));
    }
    parts.join(" ")
}

/// `1h 2m 3s`, `2m 3s` or `3s`.
pub fn format_duration(seconds: u64) -> String {
    let h = seconds / HOUR;
    let m = (seconds % HOUR) / MINUTE;
    let s = seconds % MINUTE;
    if h > 0 {
        format!("{}h {}m {}s", h, m, s)
    } else if m > 0 {
        format!("{}m {}s", m, s)
    } else {
        format!("{}s", s)
    }
}

/// Tooltip of the overlay.
pub fn savings_tooltip(session_saved: f64, global_saved: f64) -> String {
    format!(
        "Session saved: {}\nAll-time saved: {}",
        format_time(session_saved),
        format_long_duration(global_saved)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_adjusted_time() {
        let t = AdjustedTime::compute(100.0, 700.0, 2.0).unwrap();
        assert_eq!(t.remaining, 600.0);
        assert_eq!(t.adjusted_remaining, 300.0);
        assert_eq!(t.time_saved, 300.0);

        let slow = AdjustedTime::compute(0.0, 60.0, 0.5).unwrap();
        assert_eq!(slow.adjusted_remaining, 120.0);
        assert_eq!(slow.time_saved, 0.0);
    }

    #[test]
    fn test_adjusted_time_unavailable() {
        assert!(AdjustedTime::compute(0.0, f64::INFINITY, 1.0).is_none());
        assert!(AdjustedTime::compute(0.0, f64::NAN, 1.0).is_none());
        assert!(AdjustedTime::compute(0.0, 60.0, 0.0).is_none());
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(65.9), "1:05");
        assert_eq!(format_time(3725.0), "62:05");
        assert_eq!(format_time(-3.0), "0:00");
        assert_eq!(format_time(f64::NAN), "0:00");
        assert_eq!(format_time_saved(90.0), "+1:30 saved");
    }

    #[test]
    fn test_format_end_time() {
        assert_eq!(format_end_time(&at(13, 5), 0.0, true), "13:05");
        assert_eq!(format_end_time(&at(13, 5), 0.0, false), "1:05 PM");
        assert_eq!(format_end_time(&at(0, 30), 0.0, false), "12:30 AM");
        assert_eq!(format_end_time(&at(11, 50), 900.0, false), "12:05 PM");
        assert_eq!(format_end_time(&at(23, 59), 120.0, true), "00:01");
    }

    #[test]
    fn test_label() {
        let t = AdjustedTime::compute(0.0, 600.0, 2.0).unwrap();
        assert_eq!(t.label(&at(9, 0), true, true), "5:00 | 09:05");
        assert_eq!(t.label(&at(9, 0), false, true), "5:00");
    }

    #[test]
    fn test_format_long_duration() {
        assert_eq!(format_long_duration(0.0), "0m");
        assert_eq!(format_long_duration(59.0), "0m");
        assert_eq!(format_long_duration(3600.0), "1h");
        assert_eq!(format_long_duration(3660.0), "1h 1m");
        let seconds = YEAR + 2 * MONTH + 3 * DAY + 4 * HOUR + 5 * MINUTE;
        assert_eq!(format_long_duration(seconds as f64), "1y 2mo 3d 4h 5m");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(3), "3s");
        assert_eq!(format_duration(123), "2m 3s");
        assert_eq!(format_duration(3723), "1h 2m 3s");
        assert_eq!(format_duration(3600), "1h 0m 0s");
    }

    #[test]
    fn test_tooltip() {
        assert_eq!(
            savings_tooltip(75.0, 7200.0),
            "Session saved: 1:15\nAll-time saved: 2h"
        );
    }
}
