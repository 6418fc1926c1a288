//! Watch statistics shown on the options page.

use std::collections::HashMap;

use chrono::{DateTime, Local, TimeZone, Timelike, Utc};
use core_settings::WatchSession;
use serde::Serialize;

/// Sessions shorter than this many seconds are ignored.
pub const MIN_COUNTED_SECS: i64 = 5;

const DAY_MS: i64 = 24 * 3600 * 1000;

/// Aggregated watch time; all durations in whole seconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WatchStats {
    pub total: u64,
    /// Sessions started within the last 24 hours
    pub last_day: u64,
    pub last_week: u64,
    /// Last 30 days
    pub last_month: u64,
    /// Rounded mean session length
    pub average_session: u64,
    /// Local hour (0-23) with the most watch time
    pub peak_hour: Option<u32>,
    /// Up to three `(channel, seconds)`, most watched first
    pub top_channels: Vec<(String, u64)>,
    /// Up to three `(title, seconds)`, most watched first
    pub top_titles: Vec<(String, u64)>,
}

/// Aggregate against the local time zone.
pub fn aggregate_stats(sessions: &[WatchSession], now: DateTime<Utc>) -> WatchStats {
    aggregate_stats_in(sessions, now, &Local)
}

/// Aggregate, bucketing peak hours in `tz`.
pub fn aggregate_stats_in<Tz: TimeZone>(
    sessions: &[WatchSession],
    now: DateTime<Utc>,
    tz: &Tz,
) -> WatchStats {
    let now_ms = now.timestamp_millis();
    let mut stats = WatchStats::default();
    let mut lengths: Vec<u64> = Vec::new();
    let mut channels = Totals::default();
    let mut titles = Totals::default();
    let mut hours = [0u64; 24];

    for session in sessions {
        let Some(duration_ms) = session.duration_ms() else {
            continue;
        };
        let secs = duration_ms.div_euclid(1000);
        if secs < MIN_COUNTED_SECS {
            continue;
        }
        let secs = secs as u64;

        stats.total += secs;
        lengths.push(secs);

        let age = now_ms - session.start_time;
        if age < DAY_MS {
            stats.last_day += secs;
        }
        if age < 7 * DAY_MS {
            stats.last_week += secs;
        }
        if age < 30 * DAY_MS {
            stats.last_month += secs;
        }

        if !session.channel.is_empty() {
            channels.add(&session.channel, secs);
        }
        if !session.title.is_empty() {
            titles.add(&session.title, secs);
        }
        if let Some(start) = tz.timestamp_millis_opt(session.start_time).single() {
            hours[start.hour() as usize] += secs;
        }
    }

    if !lengths.is_empty() {
        let sum: u64 = lengths.iter().sum();
        stats.average_session = (sum as f64 / lengths.len() as f64).round() as u64;
    }

    // Earliest hour wins ties
    let mut peak = 0;
    for (hour, secs) in hours.iter().enumerate() {
        if *secs > peak {
            peak = *secs;
            stats.peak_hour = Some(hour as u32);
        }
    }

    stats.top_channels = channels.top(3);
    stats.top_titles = titles.top(3);
    stats
}

/// Per-name totals in first-seen order.
#[derive(Default)]
struct Totals {
    order: Vec<String>,
    secs: HashMap<String, u64>,
}

impl Totals {
    fn add(&mut self, name: &str, secs: u64) {
        match self.secs.get_mut(name) {
            Some(total) => *total += secs,
            None => {
                self.order.push(name.to_string());
                self.secs.insert(name.to_string(), secs);
            }
        }
    }

    fn top(self, n: usize) -> Vec<(String, u64)> {
        let Totals { order, secs } = self;
        let mut entries: Vec<(String, u64)> = order
            .into_iter()
            .map(|name| {
                let total = secs.get(&name).copied().unwrap_or(0);
                (name, total)
            })
            .collect();
        // Stable: equal totals keep first-seen order
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries.truncate(n);
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000_000;
    const HOUR_MS: i64 = 3600 * 1000;

    fn session(channel: &str, title: &str, start: i64, secs: i64) -> WatchSession {
        WatchSession {
            content_id: format!("{}-{}", channel, title),
            title: title.to_string(),
            channel: channel.to_string(),
            start_time: start,
            end_time: Some(start + secs * 1000),
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp_millis(NOW).unwrap()
    }

    #[test]
    fn test_empty() {
        let stats = aggregate_stats_in(&[], now(), &Utc);
        assert_eq!(stats, WatchStats::default());
        assert_eq!(stats.peak_hour, None);
    }

    #[test]
    fn test_windows_and_totals() {
        let sessions = vec![
            session("A", "one", NOW - HOUR_MS, 60),
            session("A", "two", NOW - 3 * DAY_MS, 120),
            session("B", "three", NOW - 20 * DAY_MS, 300),
            session("C", "four", NOW - 90 * DAY_MS, 600),
        ];
        let stats = aggregate_stats_in(&sessions, now(), &Utc);

        assert_eq!(stats.total, 1080);
        assert_eq!(stats.last_day, 60);
        assert_eq!(stats.last_week, 180);
        assert_eq!(stats.last_month, 480);
        assert_eq!(stats.average_session, 270);
    }

    #[test]
    fn test_short_and_open_sessions_ignored() {
        let mut open = session("A", "open", NOW - HOUR_MS, 100);
        open.end_time = None;
        let sessions = vec![
            session("A", "short", NOW - HOUR_MS, 4),
            open,
            session("A", "ok", NOW - HOUR_MS, 5),
        ];
        let stats = aggregate_stats_in(&sessions, now(), &Utc);

        assert_eq!(stats.total, 5);
        assert_eq!(stats.top_titles, vec![("ok".to_string(), 5)]);
    }

    #[test]
    fn test_top_lists() {
        let sessions = vec![
            session("A", "x", NOW, 10),
            session("B", "y", NOW, 50),
            session("C", "z", NOW, 30),
            session("D", "w", NOW, 30),
            session("A", "x", NOW, 30),
        ];
        let stats = aggregate_stats_in(&sessions, now(), &Utc);

        assert_eq!(
            stats.top_channels,
            vec![
                ("B".to_string(), 50),
                ("A".to_string(), 40),
                ("C".to_string(), 30),
            ]
        );
        assert_eq!(stats.top_titles[0], ("y".to_string(), 50));
    }

    #[test]
    fn test_peak_hour() {
        let base = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap().timestamp_millis();
        let sessions = vec![
            session("A", "a", base + 9 * HOUR_MS, 60),
            session("A", "b", base + 21 * HOUR_MS, 100),
            session("A", "c", base + 9 * HOUR_MS + 60_000, 60),
        ];
        let stats = aggregate_stats_in(&sessions, now(), &Utc);
        assert_eq!(stats.peak_hour, Some(9));
    }
}
