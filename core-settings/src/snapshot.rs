//! Watch-session records and the statistics backup format.
//!
//! A backup is `{ "global": <seconds saved>, "watch": [<session>, ...] }`,
//! exported as pretty-printed JSON. Imports are validated in full before
//! anything is written.

use bridge_traits::ContentInfo;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{Result, SettingsError};

/// One viewing of one piece of content.
///
/// Times are epoch milliseconds. Older releases wrote the content id as
/// `videoId`; that name is still accepted when reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchSession {
    #[serde(alias = "videoId")]
    pub content_id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub channel: String,
    pub start_time: i64,
    #[serde(default)]
    pub end_time: Option<i64>,
}

impl WatchSession {
    /// An open session for `content` starting at `start_ms`.
    pub fn start(content: &ContentInfo, start_ms: i64) -> Self {
        Self {
            content_id: content.content_id.clone(),
            title: content.title.clone(),
            channel: content.channel.clone(),
            start_time: start_ms,
            end_time: None,
        }
    }

    /// Milliseconds between start and end; `None` while open.
    pub fn duration_ms(&self) -> Option<i64> {
        self.end_time.map(|end| end - self.start_time)
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.start_time).single()
    }

    fn check(&self) -> std::result::Result<(), String> {
        if self.content_id.trim().is_empty() {
            return Err("empty content id".to_string());
        }
        if self.start_time < 0 {
            return Err(format!("negative start time {}", self.start_time));
        }
        if let Some(end) = self.end_time {
            if end < self.start_time {
                return Err(format!(
                    "end time {} precedes start time {}",
                    end, self.start_time
                ));
            }
        }
        Ok(())
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parse persisted session records, skipping entries that do not parse.
pub fn sessions_from_value(value: &Value) -> Vec<WatchSession> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match serde_json::from_value::<WatchSession>(item.clone()) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unreadable watch session record");
                None
            }
        })
        .collect()
}

/// Statistics backup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Total seconds saved.
    pub global: f64,
    pub watch: Vec<WatchSession>,
}

impl Snapshot {
    pub fn new(global: f64, watch: Vec<WatchSession>) -> Self {
        Self { global, watch }
    }

    /// Pretty-printed JSON, as offered for download.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and validate a backup file.
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| SettingsError::InvalidSnapshot(format!("not valid JSON: {}", e)))?;
        Self::from_value(&value)
    }

    /// Validate a parsed backup. Any defect rejects the whole snapshot.
    pub fn from_value(value: &Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| invalid("expected an object"))?;

        let global = object
            .get("global")
            .and_then(Value::as_f64)
            .ok_or_else(|| invalid("'global' must be a number"))?;

        let items = object
            .get("watch")
            .and_then(Value::as_array)
            .ok_or_else(|| invalid("'watch' must be an array"))?;

        let watch = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                serde_json::from_value::<WatchSession>(item.clone())
                    .map_err(|e| invalid(format!("watch[{}]: {}", i, e)))
            })
            .collect::<Result<Vec<_>>>()?;

        let snapshot = Self { global, watch };
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.global.is_finite() || self.global < 0.0 {
            return Err(invalid(format!(
                "'global' must be a finite non-negative number, got {}",
                self.global
            )));
        }
        for (i, session) in self.watch.iter().enumerate() {
            session
                .check()
                .map_err(|e| invalid(format!("watch[{}]: {}", i, e)))?;
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> SettingsError {
    SettingsError::InvalidSnapshot(message.into())
}
