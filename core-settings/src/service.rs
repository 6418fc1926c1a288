//! # Settings Service
//!
//! Typed access to every persisted setting. Reads always go through
//! reconciliation, so a value lost from one tier is restored from the others
//! as a side effect of displaying it. Writes made by explicit user actions
//! return an error only when no tier accepted them.

use std::sync::Arc;

use core_runtime::events::{CoreEvent, EventBus, ResetScope, SettingsEvent};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use bridge_traits::StorageTier;

use crate::codec::{as_number, number_value};
use crate::error::{Result, SettingsError};
use crate::keys::{self, KeySpec};
use crate::reconcile::Reconciler;
use crate::snapshot::{sessions_from_value, Snapshot, WatchSession};
use crate::store::WriteReport;
use crate::theme::Theme;

/// Where the settings popup was last dragged to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PopupPosition {
    pub x: f64,
    pub y: f64,
}

/// Everything the overlay needs to render itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlaySettings {
    pub box_color_enabled: bool,
    pub box_color: String,
    pub text_color: String,
    pub theme: Theme,
    pub show_end_time: bool,
    pub use_24_hour: bool,
    pub box_opacity: u8,
}

/// Settings submitted together from the options page. Unset fields are left
/// unchanged.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsUpdate {
    pub theme: Option<Theme>,
    pub box_color: Option<String>,
    pub box_color_enabled: Option<bool>,
    pub text_color: Option<String>,
    pub show_end_time: Option<bool>,
    pub use_24_hour: Option<bool>,
    /// Raw form value; a number or numeric text.
    pub box_opacity: Option<Value>,
}

/// Coerce a user-supplied opacity to an integer percentage.
///
/// Accepts numbers and numeric strings in `0..=100`; fractional values are
/// rounded.
pub fn parse_opacity(value: &Value) -> Result<u8> {
    let key = keys::BOX_OPACITY.key;
    let n = match value {
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| SettingsError::invalid_value(key, format!("'{}' is not a number", s)))?,
        other => as_number(other)
            .ok_or_else(|| SettingsError::invalid_value(key, format!("{} is not a number", other)))?,
    };
    if !n.is_finite() || !(0.0..=100.0).contains(&n) {
        return Err(SettingsError::invalid_value(
            key,
            format!("{} is outside 0..=100", n),
        ));
    }
    Ok(n.round() as u8)
}

pub struct SettingsService {
    reconciler: Arc<Reconciler>,
    events: Option<EventBus>,
}

impl SettingsService {
    pub fn new(reconciler: Arc<Reconciler>) -> Self {
        Self {
            reconciler,
            events: None,
        }
    }

    pub fn with_events(mut self, bus: EventBus) -> Self {
        self.events = Some(bus);
        self
    }

    pub fn reconciler(&self) -> &Arc<Reconciler> {
        &self.reconciler
    }

    // ------------------------------------------------------------------
    // Getters
    // ------------------------------------------------------------------

    async fn get_bool(&self, spec: &KeySpec, default: bool) -> bool {
        self.reconciler
            .get_reconciled(spec)
            .await
            .as_bool()
            .unwrap_or(default)
    }

    async fn get_string(&self, spec: &KeySpec, default: &str) -> String {
        match self.reconciler.get_reconciled(spec).await {
            Value::String(s) => s,
            _ => default.to_string(),
        }
    }

    pub async fn box_color_enabled(&self) -> bool {
        self.get_bool(&keys::BOX_COLOR_ENABLED, true).await
    }

    pub async fn box_color(&self) -> String {
        self.get_string(&keys::BOX_COLOR, "#ffa500").await
    }

    pub async fn text_color(&self) -> String {
        self.get_string(&keys::TEXT_COLOR, "#fff").await
    }

    pub async fn theme(&self) -> Theme {
        Theme::from_name(&self.get_string(&keys::THEME, Theme::Classic.name()).await)
    }

    pub async fn show_end_time(&self) -> bool {
        self.get_bool(&keys::SHOW_END_TIME, true).await
    }

    pub async fn use_24_hour(&self) -> bool {
        self.get_bool(&keys::USE_24_HOUR, false).await
    }

    /// Stored opacity, tolerating the numeric strings older releases wrote.
    pub async fn box_opacity(&self) -> u8 {
        let value = self.reconciler.get_reconciled(&keys::BOX_OPACITY).await;
        parse_opacity(&value).unwrap_or_else(|e| {
            warn!(error = %e, "Ignoring stored opacity");
            100
        })
    }

    /// Seconds saved across all sessions.
    pub async fn global_time_saved(&self) -> f64 {
        let value = self
            .reconciler
            .get_reconciled(&keys::GLOBAL_TIME_SAVED)
            .await;
        as_number(&value).unwrap_or(0.0)
    }

    pub async fn watch_sessions(&self) -> Vec<WatchSession> {
        let value = self.reconciler.get_reconciled(&keys::WATCH_STATS).await;
        sessions_from_value(&value)
    }

    pub async fn popup_position(&self) -> Option<PopupPosition> {
        let value = self.reconciler.get_reconciled(&keys::POPUP_POSITION).await;
        if value.is_null() {
            return None;
        }
        serde_json::from_value(value).ok()
    }

    pub async fn collapsed(&self) -> bool {
        self.get_bool(&keys::COLLAPSED, false).await
    }

    /// All display settings, read concurrently.
    pub async fn overlay_settings(&self) -> OverlaySettings {
        let (box_color_enabled, box_color, text_color, theme, show_end_time, use_24_hour, box_opacity) = futures::join!(
            self.box_color_enabled(),
            self.box_color(),
            self.text_color(),
            self.theme(),
            self.show_end_time(),
            self.use_24_hour(),
            self.box_opacity(),
        );
        OverlaySettings {
            box_color_enabled,
            box_color,
            text_color,
            theme,
            show_end_time,
            use_24_hour,
            box_opacity,
        }
    }

    // ------------------------------------------------------------------
    // Setters
    // ------------------------------------------------------------------

    async fn write(&self, spec: &KeySpec, value: Value) -> Result<WriteReport> {
        let report = self
            .reconciler
            .set(spec, &value)
            .await
            .require_any(spec.key)?;
        self.emit(SettingsEvent::Changed {
            key: spec.key.to_string(),
        });
        Ok(report)
    }

    pub async fn set_box_color_enabled(&self, enabled: bool) -> Result<()> {
        self.write(&keys::BOX_COLOR_ENABLED, Value::Bool(enabled))
            .await
            .map(drop)
    }

    pub async fn set_box_color(&self, color: &str) -> Result<()> {
        self.write(&keys::BOX_COLOR, json!(color)).await.map(drop)
    }

    pub async fn set_text_color(&self, color: &str) -> Result<()> {
        self.write(&keys::TEXT_COLOR, json!(color)).await.map(drop)
    }

    /// Select a theme. A preset also stores its box and text colors.
    pub async fn set_theme(&self, theme: Theme) -> Result<()> {
        self.write(&keys::THEME, json!(theme.name())).await?;
        if let Some(colors) = theme.colors() {
            self.write(&keys::BOX_COLOR, json!(colors.background))
                .await?;
            self.write(&keys::TEXT_COLOR, json!(colors.text)).await?;
        }
        Ok(())
    }

    pub async fn set_show_end_time(&self, show: bool) -> Result<()> {
        self.write(&keys::SHOW_END_TIME, Value::Bool(show))
            .await
            .map(drop)
    }

    pub async fn set_use_24_hour(&self, use_24_hour: bool) -> Result<()> {
        self.write(&keys::USE_24_HOUR, Value::Bool(use_24_hour))
            .await
            .map(drop)
    }

    pub async fn set_box_opacity(&self, opacity: u8) -> Result<()> {
        self.set_box_opacity_value(&json!(opacity)).await
    }

    /// Store an opacity given as a number or numeric text.
    pub async fn set_box_opacity_value(&self, value: &Value) -> Result<()> {
        let opacity = parse_opacity(value)?;
        self.write(&keys::BOX_OPACITY, json!(opacity))
            .await
            .map(drop)
    }

    pub async fn set_popup_position(&self, position: PopupPosition) -> Result<()> {
        self.write(&keys::POPUP_POSITION, serde_json::to_value(position)?)
            .await
            .map(drop)
    }

    pub async fn set_collapsed(&self, collapsed: bool) -> Result<()> {
        self.write(&keys::COLLAPSED, Value::Bool(collapsed))
            .await
            .map(drop)
    }

    /// Apply a batch from the options page. Input is validated before
    /// anything is written.
    #[instrument(skip(self, update))]
    pub async fn apply(&self, update: SettingsUpdate) -> Result<()> {
        let opacity = update.box_opacity.as_ref().map(parse_opacity).transpose()?;

        if let Some(theme) = update.theme {
            self.set_theme(theme).await?;
        }
        if let Some(color) = &update.box_color {
            self.set_box_color(color).await?;
        }
        if let Some(enabled) = update.box_color_enabled {
            self.set_box_color_enabled(enabled).await?;
        }
        if let Some(color) = &update.text_color {
            self.set_text_color(color).await?;
        }
        if let Some(show) = update.show_end_time {
            self.set_show_end_time(show).await?;
        }
        if let Some(use_24_hour) = update.use_24_hour {
            self.set_use_24_hour(use_24_hour).await?;
        }
        if let Some(opacity) = opacity {
            self.set_box_opacity(opacity).await?;
        }
        info!("Applied settings");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Statistics
    // ------------------------------------------------------------------

    /// Add `amount` seconds to the persisted total. Returns the new total.
    ///
    /// Fails with [`SettingsError::NoWritableTier`] when no tier took the
    /// write; the caller keeps the amount for a later attempt.
    pub async fn add_time_saved(&self, amount: f64) -> Result<f64> {
        let (value, report) = self
            .reconciler
            .update(&keys::GLOBAL_TIME_SAVED, |current| {
                number_value(as_number(current).unwrap_or(0.0) + amount)
            })
            .await;
        report.require_any(keys::GLOBAL_TIME_SAVED.key)?;
        Ok(as_number(&value).unwrap_or(0.0))
    }

    /// Append a finished session to the history. Returns the new length.
    pub async fn append_session(&self, session: &WatchSession) -> Result<usize> {
        let record = serde_json::to_value(session)?;
        let (value, report) = self
            .reconciler
            .update(&keys::WATCH_STATS, |current| {
                let mut items = current.as_array().cloned().unwrap_or_default();
                items.push(record);
                Value::Array(items)
            })
            .await;
        report.require_any(keys::WATCH_STATS.key)?;
        Ok(value.as_array().map_or(0, Vec::len))
    }

    /// Overwrite the total in every tier. Lowering it only sticks in tiers
    /// that were reachable; an unreachable tier still holding a larger total
    /// wins the next read.
    pub async fn set_global_time_saved(&self, seconds: f64) -> Result<()> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(SettingsError::invalid_value(
                keys::GLOBAL_TIME_SAVED.key,
                format!("{} is not a finite non-negative number", seconds),
            ));
        }
        self.reconciler
            .overwrite(&keys::GLOBAL_TIME_SAVED, &number_value(seconds))
            .await
            .require_any(keys::GLOBAL_TIME_SAVED.key)?;
        self.emit(SettingsEvent::Changed {
            key: keys::GLOBAL_TIME_SAVED.key.to_string(),
        });
        Ok(())
    }

    pub async fn reset_global_time_saved(&self) -> Result<()> {
        self.reconciler
            .overwrite(&keys::GLOBAL_TIME_SAVED, &json!(0))
            .await
            .require_any(keys::GLOBAL_TIME_SAVED.key)?;
        info!("Reset global time saved");
        self.emit(SettingsEvent::Reset {
            scope: ResetScope::TimeSaved,
        });
        Ok(())
    }

    pub async fn reset_watch_stats(&self) -> Result<()> {
        self.reconciler
            .overwrite(&keys::WATCH_STATS, &json!([]))
            .await
            .require_any(keys::WATCH_STATS.key)?;
        info!("Reset watch statistics");
        self.emit(SettingsEvent::Reset {
            scope: ResetScope::WatchHistory,
        });
        Ok(())
    }

    /// Put every setting back to its default and wipe the in-page tier.
    #[instrument(skip(self))]
    pub async fn clear_all(&self) -> Result<()> {
        let mut accepted_any = false;
        for spec in keys::ALL.iter() {
            let report = if spec.default_value().is_null() {
                self.reconciler.store().remove_in(spec.key, spec.tiers).await
            } else {
                self.reconciler.overwrite(spec, &spec.default_value()).await
            };
            accepted_any |= report.any_accepted();
        }

        if let Err(e) = self
            .reconciler
            .store()
            .clear_tier(StorageTier::Fallback)
            .await
        {
            warn!(error = %e, "Could not clear in-page storage");
        }

        if !accepted_any {
            return Err(SettingsError::NoWritableTier {
                key: "*".to_string(),
            });
        }
        info!("Cleared all data");
        self.emit(SettingsEvent::Reset {
            scope: ResetScope::All,
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Backup
    // ------------------------------------------------------------------

    pub async fn export(&self) -> Snapshot {
        let (global, watch) = futures::join!(self.global_time_saved(), self.watch_sessions());
        Snapshot::new(global, watch)
    }

    pub async fn export_json(&self) -> Result<String> {
        self.export().await.to_json_pretty()
    }

    /// Replace the statistics with a validated backup.
    ///
    /// The total is written first. If no tier then accepts the session list,
    /// the previous total is written back so a failed import leaves the
    /// statistics as they were.
    #[instrument(skip(self, snapshot), fields(sessions = snapshot.watch.len()))]
    pub async fn import(&self, snapshot: Snapshot) -> Result<()> {
        snapshot.validate()?;
        let watch = serde_json::to_value(&snapshot.watch)?;
        let previous_global = self.global_time_saved().await;

        self.reconciler
            .overwrite(&keys::GLOBAL_TIME_SAVED, &number_value(snapshot.global))
            .await
            .require_any(keys::GLOBAL_TIME_SAVED.key)?;

        if let Err(e) = self
            .reconciler
            .overwrite(&keys::WATCH_STATS, &watch)
            .await
            .require_any(keys::WATCH_STATS.key)
        {
            warn!(previous_global, "Session list not imported; restoring the previous total");
            self.reconciler
                .overwrite(&keys::GLOBAL_TIME_SAVED, &number_value(previous_global))
                .await;
            return Err(e);
        }

        info!(global = snapshot.global, "Imported statistics");
        self.emit(SettingsEvent::Imported {
            global: snapshot.global,
            sessions: snapshot.watch.len(),
        });
        Ok(())
    }

    /// Parse, validate and import a backup file.
    pub async fn import_json(&self, text: &str) -> Result<()> {
        let snapshot = Snapshot::from_json(text)?;
        self.import(snapshot).await
    }

    fn emit(&self, event: SettingsEvent) {
        if let Some(bus) = &self.events {
            let _ = bus.emit(CoreEvent::Settings(event));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_opacity() {
        assert_eq!(parse_opacity(&json!(80)).unwrap(), 80);
        assert_eq!(parse_opacity(&json!("45")).unwrap(), 45);
        assert_eq!(parse_opacity(&json!(" 0 ")).unwrap(), 0);
        assert_eq!(parse_opacity(&json!(99.6)).unwrap(), 100);
    }

    #[test]
    fn test_parse_opacity_rejects() {
        for bad in [json!(101), json!(-1), json!("abc"), json!(true), Value::Null] {
            let err = parse_opacity(&bad).unwrap_err();
            assert!(matches!(err, SettingsError::InvalidValue { .. }), "{bad}");
        }
    }

    #[test]
    fn test_settings_update_from_form_json() {
        let update: SettingsUpdate = serde_json::from_value(json!({
            "theme": "Ocean",
            "boxOpacity": "70",
            "use24Hour": true
        }))
        .unwrap();
        assert_eq!(update.theme, Some(Theme::Ocean));
        assert_eq!(update.box_opacity, Some(json!("70")));
        assert_eq!(update.use_24_hour, Some(true));
        assert_eq!(update.box_color, None);
    }
}
