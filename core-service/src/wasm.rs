//! WebAssembly bindings for the extension scripts
//!
//! The content script creates one `JsCore`, forwards player events to
//! `handleSignal` and renders `overlayLabel()`; the options page uses the
//! settings, statistics and import/export methods.
//!
//! ```javascript
//! const core = new JsCore();
//! video.addEventListener('play', () => core.handleSignal({ type: 'play' }));
//! video.addEventListener('timeupdate', () =>
//!   core.handleSignal({ type: 'positionSample', position: video.currentTime, rate: video.playbackRate }));
//! const text = await core.overlayLabel();
//! ```

use std::rc::Rc;

use bridge_traits::MediaSource;
use core_playback::{PlaybackSignal, PlayerTracker};
use core_settings::{SettingsService, SettingsUpdate};
use serde::Serialize;
use std::sync::Arc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, js_sys::Promise};

use crate::{bootstrap_wasm, CoreService, WasmBridgeConfig};

// =============================================================================
// Error Handling
// =============================================================================

fn to_js_error<E: std::fmt::Display>(err: E) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(to_js_error)
}

/// Enable Rust logging to the browser console.
/// Call this once at startup to see tracing logs in DevTools.
#[wasm_bindgen(js_name = enableConsoleLogging)]
pub fn enable_console_logging(debug: bool) {
    use bridge_traits::time::LogLevel;
    use core_runtime::logging::{init_logging, LoggingConfig};

    let level = if debug { LogLevel::Debug } else { LogLevel::Info };
    let _ = init_logging(LoggingConfig::default().with_level(level));
}

// =============================================================================
// Core
// =============================================================================

/// JavaScript-accessible core for one page.
#[wasm_bindgen]
pub struct JsCore {
    core: CoreService,
    media: Arc<dyn MediaSource>,
    player: Rc<PlayerTracker>,
}

#[wasm_bindgen]
impl JsCore {
    /// Detect the storage tiers of this context and attach to the page's
    /// player.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<JsCore, JsValue> {
        let (core, media) = bootstrap_wasm(WasmBridgeConfig::default()).map_err(to_js_error)?;
        let player = Rc::new(core.player(Arc::clone(&media)));
        Ok(JsCore {
            core,
            media,
            player,
        })
    }

    /// Names of the storage tiers in use.
    #[wasm_bindgen(js_name = storageTiers)]
    pub fn storage_tiers(&self) -> Vec<String> {
        self.core
            .available_tiers()
            .into_iter()
            .map(|tier| tier.to_string())
            .collect()
    }

    /// Forward a player event: `{ type: 'play' | 'pause' | 'ended' |
    /// 'navigated' | 'unload' }` or `{ type: 'positionSample', position, rate }`.
    #[wasm_bindgen(js_name = handleSignal)]
    pub fn handle_signal(&self, signal: JsValue) -> Result<Promise, JsValue> {
        let signal: PlaybackSignal = serde_wasm_bindgen::from_value(signal)?;
        let player = Rc::clone(&self.player);
        Ok(future_to_promise(async move {
            player.handle(signal).await.map_err(to_js_error)?;
            Ok(JsValue::UNDEFINED)
        }))
    }

    /// Adjusted time text for the current player state, or `undefined`.
    #[wasm_bindgen(js_name = overlayLabel)]
    pub fn overlay_label(&self) -> Promise {
        let core = self.core.clone();
        let snapshot = self.media.snapshot();
        future_to_promise(async move {
            let Some(snapshot) = snapshot else {
                return Ok(JsValue::UNDEFINED);
            };
            Ok(match core.overlay_label(&snapshot).await {
                Some(label) => JsValue::from_str(&label),
                None => JsValue::UNDEFINED,
            })
        })
    }

    /// Savings of the current run, formatted for the tooltip.
    #[wasm_bindgen(js_name = savingsTooltip)]
    pub fn savings_tooltip(&self) -> Promise {
        let settings = self.core.settings();
        let session = self.player.savings().session_total();
        future_to_promise(async move {
            let global = settings.global_time_saved().await;
            Ok(JsValue::from_str(&core_playback::display::savings_tooltip(
                session, global,
            )))
        })
    }

    #[wasm_bindgen(js_name = overlaySettings)]
    pub fn overlay_settings(&self) -> Promise {
        let settings = self.core.settings();
        future_to_promise(async move { to_js(&settings.overlay_settings().await) })
    }

    /// Apply the options form.
    #[wasm_bindgen(js_name = applySettings)]
    pub fn apply_settings(&self, update: JsValue) -> Result<Promise, JsValue> {
        let update: SettingsUpdate = serde_wasm_bindgen::from_value(update)?;
        let settings = self.core.settings();
        Ok(future_to_promise(async move {
            settings.apply(update).await.map_err(to_js_error)?;
            Ok(JsValue::UNDEFINED)
        }))
    }

    #[wasm_bindgen(js_name = setCollapsed)]
    pub fn set_collapsed(&self, collapsed: bool) -> Promise {
        let settings = self.core.settings();
        settings_call(settings, move |s| async move { s.set_collapsed(collapsed).await })
    }

    #[wasm_bindgen(js_name = watchStats)]
    pub fn watch_stats(&self) -> Promise {
        let core = self.core.clone();
        future_to_promise(async move { to_js(&core.watch_stats().await) })
    }

    #[wasm_bindgen(js_name = exportJson)]
    pub fn export_json(&self) -> Promise {
        let settings = self.core.settings();
        future_to_promise(async move {
            let text = settings.export_json().await.map_err(to_js_error)?;
            Ok(JsValue::from_str(&text))
        })
    }

    #[wasm_bindgen(js_name = importJson)]
    pub fn import_json(&self, text: String) -> Promise {
        let settings = self.core.settings();
        settings_call(settings, move |s| async move { s.import_json(&text).await })
    }

    #[wasm_bindgen(js_name = resetTimeSaved)]
    pub fn reset_time_saved(&self) -> Promise {
        settings_call(self.core.settings(), |s| async move {
            s.reset_global_time_saved().await
        })
    }

    #[wasm_bindgen(js_name = resetWatchStats)]
    pub fn reset_watch_stats(&self) -> Promise {
        settings_call(self.core.settings(), |s| async move { s.reset_watch_stats().await })
    }

    #[wasm_bindgen(js_name = clearAll)]
    pub fn clear_all(&self) -> Promise {
        settings_call(self.core.settings(), |s| async move { s.clear_all().await })
    }
}

/// Run a unit-returning settings operation as a promise.
fn settings_call<F, Fut>(settings: Arc<SettingsService>, op: F) -> Promise
where
    F: FnOnce(Arc<SettingsService>) -> Fut + 'static,
    Fut: std::future::Future<Output = core_settings::Result<()>> + 'static,
{
    future_to_promise(async move {
        op(settings).await.map_err(to_js_error)?;
        Ok(JsValue::UNDEFINED)
    })
}
