//! Convenience helpers for wiring all wasm bridge implementations together.
//!
//! Host shells call [`build_wasm_bridges`] from their content script or
//! options page to get every bridge the core needs. Storage tiers missing
//! in the current context (no extension API on a plain page, `localStorage`
//! disabled) are left out, so the core runs on whatever subset exists.

use std::sync::Arc;

use bridge_traits::{
    playback::MediaSource,
    storage::{StorageBackend, StorageTier},
    time::{Clock, SystemClock},
};
use tracing::info;

use crate::media::{HtmlMediaSource, PageSelectors};
use crate::storage::{ExtensionStorageBackend, PageStorageBackend, DEFAULT_OWNED_PREFIXES};

/// Configuration for [`build_wasm_bridges`].
#[derive(Debug, Clone)]
pub struct WasmBridgeConfig {
    /// Prefixes of the `localStorage` keys owned by the overlay.
    pub owned_prefixes: Vec<String>,
    /// DOM lookup for the player and content metadata.
    pub selectors: PageSelectors,
    /// Skip `localStorage` (e.g. on the options page of a browser that
    /// partitions it away from content scripts).
    pub use_page_storage: bool,
}

impl WasmBridgeConfig {
    pub fn new() -> Self {
        Self {
            owned_prefixes: DEFAULT_OWNED_PREFIXES.iter().map(|p| p.to_string()).collect(),
            selectors: PageSelectors::default(),
            use_page_storage: true,
        }
    }

    /// Override the DOM selectors.
    pub fn with_selectors(mut self, selectors: PageSelectors) -> Self {
        self.selectors = selectors;
        self
    }

    pub fn with_page_storage(mut self, enabled: bool) -> Self {
        self.use_page_storage = enabled;
        self
    }
}

impl Default for WasmBridgeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Fully constructed wasm bridge objects ready for injection into the core.
pub struct WasmBridgeSet {
    /// `storage.sync`, if the extension API is reachable.
    pub primary: Option<Arc<dyn StorageBackend>>,
    /// `storage.local`, if the extension API is reachable.
    pub secondary: Option<Arc<dyn StorageBackend>>,
    /// `localStorage`, if enabled and usable.
    pub fallback: Option<Arc<dyn StorageBackend>>,
    /// Player on the current page.
    pub media: Arc<dyn MediaSource>,
    /// Wall clock of the browser.
    pub clock: Arc<dyn Clock>,
}

impl WasmBridgeSet {
    /// Tiers that were detected, in preference order.
    pub fn tiers(&self) -> Vec<StorageTier> {
        [&self.primary, &self.secondary, &self.fallback]
            .into_iter()
            .flatten()
            .map(|backend| backend.tier())
            .collect()
    }

    /// Convenience accessor to clone the media source.
    pub fn media(&self) -> Arc<dyn MediaSource> {
        Arc::clone(&self.media)
    }
}

fn detected(backend: Arc<dyn StorageBackend>) -> Option<Arc<dyn StorageBackend>> {
    backend.is_available().then_some(backend)
}

/// Build the browser bridge stack.
pub fn build_wasm_bridges(config: WasmBridgeConfig) -> WasmBridgeSet {
    let primary = detected(Arc::new(ExtensionStorageBackend::sync()));
    let secondary = detected(Arc::new(ExtensionStorageBackend::local()));
    let fallback = if config.use_page_storage {
        detected(Arc::new(
            PageStorageBackend::new().with_owned_prefixes(config.owned_prefixes.clone()),
        ))
    } else {
        None
    };

    let set = WasmBridgeSet {
        primary,
        secondary,
        fallback,
        media: Arc::new(HtmlMediaSource::with_selectors(config.selectors)),
        clock: Arc::new(SystemClock),
    };
    info!(tiers = ?set.tiers(), "Browser bridges ready");
    set
}
