//! Browser implementations of the storage tiers.
//!
//! - [`ExtensionStorageBackend`] talks to the WebExtension storage areas
//!   (`storage.sync` for the primary tier, `storage.local` for the secondary
//!   tier). The promise-based `browser.*` namespace is preferred; Chromium's
//!   callback-based `chrome.*` namespace is wrapped in a promise.
//! - [`PageStorageBackend`] uses the page's `localStorage`, which only holds
//!   strings.

use async_trait::async_trait;
use bridge_traits::{
    error::Result as BridgeResult,
    storage::{StorageBackend, StorageTier, ValueEncoding},
};
use js_sys::{Array, Function, Object, Promise, Reflect};
use serde::Serialize;
use serde_json::Value;
use tracing::trace;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

use crate::error::{WasmError, WasmResult};

/// Key prefixes owned by the overlay in a shared `localStorage`.
pub const DEFAULT_OWNED_PREFIXES: [&str; 2] = ["ytAdjustedTime", "ytWatchStats"];

/// Walk `path` from the global object; `None` if any step is missing.
fn lookup(path: &[&str]) -> Option<JsValue> {
    let mut current: JsValue = js_sys::global().into();
    for step in path {
        let next = Reflect::get(&current, &JsValue::from_str(step)).ok()?;
        if next.is_undefined() || next.is_null() {
            return None;
        }
        current = next;
    }
    Some(current)
}

/// WebExtension storage area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageArea {
    /// `storage.sync`, replicated across the user's browsers
    Sync,
    /// `storage.local`
    Local,
}

impl StorageArea {
    pub fn name(self) -> &'static str {
        match self {
            StorageArea::Sync => "sync",
            StorageArea::Local => "local",
        }
    }
}

/// Resolved handle to a storage area.
struct AreaHandle {
    area: JsValue,
    /// `browser.*` returns promises; `chrome.*` takes a trailing callback.
    promise_based: bool,
}

/// Primary or secondary tier backed by `browser.storage` / `chrome.storage`.
///
/// Values are stored natively, as structured clones of their JSON form.
#[derive(Debug, Clone)]
pub struct ExtensionStorageBackend {
    tier: StorageTier,
    area: StorageArea,
}

impl ExtensionStorageBackend {
    pub fn new(tier: StorageTier, area: StorageArea) -> Self {
        Self { tier, area }
    }

    /// `storage.sync` serving the primary tier.
    pub fn sync() -> Self {
        Self::new(StorageTier::Primary, StorageArea::Sync)
    }

    /// `storage.local` serving the secondary tier.
    pub fn local() -> Self {
        Self::new(StorageTier::Secondary, StorageArea::Local)
    }

    pub fn area(&self) -> StorageArea {
        self.area
    }

    fn handle(&self) -> Option<AreaHandle> {
        let name = self.area.name();
        if let Some(area) = lookup(&["browser", "storage", name]) {
            return Some(AreaHandle {
                area,
                promise_based: true,
            });
        }
        lookup(&["chrome", "storage", name]).map(|area| AreaHandle {
            area,
            promise_based: false,
        })
    }

    /// Call `method` on the storage area and await its result.
    async fn invoke(&self, method: &str, args: Vec<JsValue>) -> WasmResult<JsValue> {
        let handle = self.handle().ok_or_else(|| {
            WasmError::NotAvailable(format!("storage.{}", self.area.name()))
        })?;
        let function: Function = Reflect::get(&handle.area, &JsValue::from_str(method))?
            .dyn_into()
            .map_err(|_| WasmError::NotAvailable(format!("storage.{}.{method}", self.area.name())))?;

        let arguments: Array = args.into_iter().collect();
        let promise = if handle.promise_based {
            function
                .apply(&handle.area, &arguments)?
                .dyn_into::<Promise>()
                .map_err(|_| WasmError::JavaScript(format!("{method} did not return a promise")))?
        } else {
            let area = handle.area.clone();
            Promise::new(&mut |resolve, reject| {
                arguments.push(&resolve);
                if let Err(err) = function.apply(&area, &arguments) {
                    let _ = reject.call1(&JsValue::UNDEFINED, &err);
                }
            })
        };

        let result = JsFuture::from(promise).await?;

        if !handle.promise_based {
            if let Some(last_error) = lookup(&["chrome", "runtime", "lastError"]) {
                let message = Reflect::get(&last_error, &JsValue::from_str("message"))
                    .ok()
                    .and_then(|m| m.as_string())
                    .unwrap_or_else(|| "unknown extension error".to_string());
                return Err(WasmError::JavaScript(message));
            }
        }
        Ok(result)
    }

    async fn read(&self, key: &str) -> WasmResult<Option<Value>> {
        let result = self.invoke("get", vec![JsValue::from_str(key)]).await?;
        let raw = Reflect::get(&result, &JsValue::from_str(key))?;
        if raw.is_undefined() {
            return Ok(None);
        }
        Ok(Some(serde_wasm_bindgen::from_value(raw)?))
    }

    async fn write(&self, key: &str, value: &Value) -> WasmResult<()> {
        let serializer = serde_wasm_bindgen::Serializer::json_compatible();
        let js_value = value.serialize(&serializer)?;
        let items = Object::new();
        Reflect::set(&items, &JsValue::from_str(key), &js_value)?;
        self.invoke("set", vec![items.into()]).await?;
        Ok(())
    }
}

#[async_trait(?Send)]
impl StorageBackend for ExtensionStorageBackend {
    fn tier(&self) -> StorageTier {
        self.tier
    }

    fn is_available(&self) -> bool {
        self.handle().is_some()
    }

    async fn get(&self, key: &str) -> BridgeResult<Option<Value>> {
        self.read(key).await.map_err(|e| e.read_failed(self.tier))
    }

    async fn set(&self, key: &str, value: Value) -> BridgeResult<()> {
        trace!(tier = %self.tier, key, "extension storage write");
        self.write(key, &value)
            .await
            .map_err(|e| e.write_failed(self.tier))
    }

    async fn remove(&self, key: &str) -> BridgeResult<()> {
        self.invoke("remove", vec![JsValue::from_str(key)])
            .await
            .map(|_| ())
            .map_err(|e| e.write_failed(self.tier))
    }

    async fn clear(&self) -> BridgeResult<()> {
        self.invoke("clear", Vec::new())
            .await
            .map(|_| ())
            .map_err(|e| e.write_failed(self.tier))
    }
}

fn local_storage() -> WasmResult<web_sys::Storage> {
    let window = web_sys::window().ok_or_else(|| WasmError::NotAvailable("window".into()))?;
    window
        .local_storage()?
        .ok_or_else(|| WasmError::NotAvailable("localStorage".into()))
}

/// Fallback tier on the page's `localStorage`.
///
/// In a content script this storage is shared with the host page, so
/// [`clear`](StorageBackend::clear) only removes keys under the owned
/// prefixes.
#[derive(Debug, Clone)]
pub struct PageStorageBackend {
    tier: StorageTier,
    owned_prefixes: Vec<String>,
}

impl PageStorageBackend {
    pub fn new() -> Self {
        Self {
            tier: StorageTier::Fallback,
            owned_prefixes: DEFAULT_OWNED_PREFIXES.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Replace the prefixes removed by `clear`.
    pub fn with_owned_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.owned_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    fn owned_keys(&self, storage: &web_sys::Storage) -> WasmResult<Vec<String>> {
        let len = storage.length()?;
        let mut keys = Vec::new();
        for idx in 0..len {
            if let Some(entry) = storage.key(idx)? {
                if self.owned_prefixes.iter().any(|p| entry.starts_with(p.as_str())) {
                    keys.push(entry);
                }
            }
        }
        Ok(keys)
    }
}

impl Default for PageStorageBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl StorageBackend for PageStorageBackend {
    fn tier(&self) -> StorageTier {
        self.tier
    }

    fn encoding(&self) -> ValueEncoding {
        ValueEncoding::Text
    }

    fn is_available(&self) -> bool {
        local_storage().is_ok()
    }

    async fn get(&self, key: &str) -> BridgeResult<Option<Value>> {
        let storage = local_storage().map_err(|e| e.read_failed(self.tier))?;
        let item = storage
            .get_item(key)
            .map_err(|e| WasmError::from(e).read_failed(self.tier))?;
        Ok(item.map(Value::String))
    }

    async fn set(&self, key: &str, value: Value) -> BridgeResult<()> {
        let storage = local_storage().map_err(|e| e.write_failed(self.tier))?;
        let text = match value {
            Value::String(text) => text,
            other => other.to_string(),
        };
        storage
            .set_item(key, &text)
            .map_err(|e| WasmError::from(e).write_failed(self.tier))
    }

    async fn remove(&self, key: &str) -> BridgeResult<()> {
        let storage = local_storage().map_err(|e| e.write_failed(self.tier))?;
        storage
            .remove_item(key)
            .map_err(|e| WasmError::from(e).write_failed(self.tier))
    }

    async fn clear(&self) -> BridgeResult<()> {
        let storage = local_storage().map_err(|e| e.write_failed(self.tier))?;
        let keys = self
            .owned_keys(&storage)
            .map_err(|e| e.write_failed(self.tier))?;
        for key in keys {
            storage
                .remove_item(&key)
                .map_err(|e| WasmError::from(e).write_failed(self.tier))?;
        }
        Ok(())
    }
}
