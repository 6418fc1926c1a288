//! In-process storage backends.
//!
//! [`MemoryBackend`] stands in for any tier when no persistent store is
//! needed: native tools that only need a session-scoped store, and tests that
//! need to flip availability or inject failures at runtime.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::{StorageBackend, StorageTier, ValueEncoding},
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use tracing::trace;

/// HashMap-backed storage tier.
///
/// With [`ValueEncoding::Text`] the backend behaves like `window.localStorage`:
/// anything that is not a string is stored as its JSON text and reads always
/// yield `Value::String`.
#[derive(Debug)]
pub struct MemoryBackend {
    tier: StorageTier,
    encoding: ValueEncoding,
    entries: RwLock<HashMap<String, Value>>,
    available: AtomicBool,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryBackend {
    /// Structured-value store for the given tier.
    pub fn native(tier: StorageTier) -> Self {
        Self::with_encoding(tier, ValueEncoding::Native)
    }

    /// String-only store for the given tier.
    pub fn text(tier: StorageTier) -> Self {
        Self::with_encoding(tier, ValueEncoding::Text)
    }

    pub fn with_encoding(tier: StorageTier, encoding: ValueEncoding) -> Self {
        Self {
            tier,
            encoding,
            entries: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Mark the tier as present or absent in the environment.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Make every subsequent read fail with [`BridgeError::ReadFailed`].
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent write fail with [`BridgeError::WriteFailed`].
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Seed a raw value, bypassing availability and encoding.
    pub fn insert_raw(&self, key: impl Into<String>, value: Value) {
        self.write_map().insert(key.into(), value);
    }

    /// Inspect the raw stored value, bypassing availability.
    pub fn raw(&self, key: &str) -> Option<Value> {
        self.read_map().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.read_map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_map(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Value>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_map(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Value>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }

    fn ensure_available(&self) -> Result<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(BridgeError::NotAvailable(format!("{} storage", self.tier)))
        }
    }

    fn encode(&self, value: Value) -> Value {
        match (self.encoding, value) {
            (ValueEncoding::Text, Value::String(s)) => Value::String(s),
            (ValueEncoding::Text, other) => Value::String(other.to_string()),
            (ValueEncoding::Native, value) => value,
        }
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    fn tier(&self) -> StorageTier {
        self.tier
    }

    fn encoding(&self) -> ValueEncoding {
        self.encoding
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        self.ensure_available()?;
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(BridgeError::ReadFailed {
                tier: self.tier,
                message: "injected read failure".into(),
            });
        }
        Ok(self.read_map().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.ensure_available()?;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(BridgeError::WriteFailed {
                tier: self.tier,
                message: "injected write failure".into(),
            });
        }
        let value = self.encode(value);
        trace!(tier = %self.tier, key, "memory backend write");
        self.write_map().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.ensure_available()?;
        self.write_map().remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.ensure_available()?;
        self.write_map().clear();
        Ok(())
    }
}
