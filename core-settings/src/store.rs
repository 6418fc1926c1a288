//! # Multi-Backend Key-Value Store
//!
//! [`TieredStore`] fans reads and writes out to up to three storage tiers.
//! Backends are injected once; availability is re-checked on every call
//! because an extension context can lose a storage area at runtime.
//!
//! Reads are issued to all tiers concurrently and awaited together. Writes
//! follow the configured [`WritePolicy`]: the most preferred available tier is
//! awaited and the others are detached, or every tier is awaited.

use std::fmt;
use std::sync::Arc;

use bridge_traits::{StorageBackend, StorageTier, TierSet, ValueEncoding};
use core_runtime::{CoreConfig, WritePolicy};
use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, warn};

use crate::codec::encode_for;
use crate::error::{Result, SettingsError};

/// Outcome of reading one key from one tier.
#[derive(Debug, Clone, PartialEq)]
pub enum TierRead {
    /// The raw stored value, as returned by the backend.
    Value(Value),
    /// The tier is available but has no value for the key.
    Missing,
    /// No backend is configured for the tier, or it reports unavailable.
    Unavailable,
    /// The backend errored; treated as absent.
    Failed(String),
}

impl TierRead {
    pub fn value(&self) -> Option<&Value> {
        match self {
            TierRead::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Whether the tier answered the read (with or without a value).
    pub fn answered(&self) -> bool {
        matches!(self, TierRead::Value(_) | TierRead::Missing)
    }
}

/// Per-tier reads of one key, in preference order.
#[derive(Debug, Clone, PartialEq)]
pub struct TierReads {
    entries: Vec<(StorageTier, TierRead)>,
}

impl TierReads {
    pub fn iter(&self) -> impl Iterator<Item = &(StorageTier, TierRead)> {
        self.entries.iter()
    }

    pub fn get(&self, tier: StorageTier) -> Option<&TierRead> {
        self.entries
            .iter()
            .find(|(t, _)| *t == tier)
            .map(|(_, read)| read)
    }

    /// Whether any tier produced a value.
    pub fn any_value(&self) -> bool {
        self.entries.iter().any(|(_, read)| read.value().is_some())
    }
}

/// What happened to each tier during a write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
    /// Tiers whose write completed before returning.
    pub written: Vec<StorageTier>,
    /// Tiers handed to a background task.
    pub detached: Vec<StorageTier>,
    /// Tiers not configured or unavailable.
    pub skipped: Vec<StorageTier>,
    /// Tiers whose awaited write failed.
    pub failed: Vec<(StorageTier, String)>,
}

impl WriteReport {
    /// Whether at least one tier accepted (or is accepting) the value.
    pub fn any_accepted(&self) -> bool {
        !self.written.is_empty() || !self.detached.is_empty()
    }

    /// Convert a write with no accepting tier into an error.
    pub fn require_any(self, key: &str) -> Result<Self> {
        if self.any_accepted() {
            Ok(self)
        } else {
            Err(SettingsError::NoWritableTier {
                key: key.to_string(),
            })
        }
    }
}

/// Up to one backend per tier.
#[derive(Clone)]
pub struct TieredStore {
    backends: [Option<Arc<dyn StorageBackend>>; 3],
    policy: WritePolicy,
}

impl TieredStore {
    /// Slot each backend by the tier it reports. A later backend for the same
    /// tier replaces the earlier one.
    pub fn new<I>(backends: I, policy: WritePolicy) -> Self
    where
        I: IntoIterator<Item = Arc<dyn StorageBackend>>,
    {
        let mut slots: [Option<Arc<dyn StorageBackend>>; 3] = [None, None, None];
        for backend in backends {
            let tier = backend.tier();
            if slots[tier.index()].is_some() {
                warn!(%tier, "Replacing previously registered backend");
            }
            slots[tier.index()] = Some(backend);
        }
        Self {
            backends: slots,
            policy,
        }
    }

    pub fn from_config(config: &CoreConfig) -> Self {
        Self::new(config.tiers(), config.write_policy)
    }

    pub fn write_policy(&self) -> WritePolicy {
        self.policy
    }

    pub fn backend(&self, tier: StorageTier) -> Option<&Arc<dyn StorageBackend>> {
        self.backends[tier.index()].as_ref()
    }

    fn available(&self, tier: StorageTier) -> Option<&Arc<dyn StorageBackend>> {
        self.backend(tier).filter(|b| b.is_available())
    }

    /// Encoding of a configured tier.
    pub fn encoding(&self, tier: StorageTier) -> Option<ValueEncoding> {
        self.backend(tier).map(|b| b.encoding())
    }

    /// Tiers that are configured and currently available, in preference
    /// order.
    pub fn available_tiers(&self) -> Vec<StorageTier> {
        StorageTier::ALL
            .into_iter()
            .filter(|tier| self.available(*tier).is_some())
            .collect()
    }

    /// Read `key` from every tier.
    pub async fn get(&self, key: &str) -> TierReads {
        self.get_in(key, TierSet::all()).await
    }

    /// Read `key` from the given tiers concurrently.
    pub async fn get_in(&self, key: &str, tiers: TierSet) -> TierReads {
        let reads = tiers.iter().map(|tier| async move {
            let read = self.get_tier(key, tier).await;
            (tier, read)
        });
        TierReads {
            entries: join_all(reads).await,
        }
    }

    /// Read `key` from one tier.
    pub async fn get_tier(&self, key: &str, tier: StorageTier) -> TierRead {
        let Some(backend) = self.available(tier) else {
            return TierRead::Unavailable;
        };

        match backend.get(key).await {
            Ok(Some(value)) => TierRead::Value(value),
            Ok(None) => TierRead::Missing,
            Err(e) if e.is_unavailable() => TierRead::Unavailable,
            Err(e) => {
                warn!(key, %tier, error = %e, "Tier read failed");
                TierRead::Failed(e.to_string())
            }
        }
    }

    /// Write `value` to one tier, encoded for that tier.
    pub async fn set_tier(&self, key: &str, value: &Value, tier: StorageTier) -> Result<()> {
        let backend = self.available(tier).ok_or_else(|| {
            SettingsError::Backend(bridge_traits::BridgeError::NotAvailable(format!(
                "{} storage",
                tier
            )))
        })?;
        backend
            .set(key, encode_for(backend.encoding(), value))
            .await?;
        debug!(key, %tier, "Wrote tier");
        Ok(())
    }

    /// Write `value` to every tier using the store's write policy.
    pub async fn set(&self, key: &str, value: &Value) -> WriteReport {
        self.set_in(key, value, TierSet::all()).await
    }

    /// Write `value` to the given tiers using the store's write policy.
    pub async fn set_in(&self, key: &str, value: &Value, tiers: TierSet) -> WriteReport {
        self.set_with(key, value, tiers, self.policy).await
    }

    /// Write `value` to the given tiers with an explicit policy.
    pub async fn set_with(
        &self,
        key: &str,
        value: &Value,
        tiers: TierSet,
        policy: WritePolicy,
    ) -> WriteReport {
        let mut report = WriteReport::default();
        let mut awaited = Vec::new();

        for tier in tiers.iter() {
            let Some(backend) = self.available(tier) else {
                report.skipped.push(tier);
                continue;
            };

            let await_this = match policy {
                WritePolicy::AwaitAll => true,
                WritePolicy::AwaitPrimary => awaited.is_empty(),
            };

            let encoded = encode_for(backend.encoding(), value);
            if await_this {
                awaited.push((tier, Arc::clone(backend), encoded));
            } else {
                report.detached.push(tier);
                let backend = Arc::clone(backend);
                let key = key.to_string();
                core_async::task::spawn(async move {
                    if let Err(e) = backend.set(&key, encoded).await {
                        warn!(key = %key, %tier, error = %e, "Background tier write failed");
                    }
                });
            }
        }

        let results = join_all(awaited.into_iter().map(|(tier, backend, encoded)| async move {
            (tier, backend.set(key, encoded).await)
        }))
        .await;

        for (tier, result) in results {
            match result {
                Ok(()) => report.written.push(tier),
                Err(e) if e.is_unavailable() => report.skipped.push(tier),
                Err(e) => {
                    warn!(key, %tier, error = %e, "Tier write failed");
                    report.failed.push((tier, e.to_string()));
                }
            }
        }

        debug!(
            key,
            written = report.written.len(),
            detached = report.detached.len(),
            failed = report.failed.len(),
            "Wrote setting"
        );
        report
    }

    /// Remove `key` from the given tiers, awaiting each.
    pub async fn remove_in(&self, key: &str, tiers: TierSet) -> WriteReport {
        let mut report = WriteReport::default();
        for tier in tiers.iter() {
            let Some(backend) = self.available(tier) else {
                report.skipped.push(tier);
                continue;
            };
            match backend.remove(key).await {
                Ok(()) => report.written.push(tier),
                Err(e) => {
                    warn!(key, %tier, error = %e, "Tier remove failed");
                    report.failed.push((tier, e.to_string()));
                }
            }
        }
        report
    }

    /// Wipe every key in one tier.
    pub async fn clear_tier(&self, tier: StorageTier) -> Result<()> {
        let backend = self.available(tier).ok_or_else(|| {
            SettingsError::Backend(bridge_traits::BridgeError::NotAvailable(format!(
                "{} storage",
                tier
            )))
        })?;
        backend.clear().await?;
        debug!(%tier, "Cleared tier");
        Ok(())
    }
}

impl fmt::Debug for TieredStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let configured: Vec<_> = StorageTier::ALL
            .into_iter()
            .filter(|tier| self.backend(*tier).is_some())
            .collect();
        f.debug_struct("TieredStore")
            .field("tiers", &configured)
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_desktop::MemoryBackend;
    use serde_json::json;

    fn memory_tiers() -> (Arc<MemoryBackend>, Arc<MemoryBackend>, Arc<MemoryBackend>) {
        (
            Arc::new(MemoryBackend::native(StorageTier::Primary)),
            Arc::new(MemoryBackend::native(StorageTier::Secondary)),
            Arc::new(MemoryBackend::text(StorageTier::Fallback)),
        )
    }

    fn store_of(
        backends: &(Arc<MemoryBackend>, Arc<MemoryBackend>, Arc<MemoryBackend>),
        policy: WritePolicy,
    ) -> TieredStore {
        let list: Vec<Arc<dyn StorageBackend>> = vec![
            backends.0.clone(),
            backends.1.clone(),
            backends.2.clone(),
        ];
        TieredStore::new(list, policy)
    }

    #[tokio::test]
    async fn test_get_reports_each_tier() {
        let tiers = memory_tiers();
        tiers.0.insert_raw("k", json!(1));
        tiers.1.set_available(false);
        tiers.2.fail_reads(true);
        let store = store_of(&tiers, WritePolicy::AwaitAll);

        let reads = store.get("k").await;
        assert_eq!(reads.get(StorageTier::Primary), Some(&TierRead::Value(json!(1))));
        assert_eq!(reads.get(StorageTier::Secondary), Some(&TierRead::Unavailable));
        assert!(matches!(
            reads.get(StorageTier::Fallback),
            Some(TierRead::Failed(_))
        ));
        assert!(reads.any_value());
    }

    #[tokio::test]
    async fn test_unconfigured_tier_is_unavailable() {
        let primary: Arc<dyn StorageBackend> =
            Arc::new(MemoryBackend::native(StorageTier::Primary));
        let store = TieredStore::new(vec![primary], WritePolicy::AwaitAll);

        assert_eq!(
            store.get_tier("k", StorageTier::Secondary).await,
            TierRead::Unavailable
        );
        assert_eq!(store.available_tiers(), vec![StorageTier::Primary]);
    }

    #[tokio::test]
    async fn test_set_encodes_for_text_tier() {
        let tiers = memory_tiers();
        let store = store_of(&tiers, WritePolicy::AwaitAll);

        let report = store.set("pos", &json!({"x": 3, "y": 4})).await;
        assert_eq!(report.written, StorageTier::ALL.to_vec());
        assert_eq!(tiers.0.raw("pos"), Some(json!({"x": 3, "y": 4})));
        assert_eq!(tiers.2.raw("pos"), Some(json!(r#"{"x":3,"y":4}"#)));
    }

    #[tokio::test]
    async fn test_set_skips_unavailable_and_reports_failures() {
        let tiers = memory_tiers();
        tiers.0.set_available(false);
        tiers.1.fail_writes(true);
        let store = store_of(&tiers, WritePolicy::AwaitAll);

        let report = store.set("k", &json!(true)).await;
        assert_eq!(report.skipped, vec![StorageTier::Primary]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.written, vec![StorageTier::Fallback]);
        assert!(report.any_accepted());
        assert_eq!(tiers.2.raw("k"), Some(json!("true")));
    }

    #[tokio::test]
    async fn test_await_primary_detaches_the_rest() {
        let tiers = memory_tiers();
        let store = store_of(&tiers, WritePolicy::AwaitPrimary);

        let report = store.set("k", &json!(7)).await;
        assert_eq!(report.written, vec![StorageTier::Primary]);
        assert_eq!(
            report.detached,
            vec![StorageTier::Secondary, StorageTier::Fallback]
        );
        assert_eq!(tiers.0.raw("k"), Some(json!(7)));

        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        assert_eq!(tiers.1.raw("k"), Some(json!(7)));
        assert_eq!(tiers.2.raw("k"), Some(json!("7")));
    }

    #[tokio::test]
    async fn test_await_primary_awaits_first_available() {
        let tiers = memory_tiers();
        tiers.0.set_available(false);
        let store = store_of(&tiers, WritePolicy::AwaitPrimary);

        let report = store.set("k", &json!(1)).await;
        assert_eq!(report.written, vec![StorageTier::Secondary]);
        assert_eq!(report.detached, vec![StorageTier::Fallback]);
    }

    #[tokio::test]
    async fn test_no_tier_accepts() {
        let store = TieredStore::new(Vec::new(), WritePolicy::AwaitAll);
        let report = store.set("k", &json!(1)).await;
        assert!(!report.any_accepted());
        assert!(matches!(
            report.require_any("k"),
            Err(SettingsError::NoWritableTier { .. })
        ));
    }

    #[tokio::test]
    async fn test_clear_tier() {
        let tiers = memory_tiers();
        tiers.2.insert_raw("a", json!("1"));
        let store = store_of(&tiers, WritePolicy::AwaitAll);

        store.clear_tier(StorageTier::Fallback).await.unwrap();
        assert!(tiers.2.is_empty());

        tiers.1.set_available(false);
        assert!(store.clear_tier(StorageTier::Secondary).await.is_err());
    }
}
