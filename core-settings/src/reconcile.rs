//! # Reconciliation Engine
//!
//! Read-through reconciliation keeps one logical value consistent across the
//! storage tiers. Every read:
//!
//! 1. reads all tiers the key lives in (concurrently) and decodes text tiers,
//! 2. picks a winner per [`ReconcilePolicy`],
//! 3. rewrites every available tier whose stored value differs from the
//!    winner, including tiers that were missing the key or failed the read,
//! 4. returns the winner.
//!
//! After a reconciliation every available tier holds the same value.
//!
//! Calls on the same key are serialized through a per-key async mutex so a
//! read-modify-write (the savings flush, a session append) cannot interleave
//! with another one in the same process. Concurrent writers in other tabs
//! remain last-write-wins; `NumericMax` and `LongestArray` heal those races on
//! the next read.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use bridge_traits::{StorageTier, TierSet, ValueEncoding};
use core_async::sync::Mutex;
use core_runtime::events::{CoreEvent, EventBus, SettingsEvent};
use core_runtime::WritePolicy;
use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, warn};

use crate::codec::{as_number, decode_text, number_value, stored_matches};
use crate::keys::{KeySpec, ReconcilePolicy};
use crate::store::{TierRead, TierReads, TieredStore, WriteReport};

/// One async mutex per key, created on first use.
#[derive(Default)]
pub struct KeyLocks {
    locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The mutex guarding `key`.
    pub fn get(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(
            locks
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }
}

/// Winner of a reconciliation plus the tiers that were rewritten.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub value: Value,
    pub healed: Vec<StorageTier>,
}

pub struct Reconciler {
    store: Arc<TieredStore>,
    locks: KeyLocks,
    events: Option<EventBus>,
}

impl Reconciler {
    pub fn new(store: Arc<TieredStore>) -> Self {
        Self {
            store,
            locks: KeyLocks::new(),
            events: None,
        }
    }

    /// Publish heal and write-failure notifications on `bus`.
    pub fn with_events(mut self, bus: EventBus) -> Self {
        self.events = Some(bus);
        self
    }

    pub fn store(&self) -> &Arc<TieredStore> {
        &self.store
    }

    /// Reconciled value of a known key.
    pub async fn get_reconciled(&self, spec: &KeySpec) -> Value {
        let lock = self.locks.get(spec.key);
        let _guard = lock.lock().await;
        self.reconcile(spec.key, spec.policy, &spec.default_value(), spec.tiers)
            .await
            .value
    }

    /// Reconciled value of an ad-hoc key stored in every tier.
    pub async fn get_reconciled_with(
        &self,
        key: &str,
        policy: ReconcilePolicy,
        default: Value,
    ) -> Value {
        let lock = self.locks.get(key);
        let _guard = lock.lock().await;
        self.reconcile(key, policy, &default, TierSet::all())
            .await
            .value
    }

    /// Locked read-reconcile-modify-write.
    ///
    /// `f` receives the reconciled current value and returns the value to
    /// store. Returns the stored value and how the tiers took it.
    pub async fn update<F>(&self, spec: &KeySpec, f: F) -> (Value, WriteReport)
    where
        F: FnOnce(&Value) -> Value,
    {
        let lock = self.locks.get(spec.key);
        let _guard = lock.lock().await;

        let current = self
            .reconcile(spec.key, spec.policy, &spec.default_value(), spec.tiers)
            .await
            .value;
        let next = f(&current);
        let report = self.store.set_in(spec.key, &next, spec.tiers).await;
        self.report_write_failure(spec.key, &report);
        (next, report)
    }

    /// Replace the value in every tier, awaiting each write.
    ///
    /// Used for explicit user actions (import, reset) where a stale tier must
    /// not survive: the next read would otherwise resurrect it.
    pub async fn overwrite(&self, spec: &KeySpec, value: &Value) -> WriteReport {
        let lock = self.locks.get(spec.key);
        let _guard = lock.lock().await;

        let report = self
            .store
            .set_with(spec.key, value, spec.tiers, WritePolicy::AwaitAll)
            .await;
        self.report_write_failure(spec.key, &report);
        report
    }

    /// Write using the store's policy without reading first.
    pub async fn set(&self, spec: &KeySpec, value: &Value) -> WriteReport {
        let lock = self.locks.get(spec.key);
        let _guard = lock.lock().await;

        let report = self.store.set_in(spec.key, value, spec.tiers).await;
        self.report_write_failure(spec.key, &report);
        report
    }

    async fn reconcile(
        &self,
        key: &str,
        policy: ReconcilePolicy,
        default: &Value,
        tiers: TierSet,
    ) -> Reconciled {
        let reads = self.store.get_in(key, tiers).await;
        let decoded = self.decode_reads(key, &reads);
        let winner = select_winner(policy, &decoded, default);

        // An unset value has nothing to propagate
        if winner.is_null() {
            return Reconciled {
                value: winner,
                healed: Vec::new(),
            };
        }

        let stale: Vec<StorageTier> = reads
            .iter()
            .filter_map(|(tier, read)| {
                let encoding = self.store.encoding(*tier)?;
                match read {
                    // A failed read counts as absence, so the tier is rewritten
                    TierRead::Missing | TierRead::Failed(_) => Some(*tier),
                    TierRead::Value(stored) if !stored_matches(encoding, stored, &winner) => {
                        Some(*tier)
                    }
                    _ => None,
                }
            })
            .collect();

        let heals = stale.iter().map(|tier| {
            let winner = &winner;
            async move { (*tier, self.store.set_tier(key, winner, *tier).await) }
        });

        let mut healed = Vec::new();
        for (tier, result) in join_all(heals).await {
            match result {
                Ok(()) => healed.push(tier),
                Err(e) => warn!(key, %tier, error = %e, "Failed to propagate reconciled value"),
            }
        }

        if !healed.is_empty() {
            debug!(key, tiers = ?healed, "Healed diverging tiers");
            self.emit(CoreEvent::Settings(SettingsEvent::Healed {
                key: key.to_string(),
                tiers: healed.clone(),
            }));
        }

        Reconciled {
            value: winner,
            healed,
        }
    }

    /// Typed values per tier, `None` where the tier holds nothing usable.
    fn decode_reads(&self, key: &str, reads: &TierReads) -> Vec<Option<Value>> {
        reads
            .iter()
            .map(|(tier, read)| {
                let raw = read.value()?;
                match (self.store.encoding(*tier), raw) {
                    (Some(ValueEncoding::Text), Value::String(text)) => {
                        match decode_text(key, text) {
                            Ok(value) => Some(value),
                            Err(e) => {
                                warn!(key, %tier, error = %e, "Keeping malformed value as text");
                                Some(raw.clone())
                            }
                        }
                    }
                    _ => Some(raw.clone()),
                }
            })
            .collect()
    }

    fn report_write_failure(&self, key: &str, report: &WriteReport) {
        if report.any_accepted() {
            return;
        }
        let message = if report.failed.is_empty() {
            "no storage tier available".to_string()
        } else {
            report
                .failed
                .iter()
                .map(|(tier, e)| format!("{}: {}", tier, e))
                .collect::<Vec<_>>()
                .join("; ")
        };
        warn!(key, %message, "No tier accepted the write");
        self.emit(CoreEvent::Settings(SettingsEvent::WriteFailed {
            key: key.to_string(),
            message,
        }));
    }

    fn emit(&self, event: CoreEvent) {
        if let Some(bus) = &self.events {
            // No subscribers is fine
            let _ = bus.emit(event);
        }
    }
}

/// Pick the winning value among decoded tier values (preference order).
pub fn select_winner(policy: ReconcilePolicy, values: &[Option<Value>], default: &Value) -> Value {
    match policy {
        ReconcilePolicy::FirstAvailable => values
            .iter()
            .flatten()
            .find(|v| !v.is_null())
            .cloned()
            .unwrap_or_else(|| default.clone()),

        ReconcilePolicy::NumericMax => {
            if values.iter().all(Option::is_none) {
                return if as_number(default).is_some() {
                    default.clone()
                } else {
                    number_value(0.0)
                };
            }
            let max = values
                .iter()
                .map(|v| v.as_ref().and_then(as_number).unwrap_or(0.0))
                .fold(0.0_f64, f64::max);
            number_value(max)
        }

        ReconcilePolicy::LongestArray => {
            let mut best: Option<&Vec<Value>> = None;
            for array in values.iter().flatten().filter_map(Value::as_array) {
                if best.map_or(true, |b| array.len() > b.len()) {
                    best = Some(array);
                }
            }
            best.map(|a| Value::Array(a.clone()))
                .unwrap_or_else(|| default.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_available_prefers_primary() {
        let values = [Some(json!("Dark")), Some(json!("Light")), None];
        assert_eq!(
            select_winner(ReconcilePolicy::FirstAvailable, &values, &json!("Classic")),
            json!("Dark")
        );
    }

    #[test]
    fn test_first_available_skips_missing_and_null() {
        let values = [None, Some(Value::Null), Some(json!(false))];
        assert_eq!(
            select_winner(ReconcilePolicy::FirstAvailable, &values, &json!(true)),
            json!(false)
        );
        assert_eq!(
            select_winner(ReconcilePolicy::FirstAvailable, &[None, None], &json!(true)),
            json!(true)
        );
    }

    #[test]
    fn test_numeric_max() {
        let values = [None, Some(json!(5)), Some(json!(12.5))];
        assert_eq!(
            select_winner(ReconcilePolicy::NumericMax, &values, &json!(0)),
            json!(12.5)
        );
    }

    #[test]
    fn test_numeric_max_ignores_non_numeric() {
        let values = [Some(json!("garbage")), Some(json!(3))];
        assert_eq!(
            select_winner(ReconcilePolicy::NumericMax, &values, &json!(0)),
            json!(3)
        );
    }

    #[test]
    fn test_numeric_max_all_missing_uses_default() {
        assert_eq!(
            select_winner(ReconcilePolicy::NumericMax, &[None, None, None], &json!(7)),
            json!(7)
        );
        assert_eq!(
            select_winner(ReconcilePolicy::NumericMax, &[None], &json!("x")),
            json!(0)
        );
    }

    #[test]
    fn test_longest_array_ties_go_to_preferred() {
        let values = [Some(json!([1, 2])), Some(json!([3, 4])), Some(json!([5]))];
        assert_eq!(
            select_winner(ReconcilePolicy::LongestArray, &values, &json!([])),
            json!([1, 2])
        );

        let values = [Some(json!([1])), Some(json!([1, 2, 3]))];
        assert_eq!(
            select_winner(ReconcilePolicy::LongestArray, &values, &json!([])),
            json!([1, 2, 3])
        );
    }

    #[test]
    fn test_longest_array_without_arrays_uses_default() {
        let values = [Some(json!("oops")), None];
        assert_eq!(
            select_winner(ReconcilePolicy::LongestArray, &values, &json!([])),
            json!([])
        );
    }

    #[tokio::test]
    async fn test_key_locks_share_per_key() {
        let locks = KeyLocks::new();
        let a = locks.get("a");
        assert!(Arc::ptr_eq(&a, &locks.get("a")));
        assert!(!Arc::ptr_eq(&a, &locks.get("b")));
    }
}
