//! Integration tests for read-through reconciliation
//!
//! These tests verify:
//! - Convergence of every available tier after a read, for every
//!   combination of available tiers and seeded values
//! - Policy selection across native and string-only tiers
//! - Healing of missing and stale tiers, and that failed tiers are left alone
//! - Serialization of read-modify-write on the same key

use std::sync::Arc;

use bridge_desktop::MemoryBackend;
use bridge_traits::{StorageBackend, StorageTier};
use core_runtime::events::{CoreEvent, EventBus, SettingsEvent};
use core_runtime::WritePolicy;
use core_settings::codec::{encode_for, stored_matches};
use core_settings::keys::{self, KeySpec};
use core_settings::{Reconciler, TieredStore};
use serde_json::{json, Value};

struct Tiers {
    primary: Arc<MemoryBackend>,
    secondary: Arc<MemoryBackend>,
    fallback: Arc<MemoryBackend>,
}

impl Tiers {
    fn new() -> Self {
        Self {
            primary: Arc::new(MemoryBackend::native(StorageTier::Primary)),
            secondary: Arc::new(MemoryBackend::native(StorageTier::Secondary)),
            fallback: Arc::new(MemoryBackend::text(StorageTier::Fallback)),
        }
    }

    fn get(&self, tier: StorageTier) -> &Arc<MemoryBackend> {
        match tier {
            StorageTier::Primary => &self.primary,
            StorageTier::Secondary => &self.secondary,
            StorageTier::Fallback => &self.fallback,
        }
    }

    /// Seed a value the way the tier would have stored it.
    fn seed(&self, tier: StorageTier, key: &str, value: &Value) {
        let backend = self.get(tier);
        backend.insert_raw(key, encode_for(backend.encoding(), value));
    }

    fn store(&self, policy: WritePolicy) -> Arc<TieredStore> {
        let backends: Vec<Arc<dyn StorageBackend>> = vec![
            self.primary.clone(),
            self.secondary.clone(),
            self.fallback.clone(),
        ];
        Arc::new(TieredStore::new(backends, policy))
    }

    fn reconciler(&self) -> Reconciler {
        Reconciler::new(self.store(WritePolicy::AwaitAll))
    }
}

fn assert_converged(tiers: &Tiers, spec: &KeySpec, available: &[StorageTier], winner: &Value) {
    for tier in spec.tiers.iter().filter(|t| available.contains(t)) {
        let backend = tiers.get(tier);
        let raw = backend
            .raw(spec.key)
            .unwrap_or_else(|| panic!("{} missing {} after reconcile", tier, spec.key));
        assert!(
            stored_matches(backend.encoding(), &raw, winner),
            "{} holds {} for {}, expected {}",
            tier,
            raw,
            spec.key,
            winner
        );
    }
}

/// Every subset of available tiers, and for each tier every choice of
/// "absent" or one of the candidate values.
async fn check_convergence(spec: KeySpec, candidates: &[Value]) {
    let choices: Vec<Option<&Value>> = std::iter::once(None)
        .chain(candidates.iter().map(Some))
        .collect();

    for mask in 0u8..8 {
        for a in &choices {
            for b in &choices {
                for c in &choices {
                    let tiers = Tiers::new();
                    let seeds = [*a, *b, *c];
                    let mut available = Vec::new();

                    for (i, tier) in StorageTier::ALL.into_iter().enumerate() {
                        if let Some(value) = seeds[i] {
                            tiers.seed(tier, spec.key, value);
                        }
                        let up = mask & (1 << i) != 0;
                        tiers.get(tier).set_available(up);
                        if up {
                            available.push(tier);
                        }
                    }

                    let reconciler = tiers.reconciler();
                    let winner = reconciler.get_reconciled(&spec).await;
                    assert_converged(&tiers, &spec, &available, &winner);

                    // A second read sees the same value
                    assert_eq!(reconciler.get_reconciled(&spec).await, winner);
                }
            }
        }
    }
}

#[tokio::test]
async fn test_convergence_first_available() {
    check_convergence(keys::THEME, &[json!("Dark"), json!("Ocean")]).await;
}

#[tokio::test]
async fn test_convergence_numeric_max() {
    check_convergence(keys::GLOBAL_TIME_SAVED, &[json!(5), json!(12.5)]).await;
}

#[tokio::test]
async fn test_convergence_longest_array() {
    check_convergence(keys::WATCH_STATS, &[json!([1]), json!([1, 2, 3])]).await;
}

#[tokio::test]
async fn test_numeric_string_in_fallback_matches_native_number() {
    let tiers = Tiers::new();
    tiers.secondary.insert_raw(keys::GLOBAL_TIME_SAVED.key, json!(5));
    tiers.fallback.insert_raw(keys::GLOBAL_TIME_SAVED.key, json!("5"));

    let reconciler = tiers.reconciler();
    let value = reconciler.get_reconciled(&keys::GLOBAL_TIME_SAVED).await;

    assert_eq!(value, json!(5));
    assert_eq!(tiers.primary.raw(keys::GLOBAL_TIME_SAVED.key), Some(json!(5)));
    assert_eq!(tiers.secondary.raw(keys::GLOBAL_TIME_SAVED.key), Some(json!(5)));
    assert_eq!(tiers.fallback.raw(keys::GLOBAL_TIME_SAVED.key), Some(json!("5")));
}

#[tokio::test]
async fn test_default_is_returned_and_persisted() {
    let tiers = Tiers::new();
    let bus = EventBus::new(16);
    let mut events = bus.subscribe();
    let reconciler = tiers.reconciler().with_events(bus);

    assert_eq!(reconciler.get_reconciled(&keys::THEME).await, json!("Classic"));
    assert_eq!(tiers.primary.raw(keys::THEME.key), Some(json!("Classic")));
    assert_eq!(tiers.fallback.raw(keys::THEME.key), Some(json!("Classic")));

    match events.try_recv() {
        Ok(CoreEvent::Settings(SettingsEvent::Healed { key, tiers })) => {
            assert_eq!(key, keys::THEME.key);
            assert_eq!(tiers, StorageTier::ALL.to_vec());
        }
        other => panic!("expected heal event, got {:?}", other),
    }

    // Second read changes nothing
    assert_eq!(reconciler.get_reconciled(&keys::THEME).await, json!("Classic"));
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_first_available_heals_stale_lower_tiers() {
    let tiers = Tiers::new();
    tiers.primary.insert_raw(keys::USE_24_HOUR.key, json!(true));
    tiers.secondary.insert_raw(keys::USE_24_HOUR.key, json!(false));
    tiers.fallback.insert_raw(keys::USE_24_HOUR.key, json!("false"));

    let value = tiers.reconciler().get_reconciled(&keys::USE_24_HOUR).await;

    assert_eq!(value, json!(true));
    assert_eq!(tiers.secondary.raw(keys::USE_24_HOUR.key), Some(json!(true)));
    assert_eq!(tiers.fallback.raw(keys::USE_24_HOUR.key), Some(json!("true")));
}

#[tokio::test]
async fn test_text_representation_drift_is_rewritten() {
    let tiers = Tiers::new();
    tiers.primary.insert_raw(keys::BOX_OPACITY.key, json!(80));
    tiers.secondary.insert_raw(keys::BOX_OPACITY.key, json!(80));
    tiers.fallback.insert_raw(keys::BOX_OPACITY.key, json!("80.0"));

    let value = tiers.reconciler().get_reconciled(&keys::BOX_OPACITY).await;

    assert_eq!(value, json!(80));
    assert_eq!(tiers.fallback.raw(keys::BOX_OPACITY.key), Some(json!("80")));
}

#[tokio::test]
async fn test_structured_value_in_text_tier() {
    let tiers = Tiers::new();
    tiers
        .fallback
        .insert_raw(keys::POPUP_POSITION.key, json!(r#"{"x":12,"y":34}"#));

    let value = tiers
        .reconciler()
        .get_reconciled(&keys::POPUP_POSITION)
        .await;

    assert_eq!(value, json!({"x": 12, "y": 34}));
    assert_eq!(
        tiers.primary.raw(keys::POPUP_POSITION.key),
        Some(json!({"x": 12, "y": 34}))
    );
    // Not a key of the secondary tier
    assert_eq!(tiers.secondary.raw(keys::POPUP_POSITION.key), None);
}

#[tokio::test]
async fn test_unset_value_is_not_propagated() {
    let tiers = Tiers::new();
    let value = tiers
        .reconciler()
        .get_reconciled(&keys::POPUP_POSITION)
        .await;

    assert!(value.is_null());
    assert!(tiers.primary.is_empty());
    assert!(tiers.fallback.is_empty());
}

#[tokio::test]
async fn test_malformed_text_falls_back_to_raw_string() {
    let tiers = Tiers::new();
    tiers
        .fallback
        .insert_raw(keys::WATCH_STATS.key, json!("[{broken"));
    tiers.secondary.insert_raw(keys::WATCH_STATS.key, json!([]));

    let value = tiers.reconciler().get_reconciled(&keys::WATCH_STATS).await;

    // The raw string is not an array, so the secondary's empty list wins
    assert_eq!(value, json!([]));
    assert_eq!(tiers.fallback.raw(keys::WATCH_STATS.key), Some(json!("[]")));
}

#[tokio::test]
async fn test_failed_read_counts_as_absent_and_is_healed() {
    let tiers = Tiers::new();
    tiers.primary.insert_raw(keys::GLOBAL_TIME_SAVED.key, json!(999));
    tiers.primary.fail_reads(true);
    tiers.secondary.insert_raw(keys::GLOBAL_TIME_SAVED.key, json!(10));

    let value = tiers
        .reconciler()
        .get_reconciled(&keys::GLOBAL_TIME_SAVED)
        .await;

    assert_eq!(value, json!(10));
    assert_eq!(tiers.primary.raw(keys::GLOBAL_TIME_SAVED.key), Some(json!(10)));
    assert_eq!(tiers.fallback.raw(keys::GLOBAL_TIME_SAVED.key), Some(json!("10")));
}

#[tokio::test]
async fn test_unreadable_tier_converges_on_winner() {
    let tiers = Tiers::new();
    tiers.primary.insert_raw(keys::THEME.key, json!("Dark"));
    tiers.secondary.fail_reads(true);

    let reconciled = tiers.reconciler().get_reconciled(&keys::THEME).await;

    assert_eq!(reconciled, json!("Dark"));
    assert_eq!(tiers.secondary.raw(keys::THEME.key), Some(json!("Dark")));
    assert_eq!(tiers.fallback.raw(keys::THEME.key), Some(json!("Dark")));
}

#[tokio::test]
async fn test_heal_failure_is_absorbed() {
    let tiers = Tiers::new();
    tiers.secondary.insert_raw(keys::THEME.key, json!("Light"));
    tiers.primary.fail_writes(true);

    let value = tiers.reconciler().get_reconciled(&keys::THEME).await;

    assert_eq!(value, json!("Light"));
    assert_eq!(tiers.primary.raw(keys::THEME.key), None);
    assert_eq!(tiers.fallback.raw(keys::THEME.key), Some(json!("Light")));
}

#[tokio::test]
async fn test_ad_hoc_key() {
    let tiers = Tiers::new();
    tiers.fallback.insert_raw("custom", json!("3"));

    let value = tiers
        .reconciler()
        .get_reconciled_with("custom", core_settings::ReconcilePolicy::NumericMax, json!(0))
        .await;

    assert_eq!(value, json!(3));
    assert_eq!(tiers.primary.raw("custom"), Some(json!(3)));
}

#[tokio::test]
async fn test_update_is_serialized_per_key() {
    let tiers = Tiers::new();
    let reconciler = Arc::new(tiers.reconciler());

    let mut handles = Vec::new();
    for _ in 0..20 {
        let reconciler = Arc::clone(&reconciler);
        handles.push(tokio::spawn(async move {
            reconciler
                .update(&keys::GLOBAL_TIME_SAVED, |current| {
                    json!(current.as_f64().unwrap_or(0.0) + 1.0)
                })
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(
        reconciler.get_reconciled(&keys::GLOBAL_TIME_SAVED).await,
        json!(20)
    );
}

#[tokio::test]
async fn test_overwrite_lowers_numeric_max() {
    let tiers = Tiers::new();
    for tier in StorageTier::ALL {
        tiers.seed(tier, keys::GLOBAL_TIME_SAVED.key, &json!(500));
    }
    let reconciler = tiers.reconciler();

    let report = reconciler
        .overwrite(&keys::GLOBAL_TIME_SAVED, &json!(0))
        .await;

    assert_eq!(report.written, StorageTier::ALL.to_vec());
    assert_eq!(
        reconciler.get_reconciled(&keys::GLOBAL_TIME_SAVED).await,
        json!(0)
    );
}

#[tokio::test]
async fn test_await_primary_detached_writes_land() {
    let tiers = Tiers::new();
    let reconciler = Reconciler::new(tiers.store(WritePolicy::AwaitPrimary));

    let report = reconciler.set(&keys::THEME, &json!("Dark")).await;
    assert_eq!(report.written, vec![StorageTier::Primary]);
    assert_eq!(
        report.detached,
        vec![StorageTier::Secondary, StorageTier::Fallback]
    );

    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
    assert_eq!(tiers.secondary.raw(keys::THEME.key), Some(json!("Dark")));
    assert_eq!(tiers.fallback.raw(keys::THEME.key), Some(json!("Dark")));
}

#[tokio::test]
async fn test_write_with_no_tier_emits_failure() {
    let tiers = Tiers::new();
    for tier in StorageTier::ALL {
        tiers.get(tier).set_available(false);
    }
    let bus = EventBus::new(16);
    let mut events = bus.subscribe();
    let reconciler = tiers.reconciler().with_events(bus);

    let report = reconciler.set(&keys::THEME, &json!("Dark")).await;

    assert!(!report.any_accepted());
    assert!(matches!(
        events.try_recv(),
        Ok(CoreEvent::Settings(SettingsEvent::WriteFailed { .. }))
    ));
}
