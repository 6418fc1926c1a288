//! Key-Value Storage Abstractions
//!
//! A browser extension has up to three places to keep a setting, each with
//! different guarantees:
//! - **Primary**: a synchronizing store (`chrome.storage.sync`), follows the
//!   user across browsers but is quota limited and may be disabled
//! - **Secondary**: a local extension store (`chrome.storage.local`)
//! - **Fallback**: the page's own string-only store (`window.localStorage`)
//!
//! Each one is exposed to the core through [`StorageBackend`]. Adapters are
//! selected once at startup and injected; the core never sniffs the
//! environment itself.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::{error::Result, platform::PlatformSendSync};

/// Storage tier, ordered by preference for first-available reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageTier {
    /// Synchronizing store
    Primary,
    /// Local persistent store
    Secondary,
    /// In-page string-only store
    Fallback,
}

impl StorageTier {
    /// All tiers in preference order.
    pub const ALL: [StorageTier; 3] = [
        StorageTier::Primary,
        StorageTier::Secondary,
        StorageTier::Fallback,
    ];

    /// Position in preference order (0 is most preferred).
    pub fn index(self) -> usize {
        match self {
            StorageTier::Primary => 0,
            StorageTier::Secondary => 1,
            StorageTier::Fallback => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StorageTier::Primary => "primary",
            StorageTier::Secondary => "secondary",
            StorageTier::Fallback => "fallback",
        }
    }
}

impl fmt::Display for StorageTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A subset of tiers a key is persisted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TierSet {
    bits: u8,
}

impl TierSet {
    pub const fn all() -> Self {
        Self { bits: 0b111 }
    }

    pub const fn empty() -> Self {
        Self { bits: 0 }
    }

    pub const fn only(tier: StorageTier) -> Self {
        Self::empty().with(tier)
    }

    pub const fn with(self, tier: StorageTier) -> Self {
        let bit = match tier {
            StorageTier::Primary => 0b001,
            StorageTier::Secondary => 0b010,
            StorageTier::Fallback => 0b100,
        };
        Self {
            bits: self.bits | bit,
        }
    }

    pub fn contains(self, tier: StorageTier) -> bool {
        self.bits & (1 << tier.index()) != 0
    }

    pub fn is_empty(self) -> bool {
        self.bits == 0
    }

    /// Tiers in the set, in preference order.
    pub fn iter(self) -> impl Iterator<Item = StorageTier> {
        StorageTier::ALL
            .into_iter()
            .filter(move |tier| self.contains(*tier))
    }
}

impl Default for TierSet {
    fn default() -> Self {
        Self::all()
    }
}

/// How a backend represents values at rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueEncoding {
    /// Structured values (JSON-compatible) round-trip unchanged.
    Native,
    /// Only strings can be stored. The backend receives and returns
    /// `Value::String` exclusively; callers own the text encoding.
    Text,
}

/// Key-value storage backend for one tier.
///
/// Implementations report availability at call time: an extension API that
/// does not exist in the current context (content script without
/// `storage.sync`, tests, private windows) simply reports `false`.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::{StorageBackend, StorageTier};
///
/// async fn dump(backend: &dyn StorageBackend) -> Result<()> {
///     if backend.is_available() {
///         let value = backend.get("theme").await?;
///         println!("{}: {:?}", backend.tier(), value);
///     }
///     Ok(())
/// }
/// ```
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait StorageBackend: PlatformSendSync {
    /// Tier this backend serves.
    fn tier(&self) -> StorageTier;

    /// Representation used at rest.
    fn encoding(&self) -> ValueEncoding {
        ValueEncoding::Native
    }

    /// Whether the backend can be used right now.
    fn is_available(&self) -> bool {
        true
    }

    /// Read a value. `Ok(None)` when the key is unset.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Write a value, replacing any previous one.
    async fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Remove a key. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;

    /// Remove every key owned by this backend.
    async fn clear(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_order() {
        assert!(StorageTier::Primary < StorageTier::Secondary);
        assert!(StorageTier::Secondary < StorageTier::Fallback);
        assert_eq!(StorageTier::Fallback.index(), 2);
        assert_eq!(StorageTier::Secondary.to_string(), "secondary");
    }

    #[test]
    fn test_tier_set() {
        let set = TierSet::only(StorageTier::Secondary).with(StorageTier::Fallback);
        assert!(!set.contains(StorageTier::Primary));
        assert!(set.contains(StorageTier::Secondary));
        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec![StorageTier::Secondary, StorageTier::Fallback]
        );
        assert!(TierSet::empty().is_empty());
        assert_eq!(TierSet::default(), TierSet::all());
    }
}
