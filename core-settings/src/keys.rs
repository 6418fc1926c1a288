//! Persisted keys.
//!
//! Key strings match what earlier releases of the extension wrote, so
//! existing user data is picked up unchanged.

use bridge_traits::{StorageTier, TierSet};
use serde_json::Value;

use crate::codec::number_value;

/// How the winning value is chosen when tiers disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcilePolicy {
    /// First tier in preference order that holds a value.
    FirstAvailable,
    /// Largest number across tiers; a missing value counts as zero.
    NumericMax,
    /// Longest array; ties go to the preferred tier.
    LongestArray,
}

/// Default value of a key, in a form usable in `const` items.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyDefault {
    Null,
    Bool(bool),
    Number(f64),
    Str(&'static str),
    EmptyArray,
}

impl KeyDefault {
    pub fn to_value(self) -> Value {
        match self {
            KeyDefault::Null => Value::Null,
            KeyDefault::Bool(b) => Value::Bool(b),
            KeyDefault::Number(n) => number_value(n),
            KeyDefault::Str(s) => Value::String(s.to_string()),
            KeyDefault::EmptyArray => Value::Array(Vec::new()),
        }
    }
}

/// Everything the reconciler needs to know about one key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeySpec {
    pub key: &'static str,
    pub policy: ReconcilePolicy,
    pub default: KeyDefault,
    /// Tiers the key is persisted in.
    pub tiers: TierSet,
}

impl KeySpec {
    pub const fn new(key: &'static str, policy: ReconcilePolicy, default: KeyDefault) -> Self {
        Self {
            key,
            policy,
            default,
            tiers: TierSet::all(),
        }
    }

    pub const fn in_tiers(mut self, tiers: TierSet) -> Self {
        self.tiers = tiers;
        self
    }

    pub fn default_value(&self) -> Value {
        self.default.to_value()
    }
}

pub const BOX_COLOR_ENABLED: KeySpec = KeySpec::new(
    "ytAdjustedTimeBoxColorEnabled",
    ReconcilePolicy::FirstAvailable,
    KeyDefault::Bool(true),
);

pub const BOX_COLOR: KeySpec = KeySpec::new(
    "ytAdjustedTimeBoxColor",
    ReconcilePolicy::FirstAvailable,
    KeyDefault::Str("#ffa500"),
);

pub const TEXT_COLOR: KeySpec = KeySpec::new(
    "ytAdjustedTimeTextColor",
    ReconcilePolicy::FirstAvailable,
    KeyDefault::Str("#fff"),
);

pub const THEME: KeySpec = KeySpec::new(
    "ytAdjustedTimeTheme",
    ReconcilePolicy::FirstAvailable,
    KeyDefault::Str("Classic"),
);

pub const SHOW_END_TIME: KeySpec = KeySpec::new(
    "ytAdjustedTimeShowEndTime",
    ReconcilePolicy::FirstAvailable,
    KeyDefault::Bool(true),
);

pub const USE_24_HOUR: KeySpec = KeySpec::new(
    "ytAdjustedTime24Hour",
    ReconcilePolicy::FirstAvailable,
    KeyDefault::Bool(false),
);

/// Percentage, 0 to 100.
pub const BOX_OPACITY: KeySpec = KeySpec::new(
    "ytAdjustedTimeBoxOpacity",
    ReconcilePolicy::FirstAvailable,
    KeyDefault::Number(100.0),
);

/// Seconds saved across all sessions.
pub const GLOBAL_TIME_SAVED: KeySpec = KeySpec::new(
    "ytAdjustedTimeGlobalSaved",
    ReconcilePolicy::NumericMax,
    KeyDefault::Number(0.0),
);

/// Watch-session history. Kept out of the synchronizing tier, whose quota is
/// too small for it.
pub const WATCH_STATS: KeySpec = KeySpec::new(
    "ytWatchStats",
    ReconcilePolicy::LongestArray,
    KeyDefault::EmptyArray,
)
.in_tiers(TierSet::only(StorageTier::Secondary).with(StorageTier::Fallback));

/// `{x, y}` of the dragged settings popup, unset until first drag.
pub const POPUP_POSITION: KeySpec = KeySpec::new(
    "ytAdjustedTimePopupPosition",
    ReconcilePolicy::FirstAvailable,
    KeyDefault::Null,
)
.in_tiers(TierSet::only(StorageTier::Primary).with(StorageTier::Fallback));

/// Per-page overlay collapse state; lives in the page store only.
pub const COLLAPSED: KeySpec = KeySpec::new(
    "ytAdjustedTimeCollapsed",
    ReconcilePolicy::FirstAvailable,
    KeyDefault::Bool(false),
)
.in_tiers(TierSet::only(StorageTier::Fallback));

/// Every persisted key.
pub const ALL: [KeySpec; 11] = [
    BOX_COLOR_ENABLED,
    BOX_COLOR,
    TEXT_COLOR,
    THEME,
    SHOW_END_TIME,
    USE_24_HOUR,
    BOX_OPACITY,
    GLOBAL_TIME_SAVED,
    WATCH_STATS,
    POPUP_POSITION,
    COLLAPSED,
];
