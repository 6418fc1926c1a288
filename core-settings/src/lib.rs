//! # Core Settings
//!
//! Redundant settings persistence for the overlay.
//!
//! ## Overview
//!
//! Each logical setting is stored in up to three independently failing
//! tiers (synced extension storage, local extension storage, the page's own
//! string-only storage). Any of them may be missing, disabled, wiped or stale
//! at any moment. This crate keeps one logical value consistent across them:
//!
//! - [`store::TieredStore`] fans reads and writes out to the tiers
//! - [`reconcile::Reconciler`] picks a winner per key policy and heals
//!   diverging tiers on every read
//! - [`service::SettingsService`] exposes typed getters and setters, resets,
//!   and statistics import/export
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use core_settings::{Reconciler, SettingsService, TieredStore};
//!
//! let store = Arc::new(TieredStore::from_config(&config));
//! let settings = SettingsService::new(Arc::new(Reconciler::new(store)));
//!
//! settings.set_theme(Theme::Ocean).await?;
//! assert_eq!(settings.box_color().await, "#0077be");
//! ```

pub mod codec;
pub mod error;
pub mod keys;
pub mod reconcile;
pub mod service;
pub mod snapshot;
pub mod store;
pub mod theme;

pub use error::{Result, SettingsError};
pub use keys::{KeySpec, ReconcilePolicy};
pub use reconcile::Reconciler;
pub use service::{OverlaySettings, PopupPosition, SettingsService, SettingsUpdate};
pub use snapshot::{Snapshot, WatchSession};
pub use store::{TierRead, TieredStore, WriteReport};
pub use theme::Theme;
