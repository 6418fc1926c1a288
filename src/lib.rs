//! Workspace placeholder crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates (`core-service`, `core-settings`, `core-playback`).
//! Host applications can depend on `pace-workspace` and enable the documented
//! features without needing to wire each crate individually.
//!
//! - `desktop-shims` (default): native adapters backed by Tokio and SQLite
//! - `wasm`: browser adapters for extension content scripts and option pages
//! - `stats`: direct access to the settings and playback tracking crates

#[cfg(feature = "desktop-shims")]
pub use core_service as service;

#[cfg(all(feature = "wasm", not(feature = "desktop-shims")))]
pub use core_service as service;

#[cfg(feature = "stats")]
pub use core_playback as playback;

#[cfg(feature = "stats")]
pub use core_settings as settings;
