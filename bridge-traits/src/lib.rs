//! # Host Bridge Traits
//!
//! Platform abstraction traits that each host environment implements.
//!
//! ## Overview
//!
//! This crate defines the contract between the tracking core and the
//! environment it runs in. Each trait represents a capability the core needs
//! but that is provided differently per host (browser extension page, desktop
//! tool, test harness).
//!
//! ## Traits
//!
//! - [`StorageBackend`](storage::StorageBackend) - One key-value storage tier
//!   (synced, local, or in-page fallback)
//! - [`MediaSource`](playback::MediaSource) - Samples the player's position,
//!   duration, rate and loaded content
//! - [`Clock`](time::Clock) - Wall-clock source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Host Implementations
//!
//! | Host     | Implementation Crate | Storage tiers                          |
//! |----------|----------------------|----------------------------------------|
//! | Browser  | `bridge-wasm`        | `storage.sync`, `storage.local`, `localStorage` |
//! | Desktop  | `bridge-desktop`     | in-memory, SQLite, string map          |
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). A tier whose
//! API is missing reports [`BridgeError::NotAvailable`]; the settings core
//! treats that as permanent absence rather than a failure.
//!
//! ## Thread Safety
//!
//! On native targets every trait requires `Send + Sync`
//! ([`PlatformSendSync`](platform::PlatformSendSync)); on `wasm32` the bound
//! is dropped because browser handles are single-threaded.

pub mod error;
pub mod platform;
pub mod playback;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use playback::{ContentInfo, MediaSource, PlaybackSnapshot, TrackerId};
pub use storage::{StorageBackend, StorageTier, TierSet, ValueEncoding};
pub use time::{Clock, ConsoleLogger, LogEntry, LogLevel, LoggerSink, ManualClock, SystemClock};
