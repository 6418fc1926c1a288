//! # Desktop Bridge Implementations
//!
//! Native implementations of the bridge traits, used by desktop tooling
//! (importers, replay tools) and by the test suites of the core crates.
//!
//! ## Overview
//!
//! - [`MemoryBackend`] - HashMap-backed tier, native or string-only encoding,
//!   with availability and failure toggles
//! - [`SqliteBackend`] - persistent tier on a SQLite key-value table
//! - [`ManualMediaSource`] - media source driven by the host
//!
//! ## Feature Flags
//!
//! - `sqlite-store`: Enable the SQLite-backed tier (default)
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{MemoryBackend, SqliteBackend};
//! use bridge_traits::StorageTier;
//!
//! #[tokio::main]
//! async fn main() {
//!     let primary = SqliteBackend::open_default(StorageTier::Primary).await?;
//!     let fallback = MemoryBackend::text(StorageTier::Fallback);
//!
//!     // Use in core configuration
//! }
//! ```

mod media;
mod memory;

#[cfg(feature = "sqlite-store")]
mod settings;

pub use media::ManualMediaSource;
pub use memory::MemoryBackend;

#[cfg(feature = "sqlite-store")]
pub use settings::SqliteBackend;
