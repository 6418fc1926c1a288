//! Synchronization primitives.
//!
//! - On native platforms: `tokio::sync::Mutex` (`Send + Sync`, async-aware)
//! - On WASM: `futures::lock::Mutex` (single-threaded event loop)
//!
//! Both expose `Mutex::new` and an awaitable `lock()`, which is all the core
//! relies on.

#[cfg(not(target_arch = "wasm32"))]
pub use tokio::sync::{Mutex, MutexGuard};

#[cfg(target_arch = "wasm32")]
pub use futures::lock::{Mutex, MutexGuard};
