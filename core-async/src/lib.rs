//! Runtime-agnostic async primitives for the pace core.
//!
//! The tracking and settings crates run in two very different hosts:
//! - Native hosts (desktop tooling, tests): Tokio runtime
//! - Browser extensions compiled to WebAssembly: the page's event loop via
//!   `wasm-bindgen-futures` and `gloo-timers`
//!
//! Downstream crates depend on this crate instead of Tokio so the same
//! accumulator and recorder code compiles for both targets.
//!
//! # Modules
//!
//! - `task`: spawning detached work (periodic ticks, deferred session ends,
//!   best-effort storage writes) with abortable handles
//! - `time`: `sleep` and `Duration`
//! - `sync`: async `Mutex`
//!
//! # Examples
//!
//! ```rust,no_run
//! use core_async::task;
//! use core_async::time::{sleep, Duration};
//!
//! async fn example() {
//!     let handle = task::spawn(async {
//!         sleep(Duration::from_secs(5)).await;
//!     });
//!     handle.abort();
//! }
//! ```

pub mod sync;
pub mod task;
pub mod time;

pub use task::spawn;
pub use time::{sleep, Duration};
