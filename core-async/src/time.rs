//! Time-related abstractions.
//!
//! - On native platforms: `tokio::time::sleep`, which honours Tokio's paused
//!   clock in tests (`#[tokio::test(start_paused = true)]`)
//! - On WASM: `gloo-timers`, backed by the browser's `setTimeout`

#[cfg(not(target_arch = "wasm32"))]
pub use tokio::time::{sleep, timeout};

pub use std::time::Duration;

#[cfg(target_arch = "wasm32")]
/// Sleeps for the specified duration using the browser's `setTimeout`.
pub async fn sleep(duration: Duration) {
    gloo_timers::future::sleep(duration).await
}
