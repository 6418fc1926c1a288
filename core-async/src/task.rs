//! Task spawning abstractions.
//!
//! Every task the core spawns is detached work that may need to be cancelled
//! later (a periodic flush loop, a deferred session end). [`TaskHandle`] wraps
//! the platform primitive so `abort()` genuinely stops the task on both
//! targets:
//!
//! - Native: `tokio::task::JoinHandle::abort`
//! - WASM: the future is wrapped in [`futures::future::Abortable`] before it is
//!   handed to `wasm_bindgen_futures::spawn_local`
//!
//! # Examples
//!
//! ```rust,no_run
//! use core_async::task;
//!
//! # async fn example() {
//! let handle = task::spawn(async {
//!     // periodic work
//! });
//! assert!(!handle.is_aborted());
//! handle.abort();
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Handle to a detached task.
///
/// Dropping the handle does not cancel the task; call [`TaskHandle::abort`].
pub struct TaskHandle {
    aborted: Arc<AtomicBool>,
    #[cfg(not(target_arch = "wasm32"))]
    inner: tokio::task::JoinHandle<()>,
    #[cfg(target_arch = "wasm32")]
    inner: futures::future::AbortHandle,
}

impl TaskHandle {
    /// Cancel the task at its next suspension point.
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
        self.inner.abort();
    }

    /// Whether [`TaskHandle::abort`] has been called.
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    /// Whether the task has run to completion.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("aborted", &self.is_aborted())
            .finish_non_exhaustive()
    }
}

/// Spawns a detached task on the Tokio runtime.
///
/// Must be called from within a Tokio runtime context.
#[cfg(not(target_arch = "wasm32"))]
pub fn spawn<F>(future: F) -> TaskHandle
where
    F: Future<Output = ()> + Send + 'static,
{
    TaskHandle {
        aborted: Arc::new(AtomicBool::new(false)),
        inner: tokio::task::spawn(future),
    }
}

/// Spawns a detached task on the browser event loop.
#[cfg(target_arch = "wasm32")]
pub fn spawn<F>(future: F) -> TaskHandle
where
    F: Future<Output = ()> + 'static,
{
    let (abort_handle, registration) = futures::future::AbortHandle::new_pair();
    let abortable = futures::future::Abortable::new(future, registration);
    wasm_bindgen_futures::spawn_local(async move {
        let _ = abortable.await;
    });
    TaskHandle {
        aborted: Arc::new(AtomicBool::new(false)),
        inner: abort_handle,
    }
}

/// Cooperatively yields execution back to the scheduler.
#[cfg(not(target_arch = "wasm32"))]
pub async fn yield_now() {
    tokio::task::yield_now().await
}

/// Cooperatively yields execution back to the browser event loop.
#[cfg(target_arch = "wasm32")]
pub async fn yield_now() {
    gloo_timers::future::TimeoutFuture::new(0).await;
}
