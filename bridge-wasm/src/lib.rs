//! WebAssembly Bridge Implementations
//!
//! This crate provides browser implementations of the bridge traits defined
//! in `bridge-traits`, for extension content scripts and options pages. The
//! implementations use browser APIs through `web-sys`, `js-sys` and
//! `wasm-bindgen`.
//!
//! # Platform Support
//!
//! This crate is designed exclusively for the `wasm32-unknown-unknown` target.
//! It will not compile for native targets.
//!
//! # Implementations
//!
//! - `ExtensionStorageBackend`: `storage.sync` / `storage.local` tiers
//! - `PageStorageBackend`: `localStorage` fallback tier (strings only)
//! - `HtmlMediaSource`: `<video>` element and watch page metadata
//!
//! # Examples
//!
//! ```ignore
//! use bridge_wasm::{build_wasm_bridges, WasmBridgeConfig};
//!
//! let bridges = build_wasm_bridges(WasmBridgeConfig::default());
//! tracing::info!("storage tiers: {:?}", bridges.tiers());
//! ```

#![cfg(target_arch = "wasm32")]

pub mod bootstrap;
pub mod error;
pub mod media;
pub mod storage;

// Re-export commonly used types
pub use bootstrap::{build_wasm_bridges, WasmBridgeConfig, WasmBridgeSet};
pub use error::{WasmError, WasmResult};
pub use media::{HtmlMediaSource, PageSelectors};
pub use storage::{ExtensionStorageBackend, PageStorageBackend, StorageArea};
