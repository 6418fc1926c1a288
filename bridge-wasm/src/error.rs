//! Error types for WebAssembly bridge implementations

use bridge_traits::{BridgeError, StorageTier};
use thiserror::Error;
use wasm_bindgen::JsCast;

/// Result type for WebAssembly bridge operations
pub type WasmResult<T> = Result<T, WasmError>;

/// Errors that can occur in WebAssembly bridge implementations
#[derive(Error, Debug)]
pub enum WasmError {
    /// JavaScript error from web-sys or an extension API
    #[error("JavaScript error: {0}")]
    JavaScript(String),

    /// A browser API is missing in this context
    #[error("Not available: {0}")]
    NotAvailable(String),

    /// A value could not cross the JS boundary
    #[error("Conversion error: {0}")]
    Conversion(String),
}

impl WasmError {
    /// Attribute the error to a failed read of `tier`.
    pub fn read_failed(self, tier: StorageTier) -> BridgeError {
        match self {
            WasmError::NotAvailable(what) => BridgeError::NotAvailable(what),
            other => BridgeError::ReadFailed {
                tier,
                message: other.to_string(),
            },
        }
    }

    /// Attribute the error to a failed write of `tier`.
    pub fn write_failed(self, tier: StorageTier) -> BridgeError {
        match self {
            WasmError::NotAvailable(what) => BridgeError::NotAvailable(what),
            other => BridgeError::WriteFailed {
                tier,
                message: other.to_string(),
            },
        }
    }
}

impl From<WasmError> for BridgeError {
    fn from(err: WasmError) -> Self {
        match err {
            WasmError::NotAvailable(what) => BridgeError::NotAvailable(what),
            other => BridgeError::OperationFailed(other.to_string()),
        }
    }
}

impl From<wasm_bindgen::JsValue> for WasmError {
    fn from(js_value: wasm_bindgen::JsValue) -> Self {
        let msg = if js_value.is_string() {
            js_value
                .as_string()
                .unwrap_or_else(|| "Unknown error".to_string())
        } else if let Some(error) = js_value.dyn_ref::<js_sys::Error>() {
            error.message().into()
        } else {
            format!("{:?}", js_value)
        };
        WasmError::JavaScript(msg)
    }
}

impl From<serde_wasm_bindgen::Error> for WasmError {
    fn from(err: serde_wasm_bindgen::Error) -> Self {
        WasmError::Conversion(err.to_string())
    }
}
