//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the pace core:
//! - Logging and tracing infrastructure
//! - Configuration management (storage tiers, tracker timings, write policy)
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that the settings and playback
//! crates depend on. It establishes the logging conventions and the event
//! broadcasting used throughout the system.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder, TrackerConfig, WritePolicy};
pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus};
