//! Logging system demonstration
//!
//! Run with:
//! ```bash
//! # Pretty format (default in debug)
//! cargo run --example logging_demo
//!
//! # JSON format
//! cargo run --example logging_demo -- json
//!
//! # With custom filter
//! cargo run --example logging_demo -- pretty "core_runtime=trace"
//! ```

use bridge_traits::time::LogLevel;
use core_runtime::logging::{init_logging, redact_if_sensitive, LogFormat, LoggingConfig};
use std::env;
use tracing::{debug, info, instrument, span, warn, Level};

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();

    let format = match args.get(1).map(String::as_str) {
        Some("json") => LogFormat::Json,
        Some("compact") => LogFormat::Compact,
        Some("pretty") => LogFormat::Pretty,
        _ => LogFormat::default(),
    };

    let mut config = LoggingConfig::default()
        .with_format(format)
        .with_level(LogLevel::Trace)
        .with_history_redaction(true);

    if let Some(filter) = args.get(2).cloned() {
        config = config.with_filter(filter);
    }

    init_logging(config).expect("Failed to initialize logging");

    info!(format = ?format, "Logging initialized");

    demo_structured_logging();
    demo_flush(3.2).await;

    info!("Demo complete");
}

fn demo_structured_logging() {
    let span = span!(Level::INFO, "watch_session");
    let _enter = span.enter();

    info!(
        content_id = %redact_if_sensitive("content_id", "dQw4w9WgXcQ"),
        title = %redact_if_sensitive("title", "Some Lecture"),
        duration_ms = 245_000,
        "Watch session recorded"
    );

    warn!(tier = "primary", "Tier unavailable, skipping write");
}

#[instrument]
async fn demo_flush(amount: f64) {
    debug!("Reading global total");
    tokio::time::sleep(tokio::time::Duration::from_millis(5)).await;
    info!(amount, global_total = 120.0 + amount, "Flushed time saved");
}
