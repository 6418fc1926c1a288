//! Integration tests for logging system

use bridge_traits::time::LogLevel;
use core_runtime::logging::{redact_field, LogFormat, LoggingConfig};

#[test]
fn test_logging_initialization() {
    // Logging can only be initialized once per process, so only the builder
    // is exercised here.
    let config = LoggingConfig::default()
        .with_format(LogFormat::Json)
        .with_level(LogLevel::Debug)
        .with_history_redaction(true)
        .with_spans(true);

    assert_eq!(config.format, LogFormat::Json);
    assert_eq!(config.level, LogLevel::Debug);
    assert!(config.redact_history);
    assert!(config.enable_spans);
}

#[test]
fn test_history_fields_redacted() {
    assert_eq!(redact_field("title", "Lecture 4", true), "[REDACTED]");
    assert_eq!(redact_field("channel", "Some Channel", true), "[REDACTED]");
    assert_eq!(redact_field("content_id", "dQw4w9WgXcQ", true), "[REDACTED]");
    assert_eq!(redact_field("video_id", "dQw4w9WgXcQ", true), "[REDACTED]");
}

#[test]
fn test_history_fields_pass_through_when_disabled() {
    assert_eq!(redact_field("title", "Lecture 4", false), "Lecture 4");
}

#[test]
fn test_normal_values_pass_through() {
    assert_eq!(redact_field("amount", "1.5", true), "1.5");
    assert_eq!(redact_field("key", "boxColor", true), "boxColor");
    assert_eq!(redact_field("tier", "secondary", true), "secondary");
}

#[test]
fn test_filter_configuration() {
    let config = LoggingConfig::default().with_filter("core_settings=debug,core_playback=trace");

    assert_eq!(
        config.filter,
        Some("core_settings=debug,core_playback=trace".to_string())
    );
}

#[test]
fn test_config_chaining() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Warn)
        .with_history_redaction(false)
        .with_spans(false)
        .with_target(false)
        .with_thread_info(true);

    assert_eq!(config.format, LogFormat::Compact);
    assert_eq!(config.level, LogLevel::Warn);
    assert!(!config.redact_history);
    assert!(!config.enable_spans);
    assert!(!config.display_target);
    assert!(config.display_thread_info);
}
