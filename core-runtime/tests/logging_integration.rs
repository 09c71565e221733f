//! Integration tests for logging system

use bridge_traits::time::{ConsoleLogger, LogLevel};
use core_runtime::logging::{
    file_name, init_logging, loggable_source, redact_url, LogFormat, LoggingConfig,
};
use std::sync::Arc;

#[test]
fn test_logging_config_chaining() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Warn)
        .with_spans(true)
        .with_console(false)
        .with_logger_sink(Arc::new(ConsoleLogger::default()));

    assert_eq!(config.format, LogFormat::Compact);
    assert_eq!(config.level, LogLevel::Warn);
    assert!(config.enable_spans);
    assert!(!config.console);
    assert!(config.logger_sink.is_some());
}

#[test]
fn test_stream_urls_lose_credentials() {
    let signed = "https://media.example.net/v1/audio/123.aac?Expires=1700000000&Signature=abc";
    let redacted = redact_url(signed);
    assert_eq!(redacted, "https://media.example.net/v1/audio/123.aac");
    assert!(!redacted.contains("Signature"));
    assert_eq!(redact_url(""), "");
}

#[test]
fn test_local_sources_are_reduced_to_file_name() {
    assert_eq!(
        loggable_source("file:///var/mobile/Documents/song.mp3"),
        "song.mp3"
    );
    assert_eq!(file_name("D:\\data\\episode.m4a"), "episode.m4a");
    assert_eq!(file_name(""), "");
}

#[test]
fn test_format_selection() {
    #[cfg(debug_assertions)]
    assert_eq!(LoggingConfig::default().format, LogFormat::Pretty);

    #[cfg(not(debug_assertions))]
    assert_eq!(LoggingConfig::default().format, LogFormat::Json);
}

// Only one global subscriber per process, so this is the only test here that
// installs one.
#[test]
fn test_init_logging_twice_fails() {
    let config = LoggingConfig::default().with_filter("core_playback=debug");
    assert!(init_logging(config.clone()).is_ok());
    assert!(init_logging(config).is_err());
}
