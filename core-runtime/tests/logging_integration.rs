//! Integration tests for the global logging setup
//!
//! The global subscriber can be installed once per process, so everything
//! that touches it lives in a single test.

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::time::{LogEntry, LogLevel, LoggerSink};
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use core_runtime::Error;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct CollectingSink {
    entries: Mutex<Vec<LogEntry>>,
}

#[async_trait]
impl LoggerSink for CollectingSink {
    async fn log(&self, entry: LogEntry) -> BridgeResult<()> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        LogLevel::Info
    }
}

#[test]
fn test_global_init_forwards_to_sink_and_rejects_second_init() {
    let sink = Arc::new(CollectingSink::default());
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_filter("logging_integration=debug")
        .with_logger_sink(sink.clone());

    init_logging(config).unwrap();

    // No tokio runtime here, so the sink is driven inline
    tracing::info!(
        track_id = "t-42",
        bytes = 1024u64,
        url = "https://cdn.example.com/t-42?sig=abc",
        "Download complete"
    );
    tracing::debug!("below the sink's minimum level");

    {
        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "Download complete");
        assert_eq!(entries[0].fields.get("track_id").map(String::as_str), Some("t-42"));
        assert_eq!(entries[0].fields.get("bytes").map(String::as_str), Some("1024"));
        assert_eq!(
            entries[0].fields.get("url").map(String::as_str),
            Some("https://cdn.example.com/t-42?[REDACTED]")
        );
    }

    let second = init_logging(LoggingConfig::default());
    assert!(matches!(second, Err(Error::Config(_))));
}

#[test]
fn test_invalid_filter_is_config_error() {
    let config = LoggingConfig::default().with_filter("core_download=loud");
    assert!(matches!(init_logging(config), Err(Error::Config(_))));
}

#[test]
fn test_format_follows_build_profile() {
    let expected = if cfg!(debug_assertions) {
        LogFormat::Pretty
    } else {
        LogFormat::Json
    };
    assert_eq!(LoggingConfig::default().format, expected);
}
