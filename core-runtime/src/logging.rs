//! # Logging & Tracing Infrastructure
//!
//! Installs the global `tracing` subscriber for the offline cache and mirrors
//! every event that passes the filter into an optional host
//! [`LoggerSink`](bridge_traits::time::LoggerSink).
//!
//! Components log through the `tracing` macros with structured fields
//! (`track_id`, `item_id`, `bytes`, ...) and `#[instrument]` their public
//! async operations. Nothing here is required for the core to work; a host
//! that never calls [`init_logging`] simply sees no output.
//!
//! ```ignore
//! use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
//! use bridge_traits::time::{ConsoleLogger, LogLevel};
//!
//! init_logging(
//!     LoggingConfig::default()
//!         .with_format(LogFormat::Compact)
//!         .with_level(LogLevel::Debug)
//!         .with_logger_sink(Arc::new(ConsoleLogger::default())),
//! )?;
//! ```

use crate::error::{Error, Result};

use bridge_traits::time::{LogEntry, LogLevel, LoggerSink};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::{
    filter::EnvFilter,
    fmt::format::FmtSpan,
    layer::{Context, SubscriberExt},
    registry::{LookupSpan, Registry},
    util::SubscriberInitExt,
    Layer,
};

/// Crates that log at the configured level; everything else is held at warn
const WORKSPACE_TARGETS: &[&str] = &[
    "core_runtime",
    "core_store",
    "core_download",
    "core_sync",
    "core_service",
    "provider_catalog",
    "bridge_desktop",
];

const NOISY_DEPENDENCIES: &[&str] = &["h2", "hyper", "reqwest", "sqlx"];

/// Field names whose values never leave the process
const SENSITIVE_FIELDS: &[&str] = &[
    "token",
    "password",
    "secret",
    "api_key",
    "authorization",
    "cookie",
    "signature",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, colored; the debug-build default
    Pretty,
    /// One JSON object per event; the release-build default
    Json,
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

#[derive(Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Level applied to the workspace crates when no custom filter is set
    pub level: LogLevel,
    /// `EnvFilter` directives replacing the default per-crate filter
    pub filter: Option<String>,
    /// Scrub sensitive fields and signed URLs before they reach the sink
    pub redact: bool,
    pub logger_sink: Option<Arc<dyn LoggerSink>>,
    /// Log span open/close for `#[instrument]`ed operations
    pub enable_spans: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::Info,
            filter: None,
            redact: true,
            logger_sink: None,
            enable_spans: false,
        }
    }
}

impl fmt::Debug for LoggingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingConfig")
            .field("format", &self.format)
            .field("level", &self.level)
            .field("filter", &self.filter)
            .field("redact", &self.redact)
            .field("logger_sink", &self.logger_sink.is_some())
            .field("enable_spans", &self.enable_spans)
            .finish()
    }
}

impl LoggingConfig {
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_redaction(mut self, redact: bool) -> Self {
        self.redact = redact;
        self
    }

    pub fn with_logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    pub fn with_spans(mut self, enable: bool) -> Self {
        self.enable_spans = enable;
        self
    }

    /// `EnvFilter` directives this configuration resolves to
    pub fn directives(&self) -> String {
        if let Some(filter) = &self.filter {
            return filter.clone();
        }

        let level = level_name(self.level);
        WORKSPACE_TARGETS
            .iter()
            .map(|target| format!("{}={}", target, level))
            .chain(
                NOISY_DEPENDENCIES
                    .iter()
                    .map(|target| format!("{}=warn", target)),
            )
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// Returns `Error::Config` if the filter does not parse or a global
/// subscriber is already installed.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_new(config.directives())
        .map_err(|e| Error::Config(format!("Invalid log filter: {}", e)))?;

    let span_events = if config.enable_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let output: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_span_events(span_events)
            .with_writer(io::stdout)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(config.enable_spans)
            .with_span_list(false)
            .with_writer(io::stdout)
            .boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer()
            .compact()
            .with_span_events(span_events)
            .with_writer(io::stdout)
            .boxed(),
    };

    let forward = config
        .logger_sink
        .map(|sink| SinkForwarder::new(sink, config.redact));

    tracing_subscriber::registry()
        .with(output)
        .with(forward)
        .with(filter)
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to initialize logging: {}", e)))
}

fn level_name(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Trace => "trace",
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    }
}

fn from_tracing_level(level: tracing::Level) -> LogLevel {
    match level {
        tracing::Level::TRACE => LogLevel::Trace,
        tracing::Level::DEBUG => LogLevel::Debug,
        tracing::Level::INFO => LogLevel::Info,
        tracing::Level::WARN => LogLevel::Warn,
        tracing::Level::ERROR => LogLevel::Error,
    }
}

/// Scrub one structured field before it leaves the process.
///
/// Values of sensitive fields are replaced outright. Stream and cover URLs
/// are signed, so their query string is dropped.
///
/// ```ignore
/// use core_runtime::logging::redact_field;
///
/// assert_eq!(redact_field("url", "https://cdn/t1.mp3?sig=abc"), "https://cdn/t1.mp3?[REDACTED]");
/// ```
pub fn redact_field(name: &str, value: &str) -> String {
    let name = name.to_ascii_lowercase();
    if SENSITIVE_FIELDS.iter().any(|field| name.contains(field)) {
        return "[REDACTED]".to_string();
    }

    let is_url = value.starts_with("http://") || value.starts_with("https://");
    match value.split_once('?') {
        Some((base, _)) if is_url => format!("{}?[REDACTED]", base),
        _ => value.to_string(),
    }
}

/// Layer that hands each event to the host sink
struct SinkForwarder {
    sink: Arc<dyn LoggerSink>,
    redact: bool,
}

impl SinkForwarder {
    fn new(sink: Arc<dyn LoggerSink>, redact: bool) -> Self {
        Self { sink, redact }
    }

    fn entry_for(&self, event: &Event<'_>, span: Option<&str>) -> Option<LogEntry> {
        let metadata = event.metadata();
        let level = from_tracing_level(*metadata.level());
        if level < self.sink.min_level() {
            return None;
        }

        let mut fields = FieldCollector::default();
        event.record(&mut fields);

        let message = fields
            .message
            .take()
            .unwrap_or_else(|| metadata.name().to_string());
        let mut entry = LogEntry::new(level, metadata.target(), message);
        for (key, value) in fields.values {
            let value = if self.redact {
                redact_field(&key, &value)
            } else {
                value
            };
            entry = entry.with_field(key, value);
        }
        if let Some(span) = span {
            entry = entry.with_span(span);
        }
        Some(entry)
    }
}

impl<S> Layer<S> for SinkForwarder
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let span = ctx.event_span(event);
        let Some(entry) = self.entry_for(event, span.as_ref().map(|s| s.name())) else {
            return;
        };

        let sink = Arc::clone(&self.sink);
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if let Err(e) = sink.log(entry).await {
                        eprintln!("Log sink rejected entry: {}", e);
                    }
                });
            }
            // Outside a runtime the sink is driven inline
            Err(_) => {
                if let Err(e) = futures::executor::block_on(sink.log(entry)) {
                    eprintln!("Log sink rejected entry: {}", e);
                }
            }
        }
    }
}

#[derive(Default)]
struct FieldCollector {
    message: Option<String>,
    values: HashMap<String, String>,
}

impl FieldCollector {
    fn insert(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = Some(value);
        } else {
            self.values.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, value.to_string());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.insert(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, format!("{:?}", value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as SinkResult;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        entries: Mutex<Vec<LogEntry>>,
    }

    #[async_trait]
    impl LoggerSink for RecordingSink {
        async fn log(&self, entry: LogEntry) -> SinkResult<()> {
            self.entries.lock().unwrap().push(entry);
            Ok(())
        }

        fn min_level(&self) -> LogLevel {
            LogLevel::Debug
        }
    }

    fn forwarding(redact: bool) -> (Arc<RecordingSink>, impl Subscriber + Send + Sync) {
        let sink = Arc::new(RecordingSink::default());
        let layer = SinkForwarder::new(sink.clone(), redact);
        (sink, tracing_subscriber::registry().with(layer))
    }

    #[test]
    fn test_default_directives() {
        let directives = LoggingConfig::default()
            .with_level(LogLevel::Debug)
            .directives();

        assert!(directives.contains("core_download=debug"));
        assert!(directives.contains("core_sync=debug"));
        assert!(directives.contains("sqlx=warn"));
        assert!(EnvFilter::try_new(&directives).is_ok());
    }

    #[test]
    fn test_custom_filter_replaces_defaults() {
        let config = LoggingConfig::default().with_filter("core_store=trace");
        assert_eq!(config.directives(), "core_store=trace");
    }

    #[test]
    fn test_redact_field() {
        assert_eq!(redact_field("api_token", "abc"), "[REDACTED]");
        assert_eq!(redact_field("Authorization", "Bearer x"), "[REDACTED]");
        assert_eq!(
            redact_field("url", "https://cdn.example.com/t1.mp3?sig=abc&exp=1"),
            "https://cdn.example.com/t1.mp3?[REDACTED]"
        );
        assert_eq!(redact_field("title", "What? Really?"), "What? Really?");
        assert_eq!(redact_field("track_id", "t1"), "t1");
    }

    #[test]
    fn test_forwarder_captures_fields_and_span() {
        let (sink, subscriber) = forwarding(false);
        tracing::subscriber::with_default(subscriber, || {
            let span = tracing::info_span!("run_transfer");
            let _entered = span.enter();
            tracing::info!(target: "core_download", track_id = "t1", bytes = 42u64, "Download complete");
            tracing::trace!("below the sink minimum");
        });

        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].target, "core_download");
        assert_eq!(entries[0].message, "Download complete");
        assert_eq!(entries[0].fields.get("bytes").map(String::as_str), Some("42"));
        assert_eq!(entries[0].span.as_deref(), Some("run_transfer"));
    }

    #[test]
    fn test_forwarder_redacts() {
        let (sink, subscriber) = forwarding(true);
        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(url = "https://cdn/t1?sig=abc", secret = "x", "Transfer failed");
        });

        let entries = sink.entries.lock().unwrap();
        assert_eq!(
            entries[0].fields.get("url").map(String::as_str),
            Some("https://cdn/t1?[REDACTED]")
        );
        assert_eq!(
            entries[0].fields.get("secret").map(String::as_str),
            Some("[REDACTED]")
        );
    }
}
