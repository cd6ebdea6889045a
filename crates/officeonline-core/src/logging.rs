use crate::config::{LoggingConfig, DEFAULT_LOG_FILTER};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

pub fn init_logging() {
    init_logging_with(None, None::<MemorySink>);
}

/// Like [`init_logging`], with the configured filter as the fallback for an
/// unset `RUST_LOG`.
pub fn init_logging_from(cfg: &LoggingConfig) {
    init_logging_with(Some(cfg.directive()), None::<MemorySink>);
}

/// Installs the global subscriber: `fmt` output filtered by `RUST_LOG`
/// (falling back to `default_filter`, then `info`), plus an optional sink.
pub fn init_logging_with<S: LogSink>(default_filter: Option<&str>, sink: Option<S>) {
    let _ = tracing_subscriber::registry()
        .with(env_filter(default_filter))
        .with(fmt::layer())
        .with(sink.map(SinkLayer::new))
        .try_init();
}

fn env_filter(default_filter: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter.unwrap_or(DEFAULT_LOG_FILTER)))
}

/// Receives human-readable diagnostic lines.
pub trait LogSink: Send + Sync + 'static {
    fn write(&self, line: &str);
}

/// Sink keeping every line in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear(&self) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl LogSink for MemorySink {
    fn write(&self, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_string());
    }
}

/// Tracing layer that formats each event as `LEVEL target: message k=v`
/// and hands it to a [`LogSink`]. A panicking sink is ignored.
pub struct SinkLayer<S> {
    sink: S,
}

impl<S: LogSink> SinkLayer<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }
}

impl<S, Sub> Layer<Sub> for SinkLayer<S>
where
    S: LogSink,
    Sub: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, Sub>) {
        let meta = event.metadata();

        let mut visitor = LineVisitor::default();
        event.record(&mut visitor);

        let mut line = format!("{} {}: {}", meta.level(), meta.target(), visitor.message);
        for (key, value) in &visitor.fields {
            let _ = write!(line, " {}={}", key, value);
        }

        let _ = catch_unwind(AssertUnwindSafe(|| self.sink.write(&line)));
    }
}

#[derive(Default)]
struct LineVisitor {
    message: String,
    fields: BTreeMap<String, String>,
}

impl tracing::field::Visit for LineVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.fields
                .insert(field.name().to_string(), format!("{:?}", value));
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields
                .insert(field.name().to_string(), value.to_string());
        }
    }
}
