//! Structured per-request logging with correlation IDs.
//!
//! A [`RequestLogger`] is created once per inbound request (by the request-log
//! middleware) and bound to one generated correlation ID and start time.
//! Every entry it emits carries `timestamp, level, request_id, route, method,
//! message`, so an operator can reconstruct a request's full trace by
//! grepping the log stream for its ID.
//!
//! # Correlation IDs
//!
//! IDs look like `req_k3x9m2p4q8w1`: 12 random lowercase-alphanumeric
//! characters behind a fixed prefix. They are log-correlation handles, not
//! security tokens; the generator is not cryptographically secure and the
//! collision risk is acceptable for this purpose.
//!
//! # Sinks
//!
//! Entries flow through a [`LogSink`]. The default [`TracingSink`] forwards
//! each entry as one line through `tracing` at the mapped level, so the
//! subscriber configured in `main.rs` decides the final encoding. Tests
//! inject a [`MemorySink`] to assert on entries directly.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value, json};

/// Prefix for generated correlation IDs.
pub const REQUEST_ID_PREFIX: &str = "req_";

/// Number of random characters after the prefix.
const REQUEST_ID_LEN: usize = 12;

/// Lowercase-alphanumeric alphabet for ID generation.
const ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Lowercase name used in the `level` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Destination for finished log entries.
pub trait LogSink: Send + Sync {
    /// Write one structured entry at the given level.
    fn write(&self, level: LogLevel, entry: &Value);
}

/// Default sink: one line per entry through the `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write(&self, level: LogLevel, entry: &Value) {
        let line = entry.to_string();
        match level {
            LogLevel::Debug => tracing::debug!(target: "request", "{line}"),
            LogLevel::Info => tracing::info!(target: "request", "{line}"),
            LogLevel::Warn => tracing::warn!(target: "request", "{line}"),
            LogLevel::Error => tracing::error!(target: "request", "{line}"),
        }
    }
}

/// Capture sink for tests: stores every entry in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<(LogLevel, Value)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all captured entries in emission order.
    pub fn entries(&self) -> Vec<(LogLevel, Value)> {
        match self.entries.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl LogSink for MemorySink {
    fn write(&self, level: LogLevel, entry: &Value) {
        if let Ok(mut guard) = self.entries.lock() {
            guard.push((level, entry.clone()));
        }
    }
}

/// Generate a fresh correlation ID: `req_` plus 12 random characters.
pub fn generate_request_id() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let mut id = String::with_capacity(REQUEST_ID_PREFIX.len() + REQUEST_ID_LEN);
    id.push_str(REQUEST_ID_PREFIX);
    for _ in 0..REQUEST_ID_LEN {
        let index = rng.random_range(0..ID_ALPHABET.len());
        // The index is always in range; fall back defensively anyway since
        // indexing is linted against.
        id.push(ID_ALPHABET.get(index).copied().unwrap_or(b'x') as char);
    }
    id
}

/// Structured logger bound to one request's correlation ID and start time.
///
/// Purely a formatter over closure state: no shared mutable state beyond the
/// sink, cheap to clone into handlers and spawned work.
#[derive(Clone)]
pub struct RequestLogger {
    request_id: String,
    method: String,
    route: String,
    started: Instant,
    sink: Arc<dyn LogSink>,
}

impl std::fmt::Debug for RequestLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestLogger")
            .field("request_id", &self.request_id)
            .field("method", &self.method)
            .field("route", &self.route)
            .finish_non_exhaustive()
    }
}

impl RequestLogger {
    /// Create a logger for one request with a freshly generated ID.
    pub fn new(method: &str, route: &str) -> Self {
        Self::with_sink(method, route, Arc::new(TracingSink))
    }

    /// Create a logger with an explicit sink (used by tests).
    pub fn with_sink(method: &str, route: &str, sink: Arc<dyn LogSink>) -> Self {
        Self {
            request_id: generate_request_id(),
            method: method.to_string(),
            route: route.to_string(),
            started: Instant::now(),
            sink,
        }
    }

    /// The correlation ID bound to this logger.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Milliseconds since the logger (and thus the request) started.
    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    pub fn debug(&self, message: &str, extra: Option<Value>) {
        self.emit(LogLevel::Debug, message, extra, None);
    }

    pub fn info(&self, message: &str, extra: Option<Value>) {
        self.emit(LogLevel::Info, message, extra, None);
    }

    pub fn warn(&self, message: &str, extra: Option<Value>) {
        self.emit(LogLevel::Warn, message, extra, None);
    }

    pub fn error(&self, message: &str, extra: Option<Value>) {
        self.emit(LogLevel::Error, message, extra, None);
    }

    /// Terminal entry for a request: `info` plus `duration_ms`.
    pub fn done(&self, message: &str, extra: Option<Value>) {
        self.emit(LogLevel::Info, message, extra, Some(self.elapsed_ms()));
    }

    fn emit(&self, level: LogLevel, message: &str, extra: Option<Value>, duration_ms: Option<u64>) {
        let entry = self.build_entry(level, message, extra, duration_ms);
        self.sink.write(level, &entry);
    }

    /// Merge an entry per the field-precedence contract: caller-supplied
    /// extra fields may override `message`, but the identity fields
    /// (`timestamp`, `level`, `request_id`, `route`, `method`) and
    /// `duration_ms` always win. Non-object extras are ignored.
    fn build_entry(
        &self,
        level: LogLevel,
        message: &str,
        extra: Option<Value>,
        duration_ms: Option<u64>,
    ) -> Value {
        let mut fields = Map::new();
        fields.insert("message".to_string(), json!(message));

        if let Some(Value::Object(extra)) = extra {
            for (key, value) in extra {
                fields.insert(key, value);
            }
        }

        fields.insert(
            "timestamp".to_string(),
            json!(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        fields.insert("level".to_string(), json!(level.as_str()));
        fields.insert("request_id".to_string(), json!(self.request_id));
        fields.insert("route".to_string(), json!(self.route));
        fields.insert("method".to_string(), json!(self.method));

        if let Some(duration) = duration_ms {
            fields.insert("duration_ms".to_string(), json!(duration));
        }

        Value::Object(fields)
    }
}
