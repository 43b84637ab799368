//! Structured logging of errors

use serde_json::{Map, Value};
use std::error::Error as StdError;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tracing::{debug, error, info, trace, warn, Level};

use crate::errors::{find, Error, LogField};

/// Destination for error log entries
pub trait LogSink: Send + Sync {
    fn log(&self, level: Level, message: &str, fields: &[LogField]);
}

/// Sink that emits one `tracing` event per entry
///
/// Fields are folded into a single JSON object under `fields`; a later field
/// with the same key replaces an earlier one.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, level: Level, message: &str, fields: &[LogField]) {
        let fields = fields_to_object(fields);

        if level == Level::ERROR {
            error!(fields = %fields, "{}", message);
        } else if level == Level::WARN {
            warn!(fields = %fields, "{}", message);
        } else if level == Level::INFO {
            info!(fields = %fields, "{}", message);
        } else if level == Level::DEBUG {
            debug!(fields = %fields, "{}", message);
        } else {
            trace!(fields = %fields, "{}", message);
        }
    }
}

pub fn fields_to_object(fields: &[LogField]) -> Value {
    let object: Map<String, Value> = fields
        .iter()
        .map(|field| (field.key.clone(), field.value.clone()))
        .collect();
    Value::Object(object)
}

/// One call received by a [`MemorySink`]
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub level: Level,
    pub message: String,
    pub fields: Vec<LogField>,
}

impl LogRecord {
    /// Value of the last field named `key`
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields
            .iter()
            .rev()
            .find(|field| field.key == key)
            .map(|field| &field.value)
    }
}

/// Sink that keeps every entry in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl LogSink for MemorySink {
    fn log(&self, level: Level, message: &str, fields: &[LogField]) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(LogRecord {
                level,
                message: message.to_owned(),
                fields: fields.to_vec(),
            });
    }
}

/// Process-wide defaults used when [`LogOptions`] leaves a setting unset
#[derive(Clone)]
pub struct LogDefaults {
    pub sink: Arc<dyn LogSink>,
    pub level: Level,
}

impl Default for LogDefaults {
    fn default() -> Self {
        Self {
            sink: Arc::new(TracingSink),
            level: Level::ERROR,
        }
    }
}

static DEFAULTS: OnceLock<LogDefaults> = OnceLock::new();

/// Install the process-wide defaults
///
/// Only the first call wins; later calls hand their defaults back.
pub fn install_defaults(defaults: LogDefaults) -> Result<(), LogDefaults> {
    DEFAULTS.set(defaults)
}

pub fn defaults() -> &'static LogDefaults {
    DEFAULTS.get_or_init(LogDefaults::default)
}

/// Per-call overrides layered onto [`defaults`]
#[derive(Clone, Default)]
pub struct LogOptions {
    sink: Option<Arc<dyn LogSink>>,
    level: Option<Level>,
    fields: Vec<LogField>,
}

impl LogOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = Some(level);
        self
    }

    /// Extra fields, logged after the error's own fields
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = LogField>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Explicitly requested level, if any
    pub fn level(&self) -> Option<Level> {
        self.level
    }

    fn sink(&self) -> Arc<dyn LogSink> {
        self.sink
            .clone()
            .unwrap_or_else(|| Arc::clone(&defaults().sink))
    }
}

/// Log `err` through the configured sink
///
/// When an [`Error`] is found in the chain its log fields come first, then
/// its domain, then the extra fields from `options`. Returns whether an entry
/// was written.
pub fn log_err(err: Option<&(dyn StdError + 'static)>, options: &LogOptions) -> bool {
    let Some(err) = err else {
        return false;
    };

    let level = options.level.unwrap_or(defaults().level);
    let mut fields = Vec::new();

    if let Some(value) = find::<Error>(err) {
        fields.extend_from_slice(value.log_fields());
        if let Some(domain) = value.domain() {
            fields.push(LogField::new("domain", domain));
        }
    }
    fields.extend_from_slice(&options.fields);

    options.sink().log(level, &err.to_string(), &fields);
    true
}
