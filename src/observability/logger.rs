//! Structured JSON logger
//!
//! - One log line = one event
//! - `event` and `severity` first, remaining keys sorted
//! - Synchronous, no buffering
//!
//! The logger is an owned value carried by `QueryContext`. Components receive
//! a clone at construction; there is no process-wide logger.

use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};

use super::events::Event;

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Debug-level detail
    Trace = 0,
    /// Normal operations
    Info = 1,
    /// Recoverable issues
    Warn = 2,
    /// Operation failures
    Error = 3,
    /// Query cannot continue
    Fatal = 4,
}

impl Severity {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(Severity::Trace),
            "info" => Ok(Severity::Info),
            "warn" => Ok(Severity::Warn),
            "error" => Ok(Severity::Error),
            "fatal" => Ok(Severity::Fatal),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

/// Where log lines go
#[derive(Debug, Clone)]
pub enum LogSink {
    /// Process stdout (INFO and below) and stderr (ERROR and above)
    Console,
    /// Captured lines, used by tests and embedding callers
    Memory(Arc<Mutex<Vec<String>>>),
    /// Discard everything
    Null,
}

/// A structured logger that outputs JSON lines
#[derive(Debug, Clone)]
pub struct Logger {
    sink: LogSink,
    min_severity: Severity,
}

impl Logger {
    /// Console logger at the given minimum severity
    pub fn console(min_severity: Severity) -> Self {
        Self {
            sink: LogSink::Console,
            min_severity,
        }
    }

    /// Logger capturing every line in memory
    pub fn memory() -> Self {
        Self {
            sink: LogSink::Memory(Arc::new(Mutex::new(Vec::new()))),
            min_severity: Severity::Trace,
        }
    }

    /// Logger that discards everything
    pub fn null() -> Self {
        Self {
            sink: LogSink::Null,
            min_severity: Severity::Fatal,
        }
    }

    /// Returns the minimum severity this logger emits
    pub fn min_severity(&self) -> Severity {
        self.min_severity
    }

    /// Returns true if a line at `severity` would be written
    pub fn enabled(&self, severity: Severity) -> bool {
        !matches!(self.sink, LogSink::Null) && severity >= self.min_severity
    }

    /// Log an event with the given severity and fields
    pub fn log(&self, severity: Severity, event: &str, fields: &[(&str, &str)]) {
        if !self.enabled(severity) {
            return;
        }

        let line = Self::format_line(severity, event, fields);

        match &self.sink {
            LogSink::Console => {
                if severity >= Severity::Error {
                    Self::write_line(&line, &mut io::stderr());
                } else {
                    Self::write_line(&line, &mut io::stdout());
                }
            }
            LogSink::Memory(lines) => {
                // A poisoned buffer only loses log lines
                if let Ok(mut lines) = lines.lock() {
                    lines.push(line);
                }
            }
            LogSink::Null => {}
        }
    }

    /// Log a typed event at its default severity
    pub fn event(&self, event: Event, fields: &[(&str, &str)]) {
        self.log(event.severity(), event.as_str(), fields);
    }

    /// Log at TRACE level
    pub fn trace(&self, event: &str, fields: &[(&str, &str)]) {
        self.log(Severity::Trace, event, fields);
    }

    /// Log at INFO level
    pub fn info(&self, event: &str, fields: &[(&str, &str)]) {
        self.log(Severity::Info, event, fields);
    }

    /// Log at WARN level
    pub fn warn(&self, event: &str, fields: &[(&str, &str)]) {
        self.log(Severity::Warn, event, fields);
    }

    /// Log at ERROR level
    pub fn error(&self, event: &str, fields: &[(&str, &str)]) {
        self.log(Severity::Error, event, fields);
    }

    /// Returns captured lines (empty for non-memory sinks)
    pub fn captured(&self) -> Vec<String> {
        match &self.sink {
            LogSink::Memory(lines) => lines.lock().map(|l| l.clone()).unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// Returns true if a captured line carries the given event name
    pub fn has_event(&self, event: Event) -> bool {
        self.captured().iter().any(|line| {
            serde_json::from_str::<Value>(line)
                .map(|v| v["event"] == event.as_str())
                .unwrap_or(false)
        })
    }

    fn format_line(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
        let mut sorted_fields: Vec<_> = fields.iter().collect();
        sorted_fields.sort_by_key(|(k, _)| *k);

        // Build the JSON text by hand so event and severity lead, then each
        // key and value goes through serde_json for escaping.
        let mut output = String::with_capacity(128);
        output.push_str("{\"event\":");
        output.push_str(&Value::String(event.to_string()).to_string());
        output.push_str(",\"severity\":\"");
        output.push_str(severity.as_str());
        output.push('"');

        let mut rest = Map::new();
        for (key, value) in sorted_fields {
            rest.insert((*key).to_string(), Value::String((*value).to_string()));
        }
        for (key, value) in rest {
            output.push(',');
            output.push_str(&Value::String(key).to_string());
            output.push(':');
            output.push_str(&value.to_string());
        }

        output.push('}');
        output
    }

    fn write_line<W: Write>(line: &str, writer: &mut W) {
        // Observability failure must never fail a query
        let _ = writer.write_all(line.as_bytes());
        let _ = writer.write_all(b"\n");
        let _ = writer.flush();
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::console(Severity::Info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Trace < Severity::Info);
        assert!(Severity::Info < Severity::Warn);
        assert!(Severity::Warn < Severity::Error);
        assert!(Severity::Error < Severity::Fatal);
    }

    #[test]
    fn test_severity_parse() {
        assert_eq!("warn".parse::<Severity>().unwrap(), Severity::Warn);
        assert_eq!("INFO".parse::<Severity>().unwrap(), Severity::Info);
        assert!("verbose".parse::<Severity>().is_err());
    }

    #[test]
    fn test_log_json_format() {
        let logger = Logger::memory();
        logger.info("TEST_EVENT", &[]);

        let lines = logger.captured();
        assert_eq!(lines.len(), 1);
        let parsed: Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(parsed["event"], "TEST_EVENT");
        assert_eq!(parsed["severity"], "INFO");
    }

    #[test]
    fn test_log_deterministic_ordering() {
        let logger = Logger::memory();
        logger.info("TEST", &[("zebra", "1"), ("apple", "2"), ("mango", "3")]);
        logger.info("TEST", &[("apple", "2"), ("mango", "3"), ("zebra", "1")]);

        let lines = logger.captured();
        assert_eq!(lines[0], lines[1]);

        let apple_pos = lines[0].find("apple").unwrap();
        let mango_pos = lines[0].find("mango").unwrap();
        let zebra_pos = lines[0].find("zebra").unwrap();
        assert!(apple_pos < mango_pos);
        assert!(mango_pos < zebra_pos);
        assert!(lines[0].starts_with("{\"event\":\"TEST\",\"severity\":\"INFO\""));
    }

    #[test]
    fn test_log_escapes_special_chars() {
        let logger = Logger::memory();
        logger.info("TEST", &[("message", "hello \"world\"\nline2")]);

        let parsed: Value = serde_json::from_str(&logger.captured()[0]).unwrap();
        assert_eq!(parsed["message"], "hello \"world\"\nline2");
    }

    #[test]
    fn test_min_severity_filters() {
        let logger = Logger {
            sink: LogSink::Memory(Arc::new(Mutex::new(Vec::new()))),
            min_severity: Severity::Warn,
        };
        logger.info("SKIPPED", &[]);
        logger.warn("KEPT", &[]);

        let lines = logger.captured();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("KEPT"));
    }

    #[test]
    fn test_null_logger_writes_nothing() {
        let logger = Logger::null();
        assert!(!logger.enabled(Severity::Fatal));
        logger.error("NOTHING", &[]);
        assert!(logger.captured().is_empty());
    }

    #[test]
    fn test_typed_event_lookup() {
        let logger = Logger::memory();
        logger.event(Event::TermDelayed, &[("field", "FOO")]);
        assert!(logger.has_event(Event::TermDelayed));
        assert!(!logger.has_event(Event::ScanCancelled));
    }
}
