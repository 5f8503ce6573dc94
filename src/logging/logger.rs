use std::fmt;
use std::io;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

/// Severity of a [`LogRecord`], ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum LogLevel {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Notice => "NOTICE",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
            LogLevel::Alert => "ALERT",
            LogLevel::Emergency => "EMERGENCY",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    pub channel: String,
    pub level: LogLevel,
    pub message: String,
    pub datetime: DateTime<Utc>,
}

impl LogRecord {
    pub fn new(channel: &str, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            channel: channel.to_string(),
            level,
            message: message.into(),
            datetime: Utc::now(),
        }
    }

    /// One-line rendering: `[2024-01-01 12:00:00] main.WARNING: message`.
    pub fn format_line(&self) -> String {
        format!(
            "[{}] {}.{}: {}",
            self.datetime.format("%Y-%m-%d %H:%M:%S"),
            self.channel,
            self.level,
            self.message
        )
    }
}

/// Destination for log records.
pub trait LogHandler: Send {
    fn handle(&mut self, record: &LogRecord) -> io::Result<()>;

    /// Deliver several records at once. Handlers that send one message per
    /// call (mail) override this to group them.
    fn handle_batch(&mut self, records: &[LogRecord]) -> io::Result<()> {
        for record in records {
            self.handle(record)?;
        }
        Ok(())
    }
}

/// Named logging channel with a stack of handlers.
///
/// The most recently pushed handler sees a record first. A failing handler
/// is reported through `tracing` and does not stop the others.
pub struct Logger {
    name: String,
    handlers: Mutex<Vec<Box<dyn LogHandler>>>,
}

impl Logger {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            handlers: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn push_handler(&self, handler: Box<dyn LogHandler>) {
        self.handlers.lock().push(handler);
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.lock().len()
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        let record = LogRecord::new(&self.name, level, message);
        mirror(&record);

        let mut handlers = self.handlers.lock();
        for handler in handlers.iter_mut().rev() {
            if let Err(e) = handler.handle(&record) {
                tracing::error!(channel = %self.name, error = %e, "log handler failed");
            }
        }
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    pub fn critical(&self, message: impl Into<String>) {
        self.log(LogLevel::Critical, message);
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("handlers", &self.handler_count())
            .finish()
    }
}

fn mirror(record: &LogRecord) {
    let channel = record.channel.as_str();
    let message = record.message.as_str();
    match record.level {
        LogLevel::Debug => tracing::debug!(channel, "{}", message),
        LogLevel::Info | LogLevel::Notice => tracing::info!(channel, "{}", message),
        LogLevel::Warning => tracing::warn!(channel, "{}", message),
        _ => tracing::error!(channel, level = %record.level, "{}", message),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Arc;

    /// Handler collecting everything it sees.
    #[derive(Clone, Default)]
    pub(crate) struct Collect(pub Arc<Mutex<Vec<String>>>);

    impl LogHandler for Collect {
        fn handle(&mut self, record: &LogRecord) -> io::Result<()> {
            self.0.lock().push(record.message.clone());
            Ok(())
        }
    }

    struct Tagged(&'static str, Arc<Mutex<Vec<String>>>);

    impl LogHandler for Tagged {
        fn handle(&mut self, _record: &LogRecord) -> io::Result<()> {
            self.1.lock().push(self.0.to_string());
            Ok(())
        }
    }

    struct Broken;

    impl LogHandler for Broken {
        fn handle(&mut self, _record: &LogRecord) -> io::Result<()> {
            Err(io::Error::other("disk full"))
        }
    }

    #[test]
    fn test_levels_are_ordered() {
        assert!(LogLevel::Warning > LogLevel::Info);
        assert!(LogLevel::Emergency > LogLevel::Critical);
        assert_eq!(LogLevel::Warning.to_string(), "WARNING");
    }

    #[test]
    fn test_format_line() {
        let line = LogRecord::new("main", LogLevel::Warning, "hello").format_line();
        assert!(line.starts_with('['));
        assert!(line.ends_with("] main.WARNING: hello"));
    }

    #[test]
    fn test_last_pushed_handler_runs_first() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let logger = Logger::new("main");
        logger.push_handler(Box::new(Tagged("first", seen.clone())));
        logger.push_handler(Box::new(Tagged("second", seen.clone())));

        logger.info("x");

        assert_eq!(*seen.lock(), vec!["second", "first"]);
    }

    #[test]
    fn test_failing_handler_does_not_stop_others() {
        let collect = Collect::default();
        let logger = Logger::new("main");
        logger.push_handler(Box::new(collect.clone()));
        logger.push_handler(Box::new(Broken));

        logger.error("boom");

        assert_eq!(*collect.0.lock(), vec!["boom"]);
        assert_eq!(logger.handler_count(), 2);
    }
}
