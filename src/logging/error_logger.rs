use std::error::Error;
use std::panic;
use std::sync::Arc;

use super::logger::{LogLevel, Logger};

/// Routes errors and panics into a [`Logger`].
#[derive(Debug, Clone)]
pub struct ErrorLogger {
    logger: Arc<Logger>,
}

impl ErrorLogger {
    pub fn new(logger: Arc<Logger>) -> Self {
        Self { logger }
    }

    pub fn logger(&self) -> &Arc<Logger> {
        &self.logger
    }

    /// Log `error` and its whole source chain at error level.
    pub fn report(&self, error: &dyn Error) {
        self.report_at(LogLevel::Error, error);
    }

    /// Same as [`report`](Self::report), for errors that stop the process.
    pub fn report_fatal(&self, error: &dyn Error) {
        self.report_at(LogLevel::Critical, error);
    }

    fn report_at(&self, level: LogLevel, error: &dyn Error) {
        self.logger.log(level, describe(error));
    }

    /// Log panics through this logger, then run the previous hook.
    pub fn install_panic_hook(&self) {
        let logger = self.logger.clone();
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let location = info
                .location()
                .map(|l| format!(" at {}:{}", l.file(), l.line()))
                .unwrap_or_default();
            let payload = info
                .payload()
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| info.payload().downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            logger.critical(format!("panic{}: {}", location, payload));
            previous(info);
        }));
    }
}

/// `error: cause: root cause`
pub fn describe(error: &dyn Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{DatabaseReadError, ServiceError};
    use crate::logging::logger::tests::Collect;
    use std::path::PathBuf;

    #[test]
    fn test_report_includes_source_chain() {
        let collect = Collect::default();
        let logger = Arc::new(Logger::new("main"));
        logger.push_handler(Box::new(collect.clone()));
        let errors = ErrorLogger::new(logger);

        let err = ServiceError::DatabaseUnreadable {
            path: PathBuf::from("db.json"),
            source: DatabaseReadError::Read(std::io::Error::other("permission denied")),
        };
        errors.report(&err);

        let seen = collect.0.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0],
            "could not read the database: read failed: permission denied: permission denied"
        );
    }
}
