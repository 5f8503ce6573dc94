use std::path::PathBuf;

use super::{CONFIG, LOGGER, LOG_EMAIL, LOG_FILE};
use crate::config::{expand_path, Config};
use crate::errors::ServiceError;
use crate::infrastructure::container::{Locator, Resolver};
use crate::logging::{
    ErrorLogger, FingersCrossedHandler, LogLevel, Logger, MailHandler, StreamHandler,
};

/// Recipient of warning mails, read from the configuration on every access.
pub fn log_email(resolver: &Resolver<'_>) -> Result<Option<String>, ServiceError> {
    let config = resolver.get_as::<Config>(CONFIG)?;
    Ok(config.get_non_empty(LOG_EMAIL))
}

/// Log file path, read from the configuration on every access.
pub fn log_file(resolver: &Resolver<'_>) -> Result<Option<PathBuf>, ServiceError> {
    let config = resolver.get_as::<Config>(CONFIG)?;
    match config.get_non_empty(LOG_FILE) {
        Some(raw) => Ok(Some(expand_path(&raw)?)),
        None => Ok(None),
    }
}

/// The `main` channel: mails everything once a warning shows up, and
/// appends every record to the log file.
pub fn logger(resolver: &Resolver<'_>) -> Result<Logger, ServiceError> {
    let logger = Logger::new("main");

    if let Some(email) = resolver.get_as::<Option<String>>(LOG_EMAIL)?.as_ref() {
        logger.push_handler(Box::new(FingersCrossedHandler::new(
            MailHandler::sendmail(email),
            LogLevel::Warning,
        )));
    }

    if let Some(path) = resolver.get_as::<Option<PathBuf>>(LOG_FILE)?.as_ref() {
        let handler = StreamHandler::open(path)
            .map_err(|e| ServiceError::IO(format!("opening log file {}", path.display()), e))?;
        logger.push_handler(Box::new(handler));
    }

    tracing::debug!(handlers = logger.handler_count(), "logger ready");
    Ok(logger)
}

pub fn error_logger(resolver: &Resolver<'_>) -> Result<ErrorLogger, ServiceError> {
    Ok(ErrorLogger::new(resolver.get_as::<Logger>(LOGGER)?))
}
