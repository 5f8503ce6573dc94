//! Bundled services
//!
//! Every service the server is made of, registered under its identifier.
//! Factories look their dependencies up through the [`Resolver`] they are
//! given, so the order of registration does not matter.
//!
//! [`Resolver`]: crate::infrastructure::container::Resolver

pub mod application;
pub mod database;
pub mod logging;

use crate::config::Config;
use crate::infrastructure::container::{
    ContainerError, FactoryRegistry, Locator, ServiceContainer,
};

pub const APPLICATION: &str = "application";
pub const CONFIG: &str = "config";
pub const DATABASE: &str = "database";
pub const ERROR_LOGGER: &str = "errorLogger";
pub const LOG_EMAIL: &str = "log.email";
pub const LOG_FILE: &str = "log.file";
pub const LOGGER: &str = "logger";
pub const LOOP: &str = "loop";
pub const TOKENS: &str = "tokens";
pub const USERS: &str = "users";
pub const VMS: &str = "vms";

/// Identifiers served by factories, in the order `check` resolves them.
pub const BUNDLED: &[&str] = &[
    LOG_EMAIL,
    LOG_FILE,
    LOGGER,
    ERROR_LOGGER,
    DATABASE,
    TOKENS,
    USERS,
    VMS,
    LOOP,
    APPLICATION,
];

pub fn registry() -> FactoryRegistry {
    let mut registry = FactoryRegistry::new();
    registry
        .accessor(LOG_EMAIL, logging::log_email)
        .accessor(LOG_FILE, logging::log_file)
        .initializer(LOGGER, logging::logger)
        .initializer(ERROR_LOGGER, logging::error_logger)
        .initializer(DATABASE, database::database)
        .initializer(VMS, database::vms)
        .initializer(TOKENS, application::tokens)
        .initializer(USERS, application::users)
        .initializer(LOOP, application::event_loop)
        .initializer(APPLICATION, application::application);
    registry
}

/// Container with every bundled service and `config` already set.
pub fn container(config: Config) -> ServiceContainer {
    let container = ServiceContainer::with_registry(registry());
    container.set(CONFIG, config);
    container
}

/// Resolve every bundled service, stopping at the first failure.
pub fn resolve_all(container: &ServiceContainer) -> Result<Vec<&'static str>, ContainerError> {
    for id in BUNDLED {
        container.get(id)?;
        tracing::debug!(id, "service ready");
    }
    Ok(BUNDLED.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::container::FactoryKind;

    #[test]
    fn test_registry_covers_bundled_ids() {
        let registry = registry();
        for id in BUNDLED {
            assert!(registry.contains(id), "missing factory for {}", id);
        }
        assert!(!registry.contains(CONFIG));
        assert_eq!(registry.names(FactoryKind::Accessor), vec!["log_email", "log_file"]);
        assert_eq!(registry.len(), BUNDLED.len());
    }
}
