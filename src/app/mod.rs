//! The server application object and its event loop.

pub mod event_loop;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;

use crate::config::{Config, DATABASE_FILE};
use crate::errors::ServiceError;
use crate::logging::Logger;
use crate::managers::{TokensManager, UsersManager, VmsManager};
use crate::storage::MemoryStore;

pub use event_loop::EventLoop;

/// How often expired tokens are purged while serving.
pub const TOKEN_PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Counts reported by [`Application::summary`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationSummary {
    pub users: usize,
    pub tokens: usize,
    pub vms: usize,
    pub tables: Vec<String>,
}

/// Everything the application is built from.
pub struct ApplicationParts {
    pub config: Arc<Config>,
    pub logger: Arc<Logger>,
    pub event_loop: Arc<EventLoop>,
    pub database: Arc<MemoryStore>,
    pub tokens: Arc<TokensManager>,
    pub users: Arc<UsersManager>,
    pub vms: Arc<VmsManager>,
}

pub struct Application {
    config: Arc<Config>,
    logger: Arc<Logger>,
    event_loop: Arc<EventLoop>,
    database: Arc<MemoryStore>,
    tokens: Arc<TokensManager>,
    users: Arc<UsersManager>,
    vms: Arc<VmsManager>,
}

impl Application {
    pub fn new(parts: ApplicationParts) -> Self {
        let ApplicationParts {
            config,
            logger,
            event_loop,
            database,
            tokens,
            users,
            vms,
        } = parts;
        Self {
            config,
            logger,
            event_loop,
            database,
            tokens,
            users,
            vms,
        }
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn logger(&self) -> &Arc<Logger> {
        &self.logger
    }

    pub fn event_loop(&self) -> &Arc<EventLoop> {
        &self.event_loop
    }

    pub fn database(&self) -> &Arc<MemoryStore> {
        &self.database
    }

    pub fn tokens(&self) -> &Arc<TokensManager> {
        &self.tokens
    }

    pub fn users(&self) -> &Arc<UsersManager> {
        &self.users
    }

    pub fn vms(&self) -> &Arc<VmsManager> {
        &self.vms
    }

    pub fn summary(&self) -> Result<ApplicationSummary, ServiceError> {
        Ok(ApplicationSummary {
            users: self.users.count()?,
            tokens: self.tokens.count()?,
            vms: self.vms.count()?,
            tables: self.database.table_names(),
        })
    }

    /// Write the shared database to `database.file`.
    pub fn persist(&self) -> Result<PathBuf, ServiceError> {
        let path = self.config.require_path(DATABASE_FILE)?;
        self.database.save(&path)?;
        self.logger.info(format!("database saved to {}", path.display()));
        Ok(path)
    }

    /// Drive the event loop until `shutdown` completes, purging expired tokens
    /// every `purge_every`, then persist the database.
    pub fn run_until<F>(&self, shutdown: F, purge_every: Duration) -> Result<PathBuf, ServiceError>
    where
        F: Future<Output = ()>,
    {
        self.logger.info("server started");
        self.event_loop.block_on(async {
            tokio::pin!(shutdown);
            let mut ticker = tokio::time::interval(purge_every);
            loop {
                tokio::select! {
                    _ = &mut shutdown => break,
                    _ = ticker.tick() => {
                        if let Err(e) = self.tokens.purge_expired(Utc::now()) {
                            self.logger.error(format!("token purge failed: {}", e));
                        }
                    }
                }
            }
        });
        self.logger.info("server stopping");
        self.persist()
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("logger", &self.logger)
            .field("tables", &self.database.table_names())
            .finish_non_exhaustive()
    }
}
