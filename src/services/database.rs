use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde_json::json;
use toml::Value;

use super::{CONFIG, LOGGER};
use crate::config::{Config, DATABASE_FILE, DATABASE_TYPE};
use crate::errors::{DatabaseReadError, ServiceError};
use crate::infrastructure::container::{Locator, Resolver};
use crate::logging::Logger;
use crate::managers::{Permission, VmsManager, TOKENS_TABLE, USERS_TABLE, VMS_TABLE};
use crate::storage::{row, MemoryStore, StoreState};

pub const DEFAULT_ADMIN_NAME: &str = "admin";
/// bcrypt hash of `admin`.
pub const DEFAULT_ADMIN_PASSWORD: &str = "$2y$10$VzBQqiwnhG5zc2.MQmmW4ORcPW6FE7SLhPr1VBV2ubn5zJoesnmli";
pub const NO_DATABASE_WARNING: &str = "no existing database, creating default user (admin:admin)";

/// Load the database from `database.file`, or create a fresh one holding
/// the default administrator when the file does not exist.
pub fn database(resolver: &Resolver<'_>) -> Result<MemoryStore, ServiceError> {
    let config = resolver.get_as::<Config>(CONFIG)?;

    match config.get(DATABASE_TYPE) {
        Some(Value::String(kind)) if kind == "json" => {}
        Some(Value::String(kind)) => return Err(ServiceError::UnsupportedDatabaseType(kind.clone())),
        Some(other) => return Err(ServiceError::UnsupportedDatabaseType(other.to_string())),
        None => return Err(ServiceError::UnsupportedDatabaseType(String::new())),
    }

    let path = config.require_path(DATABASE_FILE)?;
    if path.exists() {
        let store = load(&path).map_err(|source| ServiceError::DatabaseUnreadable {
            path: path.clone(),
            source,
        })?;
        tracing::info!(path = %path.display(), "database loaded");
        return Ok(store);
    }

    let store = MemoryStore::new();
    store.create_table(TOKENS_TABLE, |t| {
        t.string("id").unique().integer("expiration").string("user_id");
    })?;
    store.create_table(USERS_TABLE, |t| {
        t.integer("id")
            .auto_incremented()
            .string("name")
            .unique()
            .string("password")
            .integer("permission");
    })?;
    store.create(
        USERS_TABLE,
        vec![row([
            ("name", json!(DEFAULT_ADMIN_NAME)),
            ("password", json!(DEFAULT_ADMIN_PASSWORD)),
            ("permission", json!(Permission::Admin.level())),
        ])],
    )?;

    tracing::warn!(path = %path.display(), "{}", NO_DATABASE_WARNING);
    // The store is usable without a logger; losing the warning is not fatal
    match resolver.get_as::<Logger>(LOGGER) {
        Ok(logger) => logger.warning(NO_DATABASE_WARNING),
        Err(e) => tracing::warn!(error = %e, "logger unavailable, warning not recorded"),
    }
    Ok(store)
}

fn load(path: &Path) -> Result<MemoryStore, DatabaseReadError> {
    let content = fs::read_to_string(path).map_err(DatabaseReadError::Read)?;
    let state: StoreState = serde_json::from_str(&content).map_err(DatabaseReadError::Decode)?;
    MemoryStore::from_state(state).map_err(DatabaseReadError::State)
}

/// Virtual machines live in a private store, separate from `database`.
pub fn vms(_resolver: &Resolver<'_>) -> Result<VmsManager, ServiceError> {
    let store = MemoryStore::new();
    store.create_table(VMS_TABLE, |t| {
        t.string("id").unique();
    })?;
    Ok(VmsManager::new(Arc::new(store)))
}
