//! 内置服务的集成测试

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use xo_server::app::Application;
use xo_server::config::{Config, DATABASE_FILE, DATABASE_TYPE, LOG_EMAIL, LOG_FILE};
use xo_server::errors::ServiceError;
use xo_server::infrastructure::container::{ContainerError, Locator};
use xo_server::managers::{Permission, TokensManager, UsersManager, VmsManager};
use xo_server::services::{self, database::NO_DATABASE_WARNING};
use xo_server::storage::{MemoryStore, StoreState};

fn config_in(dir: &Path) -> Config {
    let mut config = Config::with_defaults();
    config.set(DATABASE_FILE, dir.join("database.json").to_string_lossy().to_string());
    config.set(LOG_FILE, dir.join("xo.log").to_string_lossy().to_string());
    config
}

#[test]
fn test_fresh_database_has_default_admin() {
    let dir = tempfile::tempdir().unwrap();
    let container = services::container(config_in(dir.path()));

    let database = container.get_as::<MemoryStore>("database").unwrap();

    assert_eq!(database.table_names(), vec!["tokens", "users"]);
    let users = database.all("users").unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["name"], "admin");
    assert_eq!(users[0]["permission"], 3);
    assert_eq!(users[0]["id"], 1);
    assert_eq!(database.count("tokens").unwrap(), 0);

    let log = fs::read_to_string(dir.path().join("xo.log")).unwrap();
    assert!(log.contains(&format!("main.WARNING: {}", NO_DATABASE_WARNING)));
    assert!(!dir.path().join("database.json").exists());
}

#[test]
fn test_fresh_database_survives_an_unwritable_log_file() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "not a directory").unwrap();
    let mut config = config_in(dir.path());
    config.set(LOG_FILE, blocker.join("xo.log").to_string_lossy().to_string());
    let container = services::container(config);

    let database = container.get_as::<MemoryStore>("database").unwrap();

    assert_eq!(database.table_names(), vec!["tokens", "users"]);
    assert_eq!(database.count("users").unwrap(), 1);
    assert!(container.contains("database"));

    let err = container.get("logger").unwrap_err();
    assert!(err.is_fatal());
    assert!(!container.contains("logger"));
}

#[test]
fn test_database_is_memoized() {
    let dir = tempfile::tempdir().unwrap();
    let container = services::container(config_in(dir.path()));

    let first = container.get_as::<MemoryStore>("database").unwrap();
    let second = container.get_as::<MemoryStore>("database").unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    let log = fs::read_to_string(dir.path().join("xo.log")).unwrap();
    assert_eq!(log.matches(NO_DATABASE_WARNING).count(), 1);
}

#[test]
fn test_invalid_json_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("database.json"), "{ not json").unwrap();
    let container = services::container(config_in(dir.path()));

    let err = container.get("database").unwrap_err();

    assert!(err.is_fatal());
    assert!(matches!(
        err.service_error(),
        Some(ServiceError::DatabaseUnreadable { .. })
    ));
    assert_eq!(
        err.service_error().unwrap().to_string(),
        "could not read the database"
    );
    assert!(!container.contains("database"));
}

#[test]
fn test_unsupported_database_type_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_in(dir.path());
    config.set(DATABASE_TYPE, "mysql");
    let container = services::container(config);

    let err = container.get("users").unwrap_err();

    assert!(err.is_fatal());
    assert_eq!(
        err.service_error().unwrap().to_string(),
        "unsupported database type (mysql)"
    );
    assert!(!container.contains("users"));
    assert!(!container.contains("database"));
}

#[test]
fn test_existing_database_is_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("database.json");

    let store = MemoryStore::new();
    store
        .create_table("users", |t| {
            t.integer("id").auto_incremented().string("name").unique();
        })
        .unwrap();
    store
        .create("users", vec![xo_server::storage::row([("name", "alice")])])
        .unwrap();
    store.save(&path).unwrap();

    let container = services::container(config_in(dir.path()));
    let database = container.get_as::<MemoryStore>("database").unwrap();

    assert_eq!(database.state(), store.state());
    let log = fs::read_to_string(dir.path().join("xo.log")).unwrap_or_default();
    assert!(!log.contains(NO_DATABASE_WARNING));
}

#[test]
fn test_managers_share_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let container = services::container(config_in(dir.path()));

    let users = container.get_as::<UsersManager>("users").unwrap();
    let tokens = container.get_as::<TokensManager>("tokens").unwrap();
    let database = container.get_as::<MemoryStore>("database").unwrap();

    let admin = users.find_by_name("admin").unwrap().unwrap();
    assert_eq!(admin.permission, Permission::Admin);

    tokens
        .create(&admin.id.to_string(), chrono::Duration::hours(1))
        .unwrap();
    assert_eq!(database.count("tokens").unwrap(), 1);
}

#[test]
fn test_vms_use_a_private_store() {
    let dir = tempfile::tempdir().unwrap();
    let container = services::container(config_in(dir.path()));

    let vms = container.get_as::<VmsManager>("vms").unwrap();
    let again = container.get_as::<VmsManager>("vms").unwrap();
    assert!(Arc::ptr_eq(&vms, &again));

    vms.add("vm-1").unwrap();
    assert_eq!(vms.store().table_names(), vec!["vms"]);
    // vms never touches the configuration or the shared database
    assert!(!container.contains("database"));

    let database = container.get_as::<MemoryStore>("database").unwrap();
    assert!(!Arc::ptr_eq(vms.store(), &database));
    assert!(!database.has_table("vms"));
}

#[test]
fn test_log_accessors_follow_config() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_in(dir.path());
    config.set(LOG_EMAIL, "ops@example.org");
    config.set(LOG_FILE, "~/xo.log");
    let container = services::container(config);

    let email = container.get_as::<Option<String>>("log.email").unwrap();
    assert_eq!(email.as_deref(), Some("ops@example.org"));

    let file = container.get_as::<Option<PathBuf>>("log.file").unwrap();
    let file = file.as_deref().unwrap();
    assert!(file.ends_with("xo.log"));
    assert!(!file.to_string_lossy().starts_with('~'));

    // accessors are not memoized
    assert!(!container.contains("log.email"));

    container.set("config", Config::new());
    let email = container.get_as::<Option<String>>("log.email").unwrap();
    assert!(email.is_none());
}

#[test]
fn test_empty_log_settings_add_no_handlers() {
    let mut config = Config::with_defaults();
    config.set(LOG_EMAIL, false);
    config.set(LOG_FILE, "");
    let container = services::container(config);

    let logger = container.get_as::<xo_server::logging::Logger>("logger").unwrap();
    assert_eq!(logger.name(), "main");
    assert_eq!(logger.handler_count(), 0);
}

#[test]
fn test_unknown_service() {
    let container = services::container(Config::with_defaults());

    let err = container.get("hypervisor").unwrap_err();

    assert!(matches!(err, ContainerError::NoSuchEntry { ref id } if id == "hypervisor"));
    assert!(!err.is_fatal());
}

#[test]
fn test_application_persists_database() {
    let dir = tempfile::tempdir().unwrap();
    let container = services::container(config_in(dir.path()));

    let app = container.get_as::<Application>("application").unwrap();
    let summary = app.summary().unwrap();
    assert_eq!(summary.users, 1);
    assert_eq!(summary.tokens, 0);
    assert_eq!(summary.vms, 0);
    assert_eq!(summary.tables, vec!["tokens", "users"]);

    let path = app.persist().unwrap();
    assert_eq!(path, dir.path().join("database.json"));
    let state: StoreState = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(state.tables["users"].rows.len(), 1);

    let again = container.get_as::<Application>("application").unwrap();
    assert!(Arc::ptr_eq(&app, &again));
    assert!(Arc::ptr_eq(app.users(), &container.get_as::<UsersManager>("users").unwrap()));
}

#[test]
fn test_run_until_purges_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let container = services::container(config_in(dir.path()));
    let app = container.get_as::<Application>("application").unwrap();

    app.tokens()
        .create("1", chrono::Duration::seconds(-10))
        .unwrap();

    let path = app
        .run_until(
            async { tokio::time::sleep(std::time::Duration::from_millis(20)).await },
            std::time::Duration::from_millis(5),
        )
        .unwrap();

    assert_eq!(app.tokens().count().unwrap(), 0);
    assert!(path.exists());
}

#[test]
fn test_resolve_all_builds_everything() {
    let dir = tempfile::tempdir().unwrap();
    let container = services::container(config_in(dir.path()));

    let resolved = services::resolve_all(&container).unwrap();

    assert_eq!(resolved.len(), services::BUNDLED.len());
    for id in ["logger", "errorLogger", "database", "tokens", "users", "vms", "loop", "application"] {
        assert!(container.contains(id), "{} not memoized", id);
    }
}
