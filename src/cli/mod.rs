//! 命令行入口
//!
//! Builds the container from the loaded configuration and runs one
//! subcommand against it.

pub mod commands;

use std::time::Duration;

use anyhow::Context;

pub use commands::{ServeArgs, UsersArgs, XoServerArgs, XoServerCommand};

use crate::app::Application;
use crate::config::ConfigLoader;
use crate::infrastructure::container::{ContainerError, Locator, ServiceContainer};
use crate::logging::ErrorLogger;
use crate::managers::UsersManager;
use crate::services::{self, APPLICATION, ERROR_LOGGER, USERS};

pub fn run(args: XoServerArgs) -> anyhow::Result<()> {
    let loader = match &args.config {
        Some(path) => ConfigLoader::with_path(path),
        None => ConfigLoader::new(),
    };
    let config = loader.load().context("failed to load configuration")?;
    let container = services::container(config);

    let result = match &args.command {
        XoServerCommand::Check => check(&container),
        XoServerCommand::Users(users) => list_users(&container, users),
        XoServerCommand::Serve(serve) => run_server(&container, serve),
    };

    result.map_err(|err| {
        report(&container, &err);
        anyhow::Error::new(err)
    })
}

fn check(container: &ServiceContainer) -> Result<(), ContainerError> {
    for id in services::resolve_all(container)? {
        println!("{:<12} ok", id);
    }
    let stats = container.stats();
    println!(
        "{} resolutions, {} initializers run, hit rate {:.0}%",
        stats.total_resolutions,
        stats.initializer_invocations,
        stats.hit_rate() * 100.0
    );
    Ok(())
}

fn list_users(container: &ServiceContainer, args: &UsersArgs) -> Result<(), ContainerError> {
    let users = container.get_as::<UsersManager>(USERS)?;
    let all = users.all().map_err(|e| creation(USERS, e.into()))?;

    if args.json {
        let encoded = serde_json::to_string_pretty(&all)
            .map_err(|e| creation(USERS, crate::errors::StorageError::Encode(e).into()))?;
        println!("{}", encoded);
        return Ok(());
    }

    println!("{:<6} {:<24} PERMISSION", "ID", "NAME");
    for user in all {
        println!("{:<6} {:<24} {:?}", user.id, user.name, user.permission);
    }
    Ok(())
}

fn run_server(container: &ServiceContainer, args: &ServeArgs) -> Result<(), ContainerError> {
    let errors = container.get_as::<ErrorLogger>(ERROR_LOGGER)?;
    errors.install_panic_hook();

    let app = container.get_as::<Application>(APPLICATION)?;
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "cannot listen for Ctrl-C");
        }
    };

    let interval = Duration::from_secs(args.purge_interval.max(1));
    let path = app
        .run_until(shutdown, interval)
        .map_err(|e| creation(APPLICATION, e))?;
    println!("database saved to {}", path.display());
    Ok(())
}

fn creation(id: &str, err: crate::errors::ServiceError) -> ContainerError {
    ContainerError::Creation {
        id: id.to_string(),
        source: Box::new(err),
    }
}

/// Send the failure through the error logger when it can still be built.
fn report(container: &ServiceContainer, err: &ContainerError) {
    let Ok(errors) = container.get_as::<ErrorLogger>(ERROR_LOGGER) else {
        tracing::error!(error = %err, "error logger unavailable");
        return;
    };
    if err.is_fatal() {
        errors.report_fatal(err);
    } else {
        errors.report(err);
    }
}
