use super::{CONFIG, DATABASE, LOGGER, LOOP, TOKENS, USERS, VMS};
use crate::app::{Application, ApplicationParts, EventLoop};
use crate::config::Config;
use crate::errors::ServiceError;
use crate::infrastructure::container::{Locator, Resolver};
use crate::logging::Logger;
use crate::managers::{TokensManager, UsersManager, VmsManager};
use crate::storage::MemoryStore;

pub fn application(resolver: &Resolver<'_>) -> Result<Application, ServiceError> {
    Ok(Application::new(ApplicationParts {
        config: resolver.get_as::<Config>(CONFIG)?,
        logger: resolver.get_as::<Logger>(LOGGER)?,
        event_loop: resolver.get_as::<EventLoop>(LOOP)?,
        database: resolver.get_as::<MemoryStore>(DATABASE)?,
        tokens: resolver.get_as::<TokensManager>(TOKENS)?,
        users: resolver.get_as::<UsersManager>(USERS)?,
        vms: resolver.get_as::<VmsManager>(VMS)?,
    }))
}

pub fn event_loop(_resolver: &Resolver<'_>) -> Result<EventLoop, ServiceError> {
    EventLoop::new().map_err(|e| ServiceError::IO("creating the event loop".to_string(), e))
}

pub fn tokens(resolver: &Resolver<'_>) -> Result<TokensManager, ServiceError> {
    Ok(TokensManager::new(resolver.get_as::<MemoryStore>(DATABASE)?))
}

pub fn users(resolver: &Resolver<'_>) -> Result<UsersManager, ServiceError> {
    Ok(UsersManager::new(resolver.get_as::<MemoryStore>(DATABASE)?))
}
