pub mod app;
pub mod cli;
pub mod config;
pub mod errors;
pub mod infrastructure;
pub mod logging;
pub mod managers;
pub mod services;
pub mod storage;

// Re-export commonly used items for convenience
pub use app::{Application, EventLoop};
pub use config::Config;
pub use errors::{ServiceError, StorageError};
pub use infrastructure::container::{ContainerError, Locator, ServiceContainer};
