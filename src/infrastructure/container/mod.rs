//! Container module
//!
//! 服务按字符串标识符解析：
//! - 已缓存的条目直接返回
//! - 访问器工厂（accessor）每次调用都重新计算，不缓存
//! - 初始化工厂（initializer）只执行一次，结果写入条目表

pub mod registry;
pub mod service_container;

use std::any::Any;
use std::sync::Arc;

use thiserror::Error;

use crate::errors::ServiceError;

pub use registry::{Factory, FactoryFn, FactoryRegistry};
pub use service_container::{ContainerStats, Resolver, ServiceContainer};

/// Type-erased value stored in the entry table.
pub type Entry = Arc<dyn Any + Send + Sync>;

/// Wrap a value so it can be stored in the entry table.
pub fn entry<T: Any + Send + Sync>(value: T) -> Entry {
    Arc::new(value)
}

/// Resolution strategy of a factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactoryKind {
    /// Invoked on every resolution, result never stored
    Accessor,
    /// Invoked once, result memoized under the requested identifier
    Initializer,
}

/// Derive the factory lookup name of an identifier.
///
/// Every `_` is removed first, then every `.` becomes `_`:
/// `log.file` -> `log_file`, `foo_bar.baz` -> `foobar_baz`.
pub fn canonical_name(id: &str) -> String {
    id.replace('_', "").replace('.', "_")
}

/// 容器错误
#[derive(Debug, Error)]
pub enum ContainerError {
    /// No entry, accessor or initializer for the identifier
    #[error("no such entry: {id}")]
    NoSuchEntry { id: String },
    /// A factory asked (directly or transitively) for the identifier it is building
    #[error("circular dependency detected: {}", chain.join(" -> "))]
    CircularDependency { chain: Vec<String> },
    /// The entry exists but holds another type
    #[error("entry '{id}' is not a {expected}")]
    TypeMismatch { id: String, expected: &'static str },
    /// The factory for the identifier failed; nothing was stored
    #[error("failed to create service '{id}': {source}")]
    Creation {
        id: String,
        #[source]
        source: Box<ServiceError>,
    },
}

impl ContainerError {
    /// Whether the failure comes from a broken configuration or unreadable data
    /// the process must not continue with.
    pub fn is_fatal(&self) -> bool {
        match self {
            ContainerError::Creation { source, .. } => source.is_fatal(),
            _ => false,
        }
    }

    /// Follow nested dependency failures down to the innermost container error.
    pub fn root_cause(&self) -> &ContainerError {
        match self {
            ContainerError::Creation { source, .. } => match source.as_ref() {
                ServiceError::Dependency(inner) => inner.root_cause(),
                _ => self,
            },
            _ => self,
        }
    }

    /// The factory error at the bottom of a dependency chain, if any.
    pub fn service_error(&self) -> Option<&ServiceError> {
        match self.root_cause() {
            ContainerError::Creation { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Narrow lookup interface shared by the container and the resolver handed to factories.
pub trait Locator {
    /// Resolve the service bound to `id`.
    fn get(&self, id: &str) -> Result<Entry, ContainerError>;

    /// Resolve `id` and recover its concrete type.
    fn get_as<T: Any + Send + Sync>(&self, id: &str) -> Result<Arc<T>, ContainerError>
    where
        Self: Sized,
    {
        self.get(id)?
            .downcast::<T>()
            .map_err(|_| ContainerError::TypeMismatch {
                id: id.to_string(),
                expected: std::any::type_name::<T>(),
            })
    }
}
