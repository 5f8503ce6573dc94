//! 基础设施层
//!
//! 提供服务容器：按标识符惰性创建、缓存并分发应用服务。

pub mod container;

pub use container::{
    canonical_name, ContainerError, ContainerStats, Entry, FactoryKind, FactoryRegistry, Locator,
    Resolver, ServiceContainer,
};
