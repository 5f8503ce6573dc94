//! 工厂注册表
//!
//! 注册时按规范名存储，解析时按同样的规则查找；访问器优先于初始化器。

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::{canonical_name, entry, Entry, FactoryKind, Resolver};
use crate::errors::ServiceError;

/// Type-erased factory body.
pub type FactoryFn = Arc<dyn Fn(&Resolver<'_>) -> Result<Entry, ServiceError> + Send + Sync>;

/// Tagged factory descriptor.
#[derive(Clone)]
pub struct Factory {
    kind: FactoryKind,
    func: FactoryFn,
}

impl Factory {
    pub fn new(kind: FactoryKind, func: FactoryFn) -> Self {
        Self { kind, func }
    }

    pub fn kind(&self) -> FactoryKind {
        self.kind
    }

    pub(crate) fn invoke(&self, resolver: &Resolver<'_>) -> Result<Entry, ServiceError> {
        (self.func)(resolver)
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory").field("kind", &self.kind).finish()
    }
}

/// Set of accessor and initializer factories, fixed before the container is built.
#[derive(Clone, Default, Debug)]
pub struct FactoryRegistry {
    accessors: HashMap<String, Factory>,
    initializers: HashMap<String, Factory>,
}

impl FactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for `id` under its canonical name, replacing any
    /// factory of the same kind.
    pub fn register(&mut self, id: &str, factory: Factory) -> &mut Self {
        let name = canonical_name(id);
        match factory.kind() {
            FactoryKind::Accessor => self.accessors.insert(name, factory),
            FactoryKind::Initializer => self.initializers.insert(name, factory),
        };
        self
    }

    /// Register a factory recomputed on every resolution.
    pub fn accessor<T, F>(&mut self, id: &str, factory: F) -> &mut Self
    where
        T: Any + Send + Sync,
        F: Fn(&Resolver<'_>) -> Result<T, ServiceError> + Send + Sync + 'static,
    {
        self.register(id, Factory::new(FactoryKind::Accessor, erase(factory)))
    }

    /// Register a factory whose first result is memoized.
    pub fn initializer<T, F>(&mut self, id: &str, factory: F) -> &mut Self
    where
        T: Any + Send + Sync,
        F: Fn(&Resolver<'_>) -> Result<T, ServiceError> + Send + Sync + 'static,
    {
        self.register(id, Factory::new(FactoryKind::Initializer, erase(factory)))
    }

    /// Find the factory serving `id`. An accessor shadows an initializer.
    pub fn lookup(&self, id: &str) -> Option<&Factory> {
        let name = canonical_name(id);
        self.accessors
            .get(&name)
            .or_else(|| self.initializers.get(&name))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lookup(id).is_some()
    }

    /// Canonical names registered for one kind, sorted.
    pub fn names(&self, kind: FactoryKind) -> Vec<&str> {
        let table = match kind {
            FactoryKind::Accessor => &self.accessors,
            FactoryKind::Initializer => &self.initializers,
        };
        let mut names: Vec<&str> = table.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.accessors.len() + self.initializers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn erase<T, F>(factory: F) -> FactoryFn
where
    T: Any + Send + Sync,
    F: Fn(&Resolver<'_>) -> Result<T, ServiceError> + Send + Sync + 'static,
{
    Arc::new(move |resolver: &Resolver<'_>| factory(resolver).map(entry))
}
