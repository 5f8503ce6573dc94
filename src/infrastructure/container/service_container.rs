//! 服务容器实现
//!
//! 解析顺序：条目表 -> 访问器 -> 初始化器 -> `NoSuchEntry`。
//! 初始化器按标识符加锁执行，并发首次访问时只会被调用一次。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use super::{canonical_name, ContainerError, Entry, Factory, FactoryKind, FactoryRegistry, Locator};
use crate::errors::ServiceError;

/// Lazily-resolving service container.
///
/// Factories receive a [`Resolver`] rather than the container itself, so every
/// nested lookup knows which identifiers are already being built on its chain.
pub struct ServiceContainer {
    registry: FactoryRegistry,
    /// 条目表
    entries: DashMap<String, Entry>,
    /// 每个标识符一把初始化锁
    init_locks: DashMap<String, Arc<Mutex<()>>>,
    /// 正在执行初始化器的线程
    owners: DashMap<String, ThreadId>,
    /// 阻塞在某个初始化锁上的线程
    waiting: DashMap<ThreadId, String>,
    stats: InnerStats,
}

/// Clears an ownership record when initialization ends, panics included.
struct OwnerGuard<'a> {
    owners: &'a DashMap<String, ThreadId>,
    id: &'a str,
}

impl Drop for OwnerGuard<'_> {
    fn drop(&mut self) {
        self.owners.remove(self.id);
    }
}

#[derive(Default)]
struct InnerStats {
    total_resolutions: AtomicUsize,
    cache_hits: AtomicUsize,
    accessor_invocations: AtomicUsize,
    initializer_invocations: AtomicUsize,
}

/// Handle passed to factories; resolves dependencies on behalf of the
/// identifier being built.
pub struct Resolver<'a> {
    container: &'a ServiceContainer,
    id: &'a str,
    parent: Option<&'a Resolver<'a>>,
}

impl<'a> Resolver<'a> {
    /// Identifier this resolver is building.
    pub fn id(&self) -> &str {
        self.id
    }

    /// Identifiers under construction, outermost first.
    pub fn chain(&self) -> Vec<String> {
        let mut chain = Vec::new();
        let mut frame = Some(self);
        while let Some(current) = frame {
            chain.push(current.id.to_string());
            frame = current.parent;
        }
        chain.reverse();
        chain
    }

    /// Identifiers are compared by canonical name, since that is what picks
    /// the factory.
    fn is_building(&self, id: &str) -> bool {
        let name = canonical_name(id);
        let mut frame = Some(self);
        while let Some(current) = frame {
            if canonical_name(current.id) == name {
                return true;
            }
            frame = current.parent;
        }
        false
    }
}

impl Locator for Resolver<'_> {
    fn get(&self, id: &str) -> Result<Entry, ContainerError> {
        self.container.resolve(id, Some(self))
    }
}

impl ServiceContainer {
    /// Container without any factory; only explicit `set` entries resolve.
    pub fn new() -> Self {
        Self::with_registry(FactoryRegistry::new())
    }

    pub fn with_registry(registry: FactoryRegistry) -> Self {
        Self {
            registry,
            entries: DashMap::new(),
            init_locks: DashMap::new(),
            owners: DashMap::new(),
            waiting: DashMap::new(),
            stats: InnerStats::default(),
        }
    }

    /// Store `value` under `id`, replacing any previous entry or memoized result.
    pub fn set<T: std::any::Any + Send + Sync>(&self, id: &str, value: T) {
        self.set_entry(id, Arc::new(value));
    }

    /// Store an already type-erased entry under `id`.
    pub fn set_entry(&self, id: &str, value: Entry) {
        self.entries.insert(id.to_string(), value);
    }

    /// Whether `id` is present in the entry table. Factories are not consulted.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Whether an accessor or initializer could serve `id`.
    pub fn has_factory(&self, id: &str) -> bool {
        self.registry.contains(id)
    }

    /// Identifiers currently in the entry table, sorted.
    pub fn entry_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        ids.sort_unstable();
        ids
    }

    pub fn registry(&self) -> &FactoryRegistry {
        &self.registry
    }

    pub fn stats(&self) -> ContainerStats {
        ContainerStats {
            total_resolutions: self.stats.total_resolutions.load(Ordering::Relaxed),
            cache_hits: self.stats.cache_hits.load(Ordering::Relaxed),
            accessor_invocations: self.stats.accessor_invocations.load(Ordering::Relaxed),
            initializer_invocations: self.stats.initializer_invocations.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }

    fn resolve(&self, id: &str, parent: Option<&Resolver<'_>>) -> Result<Entry, ContainerError> {
        self.stats.total_resolutions.fetch_add(1, Ordering::Relaxed);

        // Presence, not content, decides
        if let Some(value) = self.cached(id) {
            trace!(id, "entry table hit");
            return Ok(value);
        }

        if let Some(parent) = parent {
            if parent.is_building(id) {
                let mut chain = parent.chain();
                let name = canonical_name(id);
                let start = chain
                    .iter()
                    .position(|c| canonical_name(c) == name)
                    .unwrap_or(0);
                chain.drain(..start);
                chain.push(id.to_string());
                warn!(chain = %chain.join(" -> "), "circular service dependency");
                return Err(ContainerError::CircularDependency { chain });
            }
        }

        let factory = self
            .registry
            .lookup(id)
            .ok_or_else(|| ContainerError::NoSuchEntry { id: id.to_string() })?;

        let frame = Resolver {
            container: self,
            id,
            parent,
        };

        match factory.kind() {
            FactoryKind::Accessor => {
                self.stats.accessor_invocations.fetch_add(1, Ordering::Relaxed);
                trace!(id, "invoking accessor");
                factory
                    .invoke(&frame)
                    .map_err(|err| self.creation_failed(id, err))
            }
            FactoryKind::Initializer => self.initialize(id, factory, &frame),
        }
    }

    /// Run an initializer under the identifier's init lock.
    ///
    /// The lock stays held while the factory resolves its dependencies. Two
    /// threads entering a cycle from opposite ends would therefore wait on each
    /// other forever; before blocking, the wait-for graph is walked and such a
    /// cycle is reported as `CircularDependency` instead.
    fn initialize(
        &self,
        id: &str,
        factory: &Factory,
        frame: &Resolver<'_>,
    ) -> Result<Entry, ContainerError> {
        let lock = self
            .init_locks
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();
        let me = thread::current().id();

        let _guard = match lock.try_lock() {
            Some(guard) => guard,
            None => {
                self.waiting.insert(me, id.to_string());
                if let Some(chain) = self.wait_cycle(id, me) {
                    self.waiting.remove(&me);
                    warn!(chain = %chain.join(" -> "), "circular service dependency across threads");
                    return Err(ContainerError::CircularDependency { chain });
                }
                let guard = lock.lock();
                self.waiting.remove(&me);
                guard
            }
        };

        // Another thread may have finished while we waited
        if let Some(value) = self.cached(id) {
            return Ok(value);
        }

        self.owners.insert(id.to_string(), me);
        let _owner = OwnerGuard {
            owners: &self.owners,
            id,
        };

        self.stats.initializer_invocations.fetch_add(1, Ordering::Relaxed);
        debug!(id, "initializing service");
        let value = factory
            .invoke(frame)
            .map_err(|err| self.creation_failed(id, err))?;

        self.set_entry(id, value.clone());
        debug!(id, "service memoized");
        Ok(value)
    }

    /// Follow "waits for the lock of" edges starting at `id`. Returns the
    /// identifiers involved when they lead back to a lock held by `me`.
    fn wait_cycle(&self, id: &str, me: ThreadId) -> Option<Vec<String>> {
        let mut path = vec![id.to_string()];
        let mut current = id.to_string();
        // Bounded by the number of live waiters
        for _ in 0..=self.waiting.len() + 1 {
            let owner = *self.owners.get(&current)?.value();
            if owner == me {
                let mut chain = Vec::with_capacity(path.len() + 1);
                chain.push(current);
                chain.extend(path);
                return Some(chain);
            }
            current = self.waiting.get(&owner)?.value().clone();
            path.push(current.clone());
        }
        None
    }

    fn cached(&self, id: &str) -> Option<Entry> {
        let value = self.entries.get(id).map(|e| e.value().clone())?;
        self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
        Some(value)
    }

    fn creation_failed(&self, id: &str, err: ServiceError) -> ContainerError {
        match err {
            // Cycles surface as-is instead of being wrapped once per frame
            ServiceError::Dependency(cycle @ ContainerError::CircularDependency { .. }) => cycle,
            err => {
                warn!(id, error = %err, "service factory failed");
                ContainerError::Creation {
                    id: id.to_string(),
                    source: Box::new(err),
                }
            }
        }
    }
}

impl Default for ServiceContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl Locator for ServiceContainer {
    fn get(&self, id: &str) -> Result<Entry, ContainerError> {
        self.resolve(id, None)
    }
}

/// 容器统计信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerStats {
    pub total_resolutions: usize,
    pub cache_hits: usize,
    pub accessor_invocations: usize,
    pub initializer_invocations: usize,
    /// 条目表大小
    pub entries: usize,
}

impl ContainerStats {
    /// Share of resolutions answered from the entry table.
    pub fn hit_rate(&self) -> f64 {
        if self.total_resolutions == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.total_resolutions as f64
        }
    }
}
