//! Scoped service registries with ancestor-chain lookup.
//!
//! A registry is a typed map from [`ServiceKey`] to a service instance.
//! Registries form a chain: a lookup that misses locally walks parent
//! registries iteratively until it finds a binding or runs out of ancestors.
//! Bindings are singletons per registry; a lazily bound factory runs at most
//! once even under concurrent first resolution.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, RwLock};

use tracing::debug;

use crate::error::RegistryError;
use crate::key::ServiceKey;
use crate::Result;

type AnyService = Arc<dyn Any + Send + Sync>;
type ServiceFactory = Box<dyn Fn() -> AnyService + Send + Sync>;
type StopFn = Box<dyn Fn(&AnyService) + Send + Sync>;

/// Lifetime class of a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
  /// One per process, created at startup, never explicitly torn down.
  Global,
  /// One per build invocation, parented to the global registry, closed when
  /// the invocation is discarded.
  Invocation,
}

impl fmt::Display for Scope {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Scope::Global => write!(f, "global"),
      Scope::Invocation => write!(f, "invocation"),
    }
  }
}

/// A service that owns resources released when its registry closes.
pub trait Stoppable {
  fn stop(&self);
}

enum Provider {
  Eager(AnyService),
  Lazy(ServiceFactory),
}

struct Binding {
  provider: Provider,
  cell: OnceLock<AnyService>,
  stop: Option<StopFn>,
}

impl Binding {
  fn eager(instance: AnyService, stop: Option<StopFn>) -> Self {
    Self {
      provider: Provider::Eager(instance),
      cell: OnceLock::new(),
      stop,
    }
  }

  fn lazy(factory: ServiceFactory, stop: Option<StopFn>) -> Self {
    Self {
      provider: Provider::Lazy(factory),
      cell: OnceLock::new(),
      stop,
    }
  }

  /// Resolve the binding, running a lazy factory at most once. The
  /// `OnceLock` serializes concurrent first resolution per binding.
  fn resolve(&self) -> AnyService {
    self
      .cell
      .get_or_init(|| match &self.provider {
        Provider::Eager(instance) => instance.clone(),
        Provider::Lazy(factory) => factory(),
      })
      .clone()
  }
}

#[derive(Default)]
struct BindingTable {
  map: HashMap<ServiceKey, Arc<Binding>>,
  /// Registration order, for reverse-order stop hooks on close.
  order: Vec<ServiceKey>,
}

/// A hierarchical, scoped container of typed service instances.
pub struct ServiceRegistry {
  scope: Scope,
  parent: Option<Arc<ServiceRegistry>>,
  bindings: RwLock<BindingTable>,
  closed: AtomicBool,
}

impl ServiceRegistry {
  /// Create a process-global root registry.
  pub fn global() -> Arc<Self> {
    Arc::new(Self {
      scope: Scope::Global,
      parent: None,
      bindings: RwLock::new(BindingTable::default()),
      closed: AtomicBool::new(false),
    })
  }

  /// Create an invocation-scoped registry parented to `self`. The child
  /// sees every ancestor binding but cannot mutate them.
  pub fn create_child(self: &Arc<Self>) -> Arc<Self> {
    Arc::new(Self {
      scope: Scope::Invocation,
      parent: Some(self.clone()),
      bindings: RwLock::new(BindingTable::default()),
      closed: AtomicBool::new(false),
    })
  }

  pub fn scope(&self) -> Scope {
    self.scope
  }

  pub fn parent(&self) -> Option<&Arc<ServiceRegistry>> {
    self.parent.as_ref()
  }

  /// Register an instance under its type.
  pub fn add_instance<T: Send + Sync + 'static>(&self, instance: T) -> Result<()> {
    self.insert(ServiceKey::of::<T>(), Binding::eager(Arc::new(instance), None))
  }

  /// Register an already shared instance under its type.
  pub fn add_shared<T: Send + Sync + 'static>(&self, instance: Arc<T>) -> Result<()> {
    self.insert(ServiceKey::of::<T>(), Binding::eager(instance, None))
  }

  /// Register an instance under its type plus a qualifying name.
  pub fn add_named_instance<T: Send + Sync + 'static>(&self, name: &str, instance: T) -> Result<()> {
    self.insert(ServiceKey::named::<T>(name), Binding::eager(Arc::new(instance), None))
  }

  /// Register a factory; the service is created on first lookup and then
  /// memoized for the lifetime of this registry.
  pub fn add_factory<T, F>(&self, factory: F) -> Result<()>
  where
    T: Send + Sync + 'static,
    F: Fn() -> T + Send + Sync + 'static,
  {
    let factory: ServiceFactory = Box::new(move || Arc::new(factory()));
    self.insert(ServiceKey::of::<T>(), Binding::lazy(factory, None))
  }

  /// Register a named factory.
  pub fn add_named_factory<T, F>(&self, name: &str, factory: F) -> Result<()>
  where
    T: Send + Sync + 'static,
    F: Fn() -> T + Send + Sync + 'static,
  {
    let factory: ServiceFactory = Box::new(move || Arc::new(factory()));
    self.insert(ServiceKey::named::<T>(name), Binding::lazy(factory, None))
  }

  /// Register a service whose `stop` hook runs when this registry closes.
  pub fn add_stoppable<T: Stoppable + Send + Sync + 'static>(&self, instance: T) -> Result<()> {
    self.insert(
      ServiceKey::of::<T>(),
      Binding::eager(Arc::new(instance), Some(Self::stop_hook::<T>())),
    )
  }

  /// Register a factory for a service with a `stop` hook. The hook only
  /// runs if the service was actually resolved before close.
  pub fn add_stoppable_factory<T, F>(&self, factory: F) -> Result<()>
  where
    T: Stoppable + Send + Sync + 'static,
    F: Fn() -> T + Send + Sync + 'static,
  {
    let factory: ServiceFactory = Box::new(move || Arc::new(factory()));
    self.insert(ServiceKey::of::<T>(), Binding::lazy(factory, Some(Self::stop_hook::<T>())))
  }

  fn stop_hook<T: Stoppable + Send + Sync + 'static>() -> StopFn {
    Box::new(|service| {
      if let Some(service) = service.downcast_ref::<T>() {
        service.stop();
      }
    })
  }

  /// Resolve the unnamed binding of `T`, walking self then ancestors.
  pub fn get<T: Send + Sync + 'static>(&self) -> Result<Arc<T>> {
    self.lookup(ServiceKey::of::<T>())
  }

  /// Resolve a named binding of `T`, walking self then ancestors.
  pub fn get_named<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>> {
    self.lookup(ServiceKey::named::<T>(name))
  }

  fn insert(&self, key: ServiceKey, binding: Binding) -> Result<()> {
    self.ensure_open()?;
    let mut table = self.bindings.write().unwrap();
    if table.map.contains_key(&key) {
      return Err(RegistryError::DuplicateBinding(key));
    }
    debug!(key = %key, scope = %self.scope, "registering service");
    table.order.push(key.clone());
    table.map.insert(key, Arc::new(binding));
    Ok(())
  }

  fn lookup<T: Send + Sync + 'static>(&self, key: ServiceKey) -> Result<Arc<T>> {
    self.ensure_open()?;
    let mut registry = Some(self);
    while let Some(current) = registry {
      let binding = current.bindings.read().unwrap().map.get(&key).cloned();
      if let Some(binding) = binding {
        let service = binding.resolve();
        // The table is keyed by TypeId, so the downcast cannot fail.
        return Ok(service.downcast::<T>().expect("binding type matches key"));
      }
      registry = current.parent.as_deref();
    }
    Err(RegistryError::ServiceNotFound(key))
  }

  /// Close the registry: run stop hooks over resolved services in reverse
  /// registration order and drop all bindings. Idempotent; later `get` or
  /// `add_*` calls fail with [`RegistryError::Closed`].
  pub fn close(&self) {
    if self.closed.swap(true, Ordering::SeqCst) {
      return;
    }
    debug!(scope = %self.scope, "closing service registry");
    let mut table = self.bindings.write().unwrap();
    for key in table.order.iter().rev() {
      if let Some(binding) = table.map.get(key) {
        if let Some(stop) = &binding.stop {
          // A lazy service that was never resolved owns nothing to stop.
          match (&binding.provider, binding.cell.get()) {
            (Provider::Eager(service), _) => {
              debug!(key = %key, "stopping service");
              stop(service);
            }
            (Provider::Lazy(_), Some(service)) => {
              debug!(key = %key, "stopping service");
              stop(service);
            }
            (Provider::Lazy(_), None) => {}
          }
        }
      }
    }
    table.map.clear();
    table.order.clear();
  }

  pub fn is_closed(&self) -> bool {
    self.closed.load(Ordering::SeqCst)
  }

  fn ensure_open(&self) -> Result<()> {
    if self.is_closed() {
      return Err(RegistryError::Closed);
    }
    Ok(())
  }
}

impl fmt::Debug for ServiceRegistry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ServiceRegistry")
      .field("scope", &self.scope)
      .field("closed", &self.is_closed())
      .finish_non_exhaustive()
  }
}
