//! One build invocation: services, descriptor tree, root and current project.
//!
//! An invocation owns the per-invocation service registry and the descriptor
//! arena, and tracks the root and current/default project pointers. The
//! project tree itself is owned root-down through `Arc` child links; the
//! invocation only holds weak back-references, so discarding the root
//! releases the whole tree.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, Weak};

use thiserror::Error;
use tracing::debug;

use projfix_registry::{Scope, ServiceRegistry};

use crate::descriptor::DescriptorArena;
use crate::project::Project;

/// Errors that can occur wiring an invocation
#[derive(Debug, Error)]
pub enum InvocationError {
  /// `set_root` was called a second time.
  #[error("root project has already been set for this invocation")]
  RootAlreadySet,

  /// The registry is not an invocation-scoped child of the global registry.
  #[error("invocation services must be an invocation-scoped child of the global registry")]
  InvalidScope,
}

/// Context shared by every project built within one invocation.
pub struct Invocation {
  services: Arc<ServiceRegistry>,
  descriptors: DescriptorArena,
  root: OnceLock<Weak<Project>>,
  current: Mutex<Weak<Project>>,
  /// Colon-path lookup of every project built in this invocation.
  projects: Mutex<HashMap<String, Weak<Project>>>,
}

impl Invocation {
  /// Create an invocation around its per-invocation services and a fresh
  /// descriptor arena. The registry must be invocation-scoped and parented
  /// to a global registry.
  pub fn create(
    services: Arc<ServiceRegistry>,
    descriptors: DescriptorArena,
  ) -> Result<Arc<Self>, InvocationError> {
    let parented_to_global = services.scope() == Scope::Invocation
      && services.parent().is_some_and(|parent| parent.scope() == Scope::Global);
    if !parented_to_global {
      return Err(InvocationError::InvalidScope);
    }
    Ok(Arc::new(Self {
      services,
      descriptors,
      root: OnceLock::new(),
      current: Mutex::new(Weak::new()),
      projects: Mutex::new(HashMap::new()),
    }))
  }

  pub fn services(&self) -> &Arc<ServiceRegistry> {
    &self.services
  }

  pub fn descriptors(&self) -> &DescriptorArena {
    &self.descriptors
  }

  /// Set the root project. Settable exactly once; also initializes the
  /// current project pointer.
  pub fn set_root(&self, project: &Arc<Project>) -> Result<(), InvocationError> {
    self
      .root
      .set(Arc::downgrade(project))
      .map_err(|_| InvocationError::RootAlreadySet)?;
    *self.current.lock().unwrap() = Arc::downgrade(project);
    debug!(root = %project.path(), "invocation root set");
    Ok(())
  }

  pub fn root(&self) -> Option<Arc<Project>> {
    self.root.get().and_then(Weak::upgrade)
  }

  pub fn current(&self) -> Option<Arc<Project>> {
    self.current.lock().unwrap().upgrade()
  }

  /// Reassign the current/default project. Multi-module logic repoints
  /// this after the root is built.
  pub fn set_current(&self, project: &Arc<Project>) {
    *self.current.lock().unwrap() = Arc::downgrade(project);
  }

  /// Record a built project under its colon path.
  pub fn register_project(&self, project: &Arc<Project>) {
    self
      .projects
      .lock()
      .unwrap()
      .insert(project.path().to_string(), Arc::downgrade(project));
  }

  /// Resolve a previously built project by colon path.
  pub fn project(&self, path: &str) -> Option<Arc<Project>> {
    self.projects.lock().unwrap().get(path).and_then(Weak::upgrade)
  }

  /// Discard the invocation: close the per-invocation services. The
  /// project tree is released by dropping the root.
  pub fn close(&self) {
    self.services.close();
  }
}

impl Drop for Invocation {
  fn drop(&mut self) {
    // Discarding the last handle releases the invocation's services too;
    // close() is idempotent, so an explicit close earlier is fine.
    self.services.close();
  }
}

impl fmt::Debug for Invocation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Invocation")
      .field("services", &self.services)
      .field("descriptors", &self.descriptors)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicBool, Ordering};

  use projfix_registry::Stoppable;

  use super::*;

  #[test]
  fn create_requires_invocation_scope() {
    let global = ServiceRegistry::global();
    let err = Invocation::create(global, DescriptorArena::new()).unwrap_err();
    assert!(matches!(err, InvocationError::InvalidScope));
  }

  #[test]
  fn create_requires_global_parent() {
    let global = ServiceRegistry::global();
    let grandchild = global.create_child().create_child();
    let err = Invocation::create(grandchild, DescriptorArena::new()).unwrap_err();
    assert!(matches!(err, InvocationError::InvalidScope));
  }

  #[test]
  fn create_accepts_child_of_global() {
    let global = ServiceRegistry::global();
    let invocation = Invocation::create(global.create_child(), DescriptorArena::new()).unwrap();
    assert!(invocation.root().is_none());
    assert!(invocation.current().is_none());
  }

  struct Flag(Arc<AtomicBool>);

  impl Stoppable for Flag {
    fn stop(&self) {
      self.0.store(true, Ordering::SeqCst);
    }
  }

  #[test]
  fn dropping_the_invocation_closes_its_services() {
    let global = ServiceRegistry::global();
    let invocation = Invocation::create(global.create_child(), DescriptorArena::new()).unwrap();
    let stopped = Arc::new(AtomicBool::new(false));
    invocation
      .services()
      .add_stoppable(Flag(stopped.clone()))
      .unwrap();

    drop(invocation);
    assert!(stopped.load(Ordering::SeqCst));
  }
}
