//! The project model object.
//!
//! A project is the decorated unit of the model tree: immutable identity
//! (name, directory, colon path), a weak link to its parent, owned child
//! links, a shared back-reference to its invocation, and the dynamic
//! property surface provided by decoration.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Weak};

use tracing::debug;

use projfix_registry::ServiceRegistry;

use crate::decorate::{Decorate, DecorateError, HookTable};
use crate::descriptor::DescriptorId;
use crate::extensions::{self, Conventions, ExtensionTable, PropertyError};
use crate::invocation::Invocation;

/// Constructor arguments for a decorated [`Project`].
pub struct ProjectSeed {
  pub name: String,
  pub dir: PathBuf,
  pub descriptor: DescriptorId,
  pub parent: Option<Arc<Project>>,
  pub invocation: Arc<Invocation>,
}

/// One node of the model-object tree.
pub struct Project {
  name: String,
  dir: PathBuf,
  path: String,
  descriptor: DescriptorId,
  parent: Option<Weak<Project>>,
  children: Mutex<Vec<Arc<Project>>>,
  invocation: Arc<Invocation>,
  properties: ExtensionTable,
  hooks: Arc<HookTable>,
}

impl Decorate for Project {
  type Seed = ProjectSeed;

  fn extension_points() -> &'static [&'static str] {
    &["group", "version", "description", "status"]
  }

  fn construct(seed: ProjectSeed, hooks: Arc<HookTable>) -> Result<Self, DecorateError> {
    if seed.name.is_empty() {
      return Err(DecorateError::undecoratable::<Self>(
        "project name must not be empty",
      ));
    }
    let path = match &seed.parent {
      None => ":".to_string(),
      Some(parent) if parent.path == ":" => format!(":{}", seed.name),
      Some(parent) => format!("{}:{}", parent.path, seed.name),
    };
    Ok(Self {
      name: seed.name,
      dir: seed.dir,
      path,
      descriptor: seed.descriptor,
      parent: seed.parent.as_ref().map(Arc::downgrade),
      children: Mutex::new(Vec::new()),
      invocation: seed.invocation,
      properties: ExtensionTable::new(),
      hooks,
    })
  }
}

impl Project {
  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn project_dir(&self) -> &Path {
    &self.dir
  }

  /// Colon path within the invocation: `:` for the root, `:a:b` below it.
  pub fn path(&self) -> &str {
    &self.path
  }

  pub fn descriptor_id(&self) -> DescriptorId {
    self.descriptor
  }

  pub fn parent(&self) -> Option<Arc<Project>> {
    self.parent.as_ref().and_then(Weak::upgrade)
  }

  pub fn is_root(&self) -> bool {
    self.parent.is_none()
  }

  /// Snapshot of the child projects, in registration order.
  pub fn children(&self) -> Vec<Arc<Project>> {
    self.children.lock().unwrap().clone()
  }

  pub fn child(&self, name: &str) -> Option<Arc<Project>> {
    self
      .children
      .lock()
      .unwrap()
      .iter()
      .find(|child| child.name == name)
      .cloned()
  }

  pub fn invocation(&self) -> &Arc<Invocation> {
    &self.invocation
  }

  /// The root of the tree this project belongs to, while it is alive.
  pub fn root(&self) -> Option<Arc<Project>> {
    self.invocation.root()
  }

  /// The per-invocation services this project was wired to.
  pub fn services(&self) -> &Arc<ServiceRegistry> {
    self.invocation.services()
  }

  /// Attach an already constructed child. Ordering follows attachment
  /// order; sibling-name uniqueness is enforced earlier, at descriptor
  /// creation.
  pub fn add_child(&self, child: Arc<Project>) {
    debug!(parent = %self.path, child = %child.path, "attaching child project");
    self.children.lock().unwrap().push(child);
  }

  /// Set a dynamic property, shadowing any convention default.
  pub fn set_property<T: Send + Sync + 'static>(&self, name: &str, value: T) {
    self.properties.set(name, value);
  }

  /// Whether a read of `name` would produce a value.
  pub fn has_property(&self, name: &str) -> bool {
    self.properties.contains(name)
      || (self.hooks.intercepts(name) && self.convention(name).is_some())
  }

  /// Read a dynamic property. Explicitly set values win; unset extension
  /// points resolve lazily through the invocation's [`Conventions`].
  pub fn property<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>, PropertyError> {
    if let Some(value) = self.properties.get(name) {
      return extensions::downcast(name, value);
    }
    if self.hooks.intercepts(name) {
      if let Some(value) = self.convention(name) {
        return extensions::downcast(name, value);
      }
    }
    Err(PropertyError::NotFound(name.to_string()))
  }

  fn convention(&self, name: &str) -> Option<crate::extensions::PropertyValue> {
    let conventions = self.invocation.services().get::<Conventions>().ok()?;
    conventions.resolve(name)
  }
}

impl std::fmt::Debug for Project {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Project")
      .field("path", &self.path)
      .field("dir", &self.dir)
      .finish_non_exhaustive()
  }
}
