//! The project fixture builder.
//!
//! `build()` either starts a fresh invocation (no parent configured) or
//! attaches a child to the invocation of an already built parent. The
//! sequencing mirrors §2 of the crate docs: descriptor first, then the
//! decorated instance, then registration in the model tree and the
//! invocation's project map.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use projfix_model::{
  Conventions, DecorateError, Decorator, DescriptorArena, DescriptorError, Invocation,
  InvocationError, Project, ProjectSeed,
};
use projfix_registry::{RegistryError, ServiceRegistry};

use crate::globals::global_services;

/// Errors surfaced by [`ProjectBuilder::build`]
#[derive(Debug, Error)]
pub enum BuildError {
  #[error("registry error: {0}")]
  Registry(#[from] RegistryError),

  #[error("descriptor error: {0}")]
  Descriptor(#[from] DescriptorError),

  #[error("decoration error: {0}")]
  Decorate(#[from] DecorateError),

  #[error("invocation error: {0}")]
  Invocation(#[from] InvocationError),

  #[error("failed to create temporary project directory: {0}")]
  TempDir(#[source] io::Error),
}

/// Builds project test doubles.
///
/// Mutators are chainable and perform no validation; everything is checked
/// inside [`build`](Self::build). A single builder may be reused to build
/// multiple independent roots.
pub struct ProjectBuilder {
  project_dir: Option<PathBuf>,
  name: String,
  parent: Option<Arc<Project>>,
  globals: Arc<ServiceRegistry>,
}

impl ProjectBuilder {
  /// Create a builder backed by the process-global services.
  pub fn builder() -> Self {
    Self::with_global_services(global_services())
  }

  /// Create a builder backed by an explicit global registry.
  pub fn with_global_services(globals: Arc<ServiceRegistry>) -> Self {
    Self {
      project_dir: None,
      name: "test".to_string(),
      parent: None,
      globals,
    }
  }

  /// Set the project directory. Unset, a root gets a fresh unique temp
  /// directory and a child defaults to `<parent dir>/<name>`.
  pub fn with_project_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.project_dir = Some(dir.into());
    self
  }

  /// Set the project name (default `"test"`).
  pub fn with_name(mut self, name: impl Into<String>) -> Self {
    self.name = name.into();
    self
  }

  /// Attach the built project as a child of `parent` instead of starting a
  /// new invocation.
  pub fn with_parent(mut self, parent: Arc<Project>) -> Self {
    self.parent = Some(parent);
    self
  }

  /// Build the configured project.
  pub fn build(&self) -> Result<Arc<Project>, BuildError> {
    match &self.parent {
      Some(parent) => self.build_child(parent),
      None => self.build_root(),
    }
  }

  fn build_root(&self) -> Result<Arc<Project>, BuildError> {
    let dir = self.prepare_project_dir()?;
    info!(name = %self.name, dir = ?dir, "building root project");

    let services = self.globals.create_child();
    services.add_instance(Conventions::new())?;

    let descriptors = DescriptorArena::new();
    let root_id = descriptors.create_root(&self.name, &dir)?;
    let dir = descriptors.dir(root_id);
    let invocation = Invocation::create(services, descriptors)?;

    let decorator = invocation.services().get::<Decorator>()?;
    let project = decorator.decorate::<Project>(ProjectSeed {
      name: self.name.clone(),
      dir,
      descriptor: root_id,
      parent: None,
      invocation: invocation.clone(),
    })?;

    invocation.set_root(&project)?;
    invocation.register_project(&project);
    Ok(project)
  }

  fn build_child(&self, parent: &Arc<Project>) -> Result<Arc<Project>, BuildError> {
    let invocation = parent.invocation().clone();
    debug!(name = %self.name, parent = %parent.path(), "building child project");

    // Sibling-name uniqueness is checked here, under the arena lock.
    let descriptor = invocation.descriptors().create_child(
      parent.descriptor_id(),
      &self.name,
      self.project_dir.as_deref(),
    )?;
    let dir = invocation.descriptors().dir(descriptor);

    let decorator = invocation.services().get::<Decorator>()?;
    let child = decorator.decorate::<Project>(ProjectSeed {
      name: self.name.clone(),
      dir,
      descriptor,
      parent: Some(parent.clone()),
      invocation: invocation.clone(),
    })?;

    parent.add_child(child.clone());
    invocation.register_project(&child);
    Ok(child)
  }

  fn prepare_project_dir(&self) -> Result<PathBuf, BuildError> {
    match &self.project_dir {
      // Canonicalization happens when the root descriptor is created.
      Some(dir) => Ok(dir.clone()),
      None => {
        let dir = tempfile::Builder::new()
          .prefix("projfix-")
          .tempdir()
          .map_err(BuildError::TempDir)?
          // Cleanup belongs to the caller's environment, not this library.
          .keep();
        debug!(dir = ?dir, "created temporary project directory");
        Ok(dir)
      }
    }
  }
}

impl Default for ProjectBuilder {
  fn default() -> Self {
    Self::builder()
  }
}
