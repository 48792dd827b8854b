//! projfix-fixtures: synthesize project test doubles
//!
//! The entry point is [`ProjectBuilder`]:
//!
//! 1. Create a builder with [`ProjectBuilder::builder`]
//! 2. Optionally configure it (`with_name`, `with_project_dir`,
//!    `with_parent`)
//! 3. Call [`ProjectBuilder::build`] to get a fully wired
//!    [`Project`](projfix_model::Project)
//!
//! A builder can be reused: every parentless `build()` starts a wholly
//! independent invocation with its own service registry and descriptor
//! tree.

mod builder;
mod globals;

pub use builder::{BuildError, ProjectBuilder};
pub use globals::{build_global_services, global_services};

// The model surface callers configure after building.
pub use projfix_model::{Conventions, Invocation, Project, PropertyError};

/// Result type for fixture building
pub type Result<T> = std::result::Result<T, BuildError>;
