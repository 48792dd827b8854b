//! projfix-model: the project model built by fixtures
//!
//! This crate provides the object graph behind a built project fixture:
//! - `DescriptorArena`: lightweight name/directory tree mirroring the
//!   project hierarchy
//! - `Project`: the decorated model object (identity, tree links, dynamic
//!   properties)
//! - `Decorator`: wraps constructed instances with lazy extension-point
//!   resolution, caching the interception shape per type
//! - `Invocation`: one build invocation's services, root and current project

pub mod decorate;
pub mod descriptor;
pub mod extensions;
pub mod invocation;
pub mod project;

pub use decorate::{Decorate, DecorateError, Decorator, HookTable};
pub use descriptor::{Descriptor, DescriptorArena, DescriptorError, DescriptorId};
pub use extensions::{Conventions, ExtensionTable, PropertyError, PropertyValue};
pub use invocation::{Invocation, InvocationError};
pub use project::{Project, ProjectSeed};
