//! projfix-registry: hierarchical, scoped service registries
//!
//! This crate provides the service container used by project fixtures:
//! - `ServiceRegistry`: a typed map of service instances with an optional
//!   parent; lookups walk the ancestor chain on miss
//! - `Scope`: the lifetime class of a registry (process-global vs.
//!   per-build-invocation)
//! - `Stoppable`: services that release resources when their registry closes

mod error;
mod key;
mod registry;

pub use error::RegistryError;
pub use key::ServiceKey;
pub use registry::{Scope, ServiceRegistry, Stoppable};

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;
