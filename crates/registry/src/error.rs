//! Error types for projfix-registry.

use thiserror::Error;

use crate::key::ServiceKey;

/// Errors that can occur in service registry operations
#[derive(Debug, Error)]
pub enum RegistryError {
  /// No binding for the key anywhere on the ancestor chain.
  #[error("no service registered for {0}")]
  ServiceNotFound(ServiceKey),

  /// The key is already bound in the registry being mutated. Shadowing an
  /// ancestor binding is allowed; rebinding within one registry is not.
  #[error("a service is already registered for {0}")]
  DuplicateBinding(ServiceKey),

  /// The registry has been closed; no further lookups or registrations.
  #[error("service registry has been closed")]
  Closed,
}
