//! Typed service keys.

use std::any::{TypeId, type_name};
use std::fmt;

/// Identifies a service binding: a concrete Rust type plus an optional
/// qualifying name for registering several instances of one type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceKey {
  type_id: TypeId,
  type_name: &'static str,
  name: Option<String>,
}

impl ServiceKey {
  /// Key for the unnamed binding of `T`.
  pub fn of<T: 'static>() -> Self {
    Self {
      type_id: TypeId::of::<T>(),
      type_name: type_name::<T>(),
      name: None,
    }
  }

  /// Key for a named binding of `T`.
  pub fn named<T: 'static>(name: &str) -> Self {
    Self {
      type_id: TypeId::of::<T>(),
      type_name: type_name::<T>(),
      name: Some(name.to_string()),
    }
  }

  pub fn type_name(&self) -> &'static str {
    self.type_name
  }

  pub fn name(&self) -> Option<&str> {
    self.name.as_deref()
  }
}

impl fmt::Display for ServiceKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.name {
      Some(name) => write!(f, "{} ('{}')", self.type_name, name),
      None => write!(f, "{}", self.type_name),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unnamed_and_named_keys_differ() {
    assert_ne!(ServiceKey::of::<String>(), ServiceKey::named::<String>("a"));
    assert_ne!(ServiceKey::named::<String>("a"), ServiceKey::named::<String>("b"));
    assert_eq!(ServiceKey::of::<String>(), ServiceKey::of::<String>());
  }

  #[test]
  fn keys_of_distinct_types_differ() {
    assert_ne!(ServiceKey::of::<String>(), ServiceKey::of::<u32>());
  }

  #[test]
  fn display_includes_qualifier() {
    let key = ServiceKey::named::<u32>("retries");
    assert_eq!(key.to_string(), "u32 ('retries')");
  }
}
