//! Dynamic properties and convention defaults.
//!
//! Every decorated model object carries an [`ExtensionTable`] of dynamic
//! properties set at runtime. Reads of designated extension points that have
//! no explicit value fall back to the invocation's [`Conventions`] service,
//! so unset typed properties resolve lazily instead of returning an empty
//! value.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use thiserror::Error;

/// Type-erased dynamic property value.
pub type PropertyValue = Arc<dyn Any + Send + Sync>;

/// Errors that can occur reading dynamic properties
#[derive(Debug, Error)]
pub enum PropertyError {
  /// Neither an explicit value nor a convention default exists.
  #[error("property '{0}' is not set and has no convention default")]
  NotFound(String),

  /// A value exists but is not of the requested type.
  #[error("property '{name}' is not a {expected}")]
  WrongType { name: String, expected: &'static str },
}

/// Runtime-set dynamic properties of one model object.
#[derive(Debug, Default)]
pub struct ExtensionTable {
  values: Mutex<HashMap<String, PropertyValue>>,
}

impl ExtensionTable {
  pub fn new() -> Self {
    Self::default()
  }

  /// Set a property, replacing any previous value.
  pub fn set<T: Send + Sync + 'static>(&self, name: &str, value: T) {
    self
      .values
      .lock()
      .unwrap()
      .insert(name.to_string(), Arc::new(value));
  }

  /// The raw value of an explicitly set property.
  pub fn get(&self, name: &str) -> Option<PropertyValue> {
    self.values.lock().unwrap().get(name).cloned()
  }

  pub fn contains(&self, name: &str) -> bool {
    self.values.lock().unwrap().contains_key(name)
  }
}

/// Named default values resolved when an intercepted extension point is
/// read without being set. Registered per invocation.
#[derive(Debug, Default)]
pub struct Conventions {
  defaults: Mutex<HashMap<String, PropertyValue>>,
}

impl Conventions {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register (or replace) the default for an extension point.
  pub fn set_default<T: Send + Sync + 'static>(&self, name: &str, value: T) {
    self
      .defaults
      .lock()
      .unwrap()
      .insert(name.to_string(), Arc::new(value));
  }

  /// Resolve the default for `name`, if one is registered.
  pub fn resolve(&self, name: &str) -> Option<PropertyValue> {
    self.defaults.lock().unwrap().get(name).cloned()
  }
}

/// Downcast a property value to `T`, mapping mismatches to
/// [`PropertyError::WrongType`].
pub(crate) fn downcast<T: Send + Sync + 'static>(
  name: &str,
  value: PropertyValue,
) -> Result<Arc<T>, PropertyError> {
  value.downcast::<T>().map_err(|_| PropertyError::WrongType {
    name: name.to_string(),
    expected: std::any::type_name::<T>(),
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn set_then_get_roundtrips() {
    let table = ExtensionTable::new();
    table.set("version", "1.2.3".to_string());

    let value = table.get("version").unwrap();
    assert_eq!(*downcast::<String>("version", value).unwrap(), "1.2.3");
    assert!(table.get("group").is_none());
  }

  #[test]
  fn set_replaces_previous_value() {
    let table = ExtensionTable::new();
    table.set("count", 1u32);
    table.set("count", 2u32);

    let value = table.get("count").unwrap();
    assert_eq!(*downcast::<u32>("count", value).unwrap(), 2);
  }

  #[test]
  fn downcast_mismatch_reports_expected_type() {
    let table = ExtensionTable::new();
    table.set("count", 1u32);

    let err = downcast::<String>("count", table.get("count").unwrap()).unwrap_err();
    assert!(matches!(err, PropertyError::WrongType { name, .. } if name == "count"));
  }

  #[test]
  fn conventions_resolve_registered_defaults() {
    let conventions = Conventions::new();
    conventions.set_default("status", "integration".to_string());

    assert!(conventions.resolve("status").is_some());
    assert!(conventions.resolve("group").is_none());
  }
}
