//! Wrapper-based decoration of constructed model objects.
//!
//! Decoration here is composition, not code generation: a decoratable type
//! declares its interceptable extension points and a seeded constructor,
//! and the [`Decorator`] hands it a shared [`HookTable`] describing which
//! property reads resolve lazily via conventions. The hook table is cached
//! per concrete type, so repeated decoration of one type is amortized O(1).

use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::debug;

/// Errors that can occur during decoration
#[derive(Debug, Error)]
pub enum DecorateError {
  /// The type lacks the structural markers decoration requires.
  #[error("cannot decorate {type_name}: {reason}")]
  UndecoratableType {
    type_name: &'static str,
    reason: String,
  },
}

impl DecorateError {
  pub fn undecoratable<T>(reason: &str) -> Self {
    Self::UndecoratableType {
      type_name: type_name::<T>(),
      reason: reason.to_string(),
    }
  }
}

/// The interception shape of one decorated type: which property names are
/// resolved through conventions when unset. Immutable once built.
#[derive(Debug)]
pub struct HookTable {
  intercepted: &'static [&'static str],
}

impl HookTable {
  fn new(intercepted: &'static [&'static str]) -> Self {
    Self { intercepted }
  }

  /// Whether reads of `name` fall back to convention resolution.
  pub fn intercepts(&self, name: &str) -> bool {
    self.intercepted.contains(&name)
  }

  pub fn extension_points(&self) -> &[&'static str] {
    self.intercepted
  }
}

/// A type that can be decorated.
///
/// The two structural markers decoration requires: a list of extension-point
/// property names to intercept, and a constructor accepting the type's seed
/// plus the shared hook table.
pub trait Decorate: Send + Sync + Sized + 'static {
  /// Constructor arguments for the decorated instance.
  type Seed;

  /// Property names whose reads are intercepted. Must be non-empty for the
  /// type to be decoratable.
  fn extension_points() -> &'static [&'static str];

  /// Build the instance around the interception table. May reject a seed
  /// that does not match an accessible constructor.
  fn construct(seed: Self::Seed, hooks: Arc<HookTable>) -> Result<Self, DecorateError>;
}

/// Stateless decoration factory with a process-wide, never-invalidated
/// cache of hook-table shapes keyed by concrete type.
#[derive(Debug, Default)]
pub struct Decorator {
  shapes: Mutex<HashMap<TypeId, Arc<HookTable>>>,
}

impl Decorator {
  pub fn new() -> Self {
    Self::default()
  }

  /// Decorate a new instance of `T` from `seed`.
  pub fn decorate<T: Decorate>(&self, seed: T::Seed) -> Result<Arc<T>, DecorateError> {
    let hooks = self.shape_for::<T>()?;
    Ok(Arc::new(T::construct(seed, hooks)?))
  }

  /// The cached hook table for `T`, built on first use.
  pub fn shape_for<T: Decorate>(&self) -> Result<Arc<HookTable>, DecorateError> {
    let points = T::extension_points();
    if points.is_empty() {
      return Err(DecorateError::undecoratable::<T>(
        "declares no extension points",
      ));
    }
    let mut shapes = self.shapes.lock().unwrap();
    let hooks = shapes.entry(TypeId::of::<T>()).or_insert_with(|| {
      debug!(ty = type_name::<T>(), points = points.len(), "synthesizing hook table");
      Arc::new(HookTable::new(points))
    });
    Ok(hooks.clone())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Debug)]
  struct Widget {
    label: String,
    hooks: Arc<HookTable>,
  }

  impl Decorate for Widget {
    type Seed = String;

    fn extension_points() -> &'static [&'static str] {
      &["size", "color"]
    }

    fn construct(seed: String, hooks: Arc<HookTable>) -> Result<Self, DecorateError> {
      if seed.is_empty() {
        return Err(DecorateError::undecoratable::<Self>("empty label"));
      }
      Ok(Self { label: seed, hooks })
    }
  }

  #[derive(Debug)]
  struct Bare;

  impl Decorate for Bare {
    type Seed = ();

    fn extension_points() -> &'static [&'static str] {
      &[]
    }

    fn construct(_seed: (), _hooks: Arc<HookTable>) -> Result<Self, DecorateError> {
      Ok(Self)
    }
  }

  #[test]
  fn decorated_instances_share_one_cached_shape() {
    let decorator = Decorator::new();
    let first = decorator.decorate::<Widget>("a".to_string()).unwrap();
    let second = decorator.decorate::<Widget>("b".to_string()).unwrap();

    // Distinct instances, same synthesized shape.
    assert!(!Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&first.hooks, &second.hooks));
    assert_eq!(first.label, "a");
    assert_eq!(second.label, "b");
  }

  #[test]
  fn hook_table_reports_intercepted_points() {
    let decorator = Decorator::new();
    let widget = decorator.decorate::<Widget>("w".to_string()).unwrap();
    assert!(widget.hooks.intercepts("size"));
    assert!(widget.hooks.intercepts("color"));
    assert!(!widget.hooks.intercepts("label"));
  }

  #[test]
  fn type_without_extension_points_is_undecoratable() {
    let decorator = Decorator::new();
    let err = decorator.decorate::<Bare>(()).unwrap_err();
    assert!(matches!(err, DecorateError::UndecoratableType { .. }));
  }

  #[test]
  fn constructor_may_reject_its_seed() {
    let decorator = Decorator::new();
    let err = decorator.decorate::<Widget>(String::new()).unwrap_err();
    assert!(matches!(err, DecorateError::UndecoratableType { .. }));
  }
}
