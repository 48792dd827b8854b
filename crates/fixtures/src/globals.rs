//! Process-global services for project fixtures.

use std::sync::{Arc, OnceLock};

use projfix_model::Decorator;
use projfix_registry::ServiceRegistry;

/// The process-wide global registry, created once on first use.
///
/// Only this façade touches the static; everything beneath it receives the
/// handle explicitly. Lives until process exit, so it is never closed.
pub fn global_services() -> Arc<ServiceRegistry> {
  static GLOBAL: OnceLock<Arc<ServiceRegistry>> = OnceLock::new();
  GLOBAL.get_or_init(build_global_services).clone()
}

/// Build a standalone global registry with the stock global services.
/// Tests use this to isolate state from the process-wide instance.
pub fn build_global_services() -> Arc<ServiceRegistry> {
  let registry = ServiceRegistry::global();
  registry
    .add_instance(Decorator::new())
    .expect("fresh global registry has no bindings");
  registry
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn global_services_is_a_singleton() {
    assert!(Arc::ptr_eq(&global_services(), &global_services()));
  }

  #[test]
  fn stock_services_include_the_decorator() {
    let registry = build_global_services();
    assert!(registry.get::<Decorator>().is_ok());
  }
}
