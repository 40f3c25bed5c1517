//! Factories build instances of a resolved class.

use crate::class::{Args, Class};
use crate::container::{Container, Shared};
use crate::error::{Error, Result};
use crate::specifier::Specifier;
use crate::value::{Entry, Value};
use std::any::{type_name, Any};
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::debug;

/// Creates injected instances of the entry a specifier resolved to.
///
/// A factory is cached per specifier by its container and refers back to it
/// weakly; creating through a factory whose container has been dropped fails
/// with [`Error::ContainerDropped`].
pub struct Factory {
  specifier: Specifier,
  entry: Entry,
  container: Weak<Shared>,
}

impl Factory {
  pub(crate) fn new(specifier: Specifier, entry: Entry, container: Weak<Shared>) -> Self {
    Self {
      specifier,
      entry,
      container,
    }
  }

  pub fn specifier(&self) -> &Specifier {
    &self.specifier
  }

  /// The resolved entry, exactly as the registry or resolver produced it.
  pub fn entry(&self) -> &Entry {
    &self.entry
  }

  pub fn class(&self) -> Option<&Arc<Class>> {
    self.entry.as_class()
  }

  /// Instantiates the class without arguments and applies its injections.
  pub fn create(&self) -> Result<Value> {
    self.create_with(&Args::new())
  }

  /// Instantiates the class with `args` and applies its injections.
  ///
  /// Every call yields a fresh instance; singleton caching is the
  /// container's concern, not the factory's.
  pub fn create_with(&self, args: &Args) -> Result<Value> {
    let class = self.class().ok_or_else(|| Error::NotAClass {
      specifier: self.specifier.to_string(),
    })?;
    let container = self.container().ok_or(Error::ContainerDropped)?;

    let value = class.instantiate(args)?;
    debug!(specifier = %self.specifier, class = %class.name(), "instantiated class");
    if let Some(target) = value.injection_target() {
      container.apply_injections(target)?;
    }
    Ok(value)
  }

  /// [`create_with`](Self::create_with), downcast to `T`.
  pub fn create_as<T: Any + Send + Sync>(&self, args: &Args) -> Result<Arc<T>> {
    let value = self.create_with(args)?;
    value.downcast::<T>().ok_or_else(|| Error::TypeMismatch {
      specifier: self.specifier.to_string(),
      expected: type_name::<T>(),
      found: value.type_name(),
    })
  }

  fn container(&self) -> Option<Container> {
    self.container.upgrade().map(Container::from_shared)
  }
}

impl fmt::Debug for Factory {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Factory")
      .field("specifier", &self.specifier)
      .field("entry", &self.entry)
      .field("attached", &(self.container.strong_count() > 0))
      .finish()
  }
}
