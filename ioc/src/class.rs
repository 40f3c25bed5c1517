//! Runtime class descriptors: constructors plus declared injection points.

use crate::error::{BoxError, Error, Result};
use crate::inject::{Injectable, Injection};
use crate::value::Value;
use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_CLASS_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`Class`]. Injection caches are keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u64);

type Constructor = Box<dyn Fn(&Args) -> Result<Value, BoxError> + Send + Sync>;

/// A class the container can resolve, instantiate and inject.
///
/// Each class stores only the injections it declares itself; a parent set with
/// [`ClassBuilder::extends`] contributes the rest. The flattened view is
/// computed by [`Class::resolved_injections`], where the declaration closest to
/// this class wins for any given property.
pub struct Class {
  id: ClassId,
  name: String,
  parent: Option<Arc<Class>>,
  injections: Vec<Injection>,
  constructor: Option<Constructor>,
}

impl Class {
  pub fn builder(name: impl Into<String>) -> ClassBuilder {
    ClassBuilder {
      name: name.into(),
      parent: None,
      injections: Vec::new(),
    }
  }

  pub fn id(&self) -> ClassId {
    self.id
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn parent(&self) -> Option<&Arc<Class>> {
    self.parent.as_ref()
  }

  /// Injections declared directly on this class, excluding inherited ones.
  pub fn own_injections(&self) -> &[Injection] {
    &self.injections
  }

  /// This class followed by each of its ancestors, nearest first.
  pub fn ancestors(&self) -> Ancestors<'_> {
    Ancestors { next: Some(self) }
  }

  /// Whether `other` is this class or one of its ancestors.
  pub fn inherits_from(&self, other: &Class) -> bool {
    self.ancestors().any(|class| class.id == other.id)
  }

  pub fn is_abstract(&self) -> bool {
    self.constructor.is_none()
  }

  /// Walks the ancestor chain and merges declarations, closest first.
  ///
  /// This is the expensive step the container caches per `ClassId`.
  pub fn resolved_injections(&self) -> Vec<Injection> {
    let mut seen = HashSet::new();
    let mut resolved = Vec::new();
    for class in self.ancestors() {
      for injection in &class.injections {
        if seen.insert(injection.property()) {
          resolved.push(injection.clone());
        }
      }
    }
    resolved
  }

  pub(crate) fn instantiate(&self, args: &Args) -> Result<Value> {
    let constructor = self.constructor.as_ref().ok_or_else(|| Error::AbstractClass {
      class: self.name.clone(),
    })?;
    constructor(args).map_err(|source| Error::Construction {
      class: self.name.clone(),
      source,
    })
  }
}

impl fmt::Debug for Class {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Class")
      .field("id", &self.id)
      .field("name", &self.name)
      .field("parent", &self.parent.as_ref().map(|parent| parent.name()))
      .field("injections", &self.injections)
      .field("abstract", &self.is_abstract())
      .finish()
  }
}

/// Iterator returned by [`Class::ancestors`].
pub struct Ancestors<'a> {
  next: Option<&'a Class>,
}

impl<'a> Iterator for Ancestors<'a> {
  type Item = &'a Class;

  fn next(&mut self) -> Option<&'a Class> {
    let current = self.next?;
    self.next = current.parent.as_deref();
    Some(current)
  }
}

/// Declares a [`Class`] once, at definition time.
pub struct ClassBuilder {
  name: String,
  parent: Option<Arc<Class>>,
  injections: Vec<Injection>,
}

impl ClassBuilder {
  pub fn extends(mut self, parent: &Arc<Class>) -> Self {
    self.parent = Some(parent.clone());
    self
  }

  /// Declares that `property` is filled by looking up `specifier`.
  ///
  /// Declaring the same property twice keeps the later declaration.
  pub fn inject(mut self, property: impl Into<String>, specifier: impl Into<String>) -> Self {
    let injection = Injection::new(property, specifier);
    self
      .injections
      .retain(|existing| existing.property() != injection.property());
    self.injections.push(injection);
    self
  }

  /// Finishes a class whose instances are injectable objects.
  pub fn construct<T, F>(self, constructor: F) -> Arc<Class>
  where
    T: Injectable,
    F: Fn(&Args) -> T + Send + Sync + 'static,
  {
    self.finish(Some(Box::new(
      move |args: &Args| -> Result<Value, BoxError> { Ok(Value::instance(constructor(args))) },
    )))
  }

  /// Like [`construct`](Self::construct), for constructors that can fail.
  pub fn try_construct<T, E, F>(self, constructor: F) -> Arc<Class>
  where
    T: Injectable,
    E: Into<BoxError>,
    F: Fn(&Args) -> Result<T, E> + Send + Sync + 'static,
  {
    self.finish(Some(Box::new(
      move |args: &Args| -> Result<Value, BoxError> {
        constructor(args).map(Value::instance).map_err(Into::into)
      },
    )))
  }

  /// Finishes a class whose instances are opaque values (never injected).
  pub fn construct_value<T, F>(self, constructor: F) -> Arc<Class>
  where
    T: Any + Send + Sync,
    F: Fn(&Args) -> T + Send + Sync + 'static,
  {
    self.finish(Some(Box::new(
      move |args: &Args| -> Result<Value, BoxError> { Ok(Value::new(constructor(args))) },
    )))
  }

  /// Finishes an abstract class: it can be extended and looked up, not built.
  pub fn build(self) -> Arc<Class> {
    self.finish(None)
  }

  fn finish(self, constructor: Option<Constructor>) -> Arc<Class> {
    Arc::new(Class {
      id: ClassId(NEXT_CLASS_ID.fetch_add(1, Ordering::Relaxed)),
      name: self.name,
      parent: self.parent,
      injections: self.injections,
      constructor,
    })
  }
}

/// Positional constructor arguments forwarded by [`Factory::create_with`](crate::Factory::create_with).
#[derive(Default)]
pub struct Args {
  values: Vec<Box<dyn Any + Send + Sync>>,
}

impl Args {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with<T: Any + Send + Sync>(mut self, value: T) -> Self {
    self.push(value);
    self
  }

  pub fn push<T: Any + Send + Sync>(&mut self, value: T) {
    self.values.push(Box::new(value));
  }

  /// The argument at `index`, if present and of type `T`.
  pub fn get<T: Any>(&self, index: usize) -> Option<&T> {
    self.values.get(index)?.downcast_ref::<T>()
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }
}

impl fmt::Debug for Args {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Args").field("len", &self.values.len()).finish()
  }
}
