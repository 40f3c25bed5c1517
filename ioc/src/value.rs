//! Type-erased container values and registry entries.

use crate::class::Class;
use crate::inject::Injectable;
use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

/// A type-erased, shared value handed out by the container.
///
/// A value optionally remembers an [`Injectable`] view of itself. Values built
/// with [`Value::instance`] are "object instances" and receive injections when
/// the container resolves them; values built with [`Value::new`] are opaque.
#[derive(Clone)]
pub struct Value {
  any: Arc<dyn Any + Send + Sync>,
  target: Option<Arc<dyn Injectable>>,
  type_name: &'static str,
}

impl Value {
  /// Wraps an opaque value that never receives injections.
  pub fn new<T: Any + Send + Sync>(value: T) -> Self {
    Self::from_arc(Arc::new(value))
  }

  pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
    Self {
      any: value,
      target: None,
      type_name: type_name::<T>(),
    }
  }

  /// Wraps an object instance whose declared injections the container fills.
  pub fn instance<T: Injectable>(value: T) -> Self {
    Self::instance_arc(Arc::new(value))
  }

  pub fn instance_arc<T: Injectable>(value: Arc<T>) -> Self {
    let target: Arc<dyn Injectable> = value.clone();
    Self {
      any: value,
      target: Some(target),
      type_name: type_name::<T>(),
    }
  }

  /// Returns a typed handle if the value holds a `T`.
  pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
    self.any.clone().downcast::<T>().ok()
  }

  pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
    self.any.downcast_ref::<T>()
  }

  pub fn is<T: Any>(&self) -> bool {
    self.any.is::<T>()
  }

  /// The concrete Rust type name of the wrapped value.
  pub fn type_name(&self) -> &'static str {
    self.type_name
  }

  /// The injectable view of this value, present only for object instances.
  pub fn injection_target(&self) -> Option<&dyn Injectable> {
    self.target.as_deref()
  }

  /// Whether both values share the same allocation.
  pub fn ptr_eq(&self, other: &Value) -> bool {
    std::ptr::eq(
      Arc::as_ptr(&self.any) as *const (),
      Arc::as_ptr(&other.any) as *const (),
    )
  }
}

impl fmt::Debug for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Value")
      .field("type", &self.type_name)
      .field("injectable", &self.target.is_some())
      .finish()
  }
}

/// What a registration or a resolver produces for a specifier.
#[derive(Clone, Debug)]
pub enum Entry {
  /// A class the container can instantiate through a [`Factory`](crate::Factory).
  Class(Arc<Class>),
  /// A ready-made value.
  Value(Value),
}

impl Entry {
  pub fn value<T: Any + Send + Sync>(value: T) -> Self {
    Entry::Value(Value::new(value))
  }

  pub fn instance<T: Injectable>(value: T) -> Self {
    Entry::Value(Value::instance(value))
  }

  pub fn as_class(&self) -> Option<&Arc<Class>> {
    match self {
      Entry::Class(class) => Some(class),
      Entry::Value(_) => None,
    }
  }

  pub fn as_value(&self) -> Option<&Value> {
    match self {
      Entry::Class(_) => None,
      Entry::Value(value) => Some(value),
    }
  }

  /// The entry as a plain value; a class becomes a `Value` holding `Arc<Class>`.
  pub fn to_value(&self) -> Value {
    match self {
      Entry::Class(class) => Value::from_arc(class.clone()),
      Entry::Value(value) => value.clone(),
    }
  }
}

impl From<Arc<Class>> for Entry {
  fn from(class: Arc<Class>) -> Self {
    Entry::Class(class)
  }
}

impl From<&Arc<Class>> for Entry {
  fn from(class: &Arc<Class>) -> Self {
    Entry::Class(class.clone())
  }
}

impl From<Value> for Entry {
  fn from(value: Value) -> Self {
    Entry::Value(value)
  }
}
