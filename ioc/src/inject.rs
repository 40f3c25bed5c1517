//! Injection points and the slots that receive injected values.

use crate::class::Class;
use crate::value::Value;
use parking_lot::RwLock;
use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

/// An object instance that can receive injections from a container.
///
/// `class` names the [`Class`] whose (inherited) injection declarations apply
/// to this instance. `slot` maps each declared property to the field that
/// stores it. Types composed from a base type usually delegate unknown
/// properties to the base's `slot`, which mirrors an inherited field.
///
/// ```
/// use once_cell::sync::Lazy;
/// use std::sync::Arc;
/// use strata_ioc::{Class, Inject, Injectable, InjectionSlot};
///
/// struct Mailer;
///
/// #[derive(Default)]
/// struct Signup {
///   mailer: Inject<Mailer>,
/// }
///
/// static SIGNUP: Lazy<Arc<Class>> = Lazy::new(|| {
///   Class::builder("Signup")
///     .inject("mailer", "service:mailer")
///     .construct(|_| Signup::default())
/// });
///
/// impl Injectable for Signup {
///   fn class(&self) -> Arc<Class> {
///     SIGNUP.clone()
///   }
///
///   fn slot(&self, property: &str) -> Option<&dyn InjectionSlot> {
///     match property {
///       "mailer" => Some(&self.mailer),
///       _ => None,
///     }
///   }
/// }
/// ```
pub trait Injectable: Any + Send + Sync {
  fn class(&self) -> Arc<Class>;

  fn slot(&self, property: &str) -> Option<&dyn InjectionSlot>;
}

/// A property that can be (re)assigned from a container value.
pub trait InjectionSlot: Send + Sync {
  /// Stores `value`, returning `false` if it has the wrong type.
  ///
  /// Assigning the same value again must leave the slot unchanged.
  fn assign(&self, value: &Value) -> bool;

  /// The Rust type this slot accepts, used in error messages.
  fn expected_type(&self) -> &'static str;
}

/// The standard injection slot, holding a shared `T` once injected.
pub struct Inject<T> {
  value: RwLock<Option<Arc<T>>>,
}

impl<T: Any + Send + Sync> Inject<T> {
  pub fn new() -> Self {
    Self {
      value: RwLock::new(None),
    }
  }

  /// The injected value, or `None` if the container has not filled it yet.
  pub fn get(&self) -> Option<Arc<T>> {
    self.value.read().clone()
  }

  pub fn is_set(&self) -> bool {
    self.value.read().is_some()
  }
}

impl<T: Any + Send + Sync> Default for Inject<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T: Any + Send + Sync> InjectionSlot for Inject<T> {
  fn assign(&self, value: &Value) -> bool {
    match value.downcast::<T>() {
      Some(typed) => {
        *self.value.write() = Some(typed);
        true
      }
      None => false,
    }
  }

  fn expected_type(&self) -> &'static str {
    type_name::<T>()
  }
}

impl<T> fmt::Debug for Inject<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Inject")
      .field("type", &type_name::<T>())
      .field("set", &self.value.read().is_some())
      .finish()
  }
}

/// A declared `(property, specifier)` pair on a class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Injection {
  property: String,
  specifier: String,
}

impl Injection {
  pub fn new(property: impl Into<String>, specifier: impl Into<String>) -> Self {
    Self {
      property: property.into(),
      specifier: specifier.into(),
    }
  }

  pub fn property(&self) -> &str {
    &self.property
  }

  pub fn specifier(&self) -> &str {
    &self.specifier
  }
}
