//! Container-scoped metadata storage.

use crate::class::{Class, ClassId};
use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Identifies a metadata map: either a free-form name or a class identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MetaKey {
  Name(String),
  Class(ClassId),
}

impl From<&str> for MetaKey {
  fn from(name: &str) -> Self {
    MetaKey::Name(name.to_owned())
  }
}

impl From<String> for MetaKey {
  fn from(name: String) -> Self {
    MetaKey::Name(name)
  }
}

impl From<ClassId> for MetaKey {
  fn from(id: ClassId) -> Self {
    MetaKey::Class(id)
  }
}

impl From<&Class> for MetaKey {
  fn from(class: &Class) -> Self {
    MetaKey::Class(class.id())
  }
}

impl From<&Arc<Class>> for MetaKey {
  fn from(class: &Arc<Class>) -> Self {
    MetaKey::Class(class.id())
  }
}

/// A mutable string-keyed map whose lifetime is tied to one container.
///
/// Values are stored type-erased; reads name the expected type and miss when
/// it does not match.
#[derive(Default)]
pub struct Metadata {
  values: DashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl Metadata {
  pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
    let value = self.values.get(key)?.value().clone();
    value.downcast::<T>().ok()
  }

  /// Stores `value`, replacing whatever `key` held before.
  pub fn insert<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) -> Arc<T> {
    let value = Arc::new(value);
    self.values.insert(key.into(), value.clone());
    value
  }

  /// Returns the `T` under `key`, storing `init()` first if the key is vacant
  /// or holds a different type.
  ///
  /// `init` runs while the key is locked and must not touch this map.
  pub fn get_or_insert_with<T, F>(&self, key: &str, init: F) -> Arc<T>
  where
    T: Any + Send + Sync,
    F: FnOnce() -> T,
  {
    match self.values.entry(key.to_owned()) {
      MapEntry::Occupied(mut occupied) => {
        if let Ok(existing) = occupied.get().clone().downcast::<T>() {
          return existing;
        }
        let value = Arc::new(init());
        occupied.insert(value.clone());
        value
      }
      MapEntry::Vacant(vacant) => {
        let value = Arc::new(init());
        vacant.insert(value.clone());
        value
      }
    }
  }

  pub fn remove(&self, key: &str) -> bool {
    self.values.remove(key).is_some()
  }

  pub fn contains_key(&self, key: &str) -> bool {
    self.values.contains_key(key)
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }
}

impl fmt::Debug for Metadata {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Metadata").field("len", &self.values.len()).finish()
  }
}
