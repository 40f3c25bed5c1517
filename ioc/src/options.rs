//! Per-type and per-specifier container options.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Options controlling how the container treats a resolved entry.
///
/// Unset fields fall back from a specifier (`model:user`) to its type
/// (`model`), field by field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContainerOptions {
  /// Share a single lazily created instance per specifier.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub singleton: Option<bool>,
  /// Construct an instance through the entry's factory instead of returning it as is.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub instantiate: Option<bool>,
}

impl ContainerOptions {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn singleton(mut self, singleton: bool) -> Self {
    self.singleton = Some(singleton);
    self
  }

  pub fn instantiate(mut self, instantiate: bool) -> Self {
    self.instantiate = Some(instantiate);
    self
  }

  pub fn get(&self, name: OptionName) -> Option<bool> {
    match name {
      OptionName::Singleton => self.singleton,
      OptionName::Instantiate => self.instantiate,
    }
  }

  pub fn set(&mut self, name: OptionName, value: bool) {
    match name {
      OptionName::Singleton => self.singleton = Some(value),
      OptionName::Instantiate => self.instantiate = Some(value),
    }
  }

  /// Fills every unset field of `self` from `fallback`.
  pub fn or(self, fallback: ContainerOptions) -> ContainerOptions {
    ContainerOptions {
      singleton: self.singleton.or(fallback.singleton),
      instantiate: self.instantiate.or(fallback.instantiate),
    }
  }

  /// Overwrites fields of `self` with every field set in `other`.
  pub fn merge(&mut self, other: ContainerOptions) {
    *self = other.or(*self);
  }

  pub fn is_empty(&self) -> bool {
    self.singleton.is_none() && self.instantiate.is_none()
  }
}

/// The recognized option names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionName {
  Singleton,
  Instantiate,
}

impl fmt::Display for OptionName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      OptionName::Singleton => f.write_str("singleton"),
      OptionName::Instantiate => f.write_str("instantiate"),
    }
  }
}

/// Used when neither the specifier nor its type sets `singleton`.
pub const DEFAULT_SINGLETON: bool = true;
/// Used when neither the specifier nor its type sets `instantiate`.
pub const DEFAULT_INSTANTIATE: bool = false;

/// Per-type defaults of the surrounding web framework.
///
/// Seeded by [`Container::for_application`](crate::Container::for_application)
/// and by configurations that keep `defaults: true`.
pub fn framework_defaults() -> Vec<(&'static str, ContainerOptions)> {
  let shared = ContainerOptions::new().singleton(true).instantiate(true);
  let classes = ContainerOptions::new().singleton(false).instantiate(false);
  let values = ContainerOptions::new().singleton(true).instantiate(false);
  vec![
    ("app", shared),
    ("action", classes),
    ("config", values),
    ("initializer", values),
    ("migration", values),
    ("model", classes),
    ("orm-adapter", shared),
    ("parser", shared),
    ("serializer", shared),
    ("service", shared),
    ("view", shared),
  ]
}
