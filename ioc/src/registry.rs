//! The ordered manual registry shared by containers and resolvers.

use crate::specifier::Specifier;
use crate::value::Entry;
use std::collections::HashMap;

/// Manual registrations, remembering first-registration order.
///
/// Re-registering a specifier replaces its entry but keeps its position, so
/// enumeration stays stable across overrides.
#[derive(Default)]
pub(crate) struct Registry {
  entries: HashMap<String, Entry>,
  order: Vec<Specifier>,
}

impl Registry {
  /// Inserts or replaces; returns `true` when an earlier entry was replaced.
  pub(crate) fn insert(&mut self, specifier: Specifier, entry: Entry) -> bool {
    let replaced = self
      .entries
      .insert(specifier.as_str().to_owned(), entry)
      .is_some();
    if !replaced {
      self.order.push(specifier);
    }
    replaced
  }

  pub(crate) fn get(&self, specifier: &str) -> Option<Entry> {
    self.entries.get(specifier).cloned()
  }

  pub(crate) fn contains(&self, specifier: &str) -> bool {
    self.entries.contains_key(specifier)
  }

  /// Names registered under `kind`, in registration order.
  pub(crate) fn names_for_kind(&self, kind: &str) -> Vec<String> {
    self
      .order
      .iter()
      .filter(|specifier| specifier.kind() == kind)
      .map(|specifier| specifier.name().to_owned())
      .collect()
  }

  pub(crate) fn len(&self) -> usize {
    self.order.len()
  }
}
