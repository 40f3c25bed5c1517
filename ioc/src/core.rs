//! Core, non-public data structures for the IoC container.

use crate::error::{Error, Result};
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CONTAINER_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_container_id() -> u64 {
  NEXT_CONTAINER_ID.fetch_add(1, Ordering::Relaxed)
}

thread_local! {
  // Specifiers currently being resolved on this thread, per container.
  static RESOLVING_STACK: RefCell<HashSet<ResolutionKey>> = RefCell::new(HashSet::new());
}

#[derive(Clone, PartialEq, Eq, Hash)]
pub(crate) struct ResolutionKey {
  container: u64,
  specifier: String,
}

impl fmt::Debug for ResolutionKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Key(Container({}), {})", self.container, self.specifier)
  }
}

/// An RAII guard that detects re-entrant resolution of the same specifier.
///
/// Entering a key already on this thread's stack is a cycle and fails with
/// [`Error::CircularDependency`]; dropping the guard pops the key.
pub(crate) struct ResolutionGuard {
  key: ResolutionKey,
}

impl ResolutionGuard {
  pub(crate) fn enter(container: u64, specifier: &str) -> Result<Self> {
    let key = ResolutionKey {
      container,
      specifier: specifier.to_owned(),
    };
    let inserted = RESOLVING_STACK.with(|stack| stack.borrow_mut().insert(key.clone()));
    if !inserted {
      return Err(Error::CircularDependency {
        specifier: specifier.to_owned(),
      });
    }
    Ok(Self { key })
  }
}

impl Drop for ResolutionGuard {
  fn drop(&mut self) {
    RESOLVING_STACK.with(|stack| {
      stack.borrow_mut().remove(&self.key);
    });
  }
}
