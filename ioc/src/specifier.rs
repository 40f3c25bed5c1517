//! Parsing and validation of `type:name` specifiers.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// A validated `"<type>:<name>"` key addressing a single container entry.
///
/// Specifiers are case-sensitive and must contain exactly one colon with a
/// non-empty part on either side. Names may contain `/` to address nested
/// entries (e.g. `action:users/create`).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Specifier {
  raw: String,
  colon: usize,
}

impl Specifier {
  /// Parses a single-entry specifier.
  pub fn parse(specifier: &str) -> Result<Self> {
    let malformed = |reason| Error::MalformedSpecifier {
      specifier: specifier.to_owned(),
      reason,
    };

    let colon = specifier
      .find(':')
      .ok_or_else(|| malformed("expected exactly one ':' separating type and name"))?;
    if specifier[colon + 1..].contains(':') {
      return Err(malformed("expected exactly one ':' separating type and name"));
    }
    if colon == 0 {
      return Err(malformed("type must not be empty"));
    }
    if colon + 1 == specifier.len() {
      return Err(malformed("name must not be empty"));
    }

    Ok(Self {
      raw: specifier.to_owned(),
      colon,
    })
  }

  /// Builds a specifier from its parts.
  pub fn new(kind: &str, name: &str) -> Result<Self> {
    Self::parse(&format!("{}:{}", kind, name))
  }

  /// The `type` half, e.g. `model` in `model:user`.
  pub fn kind(&self) -> &str {
    &self.raw[..self.colon]
  }

  /// The `name` half, e.g. `user` in `model:user`.
  pub fn name(&self) -> &str {
    &self.raw[self.colon + 1..]
  }

  pub fn as_str(&self) -> &str {
    &self.raw
  }
}

/// Checks that `kind` is usable as a bare type (non-empty, no colon).
pub(crate) fn validate_kind(kind: &str) -> Result<()> {
  if kind.is_empty() {
    return Err(Error::MalformedSpecifier {
      specifier: kind.to_owned(),
      reason: "type must not be empty",
    });
  }
  if kind.contains(':') {
    return Err(Error::MalformedSpecifier {
      specifier: kind.to_owned(),
      reason: "a bare type must not contain ':'",
    });
  }
  Ok(())
}

/// Checks an option key, which is either a bare type or a full specifier.
pub(crate) fn validate_option_key(key: &str) -> Result<()> {
  if key.contains(':') {
    Specifier::parse(key).map(|_| ())
  } else {
    validate_kind(key)
  }
}

impl FromStr for Specifier {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    Self::parse(s)
  }
}

impl TryFrom<&str> for Specifier {
  type Error = Error;

  fn try_from(s: &str) -> Result<Self> {
    Self::parse(s)
  }
}

impl AsRef<str> for Specifier {
  fn as_ref(&self) -> &str {
    &self.raw
  }
}

impl fmt::Display for Specifier {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.raw)
  }
}

impl fmt::Debug for Specifier {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Specifier({})", self.raw)
  }
}
