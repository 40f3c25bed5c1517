//! Resolvers map specifiers to entries for one precedence tier.
//!
//! A resolver consults, in order: a per-type [`TypeStrategy`] override, its own
//! manual registrations, and finally files under its root directory following
//! the `<root>/<type>/<name>.<ext>` convention. Finding nothing is a normal
//! outcome (`Ok(None)`), since a container probes every resolver in turn.

use crate::error::{Error, Result};
use crate::registry::Registry;
use crate::specifier::{validate_kind, Specifier};
use crate::value::Entry;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::ffi::OsStr;
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

/// Overrides retrieval of a single entry for one type.
pub type RetrieveFn = dyn Fn(&Resolver, &Specifier) -> Result<Option<Entry>> + Send + Sync;
/// Overrides enumeration of entry names for one type.
pub type AvailableFn = dyn Fn(&Resolver, &str) -> Result<Vec<String>> + Send + Sync;
/// Turns a file on disk into an entry.
pub type LoadFn = dyn Fn(&Path) -> Result<Entry> + Send + Sync;

/// Per-type resolution overrides, checked before the default lookup.
#[derive(Default)]
pub struct TypeStrategy {
  directory: Option<PathBuf>,
  retrieve: Option<Box<RetrieveFn>>,
  available: Option<Box<AvailableFn>>,
}

impl TypeStrategy {
  pub fn new() -> Self {
    Self::default()
  }

  /// Looks for this type's files in `dir` (relative to the root) instead of `<type>`.
  pub fn directory(mut self, dir: impl Into<PathBuf>) -> Self {
    self.directory = Some(dir.into());
    self
  }

  pub fn retrieve<F>(mut self, retrieve: F) -> Self
  where
    F: Fn(&Resolver, &Specifier) -> Result<Option<Entry>> + Send + Sync + 'static,
  {
    self.retrieve = Some(Box::new(retrieve));
    self
  }

  pub fn available<F>(mut self, available: F) -> Self
  where
    F: Fn(&Resolver, &str) -> Result<Vec<String>> + Send + Sync + 'static,
  {
    self.available = Some(Box::new(available));
    self
  }
}

impl fmt::Debug for TypeStrategy {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TypeStrategy")
      .field("directory", &self.directory)
      .field("retrieve", &self.retrieve.is_some())
      .field("available", &self.available.is_some())
      .finish()
  }
}

/// One precedence tier of lookup, typically one addon or the application itself.
pub struct Resolver {
  name: String,
  root: Option<PathBuf>,
  registry: RwLock<Registry>,
  strategies: HashMap<String, TypeStrategy>,
  loaders: Vec<(String, Box<LoadFn>)>,
}

impl Resolver {
  /// Creates a resolver without a root directory.
  ///
  /// It resolves only manual registrations and strategy overrides until
  /// [`with_root`](Self::with_root) points it at a directory.
  pub fn new(name: impl Into<String>) -> Self {
    let mut resolver = Self {
      name: name.into(),
      root: None,
      registry: RwLock::new(Registry::default()),
      strategies: HashMap::new(),
      loaders: Vec::new(),
    };
    resolver.set_loader("json", load_json);
    resolver.set_loader("yaml", load_yaml);
    resolver.set_loader("yml", load_yaml);
    resolver
  }

  pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
    self.root = Some(root.into());
    self
  }

  /// Remaps the directory searched for `kind`, e.g. `initializer` → `config/initializers`.
  pub fn with_directory(mut self, kind: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
    let strategy = self.strategies.entry(kind.into()).or_default();
    strategy.directory = Some(dir.into());
    self
  }

  /// Installs a strategy for `kind`, replacing any earlier one.
  pub fn with_strategy(mut self, kind: impl Into<String>, strategy: TypeStrategy) -> Self {
    self.strategies.insert(kind.into(), strategy);
    self
  }

  /// Adds (or replaces) the loader for files ending in `.<extension>`.
  ///
  /// When several files share a name, the loader added first wins.
  pub fn with_loader<F>(mut self, extension: impl Into<String>, loader: F) -> Self
  where
    F: Fn(&Path) -> Result<Entry> + Send + Sync + 'static,
  {
    self.set_loader(extension, loader);
    self
  }

  fn set_loader<F>(&mut self, extension: impl Into<String>, loader: F)
  where
    F: Fn(&Path) -> Result<Entry> + Send + Sync + 'static,
  {
    let extension = extension.into();
    match self.loaders.iter_mut().find(|(ext, _)| *ext == extension) {
      Some((_, existing)) => *existing = Box::new(loader),
      None => self.loaders.push((extension, Box::new(loader))),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn root(&self) -> Option<&Path> {
    self.root.as_deref()
  }

  /// The directory holding files for `kind`, if this resolver has a root.
  pub fn directory_for(&self, kind: &str) -> Option<PathBuf> {
    let root = self.root.as_ref()?;
    let relative = self
      .strategies
      .get(kind)
      .and_then(|strategy| strategy.directory.clone())
      .unwrap_or_else(|| PathBuf::from(kind));
    Some(root.join(relative))
  }

  /// Stores a manual override, taking precedence over files for this resolver only.
  pub fn register(&self, specifier: &str, entry: impl Into<Entry>) -> Result<()> {
    let specifier = Specifier::parse(specifier)?;
    debug!(resolver = %self.name, specifier = %specifier, "registering resolver entry");
    self.registry.write().insert(specifier, entry.into());
    Ok(())
  }

  /// Resolves a single-entry specifier, returning `Ok(None)` when nothing matches.
  pub fn retrieve(&self, specifier: &str) -> Result<Option<Entry>> {
    let specifier = Specifier::parse(specifier)?;
    self.retrieve_specifier(&specifier)
  }

  pub(crate) fn retrieve_specifier(&self, specifier: &Specifier) -> Result<Option<Entry>> {
    let strategy = self
      .strategies
      .get(specifier.kind())
      .and_then(|strategy| strategy.retrieve.as_ref());
    match strategy {
      Some(retrieve) => retrieve(self, specifier),
      None => self.retrieve_default(specifier),
    }
  }

  /// The generic lookup: manual registrations, then `<dir>/<name>.<ext>`.
  ///
  /// Strategies may call this to fall back after their own checks.
  pub fn retrieve_default(&self, specifier: &Specifier) -> Result<Option<Entry>> {
    if let Some(entry) = self.registry.read().get(specifier.as_str()) {
      trace!(resolver = %self.name, specifier = %specifier, "resolved from registrations");
      return Ok(Some(entry));
    }
    self.load_file(specifier)
  }

  fn load_file(&self, specifier: &Specifier) -> Result<Option<Entry>> {
    let Some(dir) = self.directory_for(specifier.kind()) else {
      return Ok(None);
    };
    if !is_relative_name(specifier.name()) {
      return Ok(None);
    }

    for (extension, loader) in &self.loaders {
      let path = dir.join(format!("{}.{}", specifier.name(), extension));
      if !path.is_file() {
        continue;
      }
      trace!(resolver = %self.name, path = %path.display(), "loading entry file");
      return match loader(&path) {
        Ok(entry) => Ok(Some(entry)),
        Err(e) => {
          warn!(resolver = %self.name, specifier = %specifier, error = %e, "entry file failed to load");
          Err(e)
        }
      };
    }
    Ok(None)
  }

  /// Every specifier of `kind` this resolver knows about.
  ///
  /// Manual registrations come first in registration order, followed by
  /// discovered names in sorted order; a name present in both appears once.
  pub fn available_for_type(&self, kind: &str) -> Result<Vec<Specifier>> {
    validate_kind(kind)?;
    let registered = self.registry.read().names_for_kind(kind);
    let discovered = match self
      .strategies
      .get(kind)
      .and_then(|strategy| strategy.available.as_ref())
    {
      Some(available) => available(self, kind)?,
      None => self.scan_directory(kind)?,
    };

    let mut seen = HashSet::new();
    let mut specifiers = Vec::new();
    for name in registered.into_iter().chain(discovered) {
      if !seen.insert(name.clone()) {
        continue;
      }
      match Specifier::new(kind, &name) {
        Ok(specifier) => specifiers.push(specifier),
        Err(e) => warn!(resolver = %self.name, name = %name, error = %e, "skipping unaddressable entry"),
      }
    }
    Ok(specifiers)
  }

  /// Lists loadable files for `kind` as `/`-separated names without extensions.
  ///
  /// A missing directory yields an empty list.
  pub fn scan_directory(&self, kind: &str) -> Result<Vec<String>> {
    let Some(dir) = self.directory_for(kind) else {
      return Ok(Vec::new());
    };
    if !dir.is_dir() {
      trace!(resolver = %self.name, dir = %dir.display(), "no directory to scan");
      return Ok(Vec::new());
    }

    let mut names = Vec::new();
    for entry in WalkDir::new(&dir).follow_links(true) {
      let entry = entry.map_err(|e| Error::Io {
        path: e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.clone()),
        source: e.into(),
      })?;
      if !entry.file_type().is_file() {
        continue;
      }
      let path = entry.path();
      let loadable = path
        .extension()
        .and_then(OsStr::to_str)
        .map_or(false, |ext| self.loaders.iter().any(|(known, _)| known == ext));
      if !loadable {
        continue;
      }
      let Ok(relative) = path.strip_prefix(&dir) else {
        continue;
      };
      match entry_name(relative) {
        Some(name) => names.push(name),
        None => warn!(
          resolver = %self.name,
          path = %path.display(),
          "skipping entry file with a non UTF-8 name"
        ),
      }
    }
    names.sort();
    names.dedup();
    trace!(resolver = %self.name, kind, count = names.len(), "scanned directory");
    Ok(names)
  }
}

impl fmt::Debug for Resolver {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Resolver")
      .field("name", &self.name)
      .field("root", &self.root)
      .field("registrations", &self.registry.read().len())
      .field("strategies", &self.strategies)
      .field(
        "loaders",
        &self.loaders.iter().map(|(ext, _)| ext.as_str()).collect::<Vec<_>>(),
      )
      .finish()
  }
}

/// `users/create.json` → `users/create`; `None` if any component is not UTF-8.
fn entry_name(relative: &Path) -> Option<String> {
  let parts = relative
    .with_extension("")
    .components()
    .map(|component| component.as_os_str().to_str().map(str::to_owned))
    .collect::<Option<Vec<_>>>()?;
  Some(parts.join("/"))
}

/// Rejects names that would escape the type directory.
fn is_relative_name(name: &str) -> bool {
  Path::new(name)
    .components()
    .all(|component| matches!(component, Component::Normal(_)))
}

fn read_file(path: &Path) -> Result<String> {
  fs::read_to_string(path).map_err(|source| Error::Io {
    path: path.to_path_buf(),
    source,
  })
}

fn load_json(path: &Path) -> Result<Entry> {
  let text = read_file(path)?;
  let value: serde_json::Value = serde_json::from_str(&text).map_err(|e| Error::Parse {
    path: path.to_path_buf(),
    reason: e.to_string(),
  })?;
  Ok(Entry::value(value))
}

fn load_yaml(path: &Path) -> Result<Entry> {
  let text = read_file(path)?;
  let value: serde_json::Value = serde_yaml::from_str(&text).map_err(|e| Error::Parse {
    path: path.to_path_buf(),
    reason: e.to_string(),
  })?;
  Ok(Entry::value(value))
}
