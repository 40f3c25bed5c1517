//! The main `Container` struct and its associated methods.

use crate::class::{Class, ClassId};
use crate::core::{next_container_id, ResolutionGuard};
use crate::error::{Error, Result};
use crate::factory::Factory;
use crate::inject::{Injectable, Injection};
use crate::meta::{MetaKey, Metadata};
use crate::options::{
  framework_defaults, ContainerOptions, OptionName, DEFAULT_INSTANTIATE, DEFAULT_SINGLETON,
};
use crate::registry::Registry;
use crate::resolver::Resolver;
use crate::specifier::{validate_kind, validate_option_key, Specifier};
use crate::value::{Entry, Value};
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use parking_lot::{ReentrantMutex, RwLock};
use std::any::{type_name, Any};
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, trace};

/// The Inversion of Control (IoC) container.
///
/// A container resolves `type:name` specifiers against its manual registry
/// first and then against an ordered chain of [`Resolver`]s, where the
/// earliest-added resolver wins. Resolved entries, built factories and final
/// values are cached for the container's lifetime, as are the flattened
/// injection points of every class it instantiates.
///
/// `Container` is a cheap handle; clones share the same state. Registration is
/// expected to finish during bootstrap, before lookups start: registering a
/// specifier again does not invalidate lookups already cached for it.
///
/// Cached values (singletons and raw entries) are initialized one at a time
/// per container, under a re-entrant lock held by the initializing thread.
/// Cycle detection therefore sees every in-flight initialization, and two
/// threads starting opposite ends of a dependency cycle both fail with
/// [`Error::CircularDependency`] instead of waiting on each other.
/// Constructors must not block on another thread that resolves cached
/// values from the same container.
#[derive(Clone)]
pub struct Container {
  shared: Arc<Shared>,
}

pub(crate) struct Shared {
  id: u64,
  registry: RwLock<Registry>,
  resolvers: RwLock<Vec<Arc<Resolver>>>,
  options: DashMap<String, ContainerOptions>,
  // Final looked-up values: singletons and non-instantiated entries.
  values: DashMap<String, Arc<OnceCell<Value>>>,
  // Raw entries from the registry or a resolver.
  classes: DashMap<String, Entry>,
  factories: DashMap<String, Arc<Factory>>,
  injections: DashMap<ClassId, Arc<[Injection]>>,
  meta: DashMap<MetaKey, Arc<Metadata>>,
  // Held while any cached value is being initialized.
  initializing: ReentrantMutex<()>,
}

impl Container {
  /// Creates an empty container with no resolvers and no options.
  pub fn new() -> Self {
    Self {
      shared: Arc::new(Shared {
        id: next_container_id(),
        registry: RwLock::new(Registry::default()),
        resolvers: RwLock::new(Vec::new()),
        options: DashMap::new(),
        values: DashMap::new(),
        classes: DashMap::new(),
        factories: DashMap::new(),
        injections: DashMap::new(),
        meta: DashMap::new(),
        initializing: ReentrantMutex::new(()),
      }),
    }
  }

  /// Creates a container seeded with a root resolver for `root` and the
  /// framework's per-type option defaults.
  pub fn for_application(root: impl Into<PathBuf>) -> Self {
    let container = Self::new();
    container.add_resolver(Resolver::new("application").with_root(root));
    container.seed_framework_defaults();
    container
  }

  pub(crate) fn from_shared(shared: Arc<Shared>) -> Self {
    Self { shared }
  }

  pub(crate) fn downgrade(&self) -> std::sync::Weak<Shared> {
    Arc::downgrade(&self.shared)
  }

  pub(crate) fn seed_framework_defaults(&self) {
    for (kind, options) in framework_defaults() {
      self
        .shared
        .options
        .entry(kind.to_owned())
        .or_default()
        .merge(options);
    }
  }

  // --- Resolvers ---

  /// Appends a resolver at the lowest precedence.
  pub fn add_resolver(&self, resolver: impl Into<Arc<Resolver>>) {
    let resolver = resolver.into();
    debug!(resolver = %resolver.name(), "adding resolver");
    self.shared.resolvers.write().push(resolver);
  }

  /// The resolver chain, highest precedence first.
  pub fn resolvers(&self) -> Vec<Arc<Resolver>> {
    self.shared.resolvers.read().clone()
  }

  // --- Registration ---

  /// Registers `entry` under `specifier`, shadowing anything a resolver would produce.
  pub fn register(&self, specifier: &str, entry: impl Into<Entry>) -> Result<()> {
    let specifier = Specifier::parse(specifier)?;
    let replaced = self
      .shared
      .registry
      .write()
      .insert(specifier.clone(), entry.into());
    if replaced {
      debug!(specifier = %specifier, "re-registered entry; cached lookups are kept");
    } else {
      debug!(specifier = %specifier, "registered entry");
    }
    Ok(())
  }

  pub fn register_with_options(
    &self,
    specifier: &str,
    entry: impl Into<Entry>,
    options: ContainerOptions,
  ) -> Result<()> {
    self.register(specifier, entry)?;
    self.set_options(specifier, options)
  }

  /// Whether `specifier` has a manual registration (resolvers are not consulted).
  pub fn is_registered(&self, specifier: &str) -> bool {
    self.shared.registry.read().contains(specifier)
  }

  // --- Options ---

  /// Looks up an option on the exact specifier, falling back to its type.
  ///
  /// `key` may also be a bare type. `None` means neither level sets it.
  pub fn get_option(&self, key: &str, name: OptionName) -> Option<bool> {
    self.options_for(key).get(name)
  }

  /// Writes an option at the level `key` names: a specifier or a bare type.
  pub fn set_option(&self, key: &str, name: OptionName, value: bool) -> Result<()> {
    validate_option_key(key)?;
    debug!(key, option = %name, value, "setting container option");
    self
      .shared
      .options
      .entry(key.to_owned())
      .or_default()
      .set(name, value);
    Ok(())
  }

  /// Merges every option set in `options` into the level `key` names.
  pub fn set_options(&self, key: &str, options: ContainerOptions) -> Result<()> {
    validate_option_key(key)?;
    if options.is_empty() {
      return Ok(());
    }
    debug!(key, ?options, "setting container options");
    self
      .shared
      .options
      .entry(key.to_owned())
      .or_default()
      .merge(options);
    Ok(())
  }

  /// The effective options for `key`, specifier fields shadowing type fields.
  pub fn options_for(&self, key: &str) -> ContainerOptions {
    let exact = self.stored_options(key);
    match key.split_once(':') {
      Some((kind, _)) => exact.or(self.stored_options(kind)),
      None => exact,
    }
  }

  fn stored_options(&self, key: &str) -> ContainerOptions {
    self
      .shared
      .options
      .get(key)
      .map(|options| *options.value())
      .unwrap_or_default()
  }

  // --- Resolution ---

  /// Resolves `specifier` to a `T`, failing if nothing resolves.
  pub fn lookup<T: Any + Send + Sync>(&self, specifier: &str) -> Result<Arc<T>> {
    let value = self.lookup_value(specifier)?;
    downcast_value(specifier, &value)
  }

  /// Like [`lookup`](Self::lookup), but `Ok(None)` when nothing resolves.
  pub fn lookup_loose<T: Any + Send + Sync>(&self, specifier: &str) -> Result<Option<Arc<T>>> {
    match self.lookup_value_loose(specifier)? {
      Some(value) => downcast_value(specifier, &value).map(Some),
      None => Ok(None),
    }
  }

  /// Resolves `specifier` to its type-erased value.
  ///
  /// With `instantiate` set, the value is built by the entry's factory and,
  /// if `singleton` is set too, created once and shared. Otherwise the raw
  /// entry is returned, cached, and injected when it is an object instance.
  pub fn lookup_value(&self, specifier: &str) -> Result<Value> {
    self
      .resolve_value(specifier, false)?
      .ok_or_else(|| Error::not_found(specifier))
  }

  pub fn lookup_value_loose(&self, specifier: &str) -> Result<Option<Value>> {
    self.resolve_value(specifier, true)
  }

  /// Returns the cached factory for `specifier`, building it on first use.
  pub fn factory_for(&self, specifier: &str) -> Result<Arc<Factory>> {
    let parsed = Specifier::parse(specifier)?;
    self
      .factory_for_specifier(&parsed, false)?
      .ok_or_else(|| Error::not_found(specifier))
  }

  pub fn factory_for_loose(&self, specifier: &str) -> Result<Option<Arc<Factory>>> {
    let parsed = Specifier::parse(specifier)?;
    self.factory_for_specifier(&parsed, true)
  }

  /// Looks up every entry of `kind`, keyed by unqualified name.
  pub fn lookup_all(&self, kind: &str) -> Result<NamedValues> {
    let names = self.available_for_type(kind)?;
    let mut values = NamedValues::default();
    for name in names {
      let value = self.lookup_value(&format!("{}:{}", kind, name))?;
      values.entries.push((name, value));
    }
    Ok(values)
  }

  /// Names of every entry of `kind`: manual registrations in registration
  /// order, then each resolver's names in resolver order, without duplicates.
  pub fn available_for_type(&self, kind: &str) -> Result<Vec<String>> {
    validate_kind(kind)?;
    let mut seen = HashSet::new();
    let mut names = Vec::new();

    let registered = self.shared.registry.read().names_for_kind(kind);
    for name in registered {
      if seen.insert(name.clone()) {
        names.push(name);
      }
    }
    for resolver in self.resolvers() {
      for specifier in resolver.available_for_type(kind)? {
        if seen.insert(specifier.name().to_owned()) {
          names.push(specifier.name().to_owned());
        }
      }
    }
    Ok(names)
  }

  /// Fills every injection point declared by the instance's class hierarchy.
  ///
  /// The flattened declarations are computed once per class and cached; only
  /// the lookups and assignments repeat per instance. Applying injections
  /// twice leaves the instance unchanged.
  pub fn apply_injections(&self, instance: &dyn Injectable) -> Result<()> {
    let class = instance.class();
    for injection in self.injections_for(&class).iter() {
      let slot = instance
        .slot(injection.property())
        .ok_or_else(|| Error::UnknownInjectionProperty {
          class: class.name().to_owned(),
          property: injection.property().to_owned(),
        })?;
      let value = self
        .resolve_value(injection.specifier(), true)?
        .ok_or_else(|| Error::InjectionTargetMissing {
          class: class.name().to_owned(),
          property: injection.property().to_owned(),
          specifier: injection.specifier().to_owned(),
        })?;
      if !slot.assign(&value) {
        return Err(Error::InjectionTypeMismatch {
          class: class.name().to_owned(),
          property: injection.property().to_owned(),
          specifier: injection.specifier().to_owned(),
          expected: slot.expected_type(),
          found: value.type_name(),
        });
      }
      trace!(
        class = %class.name(),
        property = %injection.property(),
        specifier = %injection.specifier(),
        "injected"
      );
    }
    Ok(())
  }

  /// The flattened injection points of `class`, cached by class identity.
  pub fn injections_for(&self, class: &Class) -> Arc<[Injection]> {
    if let Some(cached) = self.shared.injections.get(&class.id()) {
      return cached.value().clone();
    }
    let resolved: Arc<[Injection]> = class.resolved_injections().into();
    trace!(class = %class.name(), count = resolved.len(), "discovered injection points");
    self
      .shared
      .injections
      .entry(class.id())
      .or_insert(resolved)
      .value()
      .clone()
  }

  /// A mutable map tied to this container, created on first access.
  ///
  /// The same key always yields the same map within one container; distinct
  /// containers never share maps.
  pub fn meta_for(&self, key: impl Into<MetaKey>) -> Arc<Metadata> {
    self
      .shared
      .meta
      .entry(key.into())
      .or_default()
      .value()
      .clone()
  }

  // --- PRIVATE HELPERS ---

  fn resolve_value(&self, specifier: &str, loose: bool) -> Result<Option<Value>> {
    let specifier = Specifier::parse(specifier)?;
    let key = specifier.as_str();
    let options = self.options_for(key);
    let singleton = options.singleton.unwrap_or(DEFAULT_SINGLETON);
    let instantiate = options.instantiate.unwrap_or(DEFAULT_INSTANTIATE);
    let cached = singleton || !instantiate;

    if cached {
      if let Some(value) = self.cached_value(key) {
        trace!(specifier = %specifier, "value cache hit");
        return Ok(Some(value));
      }
    }

    let Some(factory) = self.factory_for_specifier(&specifier, loose)? else {
      return Ok(None);
    };

    // Entered before touching the cell: re-entrant initialization of a
    // `OnceCell` from the same thread would block forever.
    let _guard = ResolutionGuard::enter(self.shared.id, key)?;

    if !cached {
      return factory.create().map(Some);
    }

    // One initializer per container at a time, so a cycle spanning two
    // threads surfaces through the guard instead of blocking on a cell.
    let _initializing = self.shared.initializing.lock();
    let cell = self.value_cell(key);
    let value = cell.get_or_try_init(|| {
      if instantiate {
        debug!(specifier = %specifier, "creating singleton");
        factory.create()
      } else {
        let value = factory.entry().to_value();
        if let Some(target) = value.injection_target() {
          self.apply_injections(target)?;
        }
        Ok(value)
      }
    })?;
    Ok(Some(value.clone()))
  }

  fn cached_value(&self, key: &str) -> Option<Value> {
    self
      .shared
      .values
      .get(key)
      .and_then(|cell| cell.value().get().cloned())
  }

  fn value_cell(&self, key: &str) -> Arc<OnceCell<Value>> {
    self
      .shared
      .values
      .entry(key.to_owned())
      .or_default()
      .value()
      .clone()
  }

  fn factory_for_specifier(&self, specifier: &Specifier, loose: bool) -> Result<Option<Arc<Factory>>> {
    if let Some(factory) = self.shared.factories.get(specifier.as_str()) {
      return Ok(Some(factory.value().clone()));
    }
    let Some(entry) = self.resolve_entry(specifier, loose)? else {
      return Ok(None);
    };
    let factory = Arc::new(Factory::new(specifier.clone(), entry, self.downgrade()));
    Ok(Some(
      self
        .shared
        .factories
        .entry(specifier.as_str().to_owned())
        .or_insert(factory)
        .value()
        .clone(),
    ))
  }

  /// Registry first, then resolvers in precedence order; the first hit is cached.
  fn resolve_entry(&self, specifier: &Specifier, loose: bool) -> Result<Option<Entry>> {
    if let Some(entry) = self.shared.classes.get(specifier.as_str()) {
      trace!(specifier = %specifier, "class cache hit");
      return Ok(Some(entry.value().clone()));
    }

    let registered = self.shared.registry.read().get(specifier.as_str());
    let entry = match registered {
      Some(entry) => {
        debug!(specifier = %specifier, "resolved from container registry");
        Some(entry)
      }
      None => self.retrieve_from_resolvers(specifier)?,
    };

    match entry {
      Some(entry) => {
        self
          .shared
          .classes
          .insert(specifier.as_str().to_owned(), entry.clone());
        Ok(Some(entry))
      }
      None if loose => {
        trace!(specifier = %specifier, "nothing resolved (loose)");
        Ok(None)
      }
      None => Err(Error::not_found(specifier.as_str())),
    }
  }

  fn retrieve_from_resolvers(&self, specifier: &Specifier) -> Result<Option<Entry>> {
    for resolver in self.resolvers() {
      if let Some(entry) = resolver.retrieve_specifier(specifier)? {
        debug!(specifier = %specifier, resolver = %resolver.name(), "resolved from resolver");
        return Ok(Some(entry));
      }
    }
    Ok(None)
  }
}

impl Default for Container {
  fn default() -> Self {
    Self::new()
  }
}

impl fmt::Debug for Container {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let resolvers = self.shared.resolvers.read();
    f.debug_struct("Container")
      .field("id", &self.shared.id)
      .field("registrations", &self.shared.registry.read().len())
      .field(
        "resolvers",
        &resolvers.iter().map(|r| r.name().to_owned()).collect::<Vec<_>>(),
      )
      .field("cached_values", &self.shared.values.len())
      .finish()
  }
}

fn downcast_value<T: Any + Send + Sync>(specifier: &str, value: &Value) -> Result<Arc<T>> {
  value.downcast::<T>().ok_or_else(|| Error::TypeMismatch {
    specifier: specifier.to_owned(),
    expected: type_name::<T>(),
    found: value.type_name(),
  })
}

/// The result of [`Container::lookup_all`]: values keyed by unqualified name,
/// in discovery order.
#[derive(Debug, Clone, Default)]
pub struct NamedValues {
  entries: Vec<(String, Value)>,
}

impl NamedValues {
  pub fn get(&self, name: &str) -> Option<&Value> {
    self
      .entries
      .iter()
      .find(|(entry_name, _)| entry_name == name)
      .map(|(_, value)| value)
  }

  /// The value under `name`, if present and holding a `T`.
  pub fn get_as<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
    self.get(name)?.downcast::<T>()
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.entries.iter().map(|(name, _)| name.as_str())
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
    self.entries.iter().map(|(name, value)| (name.as_str(), value))
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

impl IntoIterator for NamedValues {
  type Item = (String, Value);
  type IntoIter = std::vec::IntoIter<(String, Value)>;

  fn into_iter(self) -> Self::IntoIter {
    self.entries.into_iter()
  }
}
