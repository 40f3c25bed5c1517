use pretty_assertions::assert_eq;
use serde_json::json;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use strata_ioc::{Class, Container, Entry, Error, Resolver, TypeStrategy};
use tempfile::TempDir;

// --- Test Fixtures ---

fn write(root: &Path, relative: &str, contents: &str) {
  let path = root.join(relative);
  fs::create_dir_all(path.parent().unwrap()).unwrap();
  fs::write(path, contents).unwrap();
}

fn app_dir() -> TempDir {
  let dir = tempfile::tempdir().unwrap();
  write(dir.path(), "config/environment.json", r#"{ "env": "test" }"#);
  write(dir.path(), "config/database.yaml", "adapter: sqlite\npool: 5\n");
  write(dir.path(), "action/users/create.yml", "method: post\n");
  write(dir.path(), "action/users/show.json", r#"{ "method": "get" }"#);
  write(dir.path(), "action/README.md", "not loadable");
  write(dir.path(), "config/initializers/cache.json", r#"{ "ttl": 60 }"#);
  dir
}

// --- Resolver Tests ---

#[test]
fn test_retrieve_loads_files_by_convention() {
  // Arrange
  let dir = app_dir();
  let resolver = Resolver::new("app").with_root(dir.path());

  // Act
  let environment = resolver.retrieve("config:environment").unwrap().unwrap();
  let database = resolver.retrieve("config:database").unwrap().unwrap();
  let nested = resolver.retrieve("action:users/create").unwrap().unwrap();

  // Assert
  let read = |entry: &Entry| entry.as_value().unwrap().downcast::<serde_json::Value>().unwrap();
  assert_eq!(*read(&environment), json!({ "env": "test" }));
  assert_eq!(*read(&database), json!({ "adapter": "sqlite", "pool": 5 }));
  assert_eq!(*read(&nested), json!({ "method": "post" }));
}

#[test]
fn test_retrieve_returns_none_when_absent() {
  let dir = app_dir();
  let resolver = Resolver::new("app").with_root(dir.path());

  assert!(resolver.retrieve("config:missing").unwrap().is_none());
  assert!(resolver.retrieve("config:../escape").unwrap().is_none());
  assert!(Resolver::new("rootless")
    .retrieve("config:environment")
    .unwrap()
    .is_none());
  assert!(matches!(
    resolver.retrieve("config"),
    Err(Error::MalformedSpecifier { .. })
  ));
}

#[test]
fn test_manual_registration_beats_files() {
  // Arrange
  let dir = app_dir();
  let resolver = Resolver::new("app").with_root(dir.path());
  resolver
    .register("config:environment", Entry::value("overridden"))
    .unwrap();

  // Act
  let entry = resolver.retrieve("config:environment").unwrap().unwrap();

  // Assert
  assert_eq!(*entry.as_value().unwrap().downcast::<&str>().unwrap(), "overridden");
}

#[test]
fn test_available_for_type_scans_recursively_without_duplicates() {
  // Arrange
  let dir = app_dir();
  let resolver = Resolver::new("app").with_root(dir.path());
  resolver
    .register("action:users/show", Entry::value("manual"))
    .unwrap();
  resolver
    .register("action:sessions/new", Entry::value("manual"))
    .unwrap();

  // Act
  let names: Vec<String> = resolver
    .available_for_type("action")
    .unwrap()
    .iter()
    .map(|specifier| specifier.name().to_owned())
    .collect();

  // Assert
  assert_eq!(names, ["users/show", "sessions/new", "users/create"]);
  assert!(resolver.available_for_type("missing").unwrap().is_empty());
}

#[test]
fn test_with_directory_remaps_a_type() {
  // Arrange
  let dir = app_dir();
  let resolver = Resolver::new("app")
    .with_root(dir.path())
    .with_directory("initializer", "config/initializers");

  // Act
  let names = resolver.scan_directory("initializer").unwrap();
  let entry = resolver.retrieve("initializer:cache").unwrap();

  // Assert
  assert_eq!(names, ["cache"]);
  assert!(entry.is_some());
  assert_eq!(
    resolver.directory_for("initializer").unwrap(),
    dir.path().join("config/initializers")
  );
}

#[test]
fn test_type_strategy_overrides_retrieval() {
  // Arrange
  let adapter = Class::builder("MemoryAdapter").build();
  let strategy_adapter = adapter.clone();
  let resolver = Resolver::new("orm").with_strategy(
    "orm-adapter",
    TypeStrategy::new()
      .retrieve(move |resolver, specifier| {
        if specifier.name() == "memory" {
          return Ok(Some(Entry::from(&strategy_adapter)));
        }
        resolver.retrieve_default(specifier)
      })
      .available(|_, _| Ok(vec!["memory".to_string()])),
  );
  resolver
    .register("orm-adapter:fallback", Entry::value(()))
    .unwrap();

  // Act
  let memory = resolver.retrieve("orm-adapter:memory").unwrap().unwrap();
  let fallback = resolver.retrieve("orm-adapter:fallback").unwrap();
  let names: Vec<String> = resolver
    .available_for_type("orm-adapter")
    .unwrap()
    .into_iter()
    .map(|specifier| specifier.name().to_owned())
    .collect();

  // Assert
  assert_eq!(memory.as_class().unwrap().id(), adapter.id());
  assert!(fallback.is_some());
  assert_eq!(names, ["fallback", "memory"]);
}

#[test]
fn test_custom_loader() {
  // Arrange
  let dir = tempfile::tempdir().unwrap();
  write(dir.path(), "template/index.hbs", "<h1>{{title}}</h1>");
  let resolver = Resolver::new("app")
    .with_root(dir.path())
    .with_loader("hbs", |path| {
      fs::read_to_string(path)
        .map(Entry::value)
        .map_err(|source| Error::Io {
          path: path.to_path_buf(),
          source,
        })
    });

  // Act
  let entry = resolver.retrieve("template:index").unwrap().unwrap();

  // Assert
  assert_eq!(
    entry.as_value().unwrap().downcast_ref::<String>().unwrap(),
    "<h1>{{title}}</h1>"
  );
  assert_eq!(resolver.scan_directory("template").unwrap(), ["index"]);
}

#[test]
fn test_broken_file_is_a_parse_error() {
  let dir = tempfile::tempdir().unwrap();
  write(dir.path(), "config/broken.json", "{ not json");
  let resolver = Resolver::new("app").with_root(dir.path());

  let err = resolver.retrieve("config:broken").unwrap_err();
  assert!(matches!(err, Error::Parse { .. }));
}

// --- Resolver Chains ---

#[test]
fn test_first_added_resolver_wins() {
  // Arrange
  let app = app_dir();
  let addon = tempfile::tempdir().unwrap();
  write(addon.path(), "config/environment.json", r#"{ "env": "addon" }"#);
  write(addon.path(), "config/addon.json", r#"{ "enabled": true }"#);

  let container = Container::new();
  container.add_resolver(Resolver::new("app").with_root(app.path()));
  container.add_resolver(Resolver::new("addon").with_root(addon.path()));

  // Act
  let environment = container
    .lookup::<serde_json::Value>("config:environment")
    .unwrap();
  let from_addon = container.lookup::<serde_json::Value>("config:addon").unwrap();
  let names = container.available_for_type("config").unwrap();

  // Assert
  assert_eq!(*environment, json!({ "env": "test" }));
  assert_eq!(*from_addon, json!({ "enabled": true }));
  assert_eq!(
    names,
    ["database", "environment", "initializers/cache", "addon"]
  );
  assert_eq!(
    container
      .resolvers()
      .iter()
      .map(|r| r.name().to_owned())
      .collect::<Vec<_>>(),
    ["app", "addon"]
  );
}

#[test]
fn test_application_container_uses_framework_defaults() {
  // Arrange
  let dir = app_dir();
  let container = Container::for_application(dir.path());

  // Act
  let first = container.lookup_value("config:environment").unwrap();
  let second = container.lookup_value("config:environment").unwrap();
  let all = container.lookup_all("action").unwrap();

  // Assert
  assert!(first.ptr_eq(&second));
  assert_eq!(all.names().collect::<Vec<_>>(), ["users/create", "users/show"]);
  assert_eq!(
    container.get_option("service:anything", strata_ioc::OptionName::Instantiate),
    Some(true)
  );
  assert_eq!(
    container.get_option("model:user", strata_ioc::OptionName::Singleton),
    Some(false)
  );
}

#[test]
fn test_resolvers_can_be_shared_between_containers() {
  let dir = app_dir();
  let resolver = Arc::new(Resolver::new("shared").with_root(dir.path()));
  let a = Container::new();
  let b = Container::new();
  a.add_resolver(resolver.clone());
  b.add_resolver(resolver);

  let from_a = a.lookup_value("config:environment").unwrap();
  let from_b = b.lookup_value("config:environment").unwrap();

  // Each container caches its own copy of the loaded file.
  assert!(!from_a.ptr_eq(&from_b));
}

#[cfg(target_os = "linux")]
#[test]
fn test_files_with_non_utf8_names_are_skipped() {
  use std::ffi::OsStr;
  use std::os::unix::ffi::OsStrExt;

  // Arrange
  let dir = tempfile::tempdir().unwrap();
  write(dir.path(), "config/good.json", r#"{ "ok": true }"#);
  let bad = dir
    .path()
    .join("config")
    .join(OsStr::from_bytes(b"bad\xff.json"));
  fs::write(bad, r#"{ "ok": false }"#).unwrap();
  let container = Container::new();
  container.add_resolver(Resolver::new("app").with_root(dir.path()));

  // Act
  let names = container.available_for_type("config").unwrap();
  let all = container.lookup_all("config").unwrap();

  // Assert
  assert_eq!(names, ["good"]);
  assert_eq!(all.names().collect::<Vec<_>>(), ["good"]);
  assert_eq!(
    *all.get_as::<serde_json::Value>("good").unwrap(),
    json!({ "ok": true })
  );
}
