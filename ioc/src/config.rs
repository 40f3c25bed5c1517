//! YAML-driven container bootstrap.
//!
//! ```yaml
//! defaults: true
//! options:
//!   model: { singleton: false }
//!   service:mailer: { instantiate: false }
//! resolvers:
//!   - name: application
//!     root: ./app
//!     directories:
//!       initializer: config/initializers
//! ```

use crate::container::Container;
use crate::error::{Error, Result};
use crate::options::ContainerOptions;
use crate::resolver::Resolver;
use crate::specifier::{validate_kind, validate_option_key};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The raw, deserialized form of a container configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContainerConfig {
  /// Seed the framework's per-type option defaults before `options`.
  #[serde(default = "default_true")]
  pub defaults: bool,
  /// Options keyed by bare type or full specifier.
  #[serde(default)]
  pub options: BTreeMap<String, ContainerOptions>,
  /// Resolvers in precedence order, highest first.
  #[serde(default)]
  pub resolvers: Vec<ResolverConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolverConfig {
  pub name: String,
  #[serde(default)]
  pub root: Option<PathBuf>,
  /// Type → directory remappings, relative to `root`.
  #[serde(default)]
  pub directories: BTreeMap<String, PathBuf>,
}

fn default_true() -> bool {
  true
}

impl Default for ContainerConfig {
  fn default() -> Self {
    Self {
      defaults: true,
      options: BTreeMap::new(),
      resolvers: Vec::new(),
    }
  }
}

impl ContainerConfig {
  /// Parses and validates a configuration. Relative roots stay relative to
  /// the working directory.
  pub fn from_yaml_str(yaml: &str) -> Result<Self> {
    let config: ContainerConfig =
      serde_yaml::from_str(yaml).map_err(|e| Error::Config(e.to_string()))?;
    config.validate()?;
    Ok(config)
  }

  /// Reads a configuration file. Relative resolver roots are resolved
  /// against the file's directory.
  pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| Error::Io {
      path: path.to_path_buf(),
      source,
    })?;
    let mut config: ContainerConfig =
      serde_yaml::from_reader(BufReader::new(file)).map_err(|e| Error::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
      })?;
    config.validate()?;

    if let Some(base) = path.parent() {
      for resolver in &mut config.resolvers {
        if let Some(root) = resolver.root.as_mut() {
          if root.is_relative() {
            *root = base.join(&*root);
          }
        }
      }
    }
    debug!(path = %path.display(), resolvers = config.resolvers.len(), "loaded container config");
    Ok(config)
  }

  fn validate(&self) -> Result<()> {
    for key in self.options.keys() {
      validate_option_key(key).map_err(|e| Error::Config(format!("option key: {}", e)))?;
    }

    let mut names = HashSet::new();
    for resolver in &self.resolvers {
      if resolver.name.is_empty() {
        return Err(Error::Config("resolver name must not be empty".into()));
      }
      if !names.insert(resolver.name.as_str()) {
        return Err(Error::Config(format!(
          "resolver '{}' is declared more than once",
          resolver.name
        )));
      }
      for kind in resolver.directories.keys() {
        validate_kind(kind).map_err(|e| {
          Error::Config(format!("resolver '{}' directories: {}", resolver.name, e))
        })?;
      }
    }
    Ok(())
  }
}

impl ResolverConfig {
  pub fn build(&self) -> Resolver {
    let mut resolver = Resolver::new(self.name.clone());
    if let Some(root) = &self.root {
      resolver = resolver.with_root(root.clone());
    }
    for (kind, dir) in &self.directories {
      resolver = resolver.with_directory(kind.clone(), dir.clone());
    }
    resolver
  }
}

impl Container {
  /// Builds a container from a validated configuration.
  ///
  /// Framework defaults (when enabled) are seeded first, so configured
  /// options override them field by field.
  pub fn from_config(config: &ContainerConfig) -> Result<Self> {
    let container = Container::new();
    if config.defaults {
      container.seed_framework_defaults();
    }
    for (key, options) in &config.options {
      container.set_options(key, *options)?;
    }
    for resolver in &config.resolvers {
      container.add_resolver(resolver.build());
    }
    Ok(container)
  }
}
