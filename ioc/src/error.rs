use std::path::PathBuf;
use thiserror::Error;

/// A boxed error returned by user-supplied constructors and loaders.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The main error type for the `strata_ioc` library.
///
/// Every variant that concerns a container entry embeds the offending
/// specifier so a failed lookup can be diagnosed from the message alone.
#[derive(Debug, Error)]
pub enum Error {
  #[error("No entry found for '{specifier}'")]
  NotFound { specifier: String },

  #[error("Malformed specifier '{specifier}': {reason}")]
  MalformedSpecifier {
    specifier: String,
    reason: &'static str,
  },

  #[error("Injection '{property}' on {class} references '{specifier}', which could not be resolved")]
  InjectionTargetMissing {
    class: String,
    property: String,
    specifier: String,
  },

  #[error("{class} declares an injection for '{property}' but exposes no slot with that name")]
  UnknownInjectionProperty { class: String, property: String },

  #[error("Cannot inject '{specifier}' into {class}.{property}: expected {expected}, found {found}")]
  InjectionTypeMismatch {
    class: String,
    property: String,
    specifier: String,
    expected: &'static str,
    found: &'static str,
  },

  #[error("'{specifier}' resolved to {found}, but {expected} was requested")]
  TypeMismatch {
    specifier: String,
    expected: &'static str,
    found: &'static str,
  },

  #[error("Unable to instantiate '{specifier}' (it's not a class). Set the 'instantiate: false' option on this entry to avoid instantiating it")]
  NotAClass { specifier: String },

  #[error("{class} is abstract and cannot be instantiated")]
  AbstractClass { class: String },

  #[error("Constructor for {class} failed: {source}")]
  Construction {
    class: String,
    #[source]
    source: BoxError,
  },

  #[error("Circular dependency detected while resolving '{specifier}'")]
  CircularDependency { specifier: String },

  #[error("The container that built this factory has been dropped")]
  ContainerDropped,

  #[error("Failed to read '{}': {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Failed to parse '{}': {reason}", path.display())]
  Parse { path: PathBuf, reason: String },

  #[error("Invalid container configuration: {0}")]
  Config(String),
}

impl Error {
  /// Whether this error means "nothing resolved" rather than a broken entry.
  ///
  /// Loose lookups downgrade exactly these to `None`.
  pub fn is_not_found(&self) -> bool {
    matches!(self, Error::NotFound { .. })
  }

  pub(crate) fn not_found(specifier: impl Into<String>) -> Self {
    Error::NotFound {
      specifier: specifier.into(),
    }
  }
}

/// A specialized `Result` type for `strata_ioc` operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
