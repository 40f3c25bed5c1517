use once_cell::sync::Lazy;
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use strata_ioc::{
  Class, Container, ContainerOptions, Entry, Error, Inject, Injectable, Injection, InjectionSlot,
};

// --- Test Fixtures ---

#[derive(Debug)]
struct Store {
  name: &'static str,
}

#[derive(Debug)]
struct Logger;

static BASE_CONTROLLER: Lazy<Arc<Class>> = Lazy::new(|| {
  Class::builder("BaseController")
    .inject("store", "service:store")
    .inject("logger", "service:logger")
    .build()
});

static POSTS_CONTROLLER: Lazy<Arc<Class>> = Lazy::new(|| {
  Class::builder("PostsController")
    .extends(&BASE_CONTROLLER)
    .inject("store", "service:replica")
    .construct(|_| PostsController::default())
});

#[derive(Default)]
struct BaseController {
  store: Inject<Store>,
  logger: Inject<Logger>,
}

impl BaseController {
  fn slot(&self, property: &str) -> Option<&dyn InjectionSlot> {
    match property {
      "store" => Some(&self.store),
      "logger" => Some(&self.logger),
      _ => None,
    }
  }
}

#[derive(Default)]
struct PostsController {
  base: BaseController,
}

impl Injectable for PostsController {
  fn class(&self) -> Arc<Class> {
    POSTS_CONTROLLER.clone()
  }

  fn slot(&self, property: &str) -> Option<&dyn InjectionSlot> {
    self.base.slot(property)
  }
}

fn services(container: &Container) {
  container
    .register("service:store", Entry::value(Store { name: "primary" }))
    .unwrap();
  container
    .register("service:replica", Entry::value(Store { name: "replica" }))
    .unwrap();
  container
    .register("service:logger", Entry::value(Logger))
    .unwrap();
}

fn transient() -> ContainerOptions {
  ContainerOptions::new().singleton(false).instantiate(true)
}

// --- Injection Tests ---

#[test]
fn test_instances_are_injected_on_creation() {
  // Arrange
  let container = Container::new();
  services(&container);
  container
    .register_with_options("controller:posts", &*POSTS_CONTROLLER, transient())
    .unwrap();

  // Act
  let controller = container
    .lookup::<PostsController>("controller:posts")
    .unwrap();

  // Assert
  assert!(controller.base.logger.is_set());
  // The subclass declaration overrides the inherited one.
  assert_eq!(controller.base.store.get().unwrap().name, "replica");
}

#[test]
fn test_applying_injections_twice_is_idempotent() {
  // Arrange
  let container = Container::new();
  services(&container);
  let controller = PostsController::default();

  // Act
  container.apply_injections(&controller).unwrap();
  let store = controller.base.store.get().unwrap();
  let logger = controller.base.logger.get().unwrap();
  container.apply_injections(&controller).unwrap();

  // Assert
  assert!(Arc::ptr_eq(&store, &controller.base.store.get().unwrap()));
  assert!(Arc::ptr_eq(&logger, &controller.base.logger.get().unwrap()));
}

#[test]
fn test_instances_of_one_class_share_injection_points() {
  // Arrange
  let container = Container::new();
  services(&container);
  container
    .register_with_options("controller:posts", &*POSTS_CONTROLLER, transient())
    .unwrap();

  // Act
  let first = container.lookup::<PostsController>("controller:posts").unwrap();
  let points = container.injections_for(&POSTS_CONTROLLER);
  let second = container.lookup::<PostsController>("controller:posts").unwrap();

  // Assert
  assert!(!Arc::ptr_eq(&first, &second));
  assert!(Arc::ptr_eq(&points, &container.injections_for(&POSTS_CONTROLLER)));
  assert_eq!(
    points.to_vec(),
    vec![
      Injection::new("store", "service:replica"),
      Injection::new("logger", "service:logger"),
    ]
  );
  assert!(Arc::ptr_eq(
    &first.base.store.get().unwrap(),
    &second.base.store.get().unwrap()
  ));
}

#[test]
fn test_injection_caches_are_per_container() {
  let a = Container::new();
  let b = Container::new();
  assert!(!Arc::ptr_eq(
    &a.injections_for(&POSTS_CONTROLLER),
    &b.injections_for(&POSTS_CONTROLLER)
  ));
}

#[test]
fn test_missing_injection_target_is_reported_at_instantiation() {
  // Arrange
  let container = Container::new();
  container
    .register("service:replica", Entry::value(Store { name: "replica" }))
    .unwrap();
  container
    .register_with_options("controller:posts", &*POSTS_CONTROLLER, transient())
    .unwrap();

  // Act
  let err = container
    .lookup_value("controller:posts")
    .unwrap_err();

  // Assert
  match err {
    Error::InjectionTargetMissing { class, property, specifier } => {
      assert_eq!(class, "PostsController");
      assert_eq!(property, "logger");
      assert_eq!(specifier, "service:logger");
    }
    other => panic!("unexpected error: {:?}", other),
  }
}

#[test]
fn test_injecting_the_wrong_type_fails() {
  // Arrange
  let container = Container::new();
  services(&container);
  // Replaced before anything was looked up, so the override is what resolves.
  container
    .register("service:logger", Entry::value("not a logger"))
    .unwrap();
  let controller = PostsController::default();

  // Act
  let result = container.apply_injections(&controller);

  // Assert
  assert!(matches!(
    result,
    Err(Error::InjectionTypeMismatch { ref property, found, .. })
      if property == "logger" && found == "&str"
  ));
}

// --- Raw Instances ---

struct Notifier {
  logger: Inject<Logger>,
}

static NOTIFIER: Lazy<Arc<Class>> =
  Lazy::new(|| Class::builder("Notifier").inject("logger", "service:logger").build());

impl Injectable for Notifier {
  fn class(&self) -> Arc<Class> {
    NOTIFIER.clone()
  }

  fn slot(&self, property: &str) -> Option<&dyn InjectionSlot> {
    (property == "logger").then_some(&self.logger as &dyn InjectionSlot)
  }
}

#[test]
fn test_registered_instances_are_injected_on_lookup() {
  // Arrange
  let container = Container::new();
  services(&container);
  container
    .register(
      "service:notifier",
      Entry::instance(Notifier {
        logger: Inject::new(),
      }),
    )
    .unwrap();

  // Act
  let notifier = container.lookup::<Notifier>("service:notifier").unwrap();

  // Assert
  assert!(notifier.logger.is_set());
}

#[test]
fn test_undeclared_slot_is_reported() {
  // Arrange
  struct Mute;
  static MUTE: Lazy<Arc<Class>> =
    Lazy::new(|| Class::builder("Mute").inject("voice", "service:logger").build());
  impl Injectable for Mute {
    fn class(&self) -> Arc<Class> {
      MUTE.clone()
    }
    fn slot(&self, _property: &str) -> Option<&dyn InjectionSlot> {
      None
    }
  }
  let container = Container::new();
  services(&container);

  // Act
  let err = container.apply_injections(&Mute).unwrap_err();

  // Assert
  assert!(matches!(err, Error::UnknownInjectionProperty { ref property, .. } if property == "voice"));
}

// --- Cycles ---

struct Node {
  class: Arc<Class>,
  next: Inject<Node>,
}

impl Node {
  fn of(class: &Lazy<Arc<Class>>) -> Self {
    Node {
      class: Arc::clone(class),
      next: Inject::new(),
    }
  }
}

impl Injectable for Node {
  fn class(&self) -> Arc<Class> {
    self.class.clone()
  }

  fn slot(&self, property: &str) -> Option<&dyn InjectionSlot> {
    (property == "next").then_some(&self.next as &dyn InjectionSlot)
  }
}

static PING: Lazy<Arc<Class>> = Lazy::new(|| {
  Class::builder("Ping")
    .inject("next", "node:pong")
    .construct(|_| Node::of(&PING))
});

static PONG: Lazy<Arc<Class>> = Lazy::new(|| {
  Class::builder("Pong")
    .inject("next", "node:ping")
    .construct(|_| Node::of(&PONG))
});

#[test]
fn test_circular_injection_is_detected() {
  // Arrange
  let container = Container::new();
  let options = ContainerOptions::new().singleton(true).instantiate(true);
  container
    .register_with_options("node:ping", &*PING, options)
    .unwrap();
  container
    .register_with_options("node:pong", &*PONG, options)
    .unwrap();

  // Act
  let err = container.lookup_value("node:ping").unwrap_err();

  // Assert
  assert!(matches!(err, Error::CircularDependency { ref specifier } if specifier == "node:ping"));

  // A failed initialization leaves nothing cached.
  assert!(matches!(
    container.lookup_value("node:pong"),
    Err(Error::CircularDependency { .. })
  ));
}

// --- Counting ---

#[test]
fn test_injected_singletons_are_built_once() {
  // Arrange
  static BUILT: AtomicUsize = AtomicUsize::new(0);
  let container = Container::new();
  services(&container);
  container
    .register_with_options(
      "service:logger",
      Class::builder("Logger").construct_value(|_| {
        BUILT.fetch_add(1, Ordering::SeqCst);
        Logger
      }),
      ContainerOptions::new().singleton(true).instantiate(true),
    )
    .unwrap();
  container
    .register_with_options("controller:posts", &*POSTS_CONTROLLER, transient())
    .unwrap();

  // Act
  for _ in 0..3 {
    container.lookup_value("controller:posts").unwrap();
  }

  // Assert
  assert_eq!(BUILT.load(Ordering::SeqCst), 1);
}
