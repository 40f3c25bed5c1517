//! # Strata IoC
//!
//! A resolver-backed Inversion of Control (IoC) container keyed by
//! `type:name` specifiers.
//!
//! Entries are found by asking, in order, the container's own registry and
//! then a chain of [`Resolver`]s, each of which may consult per-type
//! strategies, manual registrations and files on disk. What the container does
//! with a found entry is governed by two options, settable per type or per
//! specifier: `instantiate` (build it through a [`Factory`]) and `singleton`
//! (share one instance).
//!
//! ## Core Concepts
//!
//! - **Specifier**: `model:user`, `service:mailer`, `action:users/create`.
//! - **Resolver**: one precedence tier; the first resolver added wins.
//! - **Class**: a runtime descriptor with a constructor and declared
//!   injection points, inherited along its parent chain.
//! - **Injection**: after instantiation, each declared property is filled by
//!   looking up its specifier. Flattened declarations are cached per class.
//!
//! ## Quick Start
//!
//! ```
//! use once_cell::sync::Lazy;
//! use std::sync::Arc;
//! use strata_ioc::{Class, Container, ContainerOptions, Inject, Injectable, InjectionSlot};
//!
//! struct Mailer {
//!   from: String,
//! }
//!
//! #[derive(Default)]
//! struct Signup {
//!   mailer: Inject<Mailer>,
//! }
//!
//! static SIGNUP: Lazy<Arc<Class>> = Lazy::new(|| {
//!   Class::builder("Signup")
//!     .inject("mailer", "service:mailer")
//!     .construct(|_| Signup::default())
//! });
//!
//! impl Injectable for Signup {
//!   fn class(&self) -> Arc<Class> {
//!     SIGNUP.clone()
//!   }
//!
//!   fn slot(&self, property: &str) -> Option<&dyn InjectionSlot> {
//!     match property {
//!       "mailer" => Some(&self.mailer),
//!       _ => None,
//!     }
//!   }
//! }
//!
//! fn main() -> strata_ioc::Result<()> {
//!   let container = Container::new();
//!   container.register("service:mailer", strata_ioc::Entry::value(Mailer { from: "noreply".into() }))?;
//!   container.register_with_options(
//!     "action:signup",
//!     &*SIGNUP,
//!     ContainerOptions::new().instantiate(true).singleton(false),
//!   )?;
//!
//!   let signup = container.lookup::<Signup>("action:signup")?;
//!   assert_eq!(signup.mailer.get().map(|m| m.from.clone()), Some("noreply".to_string()));
//!
//!   // Not a singleton: every lookup builds a new instance.
//!   let again = container.lookup::<Signup>("action:signup")?;
//!   assert!(!Arc::ptr_eq(&signup, &again));
//!   Ok(())
//! }
//! ```

mod class;
mod config;
mod container;
mod core;
mod error;
mod factory;
mod inject;
mod meta;
mod options;
mod registry;
mod resolver;
mod specifier;
mod value;

pub use class::{Ancestors, Args, Class, ClassBuilder, ClassId};
pub use config::{ContainerConfig, ResolverConfig};
pub use container::{Container, NamedValues};
pub use error::{BoxError, Error, Result};
pub use factory::Factory;
pub use inject::{Inject, Injectable, Injection, InjectionSlot};
pub use meta::{MetaKey, Metadata};
pub use options::{
  framework_defaults, ContainerOptions, OptionName, DEFAULT_INSTANTIATE, DEFAULT_SINGLETON,
};
pub use resolver::{AvailableFn, LoadFn, Resolver, RetrieveFn, TypeStrategy};
pub use specifier::Specifier;
pub use value::{Entry, Value};
