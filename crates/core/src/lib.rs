//! Container boundary for bindery.
//!
//! Dependency keys, the type metadata facility, the binder SPI with fluent
//! binding builders, lifetimes and singleton storage, and an injector that
//! validates and resolves a finished set of bindings. The binding-completion
//! engine in `bindery-testing` is a consumer of everything here.

pub mod binder;
pub mod diag;
pub mod errors;
pub mod factory;
pub mod graph;
pub mod injector;
pub mod key;
pub mod metadata;
pub mod scope;

pub use binder::{
    AdaptFn, AsInterface, BindingBuilder, BindingRecord, BindingRegistry, BindingTarget,
    ConstantBindingBuilder, InstanceProvider, ProviderCall, ProviderClass,
};
pub use diag::Diagnostics;
pub use errors::ContainerError;
pub use factory::{is_assisted, Assisted, FactoryProvider};
pub use graph::{DependencyGraph, ResolutionPath};
pub use injector::{is_container_internal, Injector, MemberInjector, Stage};
pub use key::{Key, Qualifier, TypeRef};
pub use metadata::{
    ensure_provided_key, svc, unwrap_svc, AnyService, ConstructFn, Deferred, InjectionPoint,
    TypeKind, TypeMeta, TypeMetaBuilder, TypeRegistry,
};
pub use scope::{Lifetime, SingletonStore};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
