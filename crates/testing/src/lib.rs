//! Automatic dependency-binding completion for DI-backed unit tests.
//!
//! A test author declares only the bindings that matter for the test under
//! scrutiny. The completion engine observes those declarations, scans the
//! fixture for every root dependency need (lifecycle-hook parameters,
//! injected fixture members, nested auto-registered types), expands the
//! transitive dependency closure, and synthesizes a binding for everything
//! left unresolved: real singletons for ordinary concrete types, mock
//! singletons for abstractions and force-mocked types.
//!
//! ```
//! use std::sync::Arc;
//! use bindery_core::key::Key;
//! use bindery_core::metadata::{TypeMeta, TypeRegistry};
//! use bindery_testing::fixture::{FixtureMeta, HookKind};
//! use bindery_testing::mock::MockRegistry;
//! use bindery_testing::module::{build_test_injector, TestBinder};
//!
//! trait Mailer: Send + Sync {}
//!
//! struct Signup {
//!     mailer: Arc<dyn Mailer>,
//! }
//!
//! let types = TypeRegistry::new();
//! types.register(TypeMeta::interface::<dyn Mailer>());
//! types.register(
//!     TypeMeta::concrete::<Signup>()
//!         .dependency::<dyn Mailer>()
//!         .construct(|injector| {
//!             Ok(Signup { mailer: injector.resolve::<dyn Mailer>()? })
//!         }),
//! );
//!
//! struct MailerStub;
//! impl Mailer for MailerStub {}
//! let mocks = MockRegistry::new();
//! mocks.register::<dyn Mailer, _>(|| Arc::new(MailerStub));
//!
//! let fixture = FixtureMeta::new("SignupFixture")
//!     .hook(HookKind::Test, "sends_welcome_mail", vec![Key::of::<Signup>()]);
//! let module = |_: &mut TestBinder<'_>| {};
//!
//! let (injector, report) =
//!     build_test_injector(&module, &fixture, Arc::new(types), Arc::new(mocks)).unwrap();
//!
//! // Signup was synthesized as a real singleton, its mailer as a mock.
//! let signup = injector.resolve::<Signup>().unwrap();
//! assert!(Arc::ptr_eq(&signup.mailer, &injector.resolve::<dyn Mailer>().unwrap()));
//! assert_eq!(report.synthesized_mocks.len(), 1);
//! ```

pub mod fixture;
pub mod mock;
pub mod module;
pub mod observer;
pub mod report;

pub use fixture::{All, FixtureMeta, HookKind, HookMeta, NestedType, TestMarker};
pub use mock::{MockPolicy, MockProvider, MockRegistry, SpyProvider};
pub use module::{build_test_injector, AutoBinder, CompletedBindings, TestBinder, TestModule};
pub use observer::{BindingInfo, SpyBindingBuilder, SpyConstantBindingBuilder};
pub use report::CompletionReport;
