//! Test-module binding completion.
//!
//! The author declares only the bindings that matter for the test; the
//! engine collects every other key the test transitively requires — from
//! lifecycle hooks, injected fixture members and nested fixture types — and
//! synthesizes the rest: real singletons for ordinary concrete types, mock
//! singletons for abstractions and force-mocked types.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use std::sync::Arc;

use bindery_core::binder::BindingRegistry;
use bindery_core::errors::ContainerError;
use bindery_core::factory::is_assisted;
use bindery_core::injector::{is_container_internal, Injector};
use bindery_core::key::{Key, TypeRef};
use bindery_core::metadata::{ensure_provided_key, TypeKind, TypeRegistry};
use bindery_core::scope::Lifetime;

use crate::fixture::{All, FixtureMeta, TestMarker};
use crate::mock::{MockPolicy, MockProvider, MockRegistry};
use crate::observer::{
    BindingInfo, SharedBindingInfo, SpyBindingBuilder, SpyConstantBindingBuilder,
};
use crate::report::CompletionReport;

/// A test's declarative configuration step
pub trait TestModule {
    fn configure_test(&self, binder: &mut TestBinder<'_>);
}

impl<F> TestModule for F
where
    F: Fn(&mut TestBinder<'_>),
{
    fn configure_test(&self, binder: &mut TestBinder<'_>) {
        self(binder)
    }
}

/// Binding surface handed to `configure_test`. Every statement made here is
/// observed before being forwarded to the real binder.
pub struct TestBinder<'a> {
    auto: &'a mut AutoBinder,
}

impl<'a> TestBinder<'a> {
    pub fn bind<T: ?Sized + Send + Sync + 'static>(&mut self) -> SpyBindingBuilder<'_, T> {
        self.auto.observe_bind::<T>()
    }

    pub fn bind_key(&mut self, key: Key) -> SpyBindingBuilder<'_, ()> {
        self.auto.observe_bind_key(key)
    }

    pub fn bind_constant(&mut self) -> SpyConstantBindingBuilder<'_> {
        self.auto.observe_bind_constant()
    }

    /// Bind `T` to a singleton-scoped mock explicitly
    pub fn bind_mock<T: ?Sized + Send + Sync + 'static>(&mut self) {
        if let Err(err) = self.auto.bind_mock_checked(Key::of::<T>()) {
            self.auto.pending.push(err);
        }
    }

    /// Mock `T` and every registered subtype with no explicit binding
    pub fn force_mock<T: ?Sized + 'static>(&mut self) {
        self.auto.policy.force(TypeRef::of::<T>());
    }

    /// Exempt `T` from force-mocking
    pub fn dont_force_mock<T: ?Sized + 'static>(&mut self) {
        self.auto.policy.exempt(TypeRef::of::<T>());
    }
}

/// Completed output of one pass: the finished binding registry plus a
/// machine-readable summary of what was synthesized.
#[derive(Debug)]
pub struct CompletedBindings {
    pub registry: BindingRegistry,
    pub report: CompletionReport,
}

/// The completion engine. One instance runs one pass over one module and
/// fixture; the force-mock memoization lives and dies with it.
pub struct AutoBinder {
    types: Arc<TypeRegistry>,
    mocks: Arc<MockRegistry>,
    registry: BindingRegistry,
    policy: MockPolicy,
    bindings_observed: Vec<SharedBindingInfo>,
    keys_observed: HashSet<Key>,
    keys_needed: HashSet<Key>,
    synthesized_singletons: Vec<Key>,
    synthesized_mocks: Vec<Key>,
    pending: Vec<ContainerError>,
}

impl AutoBinder {
    pub fn new(types: Arc<TypeRegistry>, mocks: Arc<MockRegistry>) -> Self {
        Self {
            types,
            mocks,
            registry: BindingRegistry::new(),
            policy: MockPolicy::new(),
            bindings_observed: Vec::new(),
            keys_observed: HashSet::new(),
            keys_needed: HashSet::new(),
            synthesized_singletons: Vec::new(),
            synthesized_mocks: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// Run the full pass: observe the module's explicit configuration,
    /// collect root needs from the fixture, expand the dependency closure,
    /// and synthesize default bindings for whatever is left unresolved.
    pub fn complete(
        mut self,
        module: &dyn TestModule,
        fixture: &FixtureMeta,
    ) -> Result<CompletedBindings, ContainerError> {
        tracing::info!(fixture = fixture.name(), "completing test-module bindings");

        {
            let mut binder = TestBinder { auto: &mut self };
            module.configure_test(&mut binder);
        }
        if let Some(err) = self.pending.drain(..).next() {
            return Err(err);
        }
        let explicit_bindings = self.bindings_observed.len();

        for info in &self.bindings_observed {
            if let Some(key) = info.borrow().key() {
                self.keys_observed.insert(key);
            }
        }

        self.scan_nested_types(fixture)?;
        self.scan_lifecycle_hooks(fixture)?;
        self.scan_instance_points(fixture)?;
        self.expand_observed_bindings()?;
        self.bind_default_mocks()?;

        let report = CompletionReport::new(
            fixture.name(),
            explicit_bindings,
            self.keys_observed.len(),
            self.keys_needed.len(),
            &self.synthesized_singletons,
            &self.synthesized_mocks,
        );
        tracing::info!(
            observed = self.keys_observed.len(),
            needed = self.keys_needed.len(),
            mocks = self.synthesized_mocks.len(),
            "binding completion finished"
        );

        Ok(CompletedBindings {
            registry: self.registry,
            report,
        })
    }

    fn observe_info(&mut self, key: &Key) -> SharedBindingInfo {
        let info = Rc::new(RefCell::new(BindingInfo::for_key(key)));
        self.bindings_observed.push(Rc::clone(&info));
        info
    }

    fn observe_bind<T: ?Sized + Send + Sync + 'static>(&mut self) -> SpyBindingBuilder<'_, T> {
        let info = self.observe_info(&Key::of::<T>());
        SpyBindingBuilder::new(info, self.registry.bind::<T>())
    }

    fn observe_bind_key(&mut self, key: Key) -> SpyBindingBuilder<'_, ()> {
        let info = self.observe_info(&key);
        SpyBindingBuilder::new(info, self.registry.bind_key(key))
    }

    fn observe_bind_constant(&mut self) -> SpyConstantBindingBuilder<'_> {
        let info: SharedBindingInfo = Rc::new(RefCell::new(BindingInfo::default()));
        self.bindings_observed.push(Rc::clone(&info));
        SpyConstantBindingBuilder::new(info, self.registry.bind_constant())
    }

    fn bind_mock_checked(&mut self, key: Key) -> Result<(), ContainerError> {
        if !self.mocks.supports(&key.ty) {
            return Err(ContainerError::MissingMockSource {
                type_name: key.ty.name,
            });
        }
        let provider = Arc::new(MockProvider::new(key.ty, Arc::clone(&self.mocks)));
        self.observe_bind_key(key)
            .to_provider(provider)
            .in_scope(Lifetime::Singleton);
        Ok(())
    }

    /// Nested fixture types carrying an auto-registration marker become
    /// bindings up front, before any just-in-time resolution could see them.
    fn scan_nested_types(&mut self, fixture: &FixtureMeta) -> Result<(), ContainerError> {
        let nested: Vec<_> = fixture
            .ancestry()
            .flat_map(|f| f.nested_types().iter().cloned())
            .collect();
        for item in nested {
            let key = Key::from_type(item.ty);
            if self.keys_observed.contains(&key) {
                continue;
            }
            match item.marker {
                TestMarker::Singleton => {
                    self.observe_bind_key(key.clone()).in_scope(Lifetime::Singleton);
                }
                TestMarker::EagerSingleton => {
                    self.observe_bind_key(key.clone()).as_eager_singleton();
                }
                TestMarker::MockSingleton => self.bind_mock_checked(key.clone())?,
            }
            self.keys_observed.insert(key);
        }
        Ok(())
    }

    /// Every parameter of every test/setup/teardown hook is a root need,
    /// except parameters the runner itself supplies (the `All` marker).
    fn scan_lifecycle_hooks(&mut self, fixture: &FixtureMeta) -> Result<(), ContainerError> {
        let mut roots = Vec::new();
        for f in fixture.ancestry() {
            for hook in f.hooks() {
                for param in &hook.params {
                    if matches!(&param.qualifier, Some(q) if q.is_marker::<All>()) {
                        continue;
                    }
                    let site = format!("{}::{}", f.name(), hook.name);
                    roots.push(ensure_provided_key(&self.types, param, &site)?);
                }
            }
        }
        for key in roots {
            self.add_needed_key(key);
        }
        Ok(())
    }

    /// The fixture instance's own non-optional injection points are roots too
    fn scan_instance_points(&mut self, fixture: &FixtureMeta) -> Result<(), ContainerError> {
        let mut roots = Vec::new();
        for f in fixture.ancestry() {
            for point in f.injection_points() {
                if point.optional {
                    continue;
                }
                let site = format!("{} (injected member)", f.name());
                roots.push(ensure_provided_key(&self.types, &point.key, &site)?);
            }
        }
        for key in roots {
            self.add_needed_key(key);
        }
        Ok(())
    }

    fn add_needed_key(&mut self, key: Key) {
        self.keys_needed.insert(key.clone());
        self.bind_if_concrete(&key);
    }

    /// Concrete, unforced, non-internal, non-assisted, unbound keys get a
    /// real singleton immediately. The binding lands in `bindings_observed`,
    /// so the worklist below expands its dependencies within the same pass.
    fn bind_if_concrete(&mut self, key: &Key) {
        if self.types.is_instantiable(&key.ty)
            && !self.policy.should_mock(key.ty, &self.types)
            && !is_container_internal(&key.ty)
            && !is_assisted(key)
            && !self.keys_observed.contains(key)
        {
            self.observe_bind_key(key.clone()).in_scope(Lifetime::Singleton);
            self.keys_observed.insert(key.clone());
            self.synthesized_singletons.push(key.clone());
            tracing::debug!(key = %key, "real singleton synthesized");
        }
    }

    /// Index-based walk over a list that grows while it is walked: bindings
    /// appended by `bind_if_concrete` are themselves expanded before the pass
    /// ends. Termination relies on the observed-key set; a key is bound at
    /// most once.
    fn expand_observed_bindings(&mut self) -> Result<(), ContainerError> {
        let mut position = 0;
        while position < self.bindings_observed.len() {
            let info = Rc::clone(&self.bindings_observed[position]);
            position += 1;

            let (fixed_value, traced) = {
                let record = info.borrow();
                (record.fixed_value, record.traced_type())
            };
            if fixed_value {
                continue;
            }
            if let Some(ty) = traced {
                self.add_dependencies(ty)?;
            }
        }
        Ok(())
    }

    fn add_dependencies(&mut self, ty: TypeRef) -> Result<(), ContainerError> {
        let meta = match self.types.get(ty.id) {
            Some(meta) => meta,
            None => return Ok(()),
        };
        if !meta.is_instantiable() {
            return Ok(());
        }
        let points: Vec<Key> = meta
            .ctor_points
            .iter()
            .chain(meta.member_points.iter())
            .filter(|point| !point.optional)
            .map(|point| point.key.clone())
            .collect();
        for key in points {
            self.add_key_dependency(&key, ty.name)?;
        }
        Ok(())
    }

    fn add_key_dependency(&mut self, key: &Key, site: &str) -> Result<(), ContainerError> {
        let normalized = ensure_provided_key(&self.types, key, site)?;
        self.bind_if_concrete(&normalized);
        self.keys_needed.insert(normalized);
        Ok(())
    }

    /// Whatever is still needed but unbound gets a default binding: mocks for
    /// abstractions and force-mocked concrete types. A concrete key reaching
    /// this point was never concretized, which is a defect, not a mock.
    fn bind_default_mocks(&mut self) -> Result<(), ContainerError> {
        let mut unresolved: Vec<Key> = self
            .keys_needed
            .iter()
            .filter(|key| !self.keys_observed.contains(*key))
            .filter(|key| !is_container_internal(&key.ty) && !is_assisted(key))
            .cloned()
            .collect();
        unresolved.sort_by_key(|key| key.to_string());

        for key in unresolved {
            match self.types.kind(&key.ty) {
                Some(TypeKind::Abstract) => self.bind_mock_unobserved(&key)?,
                Some(TypeKind::Concrete)
                    if self.policy.should_mock(key.ty, &self.types) =>
                {
                    self.bind_mock_unobserved(&key)?
                }
                Some(TypeKind::Concrete) | Some(TypeKind::Provider) => {
                    return Err(ContainerError::UnresolvedNeed {
                        key: key.to_string(),
                    })
                }
                None => {
                    return Err(ContainerError::UnknownType {
                        type_name: key.type_name(),
                    })
                }
            }
        }
        Ok(())
    }

    /// Default mocks bypass observation: they are the end of the line, with
    /// nothing left to trace.
    fn bind_mock_unobserved(&mut self, key: &Key) -> Result<(), ContainerError> {
        if !self.mocks.supports(&key.ty) {
            return Err(ContainerError::MissingMockSource {
                type_name: key.ty.name,
            });
        }
        let provider = Arc::new(MockProvider::new(key.ty, Arc::clone(&self.mocks)));
        self.registry
            .bind_key(key.clone())
            .to_provider(provider)
            .in_scope(Lifetime::Singleton);
        self.keys_observed.insert(key.clone());
        self.synthesized_mocks.push(key.clone());
        tracing::debug!(key = %key, "mock singleton synthesized");
        Ok(())
    }
}

/// Run the completion pass and build the injector in one step
pub fn build_test_injector(
    module: &dyn TestModule,
    fixture: &FixtureMeta,
    types: Arc<TypeRegistry>,
    mocks: Arc<MockRegistry>,
) -> Result<(Injector, CompletionReport), ContainerError> {
    let completed = AutoBinder::new(Arc::clone(&types), mocks).complete(module, fixture)?;
    let injector = Injector::build(completed.registry, types)?;
    Ok((injector, completed.report))
}
