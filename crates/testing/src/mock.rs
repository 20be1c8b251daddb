//! Mock sources and the force-mock policy.

use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use bindery_core::binder::{InstanceProvider, ProviderClass};
use bindery_core::errors::ContainerError;
use bindery_core::injector::Injector;
use bindery_core::key::TypeRef;
use bindery_core::metadata::{svc, AnyService, TypeRegistry};

type MockFn = Box<dyn Fn() -> AnyService + Send + Sync>;

/// The mock-generation boundary: per-type factories producing inert
/// stand-ins. In applications these registrations are emitted next to the
/// type metadata; tests register `mockall` mocks or hand-written stubs.
pub struct MockRegistry {
    sources: RwLock<HashMap<TypeId, MockFn>>,
}

impl std::fmt::Debug for MockRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockRegistry")
            .field("sources", &self.len())
            .finish()
    }
}

impl MockRegistry {
    pub fn new() -> Self {
        Self {
            sources: RwLock::new(HashMap::new()),
        }
    }

    /// Register a stand-in factory for `T`
    pub fn register<T, F>(&self, source: F)
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn() -> Arc<T> + Send + Sync + 'static,
    {
        if let Ok(mut sources) = self.sources.write() {
            sources.insert(TypeId::of::<T>(), Box::new(move || svc(source())));
        }
    }

    pub fn supports(&self, ty: &TypeRef) -> bool {
        self.sources
            .read()
            .map(|sources| sources.contains_key(&ty.id))
            .unwrap_or(false)
    }

    /// Produce a stand-in for `ty`
    pub fn make(&self, ty: &TypeRef) -> Result<AnyService, ContainerError> {
        let sources = self.sources.read().map_err(|_| ContainerError::LockError {
            resource: "mock_registry".to_string(),
        })?;
        let source = sources
            .get(&ty.id)
            .ok_or(ContainerError::MissingMockSource { type_name: ty.name })?;
        Ok(source())
    }

    pub fn len(&self) -> usize {
        self.sources.read().map(|sources| sources.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Provider target for synthesized mock bindings
pub struct MockProvider {
    ty: TypeRef,
    mocks: Arc<MockRegistry>,
}

impl MockProvider {
    pub fn new(ty: TypeRef, mocks: Arc<MockRegistry>) -> Self {
        Self { ty, mocks }
    }
}

impl InstanceProvider for MockProvider {
    fn provide(&self, _injector: &Injector) -> Result<AnyService, ContainerError> {
        self.mocks.make(&self.ty)
    }
}

/// Decorating provider: produces the delegate's value wrapped by a decorate
/// closure (typically a spy around the real implementation). Classified as a
/// decorator so the wrapped abstraction's dependencies stay traceable.
pub struct SpyProvider {
    delegate: Arc<dyn InstanceProvider>,
    decorate: Arc<dyn Fn(AnyService) -> Result<AnyService, ContainerError> + Send + Sync>,
}

impl SpyProvider {
    pub fn new<F>(delegate: Arc<dyn InstanceProvider>, decorate: F) -> Self
    where
        F: Fn(AnyService) -> Result<AnyService, ContainerError> + Send + Sync + 'static,
    {
        Self {
            delegate,
            decorate: Arc::new(decorate),
        }
    }
}

impl InstanceProvider for SpyProvider {
    fn provide(&self, injector: &Injector) -> Result<AnyService, ContainerError> {
        (self.decorate)(self.delegate.provide(injector)?)
    }

    fn provider_class(&self) -> ProviderClass {
        ProviderClass::Decorator
    }
}

/// Force-mock classification, memoized per type after the first supertype
/// walk. Scoped to one completion pass; nothing here is process-wide.
#[derive(Debug, Default)]
pub struct MockPolicy {
    force: HashSet<TypeRef>,
    skip: HashSet<TypeRef>,
}

impl MockPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock `ty` and every registered subtype of it
    pub fn force(&mut self, ty: TypeRef) {
        self.force.insert(ty);
    }

    /// Exempt `ty` from force-mocking even when an ancestor is registered
    pub fn exempt(&mut self, ty: TypeRef) {
        self.skip.insert(ty);
    }

    pub fn should_mock(&mut self, ty: TypeRef, types: &TypeRegistry) -> bool {
        if self.skip.contains(&ty) {
            return false;
        }
        if self.force.contains(&ty) {
            return true;
        }

        let result = self
            .force
            .iter()
            .any(|base| types.is_subtype_of(&ty, base));

        // Memoize either way; the ancestor walk is repeated per key otherwise.
        if result {
            self.force.insert(ty);
        } else {
            self.skip.insert(ty);
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindery_core::metadata::TypeMeta;

    trait Publisher: Send + Sync {
        fn publish(&self, topic: &str);
    }

    #[derive(Default)]
    struct KafkaPublisher;
    impl Publisher for KafkaPublisher {
        fn publish(&self, _topic: &str) {}
    }

    #[test]
    fn registry_produces_registered_stand_ins() {
        let mocks = MockRegistry::new();
        mocks.register::<dyn Publisher, _>(|| Arc::new(KafkaPublisher));

        let ty = TypeRef::of::<dyn Publisher>();
        assert!(mocks.supports(&ty));

        let value = mocks.make(&ty).unwrap();
        let publisher = value.downcast_ref::<Arc<dyn Publisher>>().unwrap();
        publisher.publish("orders");
    }

    #[test]
    fn missing_source_is_reported_by_name() {
        let mocks = MockRegistry::new();
        let err = mocks.make(&TypeRef::of::<dyn Publisher>()).unwrap_err();
        match err {
            ContainerError::MissingMockSource { type_name } => {
                assert!(type_name.contains("Publisher"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn policy_walks_supertypes_and_memoizes() {
        let types = TypeRegistry::new();
        types.register(TypeMeta::interface::<dyn Publisher>());
        types.register(
            TypeMeta::concrete::<KafkaPublisher>()
                .implements::<dyn Publisher>()
                .construct(|_| Ok(KafkaPublisher)),
        );

        let mut policy = MockPolicy::new();
        policy.force(TypeRef::of::<dyn Publisher>());

        let kafka = TypeRef::of::<KafkaPublisher>();
        assert!(policy.should_mock(kafka, &types));
        // memoized positive: now a direct member of the force set
        assert!(policy.force.contains(&kafka));

        let unrelated = TypeRef::of::<String>();
        assert!(!policy.should_mock(unrelated, &types));
        assert!(policy.skip.contains(&unrelated));
    }

    #[test]
    fn exemption_beats_force_registration() {
        let types = TypeRegistry::new();
        types.register(TypeMeta::interface::<dyn Publisher>());
        types.register(
            TypeMeta::concrete::<KafkaPublisher>()
                .implements::<dyn Publisher>()
                .construct(|_| Ok(KafkaPublisher)),
        );

        let mut policy = MockPolicy::new();
        policy.force(TypeRef::of::<dyn Publisher>());
        policy.exempt(TypeRef::of::<KafkaPublisher>());

        assert!(!policy.should_mock(TypeRef::of::<KafkaPublisher>(), &types));
    }
}
