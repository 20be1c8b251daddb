//! The injector: built once from a finished binding registry, then used to
//! resolve services. Build rejects duplicate keys and instantiation cycles
//! and instantiates eager singletons; resolution caches singletons and falls
//! back to just-in-time construction of registered concrete types, the rule
//! the binding-completion layer exists to preempt.

use std::collections::HashMap;
use std::sync::Arc;

use crate::binder::{BindingRecord, BindingRegistry, BindingTarget};
use crate::diag::Diagnostics;
use crate::errors::ContainerError;
use crate::graph::DependencyGraph;
use crate::key::{Key, TypeRef};
use crate::metadata::{svc, unwrap_svc, AnyService, InjectionPoint, TypeRegistry};
use crate::scope::SingletonStore;

/// Build stage marker, natively injectable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Development,
    Production,
}

/// Types the container supplies natively; they are never bound, never
/// synthesized, and always resolvable.
pub fn is_container_internal(ty: &TypeRef) -> bool {
    ty.is::<Injector>()
        || ty.is::<Stage>()
        || ty.is::<Diagnostics>()
        || ty.is::<TypeRegistry>()
        || ty.is::<MemberInjector>()
}

struct InjectorInner {
    types: Arc<TypeRegistry>,
    records: Vec<BindingRecord>,
    index: HashMap<Key, usize>,
    singletons: SingletonStore,
    stage: Stage,
    diagnostics: Diagnostics,
}

/// Shareable injector handle
#[derive(Clone)]
pub struct Injector {
    inner: Arc<InjectorInner>,
}

impl std::fmt::Debug for Injector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Injector")
            .field("bindings", &self.inner.records.len())
            .field("stage", &self.inner.stage)
            .field("singletons", &self.inner.singletons.len())
            .finish()
    }
}

impl Injector {
    /// Build an injector in the development stage
    pub fn build(
        registry: BindingRegistry,
        types: Arc<TypeRegistry>,
    ) -> Result<Self, ContainerError> {
        Self::build_with_stage(registry, types, Stage::Development)
    }

    pub fn build_with_stage(
        registry: BindingRegistry,
        types: Arc<TypeRegistry>,
        stage: Stage,
    ) -> Result<Self, ContainerError> {
        let records = registry.into_records();

        let mut index = HashMap::with_capacity(records.len());
        for (position, record) in records.iter().enumerate() {
            if index.insert(record.key.clone(), position).is_some() {
                return Err(ContainerError::duplicate_binding(&record.key));
            }
        }

        DependencyGraph::from_bindings(&records, &types).detect_cycles()?;

        let eager_keys: Vec<Key> = records
            .iter()
            .filter(|record| record.scope.is_eager())
            .map(|record| record.key.clone())
            .collect();
        let binding_count = records.len();

        let injector = Self {
            inner: Arc::new(InjectorInner {
                types,
                records,
                index,
                singletons: SingletonStore::new(),
                stage,
                diagnostics: Diagnostics::new(),
            }),
        };

        for key in eager_keys {
            injector.resolve_key(&key)?;
        }

        tracing::info!(bindings = binding_count, stage = ?stage, "injector built");
        Ok(injector)
    }

    pub fn stage(&self) -> Stage {
        self.inner.stage
    }

    pub fn diagnostics(&self) -> Diagnostics {
        self.inner.diagnostics.clone()
    }

    pub fn types(&self) -> Arc<TypeRegistry> {
        self.inner.types.clone()
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.inner.index.contains_key(key)
    }

    /// Resolve a service by type
    pub fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, ContainerError> {
        let key = Key::of::<T>();
        unwrap_svc(&self.resolve_key(&key)?, &key)
    }

    /// Resolve a service with a named qualifier
    pub fn resolve_named<T: ?Sized + Send + Sync + 'static>(
        &self,
        name: &str,
    ) -> Result<Arc<T>, ContainerError> {
        let key = Key::named::<T>(name);
        unwrap_svc(&self.resolve_key(&key)?, &key)
    }

    /// Resolve, returning `None` when no binding or constructor exists
    pub fn try_resolve<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.resolve::<T>().ok()
    }

    /// Resolve an arbitrary key to its stored service form
    pub fn resolve_key(&self, key: &Key) -> Result<AnyService, ContainerError> {
        if let Some(native) = self.resolve_native(key) {
            return Ok(native);
        }
        match self.inner.index.get(key) {
            Some(&position) => self.activate(&self.inner.records[position]),
            None => self.construct_unbound(key),
        }
    }

    fn resolve_native(&self, key: &Key) -> Option<AnyService> {
        if key.qualifier.is_some() {
            return None;
        }
        let ty = &key.ty;
        if ty.is::<Injector>() {
            Some(svc(Arc::new(self.clone())))
        } else if ty.is::<Stage>() {
            Some(svc(Arc::new(self.inner.stage)))
        } else if ty.is::<Diagnostics>() {
            Some(svc(Arc::new(self.inner.diagnostics.clone())))
        } else if ty.is::<TypeRegistry>() {
            Some(svc(self.inner.types.clone()))
        } else if ty.is::<MemberInjector>() {
            Some(svc(Arc::new(MemberInjector::new(self.clone()))))
        } else {
            None
        }
    }

    fn activate(&self, record: &BindingRecord) -> Result<AnyService, ContainerError> {
        if record.scope.is_singleton() {
            if let Some(existing) = self.inner.singletons.get(&record.key)? {
                return Ok(existing);
            }
            let value = self.produce(record)?;
            self.inner.singletons.insert(record.key.clone(), value)
        } else {
            self.produce(record)
        }
    }

    fn produce(&self, record: &BindingRecord) -> Result<AnyService, ContainerError> {
        match &record.target {
            BindingTarget::ToSelf => self.construct_raw(&record.key.ty),
            BindingTarget::Linked { key: target, adapt } => {
                let value = self.resolve_key(target)?;
                match adapt {
                    Some(adapt) => adapt(value),
                    None => Ok(value),
                }
            }
            BindingTarget::Instance(value) => Ok(value.clone()),
            BindingTarget::Provider(provider) => provider.provide(self),
            BindingTarget::ProviderVia { call, .. } => call(self),
        }
    }

    /// Just-in-time construction for unbound keys of registered concrete and
    /// provider types; transient semantics.
    fn construct_unbound(&self, key: &Key) -> Result<AnyService, ContainerError> {
        match self.inner.types.get(key.type_id()) {
            Some(meta) if meta.construct.is_some() => self.construct_raw(&key.ty),
            _ => Err(ContainerError::missing_binding(key)),
        }
    }

    /// Construct a registered type directly through its metadata, bypassing
    /// any binding for its key. Providers that build the very type they are
    /// bound under go through here.
    pub fn construct_raw(&self, ty: &TypeRef) -> Result<AnyService, ContainerError> {
        let meta = self
            .inner
            .types
            .get(ty.id)
            .ok_or(ContainerError::UnknownType { type_name: ty.name })?;
        let construct = meta
            .construct
            .as_ref()
            .ok_or(ContainerError::NotInstantiable { type_name: ty.name })?;
        construct(self)
    }
}

/// Resolves a type's member injection points against a built injector,
/// honoring the `optional` flag. Natively injectable; the test runner uses it
/// to inject the fixture instance.
#[derive(Debug, Clone)]
pub struct MemberInjector {
    injector: Injector,
}

impl MemberInjector {
    pub fn new(injector: Injector) -> Self {
        Self { injector }
    }

    /// Resolve a single injection point. Optional points tolerate a missing
    /// binding and yield `None`.
    pub fn resolve_point(
        &self,
        point: &InjectionPoint,
    ) -> Result<Option<AnyService>, ContainerError> {
        match self.injector.resolve_key(&point.key) {
            Ok(value) => Ok(Some(value)),
            Err(ContainerError::MissingBinding { .. }) if point.optional => Ok(None),
            Err(err) => Err(err),
        }
    }
}
