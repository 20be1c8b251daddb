//! Type metadata facility.
//!
//! Rust has no runtime reflection, so the container consumes an explicit
//! registry of per-type records: kind, declared supertypes, injection points
//! and a construction closure. In applications these records are emitted by a
//! derive macro; tests register them by hand through the builder below.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, RwLock};

use crate::errors::ContainerError;
use crate::injector::Injector;
use crate::key::{Key, TypeRef};

/// Shared service value: an `Arc<dyn Any>` holding an `Arc<T>` inside.
///
/// The double indirection is what lets trait-object services (`Arc<dyn Trait>`)
/// be stored and downcast uniformly; retrieval goes through
/// `downcast_ref::<Arc<T>>()`.
pub type AnyService = Arc<dyn Any + Send + Sync>;

/// Wrap a typed service handle for storage
pub fn svc<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> AnyService {
    Arc::new(value)
}

/// Unwrap a stored service handle, failing with the key it was looked up under
pub fn unwrap_svc<T: ?Sized + Send + Sync + 'static>(
    value: &AnyService,
    key: &Key,
) -> Result<Arc<T>, ContainerError> {
    value
        .downcast_ref::<Arc<T>>()
        .cloned()
        .ok_or_else(|| ContainerError::TypeMismatch {
            key: key.to_string(),
        })
}

/// Construction closure invoked by the injector
pub type ConstructFn =
    Box<dyn Fn(&Injector) -> Result<AnyService, ContainerError> + Send + Sync>;

/// Classification of a registered type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// Ordinary type with a constructor
    Concrete,
    /// Trait object or otherwise uninstantiable abstraction
    Abstract,
    /// Deferred-provider wrapper around another key
    Provider,
}

/// A location requiring a value of a given key
#[derive(Debug, Clone)]
pub struct InjectionPoint {
    pub key: Key,
    pub optional: bool,
}

impl InjectionPoint {
    pub fn required(key: Key) -> Self {
        Self {
            key,
            optional: false,
        }
    }

    pub fn optional(key: Key) -> Self {
        Self {
            key,
            optional: true,
        }
    }
}

/// Per-type metadata record
pub struct TypeMeta {
    pub ty: TypeRef,
    pub kind: TypeKind,
    /// For `Provider` kind, the type the provider supplies. `None` means the
    /// wrapper's parameter could not be determined; normalizing a key of this
    /// type is a configuration error.
    pub provides: Option<TypeRef>,
    pub supertypes: Vec<TypeRef>,
    pub ctor_points: Vec<InjectionPoint>,
    pub member_points: Vec<InjectionPoint>,
    pub construct: Option<ConstructFn>,
}

impl std::fmt::Debug for TypeMeta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeMeta")
            .field("ty", &self.ty)
            .field("kind", &self.kind)
            .field("provides", &self.provides)
            .field("supertypes", &self.supertypes)
            .field("ctor_points", &self.ctor_points)
            .field("member_points", &self.member_points)
            .field("construct", &self.construct.as_ref().map(|_| "<construct_fn>"))
            .finish()
    }
}

impl TypeMeta {
    /// Start metadata for a concrete type
    pub fn concrete<T: Send + Sync + 'static>() -> TypeMetaBuilder {
        TypeMetaBuilder::new(TypeRef::of::<T>(), TypeKind::Concrete)
    }

    /// Start metadata for an interface (trait object) or abstract type
    pub fn interface<T: ?Sized + 'static>() -> TypeMetaBuilder {
        TypeMetaBuilder::new(TypeRef::of::<T>(), TypeKind::Abstract)
    }

    /// Start metadata for a provider wrapper type. Without a `.provides` call
    /// the record stays unparameterized, which normalization rejects.
    pub fn provider<T: ?Sized + 'static>() -> TypeMetaBuilder {
        TypeMetaBuilder::new(TypeRef::of::<T>(), TypeKind::Provider)
    }

    pub fn is_instantiable(&self) -> bool {
        self.kind == TypeKind::Concrete && self.construct.is_some()
    }
}

type PendingRegistration = Box<dyn FnOnce(&TypeRegistry) + Send>;

/// Builder for type metadata, mirroring what a derive macro would emit
pub struct TypeMetaBuilder {
    ty: TypeRef,
    kind: TypeKind,
    provides: Option<TypeRef>,
    supertypes: Vec<TypeRef>,
    ctor_points: Vec<InjectionPoint>,
    member_points: Vec<InjectionPoint>,
    construct: Option<ConstructFn>,
    pending: Vec<PendingRegistration>,
}

impl TypeMetaBuilder {
    fn new(ty: TypeRef, kind: TypeKind) -> Self {
        Self {
            ty,
            kind,
            provides: None,
            supertypes: Vec::new(),
            ctor_points: Vec::new(),
            member_points: Vec::new(),
            construct: None,
            pending: Vec::new(),
        }
    }

    /// Declare a constructor dependency on `D`
    pub fn dependency<D: ?Sized + 'static>(mut self) -> Self {
        self.ctor_points.push(InjectionPoint::required(Key::of::<D>()));
        self
    }

    /// Declare a constructor dependency on `D` with a named qualifier
    pub fn named_dependency<D: ?Sized + 'static>(mut self, name: impl Into<String>) -> Self {
        self.ctor_points
            .push(InjectionPoint::required(Key::named::<D>(name)));
        self
    }

    /// Declare a constructor dependency on `D` qualified with marker `M`
    pub fn marked_dependency<D: ?Sized + 'static, M: ?Sized + 'static>(mut self) -> Self {
        self.ctor_points
            .push(InjectionPoint::required(Key::marked::<D, M>()));
        self
    }

    /// Declare a constructor dependency on `Deferred<D>`.
    ///
    /// Also schedules registration of the wrapper's own metadata so the
    /// registry can answer what it provides.
    pub fn deferred_dependency<D: ?Sized + Send + Sync + 'static>(mut self) -> Self {
        self.ctor_points
            .push(InjectionPoint::required(Key::of::<Deferred<D>>()));
        self.pending
            .push(Box::new(|registry: &TypeRegistry| registry.register_deferred::<D>()));
        self
    }

    /// Declare a field/method injection point
    pub fn member<D: ?Sized + 'static>(mut self) -> Self {
        self.member_points
            .push(InjectionPoint::required(Key::of::<D>()));
        self
    }

    /// Declare an optional field/method injection point
    pub fn optional_member<D: ?Sized + 'static>(mut self) -> Self {
        self.member_points
            .push(InjectionPoint::optional(Key::of::<D>()));
        self
    }

    /// Declare a qualified injection point explicitly
    pub fn point(mut self, point: InjectionPoint) -> Self {
        self.member_points.push(point);
        self
    }

    /// Declare a supertype (implemented trait or base abstraction)
    pub fn implements<S: ?Sized + 'static>(mut self) -> Self {
        self.supertypes.push(TypeRef::of::<S>());
        self
    }

    /// For provider wrappers: the type the wrapper supplies
    pub fn provides<D: ?Sized + 'static>(mut self) -> Self {
        self.provides = Some(TypeRef::of::<D>());
        self
    }

    /// Set the construction closure
    pub fn construct<F, T>(mut self, f: F) -> Self
    where
        F: Fn(&Injector) -> Result<T, ContainerError> + Send + Sync + 'static,
        T: Send + Sync + 'static,
    {
        self.construct = Some(Box::new(move |injector| Ok(svc(Arc::new(f(injector)?)))));
        self
    }

    fn build(self) -> (TypeMeta, Vec<PendingRegistration>) {
        let meta = TypeMeta {
            ty: self.ty,
            kind: self.kind,
            provides: self.provides,
            supertypes: self.supertypes,
            ctor_points: self.ctor_points,
            member_points: self.member_points,
            construct: self.construct,
        };
        (meta, self.pending)
    }
}

/// Registry of type metadata, the container's answer surface for "what does
/// this type need and how is it made".
pub struct TypeRegistry {
    entries: RwLock<HashMap<TypeId, Arc<TypeMeta>>>,
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.len())
            .finish()
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Register a type's metadata, replacing any previous record
    pub fn register(&self, builder: TypeMetaBuilder) {
        let (meta, pending) = builder.build();
        tracing::debug!("registering type metadata for {}", meta.ty);
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(meta.ty.id, Arc::new(meta));
        }
        for registration in pending {
            registration(self);
        }
    }

    /// Register the deferred-provider wrapper for `T`
    pub fn register_deferred<T: ?Sized + Send + Sync + 'static>(&self) {
        let wrapper = TypeRef::of::<Deferred<T>>();
        if self.get(wrapper.id).is_some() {
            return;
        }
        self.register(
            TypeMeta::provider::<Deferred<T>>()
                .provides::<T>()
                .construct(|injector| Ok(Deferred::<T>::new(injector.clone()))),
        );
    }

    pub fn get(&self, id: TypeId) -> Option<Arc<TypeMeta>> {
        self.entries.read().ok()?.get(&id).cloned()
    }

    pub fn kind(&self, ty: &TypeRef) -> Option<TypeKind> {
        self.get(ty.id).map(|meta| meta.kind)
    }

    /// Concrete with a registered constructor
    pub fn is_instantiable(&self, ty: &TypeRef) -> bool {
        self.get(ty.id)
            .map(|meta| meta.is_instantiable())
            .unwrap_or(false)
    }

    /// Whether `ty` is `base` or declares it (transitively) as a supertype
    pub fn is_subtype_of(&self, ty: &TypeRef, base: &TypeRef) -> bool {
        if ty.id == base.id {
            return true;
        }
        let mut queue: Vec<TypeRef> = match self.get(ty.id) {
            Some(meta) => meta.supertypes.clone(),
            None => return false,
        };
        let mut seen = vec![ty.id];
        while let Some(next) = queue.pop() {
            if next.id == base.id {
                return true;
            }
            if seen.contains(&next.id) {
                continue;
            }
            seen.push(next.id);
            if let Some(meta) = self.get(next.id) {
                queue.extend(meta.supertypes.iter().copied());
            }
        }
        false
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Deferred handle on a dependency: resolved through the injector on `get`,
/// not at construction time. Binding a `Deferred<T>` parameter instead of `T`
/// is the supported way to break an instantiation cycle.
pub struct Deferred<T: ?Sized + Send + Sync + 'static> {
    injector: Injector,
    _marker: PhantomData<fn() -> Box<T>>,
}

impl<T: ?Sized + Send + Sync + 'static> Deferred<T> {
    pub fn new(injector: Injector) -> Self {
        Self {
            injector,
            _marker: PhantomData,
        }
    }

    pub fn get(&self) -> Result<Arc<T>, ContainerError> {
        self.injector.resolve::<T>()
    }
}

impl<T: ?Sized + Send + Sync + 'static> std::fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Deferred<{}>", std::any::type_name::<T>())
    }
}

/// Normalize a key through the registry: a deferred-provider key is rewritten
/// to the key of the value the provider supplies, preserving the qualifier.
/// `site` names the hook or injection point for error reporting.
pub fn ensure_provided_key(
    registry: &TypeRegistry,
    key: &Key,
    site: &str,
) -> Result<Key, ContainerError> {
    match registry.get(key.type_id()) {
        Some(meta) if meta.kind == TypeKind::Provider => match meta.provides {
            Some(provided) => Ok(key.with_type(provided)),
            None => Err(ContainerError::UnresolvableKey {
                key: key.to_string(),
                site: site.to_string(),
            }),
        },
        _ => Ok(key.clone()),
    }
}
