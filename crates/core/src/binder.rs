use std::marker::PhantomData;
use std::sync::Arc;

use crate::errors::ContainerError;
use crate::injector::Injector;
use crate::key::{Key, Qualifier, TypeRef};
use crate::metadata::{svc, unwrap_svc, AnyService};
use crate::scope::Lifetime;

/// Upcast from an implementation to the interface it is bound under.
///
/// Rust cannot coerce `Arc<U>` to `Arc<dyn I>` behind type erasure, so linked
/// bindings capture the coercion when the statement is written, where both
/// types are statically known. The identity implementation below covers
/// same-type links; a derive macro would emit the per-interface pairs.
pub trait AsInterface<I: ?Sized + Send + Sync + 'static>: Send + Sync + 'static {
    fn as_interface(self: Arc<Self>) -> Arc<I>;
}

impl<T: ?Sized + Send + Sync + 'static> AsInterface<T> for T {
    fn as_interface(self: Arc<Self>) -> Arc<T> {
        self
    }
}

/// Coercion applied to a linked target's resolved value
pub type AdaptFn = Arc<dyn Fn(AnyService) -> Result<AnyService, ContainerError> + Send + Sync>;

/// How a provider relates to the key it is bound under.
///
/// The completion layer uses this to decide whether a provider binding still
/// has traceable dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderClass {
    /// Opaque source of values; nothing to trace
    Opaque,
    /// Decorates the bound abstraction itself, so its dependencies are the
    /// abstraction's own
    Decorator,
    /// Assisted factory reporting the concrete type it produces
    Factory(TypeRef),
}

/// A source of service values invoked at resolution time
pub trait InstanceProvider: Send + Sync {
    fn provide(&self, injector: &Injector) -> Result<AnyService, ContainerError>;

    fn provider_class(&self) -> ProviderClass {
        ProviderClass::Opaque
    }
}

/// Monomorphized call through a provider looked up in the container
pub type ProviderCall =
    Arc<dyn Fn(&Injector) -> Result<AnyService, ContainerError> + Send + Sync>;

/// What a binding resolves to
pub enum BindingTarget {
    /// Untargeted: construct the key's own type
    ToSelf,
    /// Resolve another key in place of this one, optionally upcasting
    Linked { key: Key, adapt: Option<AdaptFn> },
    /// A fixed, pre-made value
    Instance(AnyService),
    /// A provider instance supplied at bind time
    Provider(Arc<dyn InstanceProvider>),
    /// A provider type resolved through the container, then invoked
    ProviderVia { provider_key: Key, call: ProviderCall },
}

impl std::fmt::Debug for BindingTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BindingTarget::ToSelf => write!(f, "ToSelf"),
            BindingTarget::Linked { key, .. } => f.debug_tuple("Linked").field(key).finish(),
            BindingTarget::Instance(_) => write!(f, "Instance(<value>)"),
            BindingTarget::Provider(_) => write!(f, "Provider(<provider>)"),
            BindingTarget::ProviderVia { provider_key, .. } => {
                f.debug_tuple("ProviderVia").field(provider_key).finish()
            }
        }
    }
}

/// One committed binding statement
#[derive(Debug)]
pub struct BindingRecord {
    pub key: Key,
    pub target: BindingTarget,
    pub scope: Lifetime,
}

/// Ordered collection of binding records.
///
/// Duplicate keys are tolerated here on purpose; the injector's build step is
/// where double binding becomes an error, matching the contract that the
/// binder itself stays permissive while a statement is being assembled.
#[derive(Debug, Default)]
pub struct BindingRegistry {
    records: Vec<BindingRecord>,
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Start a binding statement for type `T`
    pub fn bind<T: ?Sized + Send + Sync + 'static>(&mut self) -> BindingBuilder<'_, T> {
        BindingBuilder::new(self, Key::of::<T>())
    }

    /// Start a binding statement for an already-computed key
    pub fn bind_key(&mut self, key: Key) -> BindingBuilder<'_, ()> {
        BindingBuilder::new(self, key)
    }

    /// Start a constant binding statement
    pub fn bind_constant(&mut self) -> ConstantBindingBuilder<'_> {
        ConstantBindingBuilder {
            registry: self,
            qualifier: None,
        }
    }

    pub(crate) fn commit(&mut self, record: BindingRecord) {
        tracing::debug!(key = %record.key, scope = %record.scope, "binding committed");
        self.records.push(record);
    }

    pub fn records(&self) -> &[BindingRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<BindingRecord> {
        self.records
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.records.iter().any(|record| record.key == *key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Fluent builder for one binding statement.
///
/// The record is committed when the builder drops, i.e. when the statement
/// ends. An untargeted `bind::<T>()` is therefore still a binding (to the
/// type itself), which eager concrete binding depends on.
pub struct BindingBuilder<'a, T: ?Sized + 'static> {
    registry: &'a mut BindingRegistry,
    record: Option<BindingRecord>,
    _marker: PhantomData<*const T>,
}

impl<'a, T: ?Sized + Send + Sync + 'static> BindingBuilder<'a, T> {
    fn new(registry: &'a mut BindingRegistry, key: Key) -> Self {
        Self {
            registry,
            record: Some(BindingRecord {
                key,
                target: BindingTarget::ToSelf,
                scope: Lifetime::Transient,
            }),
            _marker: PhantomData,
        }
    }

    fn record_mut(&mut self) -> &mut BindingRecord {
        self.record.as_mut().expect("binding record taken before drop")
    }

    /// Qualify the bound key
    pub fn annotated_with(mut self, qualifier: Qualifier) -> Self {
        let record = self.record_mut();
        record.key = record.key.with_qualifier(qualifier);
        self
    }

    /// Link to an implementation type
    pub fn to<U: AsInterface<T>>(mut self) -> Self {
        let key = Key::of::<U>();
        let adapt_key = key.clone();
        self.record_mut().target = BindingTarget::Linked {
            key,
            adapt: Some(Arc::new(move |value: AnyService| {
                Ok(svc(unwrap_svc::<U>(&value, &adapt_key)?.as_interface()))
            })),
        };
        self
    }

    /// Link to another key of the same type (e.g. a qualified variant)
    pub fn to_key(mut self, key: Key) -> Self {
        self.record_mut().target = BindingTarget::Linked { key, adapt: None };
        self
    }

    /// Bind to a fixed, pre-made value; implicitly singleton
    pub fn to_instance(mut self, value: Arc<T>) {
        let record = self.record_mut();
        record.target = BindingTarget::Instance(svc(value));
        record.scope = Lifetime::Singleton;
    }

    /// Bind to a provider instance
    pub fn to_provider(mut self, provider: Arc<dyn InstanceProvider>) -> Self {
        self.record_mut().target = BindingTarget::Provider(provider);
        self
    }

    /// Bind to a provider type resolved through the container
    pub fn to_provider_type<P: InstanceProvider + Send + Sync + 'static>(mut self) -> Self {
        self.record_mut().target = BindingTarget::ProviderVia {
            provider_key: Key::of::<P>(),
            call: Arc::new(|injector: &Injector| {
                injector.resolve::<P>()?.provide(injector)
            }),
        };
        self
    }

    /// Set the binding's lifetime; ends the statement
    pub fn in_scope(mut self, lifetime: Lifetime) {
        self.record_mut().scope = lifetime;
    }

    /// Shorthand for `in_scope(Lifetime::Eager)`
    pub fn as_eager_singleton(mut self) {
        self.record_mut().scope = Lifetime::Eager;
    }
}

impl<'a, T: ?Sized + 'static> Drop for BindingBuilder<'a, T> {
    fn drop(&mut self) {
        if let Some(record) = self.record.take() {
            self.registry.commit(record);
        }
    }
}

/// Builder for constant bindings; the key type is the constant's own type
pub struct ConstantBindingBuilder<'a> {
    registry: &'a mut BindingRegistry,
    qualifier: Option<Qualifier>,
}

impl<'a> ConstantBindingBuilder<'a> {
    pub fn annotated_with(mut self, qualifier: Qualifier) -> Self {
        self.qualifier = Some(qualifier);
        self
    }

    pub fn to_str(self, value: &str) {
        self.commit(value.to_string());
    }

    pub fn to_int(self, value: i64) {
        self.commit(value);
    }

    pub fn to_float(self, value: f64) {
        self.commit(value);
    }

    pub fn to_bool(self, value: bool) {
        self.commit(value);
    }

    fn commit<V: Send + Sync + 'static>(self, value: V) {
        let mut key = Key::of::<V>();
        if let Some(qualifier) = self.qualifier {
            key = key.with_qualifier(qualifier);
        }
        self.registry.commit(BindingRecord {
            key,
            target: BindingTarget::Instance(svc(Arc::new(value))),
            scope: Lifetime::Singleton,
        });
    }
}
