//! Binding observation.
//!
//! Every binding statement made during test configuration is mirrored into a
//! `BindingInfo` record while the real builder call is forwarded unchanged.
//! The completion pass later walks these records to expand the dependency
//! closure; a record marked fixed-value has nothing left to trace.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use bindery_core::binder::{
    AsInterface, BindingBuilder, ConstantBindingBuilder, InstanceProvider, ProviderClass,
};
use bindery_core::key::{Key, Qualifier, TypeRef};
use bindery_core::scope::Lifetime;

/// Metadata mirror of one binding statement
#[derive(Debug, Clone, Default)]
pub struct BindingInfo {
    /// The requested type; set on creation except for constants, whose type
    /// is only known once the statement completes
    pub ty: Option<TypeRef>,
    pub qualifier: Option<Qualifier>,
    /// The concrete type the statement resolves to, when still traceable
    pub bound_type: Option<TypeRef>,
    /// Bound to a literal value, a premade mock or a constant; no further
    /// dependencies to trace
    pub fixed_value: bool,
}

impl BindingInfo {
    pub fn for_key(key: &Key) -> Self {
        Self {
            ty: Some(key.ty),
            qualifier: key.qualifier.clone(),
            bound_type: None,
            fixed_value: false,
        }
    }

    /// The key this statement bound, once the type is known
    pub fn key(&self) -> Option<Key> {
        let ty = self.ty?;
        let mut key = Key::from_type(ty);
        if let Some(qualifier) = &self.qualifier {
            key = key.with_qualifier(qualifier.clone());
        }
        Some(key)
    }

    /// The type whose dependencies the closure should expand
    pub fn traced_type(&self) -> Option<TypeRef> {
        self.bound_type.or(self.ty)
    }
}

pub(crate) type SharedBindingInfo = Rc<RefCell<BindingInfo>>;

/// Fluent builder mirroring `BindingBuilder` while recording metadata
pub struct SpyBindingBuilder<'a, T: ?Sized + Send + Sync + 'static> {
    info: SharedBindingInfo,
    inner: BindingBuilder<'a, T>,
}

impl<'a, T: ?Sized + Send + Sync + 'static> SpyBindingBuilder<'a, T> {
    pub(crate) fn new(info: SharedBindingInfo, inner: BindingBuilder<'a, T>) -> Self {
        Self { info, inner }
    }

    pub fn annotated_with(self, qualifier: Qualifier) -> Self {
        let Self { info, inner } = self;
        info.borrow_mut().qualifier = Some(qualifier.clone());
        Self {
            inner: inner.annotated_with(qualifier),
            info,
        }
    }

    pub fn to<U: AsInterface<T>>(self) -> Self {
        let Self { info, inner } = self;
        info.borrow_mut().bound_type = Some(TypeRef::of::<U>());
        Self {
            inner: inner.to::<U>(),
            info,
        }
    }

    pub fn to_key(self, key: Key) -> Self {
        let Self { info, inner } = self;
        info.borrow_mut().bound_type = Some(key.ty);
        Self {
            inner: inner.to_key(key),
            info,
        }
    }

    pub fn to_instance(self, value: Arc<T>) {
        self.info.borrow_mut().fixed_value = true;
        self.inner.to_instance(value);
    }

    pub fn to_provider(self, provider: Arc<dyn InstanceProvider>) -> Self {
        let Self { info, inner } = self;
        {
            let mut record = info.borrow_mut();
            match provider.provider_class() {
                // A decorating provider wraps the bound abstraction itself,
                // so the abstraction's own dependencies stay traceable.
                ProviderClass::Decorator => record.bound_type = record.ty,
                // An assisted factory reports the type it produces.
                ProviderClass::Factory(ty) => record.bound_type = Some(ty),
                ProviderClass::Opaque => record.fixed_value = true,
            }
        }
        Self {
            inner: inner.to_provider(provider),
            info,
        }
    }

    pub fn to_provider_type<P: InstanceProvider + Send + Sync + 'static>(self) -> Self {
        let Self { info, inner } = self;
        info.borrow_mut().bound_type = Some(TypeRef::of::<P>());
        Self {
            inner: inner.to_provider_type::<P>(),
            info,
        }
    }

    pub fn in_scope(self, lifetime: Lifetime) {
        self.inner.in_scope(lifetime);
    }

    pub fn as_eager_singleton(self) {
        self.inner.as_eager_singleton();
    }
}

/// Constant-binding counterpart; constants are always fixed values
pub struct SpyConstantBindingBuilder<'a> {
    info: SharedBindingInfo,
    inner: ConstantBindingBuilder<'a>,
}

impl<'a> SpyConstantBindingBuilder<'a> {
    pub(crate) fn new(info: SharedBindingInfo, inner: ConstantBindingBuilder<'a>) -> Self {
        info.borrow_mut().fixed_value = true;
        Self { info, inner }
    }

    pub fn annotated_with(self, qualifier: Qualifier) -> Self {
        let Self { info, inner } = self;
        info.borrow_mut().qualifier = Some(qualifier.clone());
        Self {
            inner: inner.annotated_with(qualifier),
            info,
        }
    }

    pub fn to_str(self, value: &str) {
        self.info.borrow_mut().ty = Some(TypeRef::of::<String>());
        self.inner.to_str(value);
    }

    pub fn to_int(self, value: i64) {
        self.info.borrow_mut().ty = Some(TypeRef::of::<i64>());
        self.inner.to_int(value);
    }

    pub fn to_float(self, value: f64) {
        self.info.borrow_mut().ty = Some(TypeRef::of::<f64>());
        self.inner.to_float(value);
    }

    pub fn to_bool(self, value: bool) {
        self.info.borrow_mut().ty = Some(TypeRef::of::<bool>());
        self.inner.to_bool(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindery_core::binder::BindingRegistry;
    use bindery_core::errors::ContainerError;
    use bindery_core::factory::FactoryProvider;
    use bindery_core::injector::Injector;
    use bindery_core::metadata::{svc, AnyService};

    trait Gateway: Send + Sync {}

    #[derive(Default)]
    struct HttpGateway;
    impl Gateway for HttpGateway {}

    impl AsInterface<dyn Gateway> for HttpGateway {
        fn as_interface(self: Arc<Self>) -> Arc<dyn Gateway> {
            self
        }
    }

    fn spy<'a, T: ?Sized + Send + Sync + 'static>(
        registry: &'a mut BindingRegistry,
        info: &SharedBindingInfo,
    ) -> SpyBindingBuilder<'a, T> {
        SpyBindingBuilder::new(Rc::clone(info), registry.bind::<T>())
    }

    fn new_info<T: ?Sized + Send + Sync + 'static>() -> SharedBindingInfo {
        Rc::new(RefCell::new(BindingInfo::for_key(&Key::of::<T>())))
    }

    #[test]
    fn linked_statement_records_bound_type() {
        let mut registry = BindingRegistry::new();
        let info = new_info::<dyn Gateway>();

        spy::<dyn Gateway>(&mut registry, &info)
            .to::<HttpGateway>()
            .in_scope(Lifetime::Singleton);

        let record = info.borrow();
        assert_eq!(record.bound_type, Some(TypeRef::of::<HttpGateway>()));
        assert!(!record.fixed_value);
        assert_eq!(record.traced_type(), Some(TypeRef::of::<HttpGateway>()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn instance_statement_is_fixed_value() {
        let mut registry = BindingRegistry::new();
        let info = new_info::<dyn Gateway>();

        spy::<dyn Gateway>(&mut registry, &info)
            .to_instance(Arc::new(HttpGateway) as Arc<dyn Gateway>);

        assert!(info.borrow().fixed_value);
        assert!(registry.contains(&Key::of::<dyn Gateway>()));
    }

    #[test]
    fn opaque_provider_is_fixed_value() {
        struct CannedGateway;
        impl InstanceProvider for CannedGateway {
            fn provide(&self, _: &Injector) -> Result<AnyService, ContainerError> {
                Ok(svc(Arc::new(HttpGateway) as Arc<dyn Gateway>))
            }
        }

        let mut registry = BindingRegistry::new();
        let info = new_info::<dyn Gateway>();

        spy::<dyn Gateway>(&mut registry, &info)
            .to_provider(Arc::new(CannedGateway))
            .in_scope(Lifetime::Singleton);

        assert!(info.borrow().fixed_value);
    }

    #[test]
    fn decorating_provider_keeps_the_abstraction_traceable() {
        struct PassThrough;
        impl InstanceProvider for PassThrough {
            fn provide(&self, _: &Injector) -> Result<AnyService, ContainerError> {
                Ok(svc(Arc::new(HttpGateway) as Arc<dyn Gateway>))
            }
            fn provider_class(&self) -> ProviderClass {
                ProviderClass::Decorator
            }
        }

        let mut registry = BindingRegistry::new();
        let info = new_info::<HttpGateway>();

        spy::<HttpGateway>(&mut registry, &info)
            .to_provider(Arc::new(PassThrough))
            .in_scope(Lifetime::Singleton);

        let record = info.borrow();
        assert!(!record.fixed_value);
        assert_eq!(record.traced_type(), Some(TypeRef::of::<HttpGateway>()));
    }

    #[test]
    fn factory_provider_traces_the_produced_type() {
        let mut registry = BindingRegistry::new();
        let info = new_info::<dyn Gateway>();

        spy::<dyn Gateway>(&mut registry, &info)
            .to_provider(Arc::new(FactoryProvider::of::<HttpGateway>()))
            .in_scope(Lifetime::Singleton);

        let record = info.borrow();
        assert!(!record.fixed_value);
        assert_eq!(record.bound_type, Some(TypeRef::of::<HttpGateway>()));
    }

    #[test]
    fn qualifier_updates_both_record_and_key() {
        let mut registry = BindingRegistry::new();
        let info = new_info::<dyn Gateway>();

        spy::<dyn Gateway>(&mut registry, &info)
            .annotated_with(Qualifier::named("edge"))
            .to::<HttpGateway>();

        assert_eq!(
            info.borrow().key(),
            Some(Key::named::<dyn Gateway>("edge"))
        );
        assert!(registry.contains(&Key::named::<dyn Gateway>("edge")));
    }

    #[test]
    fn constants_record_their_value_type_on_completion() {
        let mut registry = BindingRegistry::new();
        let info: SharedBindingInfo = Rc::new(RefCell::new(BindingInfo::default()));

        SpyConstantBindingBuilder::new(Rc::clone(&info), registry.bind_constant())
            .annotated_with(Qualifier::named("retries"))
            .to_int(5);

        let record = info.borrow();
        assert!(record.fixed_value);
        assert_eq!(record.key(), Some(Key::named::<i64>("retries")));
    }
}
