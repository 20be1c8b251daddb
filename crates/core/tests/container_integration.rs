//! Explicit wiring through the binder SPI, built into an injector and
//! resolved end to end.

use std::sync::Arc;

use bindery_core::binder::{AsInterface, BindingRegistry, InstanceProvider};
use bindery_core::errors::ContainerError;
use bindery_core::factory::FactoryProvider;
use bindery_core::injector::Injector;
use bindery_core::key::Qualifier;
use bindery_core::metadata::{svc, AnyService, TypeMeta, TypeRegistry};
use bindery_core::scope::Lifetime;

trait Codec: Send + Sync {
    fn name(&self) -> &'static str;
}

struct JsonCodec;
impl Codec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }
}
impl AsInterface<dyn Codec> for JsonCodec {
    fn as_interface(self: Arc<Self>) -> Arc<dyn Codec> {
        self
    }
}

struct Document {
    codec: Arc<dyn Codec>,
}

fn registry_types() -> Arc<TypeRegistry> {
    let types = TypeRegistry::new();
    types.register(TypeMeta::interface::<dyn Codec>());
    types.register(TypeMeta::concrete::<JsonCodec>().construct(|_| Ok(JsonCodec)));
    types.register(
        TypeMeta::concrete::<Document>()
            .dependency::<dyn Codec>()
            .construct(|injector| {
                Ok(Document {
                    codec: injector.resolve::<dyn Codec>()?,
                })
            }),
    );
    Arc::new(types)
}

struct CodecProvider;
impl InstanceProvider for CodecProvider {
    fn provide(&self, _injector: &Injector) -> Result<AnyService, ContainerError> {
        Ok(svc(Arc::new(JsonCodec) as Arc<dyn Codec>))
    }
}

#[test]
fn provider_type_binding_resolves_the_provider_through_the_container() {
    let types = registry_types();
    types.register(TypeMeta::concrete::<CodecProvider>().construct(|_| Ok(CodecProvider)));

    let mut registry = BindingRegistry::new();
    registry
        .bind::<dyn Codec>()
        .to_provider_type::<CodecProvider>()
        .in_scope(Lifetime::Singleton);

    let injector = Injector::build(registry, types).unwrap();
    let first = injector.resolve::<dyn Codec>().unwrap();
    let second = injector.resolve::<dyn Codec>().unwrap();

    assert_eq!(first.name(), "json");
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn factory_provider_constructs_the_produced_type_with_its_dependencies() {
    let types = registry_types();

    let mut registry = BindingRegistry::new();
    registry
        .bind::<dyn Codec>()
        .to::<JsonCodec>()
        .in_scope(Lifetime::Singleton);
    registry
        .bind::<Document>()
        .to_provider(Arc::new(FactoryProvider::of::<Document>()))
        .in_scope(Lifetime::Singleton);

    let injector = Injector::build(registry, types).unwrap();
    let document = injector.resolve::<Document>().unwrap();
    assert_eq!(document.codec.name(), "json");
}

#[test]
fn qualified_constants_resolve_by_name() {
    let types = registry_types();

    let mut registry = BindingRegistry::new();
    registry
        .bind_constant()
        .annotated_with(Qualifier::named("retries"))
        .to_int(3);
    registry
        .bind_constant()
        .annotated_with(Qualifier::named("endpoint"))
        .to_str("localhost:5432");

    let injector = Injector::build(registry, types).unwrap();
    assert_eq!(*injector.resolve_named::<i64>("retries").unwrap(), 3);
    assert_eq!(
        *injector.resolve_named::<String>("endpoint").unwrap(),
        "localhost:5432".to_string()
    );
    assert!(injector.try_resolve::<i64>().is_none());
}

#[test]
fn interface_views_share_the_singleton_with_the_concrete_key() {
    let types = registry_types();

    let mut registry = BindingRegistry::new();
    registry.bind::<JsonCodec>().in_scope(Lifetime::Singleton);
    registry
        .bind::<dyn Codec>()
        .to::<JsonCodec>()
        .in_scope(Lifetime::Singleton);

    let injector = Injector::build(registry, types).unwrap();
    let concrete = injector.resolve::<JsonCodec>().unwrap();
    let via_interface = injector.resolve::<dyn Codec>().unwrap();

    // same underlying allocation behind both keys
    let interface_ptr = Arc::as_ptr(&via_interface) as *const JsonCodec;
    assert!(std::ptr::eq(interface_ptr, Arc::as_ptr(&concrete)));

    assert_eq!(via_interface.name(), concrete.name());
}
