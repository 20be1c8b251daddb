use crate::binder::{InstanceProvider, ProviderClass};
use crate::errors::ContainerError;
use crate::injector::Injector;
use crate::key::{Key, TypeRef};
use crate::metadata::AnyService;

/// Qualifier marker for dependencies supplied by a factory at construction
/// time. Keys carrying it are never bound directly and never synthesized.
#[derive(Debug, Clone, Copy)]
pub struct Assisted;

/// Whether a key is factory-supplied
pub fn is_assisted(key: &Key) -> bool {
    matches!(&key.qualifier, Some(q) if q.is_marker::<Assisted>())
}

/// Provider backed by the factory mechanism: reports the concrete type it
/// ultimately produces so that type's dependencies stay traceable.
pub struct FactoryProvider {
    produces: TypeRef,
}

impl FactoryProvider {
    pub fn of<T: Send + Sync + 'static>() -> Self {
        Self {
            produces: TypeRef::of::<T>(),
        }
    }

    pub fn produces(&self) -> TypeRef {
        self.produces
    }
}

impl InstanceProvider for FactoryProvider {
    fn provide(&self, injector: &Injector) -> Result<AnyService, ContainerError> {
        injector.construct_raw(&self.produces)
    }

    fn provider_class(&self) -> ProviderClass {
        ProviderClass::Factory(self.produces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Qualifier;

    struct Widget;

    #[test]
    fn assisted_marker_is_detected_on_keys() {
        let assisted = Key::marked::<Widget, Assisted>();
        let named = Key::named::<Widget>("assisted");
        let plain = Key::of::<Widget>();

        assert!(is_assisted(&assisted));
        assert!(!is_assisted(&named));
        assert!(!is_assisted(&plain));
        assert!(assisted.qualifier.as_ref().unwrap().is_marker::<Assisted>());
        assert!(!Qualifier::named("assisted").is_marker::<Assisted>());
    }

    #[test]
    fn factory_provider_reports_produced_type() {
        let provider = FactoryProvider::of::<Widget>();
        match provider.provider_class() {
            ProviderClass::Factory(ty) => assert!(ty.is::<Widget>()),
            other => panic!("unexpected class: {other:?}"),
        }
    }
}
