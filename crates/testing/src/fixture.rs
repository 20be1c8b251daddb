//! Scanned shape of a test class.
//!
//! A test runner (or a derive macro) describes the fixture once: its
//! lifecycle hooks and their parameter keys, nested auto-registered types,
//! the fixture instance's own injection points, and the parent fixture it
//! extends. The completion engine consumes this description to collect its
//! root dependency needs.

use bindery_core::key::{Key, TypeRef};
use bindery_core::metadata::InjectionPoint;

/// Lifecycle hook classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    Test,
    Setup,
    Teardown,
}

/// One lifecycle hook and the keys its parameters request
#[derive(Debug, Clone)]
pub struct HookMeta {
    pub kind: HookKind,
    pub name: &'static str,
    pub params: Vec<Key>,
}

/// Marker on a nested fixture type controlling how it is auto-registered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestMarker {
    Singleton,
    EagerSingleton,
    MockSingleton,
}

/// A nested type declared inside the fixture
#[derive(Debug, Clone)]
pub struct NestedType {
    pub ty: TypeRef,
    pub marker: TestMarker,
}

/// Broadcast marker: hook parameters qualified with it are supplied by the
/// test runner itself and are never synthesized.
#[derive(Debug, Clone, Copy)]
pub struct All;

/// Description of a test class, including the chain of parents it extends
#[derive(Debug, Clone, Default)]
pub struct FixtureMeta {
    name: &'static str,
    parent: Option<Box<FixtureMeta>>,
    nested: Vec<NestedType>,
    hooks: Vec<HookMeta>,
    injection_points: Vec<InjectionPoint>,
}

impl FixtureMeta {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Declare the fixture this one extends
    pub fn extends(mut self, parent: FixtureMeta) -> Self {
        self.parent = Some(Box::new(parent));
        self
    }

    /// Declare a nested auto-registered type
    pub fn nested<T: ?Sized + 'static>(mut self, marker: TestMarker) -> Self {
        self.nested.push(NestedType {
            ty: TypeRef::of::<T>(),
            marker,
        });
        self
    }

    /// Declare a lifecycle hook with its parameter keys
    pub fn hook(mut self, kind: HookKind, name: &'static str, params: Vec<Key>) -> Self {
        self.hooks.push(HookMeta { kind, name, params });
        self
    }

    /// Declare a required injection point on the fixture instance
    pub fn inject<T: ?Sized + 'static>(mut self) -> Self {
        self.injection_points
            .push(InjectionPoint::required(Key::of::<T>()));
        self
    }

    /// Declare an optional injection point on the fixture instance
    pub fn inject_optional<T: ?Sized + 'static>(mut self) -> Self {
        self.injection_points
            .push(InjectionPoint::optional(Key::of::<T>()));
        self
    }

    /// Declare an injection point with an explicit key
    pub fn inject_point(mut self, point: InjectionPoint) -> Self {
        self.injection_points.push(point);
        self
    }

    pub fn nested_types(&self) -> &[NestedType] {
        &self.nested
    }

    pub fn hooks(&self) -> &[HookMeta] {
        &self.hooks
    }

    pub fn injection_points(&self) -> &[InjectionPoint] {
        &self.injection_points
    }

    /// This fixture followed by its ancestors, nearest first
    pub fn ancestry(&self) -> impl Iterator<Item = &FixtureMeta> {
        std::iter::successors(Some(self), |fixture| {
            fixture.parent.as_deref()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Database;
    struct Cache;

    #[test]
    fn ancestry_walks_nearest_first() {
        let base = FixtureMeta::new("BaseFixture").nested::<Database>(TestMarker::Singleton);
        let fixture = FixtureMeta::new("CacheFixture")
            .nested::<Cache>(TestMarker::MockSingleton)
            .extends(base);

        let names: Vec<&str> = fixture.ancestry().map(|f| f.name()).collect();
        assert_eq!(names, vec!["CacheFixture", "BaseFixture"]);

        let nested: Vec<TestMarker> = fixture
            .ancestry()
            .flat_map(|f| f.nested_types().iter().map(|n| n.marker))
            .collect();
        assert_eq!(nested, vec![TestMarker::MockSingleton, TestMarker::Singleton]);
    }

    #[test]
    fn hooks_record_kind_and_params() {
        let fixture = FixtureMeta::new("HookFixture")
            .hook(HookKind::Setup, "prepare", vec![Key::of::<Database>()])
            .hook(HookKind::Test, "reads_from_cache", vec![Key::of::<Cache>()]);

        assert_eq!(fixture.hooks().len(), 2);
        assert_eq!(fixture.hooks()[0].kind, HookKind::Setup);
        assert_eq!(fixture.hooks()[0].params, vec![Key::of::<Database>()]);
        assert_eq!(fixture.hooks()[1].name, "reads_from_cache");
    }

    #[test]
    fn injection_points_keep_optionality() {
        let fixture = FixtureMeta::new("InjectFixture")
            .inject::<Database>()
            .inject_optional::<Cache>();

        assert!(!fixture.injection_points()[0].optional);
        assert!(fixture.injection_points()[1].optional);
    }
}
