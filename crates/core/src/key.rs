use std::any::TypeId;
use std::fmt;

/// Lightweight handle on a Rust type: its `TypeId` plus the human-readable name.
///
/// Trait-object types are first-class (`TypeRef::of::<dyn Repository>()`), which
/// is what makes abstract dependencies expressible at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeRef {
    pub id: TypeId,
    pub name: &'static str,
}

impl TypeRef {
    /// Capture a type reference
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Check whether this reference denotes `T`
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Qualifier distinguishing multiple bindings of the same type.
///
/// `Named` qualifiers compare by value; `Marker` qualifiers compare by the
/// identity of the marker type. This mirrors the injector's own lookup rules,
/// so a completion layer using `Key` as a set element agrees with the
/// container about which dependencies are the same.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Qualifier {
    Named(String),
    Marker(TypeRef),
}

impl Qualifier {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn marker<M: ?Sized + 'static>() -> Self {
        Self::Marker(TypeRef::of::<M>())
    }

    pub fn is_marker<M: ?Sized + 'static>(&self) -> bool {
        matches!(self, Self::Marker(ty) if ty.is::<M>())
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Qualifier::Named(name) => write!(f, "named \"{}\"", name),
            Qualifier::Marker(ty) => write!(f, "marked {}", ty),
        }
    }
}

/// Canonical identity of a requested dependency: type plus optional qualifier.
///
/// Keys are immutable and used as set/map entries throughout the container.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key {
    pub ty: TypeRef,
    pub qualifier: Option<Qualifier>,
}

impl Key {
    /// Key for a bare type
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            ty: TypeRef::of::<T>(),
            qualifier: None,
        }
    }

    /// Key for a type with a named qualifier
    pub fn named<T: ?Sized + 'static>(name: impl Into<String>) -> Self {
        Self {
            ty: TypeRef::of::<T>(),
            qualifier: Some(Qualifier::named(name)),
        }
    }

    /// Key for a type with a marker qualifier
    pub fn marked<T: ?Sized + 'static, M: ?Sized + 'static>() -> Self {
        Self {
            ty: TypeRef::of::<T>(),
            qualifier: Some(Qualifier::marker::<M>()),
        }
    }

    /// Key for an already-captured type reference
    pub fn from_type(ty: TypeRef) -> Self {
        Self {
            ty,
            qualifier: None,
        }
    }

    /// Rewrap this key under another type, preserving the qualifier.
    ///
    /// Used when a deferred-provider key is normalized to the key of the
    /// value the provider supplies.
    pub fn with_type(&self, ty: TypeRef) -> Self {
        Self {
            ty,
            qualifier: self.qualifier.clone(),
        }
    }

    /// Attach a qualifier to this key
    pub fn with_qualifier(&self, qualifier: Qualifier) -> Self {
        Self {
            ty: self.ty,
            qualifier: Some(qualifier),
        }
    }

    pub fn type_id(&self) -> std::any::TypeId {
        self.ty.id
    }

    pub fn type_name(&self) -> &'static str {
        self.ty.name
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(q) => write!(f, "{} ({})", self.ty, q),
            None => write!(f, "{}", self.ty),
        }
    }
}
