use std::collections::HashMap;
use std::sync::RwLock;

use crate::errors::ContainerError;
use crate::key::Key;
use crate::metadata::AnyService;

/// Binding lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    /// New value produced for each request
    Transient,
    /// Single shared value, produced on first request
    Singleton,
    /// Single shared value, produced when the injector is built
    Eager,
}

impl Lifetime {
    pub fn is_singleton(&self) -> bool {
        matches!(self, Lifetime::Singleton | Lifetime::Eager)
    }

    pub fn is_eager(&self) -> bool {
        matches!(self, Lifetime::Eager)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Lifetime::Transient => "transient",
            Lifetime::Singleton => "singleton",
            Lifetime::Eager => "eager-singleton",
        }
    }
}

impl Default for Lifetime {
    fn default() -> Self {
        Lifetime::Transient
    }
}

impl std::fmt::Display for Lifetime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Lifetime {
    type Err = ContainerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "transient" => Ok(Lifetime::Transient),
            "singleton" => Ok(Lifetime::Singleton),
            "eager-singleton" | "eager" => Ok(Lifetime::Eager),
            _ => Err(ContainerError::InvalidLifetime {
                lifetime: s.to_string(),
            }),
        }
    }
}

/// Storage for singleton and eager-singleton values, keyed by binding key.
///
/// Keys rather than bare type ids, because qualified bindings of the same
/// type are distinct singletons.
#[derive(Debug)]
pub struct SingletonStore {
    store_id: uuid::Uuid,
    entries: RwLock<HashMap<Key, AnyService>>,
}

impl SingletonStore {
    pub fn new() -> Self {
        Self {
            store_id: uuid::Uuid::new_v4(),
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn store_id(&self) -> uuid::Uuid {
        self.store_id
    }

    pub fn get(&self, key: &Key) -> Result<Option<AnyService>, ContainerError> {
        let entries = self.entries.read().map_err(|_| ContainerError::LockError {
            resource: "singleton_store".to_string(),
        })?;
        Ok(entries.get(key).cloned())
    }

    /// Insert a value, keeping the existing one if a concurrent construction
    /// got there first. Returns the value that ended up stored.
    pub fn insert(&self, key: Key, value: AnyService) -> Result<AnyService, ContainerError> {
        let mut entries = self.entries.write().map_err(|_| ContainerError::LockError {
            resource: "singleton_store".to_string(),
        })?;
        Ok(entries.entry(key).or_insert(value).clone())
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.entries
            .read()
            .map(|entries| entries.contains_key(key))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SingletonStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::svc;
    use std::sync::Arc;

    #[test]
    fn lifetime_round_trips_through_strings() {
        assert_eq!("singleton".parse::<Lifetime>().unwrap(), Lifetime::Singleton);
        assert_eq!("transient".parse::<Lifetime>().unwrap(), Lifetime::Transient);
        assert_eq!("eager".parse::<Lifetime>().unwrap(), Lifetime::Eager);
        assert_eq!(
            "eager-singleton".parse::<Lifetime>().unwrap(),
            Lifetime::Eager
        );
        assert!("forever".parse::<Lifetime>().is_err());

        assert_eq!(format!("{}", Lifetime::Eager), "eager-singleton");
    }

    #[test]
    fn store_keeps_first_inserted_value() {
        let store = SingletonStore::new();
        let key = Key::of::<String>();

        let first = store
            .insert(key.clone(), svc(Arc::new("first".to_string())))
            .unwrap();
        let second = store
            .insert(key.clone(), svc(Arc::new("second".to_string())))
            .unwrap();

        let first = first.downcast_ref::<Arc<String>>().unwrap().clone();
        let second = second.downcast_ref::<Arc<String>>().unwrap().clone();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn qualified_keys_are_distinct_entries() {
        let store = SingletonStore::new();
        store
            .insert(Key::of::<u32>(), svc(Arc::new(1u32)))
            .unwrap();
        store
            .insert(Key::named::<u32>("other"), svc(Arc::new(2u32)))
            .unwrap();

        assert_eq!(store.len(), 2);
        assert!(store.contains(&Key::named::<u32>("other")));
        assert!(!store.contains(&Key::named::<u32>("missing")));
    }
}
