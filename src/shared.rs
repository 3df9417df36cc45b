use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;

/// A map that many threads may write into at once.
///
/// Every mutation goes through one mutex, so concurrent writers never lose an
/// update even when they touch disjoint keys.
#[derive(Debug, Default)]
pub struct SharedMap<K, V> {
    inner: Mutex<HashMap<K, V>>,
}

impl<K, V> SharedMap<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(HashMap::with_capacity(capacity)),
        }
    }

    /// Insert or replace the value for `key`, returning the previous value.
    pub fn set(&self, key: K, value: V) -> Option<V> {
        self.inner.lock().insert(key, value)
    }

    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.inner.lock().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Take the map out once no writer is left.
    pub fn into_inner(self) -> HashMap<K, V> {
        self.inner.into_inner()
    }
}
