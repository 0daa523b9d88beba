use ahash::RandomState;
use core_types::{ContentKey, SlotId};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

/// Slot <-> content key mapping used by the related-content index.
pub type LabelMap = BiMap<SlotId, ContentKey>;

/// One-to-one map between keys and values.
///
/// Inserting a pair that collides with an existing key or value evicts the
/// stale complementary entry first, so no key ever maps to two values and no
/// value to two keys. Both directions always hold the same number of entries.
#[derive(Debug, Clone)]
pub struct BiMap<K, V> {
    forward: HashMap<K, V, RandomState>,
    backward: HashMap<V, K, RandomState>,
}

impl<K, V> Default for BiMap<K, V> {
    fn default() -> Self {
        Self {
            forward: HashMap::default(),
            backward: HashMap::default(),
        }
    }
}

impl<K, V> BiMap<K, V>
where
    K: Hash + Eq + Clone,
    V: Hash + Eq + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from pairs, applying them in order with [`BiMap::insert`] semantics.
    pub fn from_entries(entries: impl IntoIterator<Item = (K, V)>) -> Self {
        let mut map = Self::new();
        for (k, v) in entries {
            map.insert(k, v);
        }
        map
    }

    /// Establish `key <-> value`, evicting any pair that used either side.
    pub fn insert(&mut self, key: K, value: V) {
        if let Some(old_value) = self.forward.remove(&key) {
            self.backward.remove(&old_value);
        }
        if let Some(old_key) = self.backward.remove(&value) {
            self.forward.remove(&old_key);
        }
        self.forward.insert(key.clone(), value.clone());
        self.backward.insert(value, key);
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.forward.get(key)
    }

    /// Reverse lookup.
    pub fn get_by_value<Q>(&self, value: &Q) -> Option<&K>
    where
        V: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.backward.get(value)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.forward.contains_key(key)
    }

    pub fn contains_value<Q>(&self, value: &Q) -> bool
    where
        V: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.backward.contains_key(value)
    }

    /// Remove the pair keyed by `key`; returns whether anything was removed.
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.forward.remove(key) {
            Some(value) => {
                self.backward.remove(&value);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Pairs in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.forward.iter()
    }
}
