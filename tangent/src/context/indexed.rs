//! Container types with strongly-typed indexes
use std::collections::HashMap;

/// Stores a set of `(V, K)` tuples, with lookup in both directions.
///
/// Implemented using a `Vec<V>` and a `HashMap<V, K>`.
///
/// The index type `K` should be a wrapper around a `usize` and implement
/// [`Index`]; it is generated by the [`define_index`] macro.
#[derive(Clone, Debug)]
pub(crate) struct IndexMap<V, K> {
    data: Vec<V>,
    map: HashMap<V, K>,
}

impl<V, K> Default for IndexMap<V, K> {
    fn default() -> Self {
        Self {
            data: vec![],
            map: HashMap::new(),
        }
    }
}

impl<V, K> IndexMap<V, K>
where
    V: Clone + Eq + std::hash::Hash,
    K: Index + Copy,
{
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.map.clear();
    }

    pub fn get_by_index(&self, k: K) -> Option<&V> {
        self.data.get(k.get())
    }

    /// Inserts the given value, returning the existing index if present
    pub fn insert(&mut self, v: V) -> K {
        *self.map.entry(v.clone()).or_insert_with(|| {
            let out = K::new(self.data.len());
            self.data.push(v);
            out
        })
    }
}

/// A `Vec<V>` which is indexed by a strongly-typed key
#[derive(Clone, Debug)]
pub(crate) struct IndexVec<V, K> {
    data: Vec<V>,
    _phantom: std::marker::PhantomData<fn(K)>,
}

impl<V, K> From<Vec<V>> for IndexVec<V, K> {
    fn from(data: Vec<V>) -> Self {
        Self {
            data,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<V, K: Index> std::ops::Index<K> for IndexVec<V, K> {
    type Output = V;
    fn index(&self, i: K) -> &V {
        &self.data[i.get()]
    }
}

impl<V, K: Index> std::ops::IndexMut<K> for IndexVec<V, K> {
    fn index_mut(&mut self, i: K) -> &mut V {
        &mut self.data[i.get()]
    }
}

/// Conversion to and from a raw `usize` index
pub trait Index {
    /// Builds the index from a raw value
    fn new(i: usize) -> Self;
    /// Returns the raw value
    fn get(&self) -> usize;
}

/// Defines an index type suitable for use in an [`IndexMap`] or [`IndexVec`]
macro_rules! define_index {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
        pub struct $name(usize);
        impl $crate::context::indexed::Index for $name {
            fn new(i: usize) -> Self {
                Self(i)
            }
            fn get(&self) -> usize {
                self.0
            }
        }
    };
}
pub(crate) use define_index;

#[cfg(test)]
mod test {
    use super::*;

    define_index!(Key, "Test key");

    #[test]
    fn insert_dedup() {
        let mut m: IndexMap<&str, Key> = IndexMap::default();
        let a = m.insert("a");
        let b = m.insert("b");
        assert_ne!(a, b);
        assert_eq!(m.insert("a"), a);
        assert_eq!(m.len(), 2);
        assert_eq!(m.get_by_index(b), Some(&"b"));
    }

    #[test]
    fn clear_resets_indexes() {
        let mut m: IndexMap<&str, Key> = IndexMap::default();
        m.insert("a");
        let b = m.insert("b");
        m.clear();
        assert!(m.is_empty());
        assert!(m.get_by_index(b).is_none());
        assert_eq!(m.insert("b"), Key::new(0));
    }
}
