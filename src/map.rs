use crate::config::{Config, IndexStrategy};
use crate::error::Error;
use crate::index::Indexer;
use crate::iter::Iter;
use crate::key::{ByteKeys, CustomKeys, KeyKind, ScalarKeys, TextKeys};
use crate::node::{drop_chain, Link, Node};
use crate::stats::{MapStats, Stats};
use std::borrow::Borrow;

/// Sequential map with `String` keys, looked up by `&str`.
pub type TextMap<V> = FixedMap<String, V, TextKeys>;
/// Sequential map with `Vec<u8>` keys, looked up by `&[u8]`.
pub type BytesMap<V> = FixedMap<Vec<u8>, V, ByteKeys>;
/// Sequential map with fixed-width scalar keys.
pub type ScalarMap<T, V> = FixedMap<T, V, ScalarKeys<T>>;

/// Fixed-capacity hash map for single-threaded use.
///
/// The bucket table is allocated once and never resized. Collisions chain
/// through singly-linked lists, and new keys are prepended to their chain.
/// Sharing one map between threads needs external exclusion (a `Mutex` or
/// `RwLock` around it); use [`SyncFixedMap`](crate::SyncFixedMap) otherwise.
///
/// A zero-capacity map is valid: it never stores anything and every lookup
/// misses.
///
/// # Example
///
/// ```rust
/// use fixedmap::TextMap;
///
/// let mut map = TextMap::with_capacity(10);
/// assert_eq!(map.set("key".to_string(), 1), None);
/// assert_eq!(map.set("key".to_string(), 2), Some(1));
/// assert_eq!(map.get("key"), Some(&2));
/// assert_eq!(map.delete("key"), Some(2));
/// assert!(map.is_empty());
/// ```
pub struct FixedMap<K, V, S> {
    table: Box<[Link<K, V>]>,
    keys: S,
    indexer: Indexer,
    len: usize,
    stats: MapStats,
}

impl<K, V, S> FixedMap<K, V, S>
where
    S: KeyKind,
    K: Borrow<S::Key>,
{
    /// Create a map with `capacity` buckets, the key kind's default hasher and
    /// modulo indexing.
    pub fn with_capacity(capacity: usize) -> Self
    where
        S: Default,
    {
        Self::with_indexer(S::default(), Indexer::modulo(capacity))
    }

    /// Create a map with `capacity` buckets, the given key kind and index strategy.
    pub fn with_keys(capacity: usize, keys: S, index: IndexStrategy) -> Result<Self, Error> {
        Ok(Self::with_indexer(keys, index.indexer(capacity)?))
    }

    /// Create a map whose table length is `indexer.len()`.
    pub fn with_indexer(keys: S, indexer: Indexer) -> Self {
        Self {
            table: std::iter::repeat_with(|| None).take(indexer.len()).collect(),
            keys,
            indexer,
            len: 0,
            stats: MapStats::new(),
        }
    }

    /// Create a map from a built configuration.
    pub fn with_config(config: Config, keys: S) -> Result<Self, Error> {
        let capacity = config.table_len();
        Self::with_keys(capacity, keys, config.index)
    }

    #[inline]
    fn bucket_index(&self, key: &S::Key) -> Option<usize> {
        if self.table.is_empty() {
            return None;
        }
        Some(self.indexer.index(self.keys.hash(key)))
    }

    /// Get a reference to the value stored for `key`.
    pub fn get(&self, key: &S::Key) -> Option<&V> {
        let index = self.bucket_index(key)?;
        let mut current = self.table[index].as_deref();
        while let Some(node) = current {
            if self.keys.equal(node.key.borrow(), key) {
                return Some(&node.value);
            }
            current = node.next.as_deref();
        }
        None
    }

    /// Get a mutable reference to the value stored for `key`.
    pub fn get_mut(&mut self, key: &S::Key) -> Option<&mut V> {
        let index = self.bucket_index(key)?;
        let keys = &self.keys;
        let mut current = self.table[index].as_deref_mut();
        while let Some(node) = current {
            if keys.equal(node.key.borrow(), key) {
                return Some(&mut node.value);
            }
            current = node.next.as_deref_mut();
        }
        None
    }

    /// Check whether `key` is present.
    pub fn contains_key(&self, key: &S::Key) -> bool {
        self.get(key).is_some()
    }

    /// Insert or overwrite. Returns the previous value if the key existed.
    ///
    /// An existing key keeps its node and only the value is replaced; a new
    /// key is prepended to its bucket chain. On a zero-capacity map this drops
    /// `key` and `value` and returns `None`.
    pub fn set(&mut self, key: K, value: V) -> Option<V> {
        let index = self.bucket_index(key.borrow())?;
        let keys = &self.keys;
        let bucket = &mut self.table[index];

        let mut current = bucket.as_deref_mut();
        while let Some(node) = current {
            if keys.equal(node.key.borrow(), key.borrow()) {
                self.stats.record_update();
                return Some(std::mem::replace(&mut node.value, value));
            }
            current = node.next.as_deref_mut();
        }

        let next = bucket.take();
        *bucket = Some(Node::new(key, value, next));
        self.len += 1;
        self.stats.record_insert();
        None
    }

    /// Remove `key`, returning its value. Missing keys are a no-op.
    pub fn delete(&mut self, key: &S::Key) -> Option<V> {
        let index = self.bucket_index(key)?;
        let keys = &self.keys;

        let mut link = &mut self.table[index];
        while link
            .as_ref()
            .is_some_and(|node| !keys.equal(node.key.borrow(), key))
        {
            link = &mut link.as_mut()?.next;
        }

        let node = link.take()?;
        let Node { value, next, .. } = *node;
        *link = next;

        self.len -= 1;
        self.stats.record_remove();
        Some(value)
    }

    /// Visit every pair in bucket order, then chain order. Returning `false`
    /// from `f` stops the walk.
    pub fn range<F>(&self, mut f: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        for (key, value) in self.iter() {
            if !f(key, value) {
                return;
            }
        }
    }

    /// Snapshot of the table's shape and the operation counters.
    pub fn stats(&self) -> Stats {
        let mut stats = Stats {
            size: self.len,
            capacity: self.cap(),
            operations: self.stats.snapshot(),
            ..Stats::default()
        };
        for bucket in self.table.iter() {
            let mut nodes = 0;
            let mut current = bucket.as_deref();
            while let Some(node) = current {
                nodes += 1;
                current = node.next.as_deref();
            }
            stats.add_chain(nodes, 0);
        }
        stats
    }
}

impl<K, V, S> FixedMap<K, V, S> {
    /// Number of keys stored.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of buckets, fixed at construction.
    pub fn cap(&self) -> usize {
        self.table.len()
    }

    /// Iterate over all pairs in the same order as [`range`](Self::range).
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(&self.table, self.len)
    }

    /// Remove every key. The bucket table is kept.
    pub fn clear(&mut self) {
        for bucket in self.table.iter_mut() {
            drop_chain(bucket.take());
        }
        self.len = 0;
    }
}

impl<K, V, Q, H, E> FixedMap<K, V, CustomKeys<Q, H, E>>
where
    Q: ?Sized,
    K: Borrow<Q>,
    H: Fn(&Q) -> u64,
    E: Fn(&Q, &Q) -> bool,
{
    /// Create a map from a hash function, an equality function and an index strategy.
    pub fn from_fns(
        capacity: usize,
        hash_fn: H,
        equal_fn: E,
        index: IndexStrategy,
    ) -> Result<Self, Error> {
        Self::with_keys(capacity, CustomKeys::new(hash_fn, equal_fn), index)
    }
}

impl<K, V, S> Default for FixedMap<K, V, S>
where
    S: KeyKind + Default,
    K: Borrow<S::Key>,
{
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl<K, V, S> Drop for FixedMap<K, V, S> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<'a, K, V, S> IntoIterator for &'a FixedMap<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V, S> std::fmt::Debug for FixedMap<K, V, S>
where
    K: std::fmt::Debug,
    V: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::KeyHasher;

    fn seeded_text(capacity: usize) -> TextMap<i32> {
        TextMap::with_keys(
            capacity,
            TextKeys::new(KeyHasher::with_seeds(1, 2, 3, 4)),
            IndexStrategy::Modulo,
        )
        .unwrap()
    }

    #[test]
    fn test_single_bucket_chain() {
        let mut map = seeded_text(1);
        map.set("a".to_string(), 1);
        map.set("b".to_string(), 2);
        map.set("c".to_string(), 3);

        // New keys go to the head of the chain.
        let keys: Vec<_> = map.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["c", "b", "a"]);

        assert_eq!(map.delete("b"), Some(2));
        let keys: Vec<_> = map.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["c", "a"]);

        assert_eq!(map.delete("c"), Some(3));
        assert_eq!(map.delete("a"), Some(1));
        assert!(map.is_empty());
        assert_eq!(map.stats().occupied_buckets, 0);
    }

    #[test]
    fn test_overwrite_keeps_len() {
        let mut map = seeded_text(4);
        map.set("key".to_string(), 1);
        assert_eq!(map.set("key".to_string(), 2), Some(1));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("key"), Some(&2));
    }

    #[test]
    fn test_get_mut() {
        let mut map = seeded_text(4);
        map.set("counter".to_string(), 0);
        *map.get_mut("counter").unwrap() += 5;
        assert_eq!(map.get("counter"), Some(&5));
        assert!(map.get_mut("missing").is_none());
    }

    #[test]
    fn test_zero_capacity_is_a_no_op() {
        let mut map: TextMap<i32> = TextMap::default();
        assert_eq!(map.cap(), 0);
        assert_eq!(map.set("key".to_string(), 1), None);
        assert_eq!(map.get("key"), None);
        assert_eq!(map.delete("key"), None);
        assert_eq!(map.len(), 0);

        let mut visited = 0;
        map.range(|_, _| {
            visited += 1;
            true
        });
        assert_eq!(visited, 0);
    }

    #[test]
    fn test_range_stops_early() {
        let mut map = seeded_text(8);
        for i in 0..10 {
            map.set(format!("key{}", i), i);
        }

        let mut visited = 0;
        map.range(|_, _| {
            visited += 1;
            visited < 3
        });
        assert_eq!(visited, 3);
    }

    #[test]
    fn test_clear() {
        let mut map = seeded_text(3);
        for i in 0..20 {
            map.set(format!("key{}", i), i);
        }
        map.clear();
        assert!(map.is_empty());
        assert_eq!(map.iter().count(), 0);
        assert_eq!(map.cap(), 3);

        map.set("again".to_string(), 1);
        assert_eq!(map.get("again"), Some(&1));
    }

    #[test]
    fn test_stats_shape() {
        let mut map = seeded_text(1);
        for i in 0..5 {
            map.set(format!("key{}", i), i);
        }
        let stats = map.stats();
        assert_eq!(stats.size, 5);
        assert_eq!(stats.capacity, 1);
        assert_eq!(stats.longest_chain, 5);
        assert_eq!(stats.tombstones, 0);
    }
}
