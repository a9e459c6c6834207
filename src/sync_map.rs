use crate::config::{Config, IndexStrategy};
use crate::error::Error;
use crate::index::Indexer;
use crate::iter::SnapshotIter;
use crate::key::{ByteKeys, CustomKeys, KeyKind, ScalarKeys, TextKeys};
use crate::node::{drop_sync_chain, empty_link, load_node, Next, SyncLink, SyncNode, ValueCell};
use crate::stats::{MapStats, Stats};
use crossbeam_utils::CachePadded;
use std::borrow::Borrow;
use std::sync::atomic::{AtomicIsize, Ordering};
use std::sync::Arc;

/// Concurrent map with `String` keys, looked up by `&str`.
pub type SyncTextMap<V> = SyncFixedMap<String, V, TextKeys>;
/// Concurrent map with `Vec<u8>` keys, looked up by `&[u8]`.
pub type SyncBytesMap<V> = SyncFixedMap<Vec<u8>, V, ByteKeys>;
/// Concurrent map with fixed-width scalar keys.
pub type SyncScalarMap<T, V> = SyncFixedMap<T, V, ScalarKeys<T>>;

/// Outcome of trying to overwrite a live key.
enum Slot<K, V> {
    Replaced(Arc<V>),
    Lost,
    /// No live node for the key under this head link.
    Vacant(Arc<Next<K, V>>),
}

/// Fixed-capacity lock-free hash map.
///
/// Every bucket is an atomically-managed chain. Nodes carry an immutable key
/// and an atomically swapped value cell; a delete swaps in a tombstone cell
/// first, then freezes the node's `next` link and sweeps frozen nodes out of
/// the bucket, so a finished delete leaves nothing reachable. All
/// mutations are single-word compare-and-swaps on a bucket head, a `next`
/// link or a value cell. A lost CAS restarts the operation from its first
/// load, so no operation blocks and none reports contention to the caller.
///
/// Nodes and cells are reference counted, so a node loaded by one thread
/// stays valid after another thread unlinks it.
///
/// Values are stored behind `Arc<V>`; reads hand out clones of that `Arc`.
///
/// # Example
///
/// ```rust
/// use fixedmap::SyncTextMap;
/// use std::sync::Arc;
/// use std::thread;
///
/// let map = Arc::new(SyncTextMap::with_capacity(64));
/// let handles: Vec<_> = (0..4)
///     .map(|t| {
///         let map = Arc::clone(&map);
///         thread::spawn(move || {
///             for i in 0..100 {
///                 map.set(format!("t{}_{}", t, i), i);
///             }
///         })
///     })
///     .collect();
/// for handle in handles {
///     handle.join().unwrap();
/// }
/// assert_eq!(map.len(), 400);
/// assert_eq!(*map.get("t3_99").unwrap(), 99);
/// ```
pub struct SyncFixedMap<K, V, S> {
    table: Box<[SyncLink<K, V>]>,
    keys: S,
    indexer: Indexer,
    len: CachePadded<AtomicIsize>,
    stats: MapStats,
}

impl<K, V, S> SyncFixedMap<K, V, S>
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
            table: std::iter::repeat_with(empty_link)
                .take(indexer.len())
                .collect(),
            keys,
            indexer,
            len: CachePadded::new(AtomicIsize::new(0)),
            stats: MapStats::new(),
        }
    }

    /// Create a map from a built configuration.
    pub fn with_config(config: Config, keys: S) -> Result<Self, Error> {
        let capacity = config.table_len();
        Self::with_keys(capacity, keys, config.index)
    }

    #[inline]
    fn bucket(&self, key: &S::Key) -> Option<&SyncLink<K, V>> {
        if self.table.is_empty() {
            return None;
        }
        Some(&self.table[self.indexer.index(self.keys.hash(key))])
    }

    /// First node from `head` on whose key matches.
    fn locate(
        &self,
        head: Option<Arc<SyncNode<K, V>>>,
        key: &S::Key,
    ) -> Option<Arc<SyncNode<K, V>>> {
        let mut current = head;
        while let Some(node) = current {
            if self.keys.equal(node.key.borrow(), key) {
                return Some(node);
            }
            current = load_node(&node.next);
        }
        None
    }

    /// Get the value stored for `key`.
    ///
    /// Only the first node matching `key` is consulted. A fresh node for a key
    /// is always linked in front of any older tombstoned one, so a tombstone
    /// found first means the key is absent.
    pub fn get(&self, key: &S::Key) -> Option<Arc<V>> {
        let bucket = self.bucket(key)?;
        let node = self.locate(load_node(bucket), key)?;
        let cell = node.cell.load();
        if cell.deleted {
            return None;
        }
        Some(Arc::clone(&cell.value))
    }

    /// Check whether `key` is present.
    pub fn contains_key(&self, key: &S::Key) -> bool {
        self.get(key).is_some()
    }

    /// Insert or replace. Returns the previous value if the key was live.
    ///
    /// A live key gets a new value cell; an absent or tombstoned key gets a
    /// new node at the head of its bucket. Only the latter changes `len()`.
    /// On a zero-capacity map this drops `key` and `value` and returns `None`.
    pub fn set(&self, key: K, value: V) -> Option<Arc<V>> {
        let bucket = self.bucket(key.borrow())?;
        let value = Arc::new(value);
        let mut retries = 0;

        // The node is only built once the key is known to be vacant, and is
        // reused for every later insert attempt.
        let (fresh, mut head) = loop {
            match self.replace(bucket, key.borrow(), &value) {
                Slot::Replaced(previous) => return Some(previous),
                Slot::Lost => self.contended("set", &mut retries),
                Slot::Vacant(head) => break (SyncNode::new(key, Arc::clone(&value)), head),
            }
        };

        loop {
            fresh.next.store(Next::to(head.node.clone()));
            let seen = bucket.compare_and_swap(&head, Next::to(Some(Arc::clone(&fresh))));
            if Arc::ptr_eq(&*seen, &head) {
                self.len.fetch_add(1, Ordering::AcqRel);
                self.stats.record_insert();
                return None;
            }
            self.contended("set", &mut retries);

            head = loop {
                match self.replace(bucket, fresh.key.borrow(), &value) {
                    Slot::Replaced(previous) => return Some(previous),
                    Slot::Lost => self.contended("set", &mut retries),
                    Slot::Vacant(head) => break head,
                }
            };
        }
    }

    /// Swap a new cell into the first live node for `key`, if there is one.
    fn replace(&self, bucket: &SyncLink<K, V>, key: &S::Key, value: &Arc<V>) -> Slot<K, V> {
        let head = bucket.load_full();
        let Some(node) = self.locate(head.node.clone(), key) else {
            return Slot::Vacant(head);
        };
        let current = node.cell.load_full();
        if current.deleted {
            return Slot::Vacant(head);
        }

        let seen = node
            .cell
            .compare_and_swap(&current, ValueCell::live(Arc::clone(value)));
        if !Arc::ptr_eq(&*seen, &current) {
            return Slot::Lost;
        }
        self.stats.record_update();
        Slot::Replaced(Arc::clone(&current.value))
    }

    /// Remove `key`, returning its value if it was live.
    ///
    /// The node is tombstoned first, which is the point the key disappears
    /// and the only step that can be retried. Its `next` link is then frozen
    /// and the bucket swept, so the node is unlinked before this returns.
    pub fn delete(&self, key: &S::Key) -> Option<Arc<V>> {
        let bucket = self.bucket(key)?;
        let mut retries = 0;

        loop {
            let node = self.locate(load_node(bucket), key)?;
            let current = node.cell.load_full();
            if current.deleted {
                return None;
            }

            let seen = node
                .cell
                .compare_and_swap(&current, ValueCell::tombstone(Arc::clone(&current.value)));
            if !Arc::ptr_eq(&*seen, &current) {
                self.contended("delete", &mut retries);
                continue;
            }

            self.len.fetch_sub(1, Ordering::AcqRel);
            self.stats.record_remove();
            node.freeze();
            self.sweep(bucket);
            return Some(Arc::clone(&current.value));
        }
    }

    /// Unlink every node with a frozen `next` from `bucket`.
    ///
    /// A predecessor link is only replaced while it is unfrozen and still
    /// points at the node, so an unlink can never land on a node that has
    /// itself been removed. Any lost CAS restarts the walk from the head.
    /// Frozen nodes left by other deletes are removed too.
    fn sweep(&self, bucket: &SyncLink<K, V>) {
        let mut retries = 0;

        'restart: loop {
            let mut prev: Option<Arc<SyncNode<K, V>>> = None;
            let mut link = bucket.load_full();

            while let Some(node) = link.node.clone() {
                let next = node.next.load_full();
                if !next.frozen {
                    prev = Some(node);
                    link = next;
                    continue;
                }

                let pred = match &prev {
                    Some(prev) => &prev.next,
                    None => bucket,
                };
                let replacement = Next::to(next.node.clone());
                let seen = pred.compare_and_swap(&link, Arc::clone(&replacement));
                if !Arc::ptr_eq(&*seen, &link) {
                    self.stats.record_unlink_miss();
                    self.contended("sweep", &mut retries);
                    continue 'restart;
                }
                link = replacement;
            }
            return;
        }
    }

    #[inline]
    fn contended(&self, op: &'static str, retries: &mut u32) {
        *retries += 1;
        self.stats.record_cas_retry();
        #[cfg(feature = "tracing")]
        tracing::trace!(op, retries = *retries, "CAS lost a race, retrying");
        #[cfg(not(feature = "tracing"))]
        let _ = op;
    }

    /// Snapshot of the table's shape and the operation counters.
    pub fn stats(&self) -> Stats {
        let mut stats = Stats {
            size: self.len(),
            capacity: self.cap(),
            operations: self.stats.snapshot(),
            ..Stats::default()
        };
        for bucket in self.table.iter() {
            let mut nodes = 0;
            let mut tombstones = 0;
            let mut current = load_node(bucket);
            while let Some(node) = current {
                nodes += 1;
                if node.is_deleted() {
                    tombstones += 1;
                }
                current = load_node(&node.next);
            }
            stats.add_chain(nodes, tombstones);
        }
        stats
    }
}

impl<K, V, S> SyncFixedMap<K, V, S> {
    /// Number of live keys.
    ///
    /// Under concurrent mutation this may briefly lag behind; it is exact
    /// once in-flight operations have finished.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire).max(0) as usize
    }

    /// Check if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of buckets, fixed at construction.
    pub fn cap(&self) -> usize {
        self.table.len()
    }

    /// Walk every live node, stopping when `f` returns `false`.
    fn walk<F>(&self, mut f: F)
    where
        F: FnMut(&Arc<SyncNode<K, V>>, &Arc<ValueCell<V>>) -> bool,
    {
        for bucket in self.table.iter() {
            let mut current = load_node(bucket);
            while let Some(node) = current {
                let cell = node.cell.load_full();
                if !cell.deleted && !f(&node, &cell) {
                    return;
                }
                current = load_node(&node.next);
            }
        }
    }

    /// Visit every live pair. Returning `false` from `f` stops the walk.
    ///
    /// Each visited value was current at some instant during the walk. Keys
    /// set or deleted concurrently may or may not be seen.
    pub fn range<F>(&self, mut f: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        self.walk(|node, cell| f(&node.key, &*cell.value));
    }

    /// Collect the live pairs into an owned iterator.
    ///
    /// # Example
    ///
    /// ```rust
    /// use fixedmap::SyncTextMap;
    ///
    /// let map = SyncTextMap::with_capacity(8);
    /// map.set("key1".to_string(), 1);
    /// map.set("key2".to_string(), 2);
    ///
    /// let mut entries: Vec<_> = map.iter_snapshot().map(|(k, v)| (k, *v)).collect();
    /// entries.sort();
    /// assert_eq!(entries, vec![("key1".to_string(), 1), ("key2".to_string(), 2)]);
    /// ```
    pub fn iter_snapshot(&self) -> SnapshotIter<K, V>
    where
        K: Clone,
    {
        let mut entries = Vec::with_capacity(self.len());
        self.walk(|node, cell| {
            entries.push((node.key.clone(), Arc::clone(&cell.value)));
            true
        });
        SnapshotIter::new(entries)
    }
}

impl<K, V, Q, H, E> SyncFixedMap<K, V, CustomKeys<Q, H, E>>
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

impl<K, V, S> Default for SyncFixedMap<K, V, S>
where
    S: KeyKind + Default,
    K: Borrow<S::Key>,
{
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl<K, V, S> Drop for SyncFixedMap<K, V, S> {
    fn drop(&mut self) {
        for bucket in self.table.iter() {
            drop_sync_chain(bucket);
        }
    }
}

impl<K, V, S> std::fmt::Debug for SyncFixedMap<K, V, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncFixedMap")
            .field("len", &self.len())
            .field("cap", &self.cap())
            .field("indexer", &self.indexer)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::KeyHasher;
    use std::collections::HashSet;
    use std::thread;

    fn single_bucket() -> SyncTextMap<i32> {
        SyncTextMap::with_keys(
            1,
            TextKeys::new(KeyHasher::with_seeds(1, 2, 3, 4)),
            IndexStrategy::Modulo,
        )
        .unwrap()
    }

    /// Keys of every reachable node in bucket 0, head first, with their deleted flag.
    fn chain(map: &SyncTextMap<i32>) -> Vec<(String, bool)> {
        let mut out = Vec::new();
        let mut current = load_node(&map.table[0]);
        while let Some(node) = current {
            out.push((node.key.clone(), node.is_deleted()));
            current = load_node(&node.next);
        }
        out
    }

    #[test]
    fn test_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SyncTextMap<i32>>();
        assert_send_sync::<SyncBytesMap<String>>();
        assert_send_sync::<SyncScalarMap<u64, Vec<u8>>>();
    }

    #[test]
    fn test_inserts_at_head_and_unlinks() {
        let map = single_bucket();
        map.set("a".to_string(), 1);
        map.set("b".to_string(), 2);
        map.set("c".to_string(), 3);
        assert_eq!(
            chain(&map),
            vec![
                ("c".to_string(), false),
                ("b".to_string(), false),
                ("a".to_string(), false)
            ]
        );

        // Middle node goes through its predecessor, head through the bucket.
        assert_eq!(*map.delete("b").unwrap(), 2);
        assert_eq!(*map.delete("c").unwrap(), 3);
        assert_eq!(chain(&map), vec![("a".to_string(), false)]);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_tombstone_found_first_hides_key() {
        let map = single_bucket();
        map.set("key".to_string(), 1);
        map.set("other".to_string(), 2);

        // Tombstone without freezing or sweeping, as a delete caught between
        // its tombstone CAS and its sweep would leave it.
        let node = map.locate(load_node(&map.table[0]), "key").unwrap();
        node.cell.store(ValueCell::tombstone(Arc::new(1)));
        map.len.fetch_sub(1, Ordering::AcqRel);

        assert!(map.get("key").is_none());
        assert!(map.delete("key").is_none());
        assert_eq!(map.stats().tombstones, 1);

        // Re-insert shadows the tombstone from the head.
        assert!(map.set("key".to_string(), 3).is_none());
        assert_eq!(*map.get("key").unwrap(), 3);
        assert_eq!(map.len(), 2);
        assert_eq!(
            chain(&map),
            vec![
                ("key".to_string(), false),
                ("other".to_string(), false),
                ("key".to_string(), true)
            ]
        );

        let mut seen = Vec::new();
        map.range(|k, v| {
            seen.push((k.clone(), *v));
            true
        });
        seen.sort();
        assert_eq!(seen, vec![("key".to_string(), 3), ("other".to_string(), 2)]);
    }

    #[test]
    fn test_sweep_unlinks_every_frozen_node() {
        let map = single_bucket();
        for (i, key) in ["a", "b", "c", "d"].iter().enumerate() {
            map.set(key.to_string(), i as i32);
        }

        // Two deletes that froze their nodes but never got to sweep.
        for key in ["d", "b"] {
            let node = map.locate(load_node(&map.table[0]), key).unwrap();
            node.cell.store(ValueCell::tombstone(Arc::new(0)));
            node.freeze();
        }
        assert_eq!(map.stats().tombstones, 2);

        map.sweep(&map.table[0]);
        assert_eq!(
            chain(&map),
            vec![("c".to_string(), false), ("a".to_string(), false)]
        );
        assert_eq!(map.stats().tombstones, 0);
    }

    #[test]
    fn test_removed_node_cannot_take_unlinks() {
        let map = single_bucket();
        for key in ["a", "b", "c"] {
            map.set(key.to_string(), 0);
        }
        // c -> b -> a; c is removed first, then b is deleted.
        let c = map.locate(load_node(&map.table[0]), "c").unwrap();
        let stale = c.next.load_full();
        assert_eq!(*map.delete("c").unwrap(), 0);

        // An unlink through the removed node must fail instead of landing
        // on a link nothing reaches any more.
        let seen = c.next.compare_and_swap(&stale, Next::to(None));
        assert!(!Arc::ptr_eq(&*seen, &stale));

        assert_eq!(*map.delete("b").unwrap(), 0);
        assert_eq!(chain(&map), vec![("a".to_string(), false)]);
    }

    #[test]
    fn test_no_duplicate_live_nodes_under_contention() {
        let map = Arc::new(single_bucket());
        let keys = ["a", "b", "c", "d"];

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let map = Arc::clone(&map);
                thread::spawn(move || {
                    for i in 0..2_000 {
                        let key = keys[(i + t) % keys.len()];
                        if (i + t) % 3 == 0 {
                            map.delete(key);
                        } else {
                            map.set(key.to_string(), i as i32);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let live: Vec<_> = chain(&map)
            .into_iter()
            .filter(|(_, deleted)| !deleted)
            .map(|(key, _)| key)
            .collect();
        let unique: HashSet<_> = live.iter().cloned().collect();
        assert_eq!(live.len(), unique.len(), "a key has two live nodes");
        assert_eq!(map.len(), live.len());
        assert_eq!(map.stats().tombstones, 0, "a finished delete left its node linked");

        // The first node for each key decides visibility.
        for key in keys {
            let first = chain(&map).into_iter().find(|(k, _)| k == key);
            let visible = map.get(key).is_some();
            assert_eq!(first.map(|(_, deleted)| !deleted).unwrap_or(false), visible);
        }
    }

    #[test]
    fn test_zero_capacity_is_a_no_op() {
        let map: SyncTextMap<i32> = SyncTextMap::default();
        assert!(map.set("key".to_string(), 1).is_none());
        assert!(map.get("key").is_none());
        assert!(map.delete("key").is_none());
        assert_eq!(map.len(), 0);
        assert_eq!(map.cap(), 0);
        assert_eq!(map.iter_snapshot().count(), 0);
    }
}
