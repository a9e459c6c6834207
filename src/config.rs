use crate::error::Error;
use crate::hash::{HashFunction, KeyHasher};
use crate::index::{closest_power_of_two, IndexCalculator, Indexer};
use crate::key::KeyKind;
use crate::map::FixedMap;
use crate::sync_map::SyncFixedMap;
use std::borrow::Borrow;

/// How a table maps digests to bucket indexes. Fixed when the table is built.
#[derive(Default)]
pub enum IndexStrategy {
    /// `digest % capacity` (default).
    #[default]
    Modulo,
    /// Mask when the capacity is a power of two, modulo otherwise.
    Auto,
    /// `digest & (capacity - 1)`. Building fails unless the capacity is a power of two.
    Mask,
    /// User-provided calculator.
    Custom(Box<dyn IndexCalculator>),
}

impl IndexStrategy {
    pub(crate) fn indexer(self, capacity: usize) -> Result<Indexer, Error> {
        match self {
            IndexStrategy::Modulo => Ok(Indexer::modulo(capacity)),
            IndexStrategy::Auto => Ok(Indexer::for_len(capacity)),
            IndexStrategy::Mask => Indexer::mask(capacity),
            IndexStrategy::Custom(calculator) => Ok(Indexer::custom(capacity, calculator)),
        }
    }
}

impl std::fmt::Debug for IndexStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexStrategy::Modulo => write!(f, "IndexStrategy::Modulo"),
            IndexStrategy::Auto => write!(f, "IndexStrategy::Auto"),
            IndexStrategy::Mask => write!(f, "IndexStrategy::Mask"),
            IndexStrategy::Custom(_) => write!(f, "IndexStrategy::Custom(...)"),
        }
    }
}

/// Configuration for a fixed map.
#[derive(Debug, Default)]
pub struct Config {
    pub(crate) capacity: usize,
    pub(crate) round_to_power_of_two: bool,
    pub(crate) hash_function: HashFunction,
    pub(crate) seeds: Option<[u64; 4]>,
    pub(crate) index: IndexStrategy,
}

impl Config {
    /// Create a new config with defaults (zero buckets, ahash, modulo indexing).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of buckets.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Round the capacity up to the next power of two when building.
    pub fn round_to_power_of_two(mut self) -> Self {
        self.round_to_power_of_two = true;
        self
    }

    /// Set the hash function to use.
    pub fn hash_function(mut self, hash_fn: HashFunction) -> Self {
        self.hash_function = hash_fn;
        self
    }

    /// Use fixed ahash seeds instead of the process-wide seed.
    ///
    /// Seeds only apply to [`HashFunction::AHash`]. FxHash is unseeded and
    /// ignores them.
    pub fn seeds(mut self, k0: u64, k1: u64, k2: u64, k3: u64) -> Self {
        self.seeds = Some([k0, k1, k2, k3]);
        self
    }

    /// Set the index strategy.
    pub fn index_strategy(mut self, index: IndexStrategy) -> Self {
        self.index = index;
        self
    }

    /// Bucket count the table will be built with.
    pub fn table_len(&self) -> usize {
        if self.round_to_power_of_two {
            closest_power_of_two(self.capacity)
        } else {
            self.capacity
        }
    }

    /// Hasher described by this config.
    pub fn hasher(&self) -> KeyHasher {
        match self.seeds {
            Some([k0, k1, k2, k3]) if self.hash_function == HashFunction::AHash => {
                KeyHasher::with_seeds(k0, k1, k2, k3)
            }
            _ => KeyHasher::new(self.hash_function),
        }
    }
}

/// Builder for creating fixed maps with custom configuration.
///
/// # Example
///
/// ```rust
/// use fixedmap::{FixedMapBuilder, IndexStrategy, SyncTextMap};
///
/// let map: SyncTextMap<i32> = FixedMapBuilder::new()
///     .capacity(1000)
///     .round_to_power_of_two()
///     .index_strategy(IndexStrategy::Mask)
///     .build_sync()?;
/// assert_eq!(map.cap(), 1024);
/// # Ok::<(), fixedmap::Error>(())
/// ```
pub struct FixedMapBuilder {
    config: Config,
}

impl FixedMapBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Set the number of buckets.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.config = self.config.capacity(capacity);
        self
    }

    /// Round the capacity up to the next power of two when building.
    pub fn round_to_power_of_two(mut self) -> Self {
        self.config = self.config.round_to_power_of_two();
        self
    }

    /// Set the hash function to use.
    pub fn hash_function(mut self, hash_fn: HashFunction) -> Self {
        self.config = self.config.hash_function(hash_fn);
        self
    }

    /// Use fixed ahash seeds instead of the process-wide seed.
    ///
    /// Seeds only apply to [`HashFunction::AHash`]. FxHash is unseeded and
    /// ignores them.
    pub fn seeds(mut self, k0: u64, k1: u64, k2: u64, k3: u64) -> Self {
        self.config = self.config.seeds(k0, k1, k2, k3);
        self
    }

    /// Set the index strategy.
    pub fn index_strategy(mut self, index: IndexStrategy) -> Self {
        self.config = self.config.index_strategy(index);
        self
    }

    /// Build a sequential map for a built-in key kind.
    pub fn build<K, V, S>(self) -> Result<FixedMap<K, V, S>, Error>
    where
        S: KeyKind + From<KeyHasher>,
        K: Borrow<S::Key>,
    {
        let keys = S::from(self.config.hasher());
        self.build_with(keys)
    }

    /// Build a sequential map around the given key kind.
    pub fn build_with<K, V, S>(self, keys: S) -> Result<FixedMap<K, V, S>, Error>
    where
        S: KeyKind,
        K: Borrow<S::Key>,
    {
        FixedMap::with_config(self.config, keys)
    }

    /// Build a concurrent map for a built-in key kind.
    pub fn build_sync<K, V, S>(self) -> Result<SyncFixedMap<K, V, S>, Error>
    where
        S: KeyKind + From<KeyHasher>,
        K: Borrow<S::Key>,
    {
        let keys = S::from(self.config.hasher());
        self.build_sync_with(keys)
    }

    /// Build a concurrent map around the given key kind.
    pub fn build_sync_with<K, V, S>(self, keys: S) -> Result<SyncFixedMap<K, V, S>, Error>
    where
        S: KeyKind,
        K: Borrow<S::Key>,
    {
        SyncFixedMap::with_config(self.config, keys)
    }
}

impl Default for FixedMapBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_len_rounding() {
        assert_eq!(Config::new().capacity(10).table_len(), 10);
        assert_eq!(Config::new().capacity(10).round_to_power_of_two().table_len(), 16);
        assert_eq!(Config::new().round_to_power_of_two().table_len(), 1);
    }

    #[test]
    fn test_strategy_to_indexer() {
        assert!(IndexStrategy::Auto.indexer(64).unwrap().is_mask());
        assert!(!IndexStrategy::Auto.indexer(60).unwrap().is_mask());
        assert!(!IndexStrategy::Modulo.indexer(64).unwrap().is_mask());
        assert_eq!(
            IndexStrategy::Mask.indexer(60).unwrap_err(),
            Error::NotPowerOfTwo { capacity: 60 }
        );
    }

    #[test]
    fn test_seeded_config_is_deterministic() {
        let a = Config::new().seeds(5, 6, 7, 8).hasher();
        let b = Config::new().seeds(5, 6, 7, 8).hasher();
        assert_eq!(a.hash_str("key"), b.hash_str("key"));
    }

    #[cfg(feature = "fxhash")]
    #[test]
    fn test_fxhash_ignores_seeds() {
        let seeded = Config::new()
            .hash_function(HashFunction::FxHash)
            .seeds(5, 6, 7, 8)
            .hasher();
        let plain = Config::new().hash_function(HashFunction::FxHash).hasher();
        assert_eq!(seeded.hash_str("key"), plain.hash_str("key"));
        assert_eq!(seeded.hash_bytes(b"key"), plain.hash_bytes(b"key"));
    }
}
