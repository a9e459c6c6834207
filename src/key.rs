//! Key kinds: each pairs a hash strategy with an equality strategy.
//!
//! A map is generic over one [`KeyKind`]. It stores owned keys `K` and looks
//! them up through the kind's borrowed form [`KeyKind::Key`], so a text map
//! stores `String` and is queried with `&str`.

use crate::hash::{KeyHasher, Scalar};
use std::marker::PhantomData;

/// Hashing and equality for one kind of key.
pub trait KeyKind {
    /// The borrowed form keys are hashed and compared as.
    type Key: ?Sized;

    /// Digest of `key`. Must be deterministic for the lifetime of `self`.
    fn hash(&self, key: &Self::Key) -> u64;

    /// Whether two keys are logically equal. Equal keys must hash equally.
    fn equal(&self, left: &Self::Key, right: &Self::Key) -> bool;
}

/// Text keys, compared byte-wise.
#[derive(Debug, Clone, Default)]
pub struct TextKeys {
    hasher: KeyHasher,
}

impl TextKeys {
    /// Text keys hashed by `hasher`.
    pub fn new(hasher: KeyHasher) -> Self {
        Self { hasher }
    }
}

impl From<KeyHasher> for TextKeys {
    fn from(hasher: KeyHasher) -> Self {
        Self::new(hasher)
    }
}

impl KeyKind for TextKeys {
    type Key = str;

    #[inline]
    fn hash(&self, key: &str) -> u64 {
        self.hasher.hash_str(key)
    }

    #[inline]
    fn equal(&self, left: &str, right: &str) -> bool {
        left == right
    }
}

/// Arbitrary byte-sequence keys, compared byte-wise.
#[derive(Debug, Clone, Default)]
pub struct ByteKeys {
    hasher: KeyHasher,
}

impl ByteKeys {
    /// Byte keys hashed by `hasher`.
    pub fn new(hasher: KeyHasher) -> Self {
        Self { hasher }
    }
}

impl From<KeyHasher> for ByteKeys {
    fn from(hasher: KeyHasher) -> Self {
        Self::new(hasher)
    }
}

impl KeyKind for ByteKeys {
    type Key = [u8];

    #[inline]
    fn hash(&self, key: &[u8]) -> u64 {
        self.hasher.hash_bytes(key)
    }

    #[inline]
    fn equal(&self, left: &[u8], right: &[u8]) -> bool {
        left == right
    }
}

/// Fixed-width scalar keys, hashed by bit pattern and compared by value.
pub struct ScalarKeys<T> {
    hasher: KeyHasher,
    _marker: PhantomData<fn(T)>,
}

impl<T> ScalarKeys<T> {
    /// Scalar keys hashed by `hasher`.
    pub fn new(hasher: KeyHasher) -> Self {
        Self {
            hasher,
            _marker: PhantomData,
        }
    }
}

impl<T> From<KeyHasher> for ScalarKeys<T> {
    fn from(hasher: KeyHasher) -> Self {
        Self::new(hasher)
    }
}

impl<T> Default for ScalarKeys<T> {
    fn default() -> Self {
        Self::new(KeyHasher::default())
    }
}

impl<T> Clone for ScalarKeys<T> {
    fn clone(&self) -> Self {
        Self::new(self.hasher.clone())
    }
}

impl<T> std::fmt::Debug for ScalarKeys<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScalarKeys")
            .field("hasher", &self.hasher)
            .finish()
    }
}

impl<T: Scalar> KeyKind for ScalarKeys<T> {
    type Key = T;

    #[inline]
    fn hash(&self, key: &T) -> u64 {
        self.hasher.hash_scalar(*key)
    }

    #[inline]
    fn equal(&self, left: &T, right: &T) -> bool {
        left == right
    }
}

/// Caller-supplied hash and equality functions over keys borrowed as `Q`.
pub struct CustomKeys<Q: ?Sized, H, E> {
    hash_fn: H,
    equal_fn: E,
    _marker: PhantomData<fn(&Q)>,
}

impl<Q, H, E> CustomKeys<Q, H, E>
where
    Q: ?Sized,
    H: Fn(&Q) -> u64,
    E: Fn(&Q, &Q) -> bool,
{
    /// Pair a hash function with an equality function.
    pub fn new(hash_fn: H, equal_fn: E) -> Self {
        Self {
            hash_fn,
            equal_fn,
            _marker: PhantomData,
        }
    }
}

impl<Q, H, E> KeyKind for CustomKeys<Q, H, E>
where
    Q: ?Sized,
    H: Fn(&Q) -> u64,
    E: Fn(&Q, &Q) -> bool,
{
    type Key = Q;

    #[inline]
    fn hash(&self, key: &Q) -> u64 {
        (self.hash_fn)(key)
    }

    #[inline]
    fn equal(&self, left: &Q, right: &Q) -> bool {
        (self.equal_fn)(left, right)
    }
}
