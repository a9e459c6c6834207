use std::hash::{BuildHasher, Hasher};
use std::sync::OnceLock;

/// Which hash algorithm a [`KeyHasher`] runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashFunction {
    /// Use ahash (default, fast and well-distributed).
    #[default]
    AHash,
    /// Use fxhash (faster but potentially less distributed). Unseeded.
    #[cfg(feature = "fxhash")]
    FxHash,
}

/// Seed shared by every hasher built without explicit seeds. Chosen once per process.
static PROCESS_STATE: OnceLock<ahash::RandomState> = OnceLock::new();

fn process_state() -> &'static ahash::RandomState {
    PROCESS_STATE.get_or_init(ahash::RandomState::new)
}

/// Seeded digest function for map keys.
///
/// A `KeyHasher` is deterministic for its own lifetime, and every hasher
/// built with [`KeyHasher::new`] shares one process-wide seed, so two maps in
/// the same process agree on digests. Seeds change across process restarts
/// unless [`KeyHasher::with_seeds`] is used.
///
/// Text and byte sequences hash the same byte stream, and scalars hash their
/// native-endian bit pattern. None of the entry points allocate.
#[derive(Clone)]
pub struct KeyHasher {
    kind: HasherKind,
}

#[derive(Clone)]
enum HasherKind {
    AHash(ahash::RandomState),
    #[cfg(feature = "fxhash")]
    FxHash,
}

impl KeyHasher {
    /// Create a hasher for the given algorithm using the process-wide seed.
    pub fn new(hash_fn: HashFunction) -> Self {
        let kind = match hash_fn {
            HashFunction::AHash => HasherKind::AHash(process_state().clone()),
            #[cfg(feature = "fxhash")]
            HashFunction::FxHash => HasherKind::FxHash,
        };
        Self { kind }
    }

    /// Create an ahash-based hasher with fixed seeds. Digests are reproducible
    /// across runs, which keeps tests and bucket layouts deterministic.
    pub fn with_seeds(k0: u64, k1: u64, k2: u64, k3: u64) -> Self {
        Self {
            kind: HasherKind::AHash(ahash::RandomState::with_seeds(k0, k1, k2, k3)),
        }
    }

    /// Digest of an arbitrary byte sequence.
    #[inline]
    pub fn hash_bytes(&self, bytes: &[u8]) -> u64 {
        match &self.kind {
            HasherKind::AHash(state) => {
                let mut hasher = state.build_hasher();
                hasher.write(bytes);
                hasher.finish()
            }
            #[cfg(feature = "fxhash")]
            HasherKind::FxHash => {
                let mut hasher = fxhash::FxHasher64::default();
                hasher.write(bytes);
                hasher.finish()
            }
        }
    }

    /// Digest of a string; equal to `hash_bytes(text.as_bytes())`.
    #[inline]
    pub fn hash_str(&self, text: &str) -> u64 {
        self.hash_bytes(text.as_bytes())
    }

    /// Digest of a fixed-width scalar, computed over its raw bytes.
    #[inline]
    pub fn hash_scalar<T: Scalar>(&self, value: T) -> u64 {
        value.with_ne_bytes(|bytes| self.hash_bytes(bytes))
    }
}

impl Default for KeyHasher {
    fn default() -> Self {
        Self::new(HashFunction::default())
    }
}

impl std::fmt::Debug for KeyHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            HasherKind::AHash(_) => write!(f, "KeyHasher::AHash"),
            #[cfg(feature = "fxhash")]
            HasherKind::FxHash => write!(f, "KeyHasher::FxHash"),
        }
    }
}

/// A fixed-width scalar usable as a map key.
///
/// Hashing goes through the value's native-endian bytes; equality is plain
/// `==`. For floats that means `0.0` and `-0.0` compare equal yet hash apart,
/// and `NaN` never matches anything.
pub trait Scalar: Copy + PartialEq {
    /// Call `f` with the raw bytes of `self`.
    fn with_ne_bytes<R>(self, f: impl FnOnce(&[u8]) -> R) -> R;
}

macro_rules! impl_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Scalar for $ty {
                #[inline]
                fn with_ne_bytes<R>(self, f: impl FnOnce(&[u8]) -> R) -> R {
                    f(&self.to_ne_bytes())
                }
            }
        )*
    };
}

impl_scalar!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);
