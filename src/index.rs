use crate::error::Error;

/// User-provided bucket selection.
pub trait IndexCalculator: Send + Sync {
    /// Return the bucket index in `[0, len)` for the given digest. `len` is never zero.
    fn index(&self, digest: u64, len: usize) -> usize;
}

/// `digest % len`. Valid for any non-zero length.
#[derive(Debug, Clone, Copy, Default)]
pub struct Modulo;

impl IndexCalculator for Modulo {
    #[inline]
    fn index(&self, digest: u64, len: usize) -> usize {
        (digest % len as u64) as usize
    }
}

/// Bucket selector for one table, fixed when the table is built.
///
/// The mask variant (`digest & (len - 1)`) is only ever constructed for
/// power-of-two lengths, so it cannot be paired with a table it would index
/// incorrectly.
pub struct Indexer {
    len: usize,
    kind: IndexKind,
}

enum IndexKind {
    Modulo(u64),
    Mask(u64),
    Custom(Box<dyn IndexCalculator>),
}

impl Indexer {
    /// Pick mask indexing when `len` is a power of two and modulo otherwise.
    pub fn for_len(len: usize) -> Self {
        if len.is_power_of_two() {
            Self::masked(len)
        } else {
            Self::modulo(len)
        }
    }

    /// Modulo indexing, whatever the length.
    pub fn modulo(len: usize) -> Self {
        Self {
            len,
            kind: IndexKind::Modulo(len as u64),
        }
    }

    /// Mask indexing. Fails unless `len` is a power of two.
    pub fn mask(len: usize) -> Result<Self, Error> {
        if !len.is_power_of_two() {
            return Err(Error::NotPowerOfTwo { capacity: len });
        }
        Ok(Self::masked(len))
    }

    /// Delegate to a caller-supplied calculator.
    pub fn custom(len: usize, calculator: Box<dyn IndexCalculator>) -> Self {
        Self {
            len,
            kind: IndexKind::Custom(calculator),
        }
    }

    fn masked(len: usize) -> Self {
        Self {
            len,
            kind: IndexKind::Mask(len as u64 - 1),
        }
    }

    /// Table length this indexer was built for.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the table has no buckets.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether this indexer masks rather than divides.
    pub fn is_mask(&self) -> bool {
        matches!(self.kind, IndexKind::Mask(_))
    }

    /// Bucket index for `digest`. The table must not be empty.
    #[inline]
    pub fn index(&self, digest: u64) -> usize {
        debug_assert!(self.len > 0, "indexing an empty table");
        match &self.kind {
            IndexKind::Modulo(len) => (digest % len) as usize,
            IndexKind::Mask(mask) => (digest & mask) as usize,
            IndexKind::Custom(calculator) => calculator.index(digest, self.len),
        }
    }
}

impl std::fmt::Debug for Indexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            IndexKind::Modulo(_) => "Modulo",
            IndexKind::Mask(_) => "Mask",
            IndexKind::Custom(_) => "Custom(...)",
        };
        f.debug_struct("Indexer")
            .field("len", &self.len)
            .field("kind", &kind)
            .finish()
    }
}

/// Round `size` up to the next power of two.
///
/// Powers of two come back unchanged and zero becomes 1. Sizes above the
/// largest representable power of two saturate to it.
pub fn closest_power_of_two(size: usize) -> usize {
    size.checked_next_power_of_two().unwrap_or(1 << (usize::BITS - 1))
}
