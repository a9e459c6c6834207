/// Errors that can occur when constructing a fixed map.
///
/// Map operations themselves never fail: a missing key is reported as `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Mask-based indexing was requested for a table whose length is not a
    /// power of two (zero included).
    NotPowerOfTwo {
        /// The rejected table length.
        capacity: usize,
    },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::NotPowerOfTwo { capacity } => {
                write!(
                    f,
                    "mask indexing needs a power-of-two capacity, got {}",
                    capacity
                )
            }
        }
    }
}

impl std::error::Error for Error {}
