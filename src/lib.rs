//! # fixedmap
//!
//! Fixed-capacity hash maps over a pre-sized bucket table, in two variants:
//!
//! - [`FixedMap`]: single-threaded, plain mutation.
//! - [`SyncFixedMap`]: lock-free, safe to share between threads without
//!   external locking.
//!
//! The table is allocated once and never resized. Collisions chain through
//! singly-linked lists and new keys are prepended to their chain. In the
//! concurrent map every mutation is a compare-and-swap on a bucket head, a
//! node link or a node's value cell. A delete tombstones the value, freezes
//! the node's link and sweeps frozen nodes out of the bucket.
//!
//! ## Features
//!
//! - **Fixed footprint**: bucket count chosen at construction, never rehashed
//! - **Lock-Free Variant**: no mutex anywhere on the concurrent path
//! - **Zero-Copy Reads**: concurrent values are stored as `Arc<T>`
//! - **Key Kinds**: text, byte sequences, fixed-width scalars, or your own hash/equality pair
//! - **Index Strategies**: modulo, mask (power-of-two tables) or a custom calculator
//! - **Statistics**: chain shape, tombstones and (with `metrics`) operation counters
//!
//! ## Example
//!
//! ```rust
//! use fixedmap::{BytesMap, SyncTextMap};
//!
//! let mut bytes = BytesMap::with_capacity(10);
//! bytes.set(vec![123, 35, 12], "A");
//! bytes.set(vec![], "B");
//! assert_eq!(bytes.get(&[123, 35, 12]), Some(&"A"));
//! bytes.delete(&[123, 35, 12]);
//! assert_eq!(bytes.get(&[123, 35, 12]), None);
//!
//! let text = SyncTextMap::with_capacity(10);
//! assert!(text.set("key".to_string(), 1).is_none());
//! assert_eq!(*text.set("key".to_string(), 2).unwrap(), 1);
//! assert_eq!(*text.get("key").unwrap(), 2);
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use fixedmap::{FixedMapBuilder, HashFunction, IndexStrategy, ScalarMap};
//!
//! let map: ScalarMap<u64, &str> = FixedMapBuilder::new()
//!     .capacity(100)
//!     .round_to_power_of_two()
//!     .index_strategy(IndexStrategy::Auto)
//!     .hash_function(HashFunction::AHash)
//!     .build()?;
//! assert_eq!(map.cap(), 128);
//! # Ok::<(), fixedmap::Error>(())
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

/// Configuration and builder types.
pub mod config;
/// Error types.
pub mod error;
/// Hash function implementations.
pub mod hash;
/// Bucket index calculation.
pub mod index;
/// Iterator implementations.
pub mod iter;
/// Key kinds: hashing paired with equality.
pub mod key;
/// Single-threaded fixed map.
pub mod map;
mod node;
/// Statistics and metrics collection.
pub mod stats;
/// Lock-free fixed map.
pub mod sync_map;

// Re-export main types
pub use config::{Config, FixedMapBuilder, IndexStrategy};
pub use error::Error;
pub use hash::{HashFunction, KeyHasher, Scalar};
pub use index::{closest_power_of_two, IndexCalculator, Indexer, Modulo};
pub use key::{ByteKeys, CustomKeys, KeyKind, ScalarKeys, TextKeys};
pub use map::{BytesMap, FixedMap, ScalarMap, TextMap};
pub use stats::{Ops, Stats};
pub use sync_map::{SyncBytesMap, SyncFixedMap, SyncScalarMap, SyncTextMap};
