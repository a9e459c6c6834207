//! Chain links for both map variants.

use arc_swap::ArcSwap;
use std::sync::Arc;

/// Owning link to the next node of a sequential chain.
pub(crate) type Link<K, V> = Option<Box<Node<K, V>>>;

/// A sequential chain node. Owned by its bucket or its predecessor.
pub(crate) struct Node<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) next: Link<K, V>,
}

impl<K, V> Node<K, V> {
    pub(crate) fn new(key: K, value: V, next: Link<K, V>) -> Box<Self> {
        Box::new(Self { key, value, next })
    }
}

/// Drop a sequential chain one node at a time.
pub(crate) fn drop_chain<K, V>(mut link: Link<K, V>) {
    while let Some(mut node) = link {
        link = node.next.take();
    }
}

/// One concurrent link: the successor it points at, and whether it is frozen.
///
/// Links are immutable and replaced whole by CAS, so two loads of the same
/// link are equal exactly when they return the same `Arc`. A frozen link
/// belongs to a deleted node; it is never replaced again, which keeps the
/// node's successor fixed while it is being unlinked.
pub(crate) struct Next<K, V> {
    pub(crate) node: Option<Arc<SyncNode<K, V>>>,
    pub(crate) frozen: bool,
}

impl<K, V> Next<K, V> {
    pub(crate) fn to(node: Option<Arc<SyncNode<K, V>>>) -> Arc<Self> {
        Arc::new(Self {
            node,
            frozen: false,
        })
    }

    pub(crate) fn frozen(node: Option<Arc<SyncNode<K, V>>>) -> Arc<Self> {
        Arc::new(Self { node, frozen: true })
    }
}

/// Atomically swapped link; both the bucket head and every node's `next`.
pub(crate) type SyncLink<K, V> = ArcSwap<Next<K, V>>;

pub(crate) fn empty_link<K, V>() -> SyncLink<K, V> {
    ArcSwap::new(Next::to(None))
}

/// The node `link` currently points at.
#[inline]
pub(crate) fn load_node<K, V>(link: &SyncLink<K, V>) -> Option<Arc<SyncNode<K, V>>> {
    link.load().node.clone()
}

/// Immutable value snapshot hung off a [`SyncNode`].
///
/// Cells are never written after construction. Replacing or deleting a value
/// swaps in a new cell, so a reader holding an old cell keeps a frozen view.
pub(crate) struct ValueCell<V> {
    pub(crate) value: Arc<V>,
    pub(crate) deleted: bool,
}

impl<V> ValueCell<V> {
    pub(crate) fn live(value: Arc<V>) -> Arc<Self> {
        Arc::new(Self {
            value,
            deleted: false,
        })
    }

    pub(crate) fn tombstone(value: Arc<V>) -> Arc<Self> {
        Arc::new(Self {
            value,
            deleted: true,
        })
    }
}

/// A concurrent chain node.
///
/// `key` is fixed at construction. `cell` and `next` are only changed by CAS
/// once the node is reachable from a bucket, and `next` stops changing once
/// it is frozen.
pub(crate) struct SyncNode<K, V> {
    pub(crate) key: K,
    pub(crate) cell: ArcSwap<ValueCell<V>>,
    pub(crate) next: SyncLink<K, V>,
}

impl<K, V> SyncNode<K, V> {
    pub(crate) fn new(key: K, value: Arc<V>) -> Arc<Self> {
        Arc::new(Self {
            key,
            cell: ArcSwap::new(ValueCell::live(value)),
            next: empty_link(),
        })
    }

    /// Whether the node's current cell is a tombstone.
    pub(crate) fn is_deleted(&self) -> bool {
        self.cell.load().deleted
    }

    /// Freeze `next` so no CAS can move the successor any more. Idempotent.
    pub(crate) fn freeze(&self) {
        loop {
            let current = self.next.load_full();
            if current.frozen {
                return;
            }
            let seen = self
                .next
                .compare_and_swap(&current, Next::frozen(current.node.clone()));
            if Arc::ptr_eq(&*seen, &current) {
                return;
            }
        }
    }
}

/// Release a concurrent chain without recursing through `next`.
///
/// Nodes still referenced elsewhere are left to their other owners, which
/// also keeps the rest of the chain alive through them.
pub(crate) fn drop_sync_chain<K, V>(head: &SyncLink<K, V>) {
    let mut current = take_link(head);
    while let Some(node) = current {
        current = match Arc::try_unwrap(node) {
            Ok(node) => take_link(&node.next),
            Err(_) => None,
        };
    }
}

fn take_link<K, V>(link: &SyncLink<K, V>) -> Option<Arc<SyncNode<K, V>>> {
    match Arc::try_unwrap(link.swap(Next::to(None))) {
        Ok(next) => next.node,
        Err(_) => None,
    }
}
