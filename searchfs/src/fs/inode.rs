//! Inode numbers for the nodes handed to the kernel.
//!
//! Every successful lookup allocates a fresh inode holding the resolved node
//! and a lookup count of one; `forget` drops the count and frees the slot at
//! zero. The root is never freed.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;

use crate::dir::ResultDir;
use crate::file::{ResultFile, StaticFile};

pub const ROOT_INO: u64 = 1;

pub enum Node<B> {
    Root,
    Readme(StaticFile),
    Results(Arc<ResultDir<B>>),
    File(ResultFile),
}

// Manual impl: `B` itself need not be Clone.
impl<B> Clone for Node<B> {
    fn clone(&self) -> Self {
        match self {
            Self::Root => Self::Root,
            Self::Readme(f) => Self::Readme(*f),
            Self::Results(d) => Self::Results(Arc::clone(d)),
            Self::File(f) => Self::File(f.clone()),
        }
    }
}

impl<B> Node<B> {
    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Root | Self::Results(_))
    }
}

struct Slot<B> {
    node: Node<B>,
    lookups: u64,
}

pub struct InodeTable<B> {
    next: AtomicU64,
    slots: RwLock<HashMap<u64, Slot<B>>>,
}

impl<B> InodeTable<B> {
    pub fn new() -> Self {
        let mut slots = HashMap::new();
        slots.insert(
            ROOT_INO,
            Slot {
                node: Node::Root,
                lookups: 1,
            },
        );
        Self {
            next: AtomicU64::new(ROOT_INO + 1),
            slots: RwLock::new(slots),
        }
    }

    /// Registers `node` with one lookup and returns its inode.
    pub async fn insert(&self, node: Node<B>) -> u64 {
        let ino = self.next.fetch_add(1, Ordering::Relaxed);
        self.slots
            .write()
            .await
            .insert(ino, Slot { node, lookups: 1 });
        ino
    }

    pub async fn get(&self, ino: u64) -> Option<Node<B>> {
        self.slots.read().await.get(&ino).map(|s| s.node.clone())
    }

    pub async fn forget(&self, ino: u64, nlookup: u64) {
        if ino == ROOT_INO {
            return;
        }
        let mut slots = self.slots.write().await;
        if let Some(slot) = slots.get_mut(&ino) {
            slot.lookups = slot.lookups.saturating_sub(nlookup);
            if slot.lookups == 0 {
                slots.remove(&ino);
            }
        }
    }
}

impl<B> Default for InodeTable<B> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockBackend;
    use std::time::SystemTime;

    fn file_node() -> Node<MockBackend> {
        let blob = crate::backend::BlobRef::parse("sha224-ab").unwrap();
        Node::File(ResultFile::new(blob, SystemTime::UNIX_EPOCH, 0))
    }

    #[tokio::test]
    async fn root_is_preallocated_and_permanent() {
        let table: InodeTable<MockBackend> = InodeTable::new();
        assert!(matches!(table.get(ROOT_INO).await, Some(Node::Root)));
        table.forget(ROOT_INO, 100).await;
        assert!(table.get(ROOT_INO).await.is_some());
    }

    #[tokio::test]
    async fn every_insert_gets_a_new_inode() {
        let table = InodeTable::new();
        let a = table.insert(file_node()).await;
        let b = table.insert(file_node()).await;
        assert_ne!(a, b);
        assert!(a > ROOT_INO && b > ROOT_INO);
        assert!(table.get(a).await.is_some() && table.get(b).await.is_some());
    }

    #[tokio::test]
    async fn forget_frees_at_zero() {
        let table = InodeTable::new();
        let ino = table.insert(file_node()).await;
        table.forget(ino, 0).await;
        assert!(table.get(ino).await.is_some());
        table.forget(ino, 1).await;
        assert!(table.get(ino).await.is_none());
        // Unknown inodes are ignored.
        table.forget(ino, 1).await;
    }
}
