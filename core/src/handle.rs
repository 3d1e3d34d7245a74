use crate::index::Index;
use parking_lot::RwLock;
use std::sync::Arc;

/// Shared, swappable reference to the index being served.
///
/// Readers take an `Arc` snapshot and score against it without holding the
/// lock; a rebuild swaps in a complete new index. In-flight queries finish on
/// the snapshot they started with.
#[derive(Debug, Clone)]
pub struct IndexHandle {
    inner: Arc<RwLock<Arc<Index>>>,
}

impl IndexHandle {
    pub fn new(index: Index) -> Self {
        Self { inner: Arc::new(RwLock::new(Arc::new(index))) }
    }

    pub fn current(&self) -> Arc<Index> {
        self.inner.read().clone()
    }

    /// Replaces the served index and returns the previous one.
    pub fn swap(&self, index: Index) -> Arc<Index> {
        let next = Arc::new(index);
        let prev = std::mem::replace(&mut *self.inner.write(), next);
        tracing::info!(old_docs = prev.len(), new_docs = self.inner.read().len(), "swapped index");
        prev
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Document, Field, IndexBuilder};

    fn build(research: &str) -> Index {
        let docs = vec![Document::new("a", "Ada").with_field(Field::Research, research)];
        IndexBuilder::new().build_documents(docs).unwrap().0
    }

    #[test]
    fn snapshot_survives_swap() {
        let handle = IndexHandle::new(build("robotics"));
        let before = handle.current();
        let prev = handle.swap(build("compilers"));

        assert!(Arc::ptr_eq(&before, &prev));
        assert!(before.vocabulary().position("robotics").is_some());
        assert!(handle.current().vocabulary().position("compilers").is_some());
        assert!(handle.current().vocabulary().position("robotics").is_none());
    }

    #[test]
    fn clones_share_the_same_slot() {
        let handle = IndexHandle::new(build("robotics"));
        let other = handle.clone();
        other.swap(build("compilers"));
        assert!(handle.current().vocabulary().position("compilers").is_some());
    }
}
