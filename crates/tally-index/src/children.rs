//! Reverse edges of the `parent` link.

use std::collections::HashMap;

use tally_types::TransactionId;

/// Maps a parent id to the ids naming it as `parent`.
///
/// The parent need not exist as a record: dangling links are indexed like
/// any other, so a later insert of the parent immediately sees its children.
#[derive(Clone, Debug, Default)]
pub struct ChildIndex {
    edges: HashMap<TransactionId, Vec<TransactionId>>,
}

impl ChildIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, parent: TransactionId, child: TransactionId) {
        self.edges.entry(parent).or_default().push(child);
    }

    /// Drop the `parent -> child` edge. Returns `true` if it existed.
    pub fn remove(&mut self, parent: TransactionId, child: TransactionId) -> bool {
        let Some(children) = self.edges.get_mut(&parent) else {
            return false;
        };
        let before = children.len();
        children.retain(|c| *c != child);
        let removed = children.len() != before;
        if children.is_empty() {
            self.edges.remove(&parent);
        }
        removed
    }

    /// Direct children of `parent`, oldest first.
    pub fn children(&self, parent: TransactionId) -> &[TransactionId] {
        self.edges.get(&parent).map(Vec::as_slice).unwrap_or(&[])
    }
}
