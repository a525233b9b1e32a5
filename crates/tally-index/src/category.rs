//! Category membership index.

use std::collections::HashMap;

use tally_types::{Category, TransactionId};

/// Maps each category to the ids carrying it, oldest first.
#[derive(Clone, Debug, Default)]
pub struct CategoryIndex {
    members: HashMap<Category, Vec<TransactionId>>,
}

impl CategoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `id` as the newest member of `category`.
    pub fn insert(&mut self, category: &Category, id: TransactionId) {
        self.members.entry(category.clone()).or_default().push(id);
    }

    /// Drop `id` from `category`. Returns `true` if it was a member.
    ///
    /// Empty categories are pruned.
    pub fn remove(&mut self, category: &str, id: TransactionId) -> bool {
        let Some(ids) = self.members.get_mut(category) else {
            return false;
        };
        let before = ids.len();
        ids.retain(|member| *member != id);
        let removed = ids.len() != before;
        if ids.is_empty() {
            self.members.remove(category);
        }
        removed
    }

    /// Members of `category` in insertion order. Unknown labels yield an empty slice.
    pub fn ids(&self, category: &str) -> &[TransactionId] {
        self.members.get(category).map(Vec::as_slice).unwrap_or(&[])
    }
}
