//! Id-based deduplication between feed tiers

use crate::models::ContentItem;
use std::collections::HashSet;

/// Ids already placed in the feed
#[derive(Debug, Default)]
pub struct SeenIds {
    ids: HashSet<String>,
}

impl SeenIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: &[ContentItem]) -> Self {
        let mut seen = Self::new();
        for item in items {
            seen.insert(item.id());
        }
        seen
    }

    /// Returns `false` when the id was already present
    pub fn insert(&mut self, id: &str) -> bool {
        if self.ids.contains(id) {
            return false;
        }
        self.ids.insert(id.to_string())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Drops every item whose id is already in `seen`, recording the survivors.
///
/// Order of the survivors is preserved. An id repeated inside `universe` is
/// kept only the first time.
pub fn exclude_seen(universe: Vec<ContentItem>, seen: &mut SeenIds) -> Vec<ContentItem> {
    universe
        .into_iter()
        .filter(|item| seen.insert(item.id()))
        .collect()
}
