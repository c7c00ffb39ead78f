use std::collections::BTreeSet;

use crate::data::FeedId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Selected,
    Deselected,
}

/// Feeds the user picked on the map. Performs no I/O; callers refetch after
/// every mutation.
#[derive(Debug, Clone, Default)]
pub struct SelectionStore {
    selected: BTreeSet<FeedId>,
}

impl SelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle(&mut self, id: FeedId) -> Toggle {
        if self.selected.remove(&id) {
            Toggle::Deselected
        } else {
            self.selected.insert(id);
            Toggle::Selected
        }
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn has(&self, id: FeedId) -> bool {
        self.selected.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Selected ids in ascending order.
    pub fn as_query_fragment(&self) -> Vec<FeedId> {
        self.selected.iter().copied().collect()
    }
}
