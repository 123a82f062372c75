//! Single-slot pre-transition snapshots backing one level of undo.
//!
//! Each completing or skipping transition stores a full copy of the quest as
//! it was immediately before; a later transition of the same quest overwrites
//! the slot. `take` removes the entry, so a second undo without an
//! intervening completing/skipping transition finds nothing -- the
//! `NoSnapshot` guarantee is structural, not a caller convention.

use std::collections::BTreeMap;

use crate::quest::{Quest, QuestId};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotLedger {
    slots: BTreeMap<QuestId, Quest>,
}

impl SnapshotLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `quest` under its own id, overwriting any previous slot.
    pub fn put(&mut self, quest: Quest) {
        self.slots.insert(quest.id.clone(), quest);
    }

    /// Consume and return the slot for `id`.
    pub fn take(&mut self, id: &QuestId) -> Option<Quest> {
        self.slots.remove(id)
    }

    /// Read the slot without consuming it. The pure undo function uses this;
    /// the coordinator spends the slot only once the command commits.
    pub fn peek(&self, id: &QuestId) -> Option<&Quest> {
        self.slots.get(id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
