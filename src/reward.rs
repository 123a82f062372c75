//! Reward ledger: base/bonus bookkeeping per stat category, the discipline
//! counter, and the completed-quest tally.
//!
//! `total` is always derived as `base + bonus` and never stored. Reversal has
//! no code path of its own: the coordinator applies the same deltas with the
//! sign flipped, so applying then reversing an amount returns the ledger to
//! its prior value exactly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::quest::StatLabel;

/// One stat category's bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardEntry {
    pub base: i64,
    pub bonus: i64,
}

impl RewardEntry {
    pub const fn with_base(base: i64) -> Self {
        Self { base, bonus: 0 }
    }

    /// Derived, never stored.
    pub const fn total(&self) -> i64 {
        self.base + self.bonus
    }
}

/// The per-user reward state derived from quest completions.
///
/// Entries are seeded once at account setup via [`RewardLedger::with_bases`]
/// and mutated only through the apply methods below. Discipline is driven
/// solely by each quest's `discipline_increment` -- explicit stat increments
/// cannot reach it, because [`StatLabel`] cannot name it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardLedger {
    stats: BTreeMap<StatLabel, RewardEntry>,
    discipline: RewardEntry,
    completed_quests: u32,
}

impl RewardLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed per-label base values, as account setup does once.
    pub fn with_bases(bases: impl IntoIterator<Item = (StatLabel, i64)>) -> Self {
        Self {
            stats: bases
                .into_iter()
                .map(|(label, base)| (label, RewardEntry::with_base(base)))
                .collect(),
            discipline: RewardEntry::default(),
            completed_quests: 0,
        }
    }

    /// Move a stat category's bonus by `amount` (negative to reverse).
    pub fn apply_stat(&mut self, label: &StatLabel, amount: i64) {
        let entry = self.stats.entry(label.clone()).or_default();
        entry.bonus += amount;
    }

    /// Move the discipline bonus by `amount` (negative to reverse).
    pub fn apply_discipline(&mut self, amount: i64) {
        self.discipline.bonus += amount;
    }

    /// Move the completed-quest tally. Crate-private: the coordinator's
    /// reward step is the only path, and it always moves this together with
    /// the discipline delta.
    pub(crate) fn record_completed(&mut self, delta: i64) {
        let next = i64::from(self.completed_quests) + delta;
        self.completed_quests = u32::try_from(next.max(0)).unwrap_or(u32::MAX);
    }

    pub fn stat(&self, label: &StatLabel) -> RewardEntry {
        self.stats.get(label).copied().unwrap_or_default()
    }

    pub const fn discipline(&self) -> RewardEntry {
        self.discipline
    }

    pub const fn completed_quests(&self) -> u32 {
        self.completed_quests
    }

    pub fn stats(&self) -> impl Iterator<Item = (&StatLabel, &RewardEntry)> {
        self.stats.iter()
    }
}
