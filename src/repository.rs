//! Quest repository boundary: the authoritative remote store.
//!
//! The engine's in-memory quest list and the durable cache are both views;
//! whatever this trait's implementation confirms is the truth. No batch or
//! transactional API is assumed -- one quest per write.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tracing::warn;

use crate::error::RepositoryError;
use crate::quest::{Quest, QuestId};

#[async_trait]
pub trait QuestRepository: Send + Sync + 'static {
    async fn get(&self, id: &QuestId) -> Result<Quest, RepositoryError>;

    /// Persist the quest, returning the stored value.
    async fn update(&self, quest: Quest) -> Result<Quest, RepositoryError>;
}

/// Simulated backend for tests and dry-run embedding.
///
/// Write-failure injection is switchable at runtime so rollback paths can be
/// exercised and then recovered from in the same scenario.
#[derive(Debug, Default, Clone)]
pub struct InMemoryQuestRepository {
    quests: Arc<RwLock<BTreeMap<QuestId, Quest>>>,
    fail_writes: Arc<AtomicBool>,
}

impl InMemoryQuestRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(quests: impl IntoIterator<Item = Quest>) -> Self {
        let repository = Self::new();
        for quest in quests {
            repository.insert(quest);
        }
        repository
    }

    /// Upsert a quest directly, as the upstream content generator would.
    pub fn insert(&self, quest: Quest) {
        self.write_guard().insert(quest.id.clone(), quest);
    }

    /// Make every subsequent `update` fail until switched back off.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn read_guard(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<QuestId, Quest>> {
        match self.quests.read() {
            Ok(guard) => guard,
            Err(poison) => poison.into_inner(),
        }
    }

    fn write_guard(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<QuestId, Quest>> {
        match self.quests.write() {
            Ok(guard) => guard,
            Err(poison) => poison.into_inner(),
        }
    }
}

#[async_trait]
impl QuestRepository for InMemoryQuestRepository {
    async fn get(&self, id: &QuestId) -> Result<Quest, RepositoryError> {
        self.read_guard()
            .get(id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(id.clone()))
    }

    async fn update(&self, quest: Quest) -> Result<Quest, RepositoryError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            warn!(quest = %quest.id, "[SIM] rejecting quest write");
            return Err(RepositoryError::Remote(
                "simulated backend write failure".to_string(),
            ));
        }
        self.write_guard().insert(quest.id.clone(), quest.clone());
        Ok(quest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quest::GoalId;

    fn quest(id: &str) -> Quest {
        Quest::new(
            QuestId::try_from(id).unwrap(),
            "Stretch",
            "",
            GoalId::from("g1"),
            3,
        )
    }

    #[tokio::test]
    async fn get_on_missing_quest_is_not_found() {
        let repository = InMemoryQuestRepository::new();
        let id = QuestId::try_from("missing").unwrap();
        assert_eq!(
            repository.get(&id).await.unwrap_err(),
            RepositoryError::NotFound(id)
        );
    }

    #[tokio::test]
    async fn update_round_trips() {
        let repository = InMemoryQuestRepository::new();
        let stored = repository.update(quest("q1")).await.unwrap();
        let fetched = repository.get(&stored.id).await.unwrap();
        assert_eq!(fetched, stored);
    }

    #[tokio::test]
    async fn failure_injection_is_recoverable() {
        let repository = InMemoryQuestRepository::new();

        repository.set_fail_writes(true);
        assert!(matches!(
            repository.update(quest("q1")).await.unwrap_err(),
            RepositoryError::Remote(_)
        ));

        repository.set_fail_writes(false);
        assert!(repository.update(quest("q1")).await.is_ok());
    }
}
