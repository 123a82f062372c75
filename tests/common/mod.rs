//! Shared fixtures for engine lifecycle tests: an engine wired to in-memory
//! collaborators, plus quest builders.

use std::sync::Arc;

use questline::{
    GoalId, InMemoryCache, InMemoryProfileService, InMemoryQuestRepository, Quest, QuestEngine,
    QuestId, QuestlineConfig, StatIncrement, StatLabel, UserId,
};

pub type TestEngine = QuestEngine<InMemoryQuestRepository, InMemoryCache, InMemoryProfileService>;

/// Cache key the engine derives for the fixture user.
pub const CACHE_KEY: &str = "questline:quests:u1";

pub struct Harness {
    pub engine: TestEngine,
    pub repository: Arc<InMemoryQuestRepository>,
    pub cache: Arc<InMemoryCache>,
    pub profile: Arc<InMemoryProfileService>,
}

pub fn harness() -> Harness {
    let repository = Arc::new(InMemoryQuestRepository::new());
    let cache = Arc::new(InMemoryCache::new());
    let profile = Arc::new(InMemoryProfileService::new());
    let engine = QuestEngine::new(
        repository.clone(),
        cache.clone(),
        profile.clone(),
        UserId::try_from("u1").unwrap(),
        QuestlineConfig::default(),
    );
    Harness {
        engine,
        repository,
        cache,
        profile,
    }
}

pub fn quest_id(s: &str) -> QuestId {
    QuestId::try_from(s).unwrap()
}

pub fn stat(s: &str) -> StatLabel {
    StatLabel::try_from(s).unwrap()
}

/// An active quest paying +1 strength and the default discipline increment.
pub fn strength_quest(id: &str, total: u32) -> Quest {
    let mut quest = Quest::new(
        quest_id(id),
        "Morning stretch",
        "Three sets of stretches",
        GoalId::from("goal-flexibility"),
        total,
    );
    quest.stat_tags = vec![stat("STR")];
    quest.stat_increments = vec![StatIncrement {
        label: stat("STR"),
        amount: 1,
    }];
    quest
}
