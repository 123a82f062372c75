//! Quest lifecycle and reward ledger engine for a gamified daily-task
//! tracker.
//!
//! Quests move from active to completed or skipped, with a single level of
//! undo backed by per-quest snapshots. Completions pay out stat bonuses, a
//! discipline counter, and a completed-quest tally into a derived reward
//! ledger; undo reverses exactly what was paid. The
//! [`QuestEngine`] coordinates each command optimistically: local state and
//! a durable-cache checkpoint are updated first, the authoritative remote
//! repository is written second, and a remote failure rolls everything back
//! so the visible state never diverges from what the backend confirmed.
//!
//! External collaborators are traits ([`QuestRepository`], [`DurableCache`],
//! [`ProfileService`]) with in-memory implementations suitable for tests and
//! dry-run embedding. Committed transitions are published as [`QuestEvent`]s
//! on a broadcast channel; [`spawn_notifier`] bridges them to a
//! [`NotificationEmitter`] for hosts that render toasts.

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod notify;
pub mod profile;
pub mod quest;
pub mod repository;
pub mod reward;
pub mod snapshot;
pub mod transition;

pub use cache::{DurableCache, InMemoryCache};
pub use config::{setup_tracing, LogLevel, QuestlineConfig};
pub use engine::QuestEngine;
pub use error::{CacheError, CommandError, ProfileError, RepositoryError, TransitionError};
pub use notify::{spawn_notifier, NotificationEmitter, QuestEvent, TracingEmitter};
pub use profile::{InMemoryProfileService, ProfileCall, ProfileService, ProfileUpdate};
pub use quest::{
    GoalId, Progress, Quest, QuestId, QuestStatus, StatIncrement, StatLabel, UserId,
    DISCIPLINE_LABEL,
};
pub use repository::{InMemoryQuestRepository, QuestRepository};
pub use reward::{RewardEntry, RewardLedger};
pub use snapshot::SnapshotLedger;
pub use transition::{
    QuestCommand, QuestOutcome, RewardEffect, SnapshotInstruction, Transition,
};
