//! Error taxonomy for the quest engine.
//!
//! Pre-mutation failures (`InvalidState`, `NoSnapshot`, a missing quest) are
//! detected before anything is touched and reject a command with no side
//! effects. A remote write failure surfaces only after the full rollback has
//! restored local state and the durable cache. Cache write failures never
//! become errors at all; the cache is not the source of truth, so they are
//! logged at the call site and ignored.

use crate::quest::{QuestId, QuestStatus};

/// A transition attempted from a status that does not permit it, or an undo
/// with nothing to undo.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("quest {id} cannot {action} while {status}")]
    InvalidState {
        id: QuestId,
        status: QuestStatus,
        action: &'static str,
    },
    #[error("no snapshot to undo for quest {0}")]
    NoSnapshot(QuestId),
}

/// Failure at the authoritative quest repository.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("quest not found: {0}")]
    NotFound(QuestId),
    #[error("remote write failed: {0}")]
    Remote(String),
}

/// Failure at the durable key-value cache.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

/// Failure at the profile/stat persistence service.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ProfileError {
    #[error("profile update rejected: {0}")]
    Rejected(String),
}

/// What a dispatched command can fail with, per the propagation policy above.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("quest not found: {0}")]
    NotFound(QuestId),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("remote write failed, command rolled back: {0}")]
    Remote(#[source] RepositoryError),
}
