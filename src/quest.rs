//! Quest entities and the validated identifier/label types around them.
//!
//! Quests arrive from an upstream content generator already well-formed; the
//! types here make the well-formedness checkable at the boundary instead of
//! trusted. `Progress` keeps its `current <= total` invariant by construction:
//! the only mutators clamp, and deserialization goes through the same
//! validation as construction (quest lists round-trip through the durable
//! cache as JSON blobs).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reserved reward-category label for the discipline counter.
///
/// Discipline is paid on every completing transition regardless of a quest's
/// stat tags, so explicit stat increments must never name it. [`StatLabel`]
/// rejects it at construction, which removes the need for a runtime guard in
/// the reward ledger.
pub const DISCIPLINE_LABEL: &str = "DIS";

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum InvalidLabel {
    #[error("stat label cannot be empty")]
    Empty,
    #[error("stat label \"DIS\" is reserved for the discipline counter")]
    ReservedDiscipline,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("{0} cannot be empty")]
pub struct EmptyId(&'static str);

/// Opaque unique quest identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QuestId(String);

impl TryFrom<String> for QuestId {
    type Error = EmptyId;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if s.is_empty() {
            return Err(EmptyId("quest id"));
        }
        Ok(Self(s))
    }
}

impl TryFrom<&str> for QuestId {
    type Error = EmptyId;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::try_from(s.to_string())
    }
}

impl AsRef<str> for QuestId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for QuestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<QuestId> for String {
    fn from(id: QuestId) -> Self {
        id.0
    }
}

/// Identifier of the user whose quests and profile this engine mutates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl TryFrom<String> for UserId {
    type Error = EmptyId;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if s.is_empty() {
            return Err(EmptyId("user id"));
        }
        Ok(Self(s))
    }
}

impl TryFrom<&str> for UserId {
    type Error = EmptyId;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::try_from(s.to_string())
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

/// Reference to the external goal a quest contributes to. Goals are owned and
/// rendered outside this engine, so the reference stays fully opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GoalId(String);

impl From<String> for GoalId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for GoalId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for GoalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A reward-category label, e.g. `"STR"`. Never the discipline category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StatLabel(String);

impl TryFrom<String> for StatLabel {
    type Error = InvalidLabel;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if s.is_empty() {
            return Err(InvalidLabel::Empty);
        }
        if s == DISCIPLINE_LABEL {
            return Err(InvalidLabel::ReservedDiscipline);
        }
        Ok(Self(s))
    }
}

impl TryFrom<&str> for StatLabel {
    type Error = InvalidLabel;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::try_from(s.to_string())
    }
}

impl AsRef<str> for StatLabel {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StatLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<StatLabel> for String {
    fn from(label: StatLabel) -> Self {
        label.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestStatus {
    Active,
    Completed,
    Skipped,
}

impl QuestStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for QuestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, thiserror::Error, PartialEq, Eq)]
#[error("progress {current} exceeds total {total}")]
pub struct ProgressOutOfRange {
    current: u32,
    total: u32,
}

/// Bounded quest progress. `current` is always within `[0, total]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ProgressRepr", into = "ProgressRepr")]
pub struct Progress {
    current: u32,
    total: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct ProgressRepr {
    current: u32,
    total: u32,
}

impl TryFrom<ProgressRepr> for Progress {
    type Error = ProgressOutOfRange;

    fn try_from(repr: ProgressRepr) -> Result<Self, Self::Error> {
        Self::new(repr.current, repr.total)
    }
}

impl From<Progress> for ProgressRepr {
    fn from(progress: Progress) -> Self {
        Self {
            current: progress.current,
            total: progress.total,
        }
    }
}

impl Progress {
    pub fn new(current: u32, total: u32) -> Result<Self, ProgressOutOfRange> {
        if current > total {
            return Err(ProgressOutOfRange { current, total });
        }
        Ok(Self { current, total })
    }

    /// Fresh zero progress toward `total`.
    pub const fn start(total: u32) -> Self {
        Self { current: 0, total }
    }

    pub const fn current(&self) -> u32 {
        self.current
    }

    pub const fn total(&self) -> u32 {
        self.total
    }

    pub const fn at_total(&self) -> bool {
        self.current == self.total
    }

    /// Same total with `current` clamped into range.
    pub(crate) fn with_current(self, current: u32) -> Self {
        Self {
            current: current.min(self.total),
            total: self.total,
        }
    }
}

/// An explicit per-quest stat payout, applied once on completion and negated
/// on a completed-undo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatIncrement {
    pub label: StatLabel,
    pub amount: i64,
}

pub(crate) const fn default_discipline_increment() -> u32 {
    1
}

/// A single trackable task instance with bounded progress and a reward payout
/// on completion.
///
/// `title` and `description` are display-only and opaque to the engine.
/// `completed_at` is `Some` exactly when `status == Completed`; the transition
/// functions maintain that invariant on every path, including skips of
/// previously completed quests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quest {
    pub id: QuestId,
    pub title: String,
    pub description: String,
    pub goal_id: GoalId,
    pub stat_tags: Vec<StatLabel>,
    pub status: QuestStatus,
    pub progress: Progress,
    pub stat_increments: Vec<StatIncrement>,
    #[serde(default = "default_discipline_increment")]
    pub discipline_increment: u32,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Quest {
    /// A fresh active quest with zero progress, as the content generator
    /// produces them.
    pub fn new(
        id: QuestId,
        title: impl Into<String>,
        description: impl Into<String>,
        goal_id: GoalId,
        total: u32,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            description: description.into(),
            goal_id,
            stat_tags: Vec::new(),
            status: QuestStatus::Active,
            progress: Progress::start(total),
            stat_increments: Vec::new(),
            discipline_increment: default_discipline_increment(),
            completed_at: None,
        }
    }
}
