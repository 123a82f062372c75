//! Pure quest state transitions.
//!
//! Every function here is total over its inputs and never mutates them: it
//! either rejects with a [`TransitionError`] before anything happens, or
//! returns a [`Transition`] describing the post-transition quest plus the
//! bookkeeping the coordinator owes once the remote write commits -- a
//! snapshot instruction, a reward effect, and the outcome to publish.
//!
//! Completion is triggered exactly when `current` reaches `total`, via any of
//! `complete`, `increment`, or `set_progress`; `decrement` never triggers it
//! and never touches the snapshot ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TransitionError;
use crate::quest::{Quest, QuestStatus};
use crate::snapshot::SnapshotLedger;

/// A user-triggered command targeting a single quest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestCommand {
    Complete,
    Skip,
    Increment,
    Decrement,
    SetProgress(u32),
    Undo,
}

impl QuestCommand {
    pub(crate) const fn action(&self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Skip => "skip",
            Self::Increment => "increment",
            Self::Decrement => "decrement",
            Self::SetProgress(_) => "set_progress",
            Self::Undo => "undo",
        }
    }
}

/// What the coordinator must do to the snapshot ledger when it commits.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotInstruction {
    /// Leave the ledger untouched.
    Keep,
    /// Store this pre-transition copy, overwriting any previous slot.
    Store(Quest),
    /// Consume the slot that fed an undo.
    Spend,
}

/// Ledger work owed after the remote write commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewardEffect {
    None,
    /// Pay out discipline, explicit stat increments, and the completed tally.
    Payout,
    /// The same deltas, negated.
    Reversal,
}

/// Outcome published on the event channel. Progress updates that complete
/// nothing have no outcome and stay silent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestOutcome {
    Completed,
    Skipped,
    Undone,
}

impl std::fmt::Display for QuestOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Skipped => write!(f, "skipped"),
            Self::Undone => write!(f, "undone"),
        }
    }
}

/// The result of a pure transition: the quest to commit and the bookkeeping
/// it requires.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub quest: Quest,
    pub snapshot: SnapshotInstruction,
    pub effect: RewardEffect,
    pub outcome: Option<QuestOutcome>,
}

impl Transition {
    /// A no-op: the quest is returned unchanged and nothing else moves.
    /// Increment at cap and decrement at zero land here -- not errors.
    fn unchanged(quest: &Quest) -> Self {
        Self {
            quest: quest.clone(),
            snapshot: SnapshotInstruction::Keep,
            effect: RewardEffect::None,
            outcome: None,
        }
    }
}

/// Route a command to its transition function.
pub fn apply(
    command: QuestCommand,
    quest: &Quest,
    snapshots: &SnapshotLedger,
    now: DateTime<Utc>,
) -> Result<Transition, TransitionError> {
    match command {
        QuestCommand::Complete => complete(quest, now),
        QuestCommand::Skip => skip(quest),
        QuestCommand::Increment => increment(quest, now),
        QuestCommand::Decrement => decrement(quest),
        QuestCommand::SetProgress(count) => set_progress(quest, count, now),
        QuestCommand::Undo => undo(quest, snapshots),
    }
}

fn require_active(quest: &Quest, action: &'static str) -> Result<(), TransitionError> {
    if quest.status != QuestStatus::Active {
        return Err(TransitionError::InvalidState {
            id: quest.id.clone(),
            status: quest.status,
            action,
        });
    }
    Ok(())
}

/// The shared completing branch: snapshot the pre-transition quest, mark it
/// completed at `value`, stamp the timestamp, and owe a payout.
fn completing(quest: &Quest, value: u32, now: DateTime<Utc>) -> Transition {
    let mut next = quest.clone();
    next.status = QuestStatus::Completed;
    next.progress = next.progress.with_current(value);
    next.completed_at = Some(now);
    Transition {
        quest: next,
        snapshot: SnapshotInstruction::Store(quest.clone()),
        effect: RewardEffect::Payout,
        outcome: Some(QuestOutcome::Completed),
    }
}

/// Complete the quest outright. Fails on an already-completed quest; a
/// skipped quest may still be completed.
pub fn complete(quest: &Quest, now: DateTime<Utc>) -> Result<Transition, TransitionError> {
    if quest.status == QuestStatus::Completed {
        return Err(TransitionError::InvalidState {
            id: quest.id.clone(),
            status: quest.status,
            action: "complete",
        });
    }
    Ok(completing(quest, quest.progress.total(), now))
}

/// Skip the quest. Progress is intentionally left untouched -- skip is not
/// completion and pays nothing.
pub fn skip(quest: &Quest) -> Result<Transition, TransitionError> {
    if quest.status == QuestStatus::Skipped {
        return Err(TransitionError::InvalidState {
            id: quest.id.clone(),
            status: quest.status,
            action: "skip",
        });
    }
    let mut next = quest.clone();
    next.status = QuestStatus::Skipped;
    // completed_at is Some iff Completed; skipping a completed quest must
    // clear it.
    next.completed_at = None;
    Ok(Transition {
        quest: next,
        snapshot: SnapshotInstruction::Store(quest.clone()),
        effect: RewardEffect::None,
        outcome: Some(QuestOutcome::Skipped),
    })
}

/// Advance progress by one. Reaching `total` completes the quest; already at
/// cap is a silent no-op.
pub fn increment(quest: &Quest, now: DateTime<Utc>) -> Result<Transition, TransitionError> {
    require_active(quest, "increment")?;

    let current = quest.progress.current();
    let next_value = current.saturating_add(1).min(quest.progress.total());
    if next_value == current {
        return Ok(Transition::unchanged(quest));
    }
    if next_value == quest.progress.total() {
        return Ok(completing(quest, next_value, now));
    }

    let mut next = quest.clone();
    next.progress = next.progress.with_current(next_value);
    Ok(Transition {
        quest: next,
        snapshot: SnapshotInstruction::Keep,
        effect: RewardEffect::None,
        outcome: None,
    })
}

/// Step progress back by one. Never completes, never un-completes, never
/// touches the snapshot ledger; at zero it is a silent no-op.
pub fn decrement(quest: &Quest) -> Result<Transition, TransitionError> {
    require_active(quest, "decrement")?;

    let current = quest.progress.current();
    let next_value = current.saturating_sub(1);
    if next_value == current {
        return Ok(Transition::unchanged(quest));
    }

    let mut next = quest.clone();
    next.progress = next.progress.with_current(next_value);
    Ok(Transition {
        quest: next,
        snapshot: SnapshotInstruction::Keep,
        effect: RewardEffect::None,
        outcome: None,
    })
}

/// Set progress to `count`, clamped into `[0, total]`. Reaching `total`
/// follows the same completing branch as [`increment`].
pub fn set_progress(
    quest: &Quest,
    count: u32,
    now: DateTime<Utc>,
) -> Result<Transition, TransitionError> {
    require_active(quest, "set progress")?;

    let clamped = count.min(quest.progress.total());
    if clamped == quest.progress.current() {
        return Ok(Transition::unchanged(quest));
    }
    if clamped == quest.progress.total() {
        return Ok(completing(quest, clamped, now));
    }

    let mut next = quest.clone();
    next.progress = next.progress.with_current(clamped);
    Ok(Transition {
        quest: next,
        snapshot: SnapshotInstruction::Keep,
        effect: RewardEffect::None,
        outcome: None,
    })
}

/// Reverse the most recent completing or skipping transition.
///
/// Always forces the quest back to Active and clears `completed_at`. Undoing
/// a completed quest restarts progress from zero (rather than resuming at
/// `total - 1`) and owes a reward reversal; undoing a skipped quest restores
/// progress unchanged from the snapshot and owes nothing, since skip never
/// touched the ledger.
///
/// The snapshot slot is spent by the commit, so a second undo without an
/// intervening completing/skipping transition fails with `NoSnapshot`.
pub fn undo(quest: &Quest, snapshots: &SnapshotLedger) -> Result<Transition, TransitionError> {
    let snapshot = snapshots
        .peek(&quest.id)
        .ok_or_else(|| TransitionError::NoSnapshot(quest.id.clone()))?;

    let reversing_completion = quest.status == QuestStatus::Completed;

    let mut next = quest.clone();
    next.status = QuestStatus::Active;
    next.completed_at = None;
    next.progress = if reversing_completion {
        next.progress.with_current(0)
    } else {
        next.progress.with_current(snapshot.progress.current())
    };

    Ok(Transition {
        quest: next,
        snapshot: SnapshotInstruction::Spend,
        effect: if reversing_completion {
            RewardEffect::Reversal
        } else {
            RewardEffect::None
        },
        outcome: Some(QuestOutcome::Undone),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quest::{GoalId, QuestId, StatIncrement, StatLabel};

    fn quest(total: u32, current: u32) -> Quest {
        let mut quest = Quest::new(
            QuestId::try_from("q1").unwrap(),
            "Stretch",
            "Morning stretch routine",
            GoalId::from("g1"),
            total,
        );
        quest.progress = quest.progress.with_current(current);
        quest.stat_increments = vec![StatIncrement {
            label: StatLabel::try_from("STR").unwrap(),
            amount: 1,
        }];
        quest
    }

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn complete_marks_terminal_state_and_snapshots_prior() {
        let q = quest(3, 1);
        let transition = complete(&q, now()).unwrap();

        assert_eq!(transition.quest.status, QuestStatus::Completed);
        assert_eq!(transition.quest.progress.current(), 3);
        assert!(transition.quest.completed_at.is_some());
        assert_eq!(transition.effect, RewardEffect::Payout);
        assert_eq!(transition.outcome, Some(QuestOutcome::Completed));
        assert_eq!(transition.snapshot, SnapshotInstruction::Store(q));
    }

    #[test]
    fn complete_on_completed_is_invalid_state() {
        let q = complete(&quest(3, 1), now()).unwrap().quest;
        let error = complete(&q, now()).unwrap_err();
        assert!(matches!(error, TransitionError::InvalidState { .. }));
    }

    #[test]
    fn complete_on_skipped_is_allowed() {
        let q = skip(&quest(3, 1)).unwrap().quest;
        let transition = complete(&q, now()).unwrap();
        assert_eq!(transition.quest.status, QuestStatus::Completed);
        assert_eq!(transition.effect, RewardEffect::Payout);
    }

    #[test]
    fn skip_leaves_progress_untouched_and_pays_nothing() {
        let q = quest(3, 2);
        let transition = skip(&q).unwrap();

        assert_eq!(transition.quest.status, QuestStatus::Skipped);
        assert_eq!(transition.quest.progress.current(), 2);
        assert_eq!(transition.effect, RewardEffect::None);
        assert_eq!(transition.outcome, Some(QuestOutcome::Skipped));
    }

    #[test]
    fn skip_on_skipped_is_invalid_state() {
        let q = skip(&quest(3, 0)).unwrap().quest;
        assert!(matches!(
            skip(&q).unwrap_err(),
            TransitionError::InvalidState { .. }
        ));
    }

    #[test]
    fn skip_of_completed_quest_clears_completed_at() {
        let completed = complete(&quest(3, 0), now()).unwrap().quest;
        let transition = skip(&completed).unwrap();
        assert_eq!(transition.quest.completed_at, None);
    }

    #[test]
    fn increment_advances_without_reward_below_total() {
        let transition = increment(&quest(3, 0), now()).unwrap();

        assert_eq!(transition.quest.progress.current(), 1);
        assert_eq!(transition.quest.status, QuestStatus::Active);
        assert_eq!(transition.effect, RewardEffect::None);
        assert_eq!(transition.outcome, None);
        assert_eq!(transition.snapshot, SnapshotInstruction::Keep);
    }

    #[test]
    fn increment_reaching_total_completes() {
        let q = quest(3, 2);
        let transition = increment(&q, now()).unwrap();

        assert_eq!(transition.quest.status, QuestStatus::Completed);
        assert_eq!(transition.quest.progress.current(), 3);
        assert!(transition.quest.completed_at.is_some());
        assert_eq!(transition.effect, RewardEffect::Payout);
        assert_eq!(transition.snapshot, SnapshotInstruction::Store(q));
    }

    #[test]
    fn increment_requires_reward_update_exactly_once_over_a_full_run() {
        let mut q = quest(3, 0);
        let mut payouts = 0;
        for _ in 0..3 {
            let transition = increment(&q, now()).unwrap();
            if transition.effect == RewardEffect::Payout {
                payouts += 1;
            }
            q = transition.quest;
        }
        assert_eq!(q.status, QuestStatus::Completed);
        assert_eq!(q.progress.current(), 3);
        assert_eq!(payouts, 1);
    }

    #[test]
    fn increment_at_cap_is_a_noop_not_an_error() {
        // An active quest sitting at total (seeded that way externally) stays
        // put: the cap branch wins over the completion branch.
        let mut q = quest(3, 0);
        q.progress = q.progress.with_current(3);
        let transition = increment(&q, now()).unwrap();

        assert_eq!(transition.quest, q);
        assert_eq!(transition.effect, RewardEffect::None);
        assert_eq!(transition.snapshot, SnapshotInstruction::Keep);
    }

    #[test]
    fn increment_on_non_active_is_invalid_state() {
        let completed = complete(&quest(3, 0), now()).unwrap().quest;
        assert!(matches!(
            increment(&completed, now()).unwrap_err(),
            TransitionError::InvalidState { .. }
        ));
    }

    #[test]
    fn decrement_steps_back_and_floors_at_zero() {
        let stepped = decrement(&quest(3, 2)).unwrap();
        assert_eq!(stepped.quest.progress.current(), 1);

        let floored = decrement(&quest(3, 0)).unwrap();
        assert_eq!(floored.quest.progress.current(), 0);
        assert_eq!(floored.effect, RewardEffect::None);
    }

    #[test]
    fn decrement_cannot_uncomplete() {
        let completed = complete(&quest(3, 0), now()).unwrap().quest;
        assert!(matches!(
            decrement(&completed).unwrap_err(),
            TransitionError::InvalidState { .. }
        ));
    }

    #[test]
    fn set_progress_clamps_and_completes_at_total() {
        let clamped = set_progress(&quest(3, 0), 99, now()).unwrap();
        assert_eq!(clamped.quest.progress.current(), 3);
        assert_eq!(clamped.quest.status, QuestStatus::Completed);
        assert_eq!(clamped.effect, RewardEffect::Payout);

        let partial = set_progress(&quest(3, 0), 2, now()).unwrap();
        assert_eq!(partial.quest.progress.current(), 2);
        assert_eq!(partial.quest.status, QuestStatus::Active);
        assert_eq!(partial.effect, RewardEffect::None);
    }

    #[test]
    fn set_progress_to_current_is_a_noop() {
        let q = quest(3, 2);
        let transition = set_progress(&q, 2, now()).unwrap();
        assert_eq!(transition.quest, q);
        assert_eq!(transition.snapshot, SnapshotInstruction::Keep);
    }

    #[test]
    fn undo_of_completed_restarts_from_zero_and_reverses() {
        let original = quest(3, 2);
        let completed = complete(&original, now()).unwrap();

        let mut snapshots = SnapshotLedger::new();
        if let SnapshotInstruction::Store(prior) = completed.snapshot {
            snapshots.put(prior);
        }

        let undone = undo(&completed.quest, &snapshots).unwrap();
        assert_eq!(undone.quest.status, QuestStatus::Active);
        assert_eq!(undone.quest.progress.current(), 0);
        assert_eq!(undone.quest.completed_at, None);
        assert_eq!(undone.effect, RewardEffect::Reversal);
        assert_eq!(undone.outcome, Some(QuestOutcome::Undone));
        assert_eq!(undone.snapshot, SnapshotInstruction::Spend);
    }

    #[test]
    fn undo_of_skipped_restores_snapshot_progress_without_reversal() {
        let original = quest(3, 2);
        let skipped = skip(&original).unwrap();

        let mut snapshots = SnapshotLedger::new();
        if let SnapshotInstruction::Store(prior) = skipped.snapshot {
            snapshots.put(prior);
        }

        let undone = undo(&skipped.quest, &snapshots).unwrap();
        assert_eq!(undone.quest.status, QuestStatus::Active);
        assert_eq!(undone.quest.progress.current(), 2);
        assert_eq!(undone.effect, RewardEffect::None);
    }

    #[test]
    fn undo_without_snapshot_fails() {
        let q = quest(3, 0);
        let snapshots = SnapshotLedger::new();
        assert_eq!(
            undo(&q, &snapshots).unwrap_err(),
            TransitionError::NoSnapshot(q.id)
        );
    }

    #[test]
    fn transitions_never_mutate_their_input() {
        let q = quest(3, 1);
        let before = q.clone();
        let _ = complete(&q, now()).unwrap();
        let _ = skip(&q).unwrap();
        let _ = increment(&q, now()).unwrap();
        let _ = decrement(&q).unwrap();
        let _ = set_progress(&q, 2, now()).unwrap();
        assert_eq!(q, before);
    }

    #[test]
    fn progress_invariant_holds_across_every_transition() {
        let mut q = quest(3, 0);
        let commands = [
            QuestCommand::Increment,
            QuestCommand::SetProgress(99),
            QuestCommand::Undo,
            QuestCommand::Increment,
            QuestCommand::Decrement,
            QuestCommand::Decrement,
            QuestCommand::Decrement,
            QuestCommand::Skip,
            QuestCommand::Undo,
            QuestCommand::Complete,
        ];

        let mut snapshots = SnapshotLedger::new();
        for command in commands {
            let Ok(transition) = apply(command, &q, &snapshots, now()) else {
                continue;
            };
            match transition.snapshot {
                SnapshotInstruction::Store(prior) => snapshots.put(prior),
                SnapshotInstruction::Spend => {
                    snapshots.take(&transition.quest.id);
                }
                SnapshotInstruction::Keep => {}
            }
            q = transition.quest;
            assert!(q.progress.current() <= q.progress.total());
        }
    }
}
