//! Profile/stat persistence boundary.
//!
//! The coordinator's reward step pushes each delta through here as a single
//! awaited call. A failed call is logged and does not roll back deltas that
//! already landed; retry and consistency policy belong to the service behind
//! the trait, not to this engine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::ProfileError;
use crate::quest::{StatLabel, UserId};

/// Absolute profile fields pushed after a completing or undoing command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub completed_quests_count: u32,
}

#[async_trait]
pub trait ProfileService: Send + Sync + 'static {
    async fn increment_stat_bonus(
        &self,
        user: &UserId,
        label: &StatLabel,
        amount: i64,
    ) -> Result<(), ProfileError>;

    async fn increment_discipline_bonus(&self, user: &UserId, amount: i64)
        -> Result<(), ProfileError>;

    async fn update_profile(&self, user: &UserId, update: ProfileUpdate)
        -> Result<(), ProfileError>;
}

/// One observed call, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileCall {
    StatBonus {
        user: UserId,
        label: StatLabel,
        amount: i64,
    },
    DisciplineBonus {
        user: UserId,
        amount: i64,
    },
    Profile {
        user: UserId,
        completed_quests_count: u32,
    },
}

/// Recording fake with per-path failure injection, for exercising the
/// partial-failure behavior of the reward step.
#[derive(Debug, Default, Clone)]
pub struct InMemoryProfileService {
    calls: Arc<Mutex<Vec<ProfileCall>>>,
    fail_stat_bonus: Arc<AtomicBool>,
}

impl InMemoryProfileService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent stat-bonus call fail; discipline and profile
    /// calls keep succeeding.
    pub fn set_fail_stat_bonus(&self, fail: bool) {
        self.fail_stat_bonus.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<ProfileCall> {
        self.guard().clone()
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, Vec<ProfileCall>> {
        match self.calls.lock() {
            Ok(guard) => guard,
            Err(poison) => poison.into_inner(),
        }
    }
}

#[async_trait]
impl ProfileService for InMemoryProfileService {
    async fn increment_stat_bonus(
        &self,
        user: &UserId,
        label: &StatLabel,
        amount: i64,
    ) -> Result<(), ProfileError> {
        if self.fail_stat_bonus.load(Ordering::SeqCst) {
            return Err(ProfileError::Rejected(format!(
                "simulated stat bonus failure for {label}"
            )));
        }
        self.guard().push(ProfileCall::StatBonus {
            user: user.clone(),
            label: label.clone(),
            amount,
        });
        Ok(())
    }

    async fn increment_discipline_bonus(
        &self,
        user: &UserId,
        amount: i64,
    ) -> Result<(), ProfileError> {
        self.guard().push(ProfileCall::DisciplineBonus {
            user: user.clone(),
            amount,
        });
        Ok(())
    }

    async fn update_profile(
        &self,
        user: &UserId,
        update: ProfileUpdate,
    ) -> Result<(), ProfileError> {
        self.guard().push(ProfileCall::Profile {
            user: user.clone(),
            completed_quests_count: update.completed_quests_count,
        });
        Ok(())
    }
}
