//! Optimistic mutation coordinator for quest commands.
//!
//! Each dispatched command runs an all-or-nothing sequence: checkpoint the
//! quest list and snapshot ledger, run the pure transition, apply it
//! optimistically in memory, checkpoint the durable cache (best-effort),
//! write to the authoritative repository, and only then settle rewards and
//! publish a transition event. A failed remote write restores the checkpoint
//! to memory *and* to the cache before the error surfaces, so a failed
//! command leaves every view exactly as it was. There is no partially
//! committed outcome, no retry, and no cancellation: a started command runs
//! to commit or rollback.
//!
//! Reward settlement is strictly sequential -- discipline delta, then each
//! explicit stat delta, then the completed-quest tally, each awaited before
//! the next -- so bonus totals are always computed from a stable prior value.
//! A profile-service failure partway through is logged and leaves
//! already-applied deltas in place; the quest transition stays committed.
//!
//! # Single-flight
//!
//! Commands for the same quest id are serialized on a per-id async mutex: a
//! second command for a quest waits for the first to commit or roll back,
//! turning the caller convention into a hard guarantee. Commands for
//! different ids interleave freely at suspension points, with no
//! cross-command ordering guarantee beyond each command's own atomicity.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex as StdMutex};

use chrono::Utc;
use tokio::sync::{broadcast, Mutex};
use tracing::{info, instrument, warn};

use crate::cache::DurableCache;
use crate::config::QuestlineConfig;
use crate::error::CommandError;
use crate::notify::QuestEvent;
use crate::profile::{ProfileService, ProfileUpdate};
use crate::quest::{Quest, QuestId, UserId};
use crate::repository::QuestRepository;
use crate::reward::RewardLedger;
use crate::snapshot::SnapshotLedger;
use crate::transition::{self, QuestCommand, RewardEffect, SnapshotInstruction, Transition};

/// Everything a command may mutate, behind one short-lived lock. Held only
/// across synchronous sections, never across an await.
struct EngineState {
    quests: BTreeMap<QuestId, Quest>,
    snapshots: SnapshotLedger,
    rewards: RewardLedger,
}

/// Full pre-command copy taken before the optimistic apply.
struct Checkpoint {
    quests: BTreeMap<QuestId, Quest>,
    snapshots: SnapshotLedger,
}

pub struct QuestEngine<R, C, P> {
    repository: Arc<R>,
    cache: Arc<C>,
    profile: Arc<P>,
    user: UserId,
    config: QuestlineConfig,
    state: StdMutex<EngineState>,
    flights: Mutex<HashMap<QuestId, Arc<Mutex<()>>>>,
    events: broadcast::Sender<QuestEvent>,
}

impl<R, C, P> QuestEngine<R, C, P>
where
    R: QuestRepository,
    C: DurableCache,
    P: ProfileService,
{
    pub fn new(
        repository: Arc<R>,
        cache: Arc<C>,
        profile: Arc<P>,
        user: UserId,
        config: QuestlineConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity);
        Self {
            repository,
            cache,
            profile,
            user,
            config,
            state: StdMutex::new(EngineState {
                quests: BTreeMap::new(),
                snapshots: SnapshotLedger::new(),
                rewards: RewardLedger::new(),
            }),
            flights: Mutex::new(HashMap::new()),
            events,
        }
    }

    /// Seed the reward ledger, as account setup does once.
    pub fn with_reward_ledger(mut self, rewards: RewardLedger) -> Self {
        match self.state.get_mut() {
            Ok(state) => state.rewards = rewards,
            Err(poison) => poison.into_inner().rewards = rewards,
        }
        self
    }

    /// Seed a quest from the upstream content generator.
    pub fn insert_quest(&self, quest: Quest) {
        self.state_guard().quests.insert(quest.id.clone(), quest);
    }

    pub fn insert_quests(&self, quests: impl IntoIterator<Item = Quest>) {
        let mut state = self.state_guard();
        for quest in quests {
            state.quests.insert(quest.id.clone(), quest);
        }
    }

    pub fn quest(&self, id: &QuestId) -> Option<Quest> {
        self.state_guard().quests.get(id).cloned()
    }

    /// All quests, ordered by id.
    pub fn quests(&self) -> Vec<Quest> {
        self.state_guard().quests.values().cloned().collect()
    }

    pub fn snapshots(&self) -> SnapshotLedger {
        self.state_guard().snapshots.clone()
    }

    pub fn rewards(&self) -> RewardLedger {
        self.state_guard().rewards.clone()
    }

    pub fn completed_quests(&self) -> u32 {
        self.state_guard().rewards.completed_quests()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QuestEvent> {
        self.events.subscribe()
    }

    /// Replace the in-memory quest list from the cache checkpoint, if one is
    /// present and decodes. Returns the number of quests loaded. Misses,
    /// expiry, and corrupt blobs all fall back to the current list (logged,
    /// never fatal); the repository remains authoritative either way.
    pub async fn hydrate_from_cache(&self) -> usize {
        let blob = match self.cache.get(&self.cache_key()).await {
            Ok(Some(blob)) => blob,
            Ok(None) => return 0,
            Err(error) => {
                warn!(%error, "cache read failed during hydration");
                return 0;
            }
        };

        match serde_json::from_str::<Vec<Quest>>(&blob) {
            Ok(quests) => {
                let count = quests.len();
                let mut state = self.state_guard();
                state.quests = quests.into_iter().map(|q| (q.id.clone(), q)).collect();
                count
            }
            Err(error) => {
                warn!(%error, "discarding corrupt cached quest list");
                0
            }
        }
    }

    /// Run one command end-to-end: commit everywhere or roll back everywhere.
    #[instrument(
        skip(self, command),
        fields(user = %self.user, quest = %id, action = command.action())
    )]
    pub async fn dispatch(
        &self,
        id: &QuestId,
        command: QuestCommand,
    ) -> Result<Quest, CommandError> {
        let flight = self.flight(id).await;
        let _in_flight = flight.lock().await;

        // Checkpoint and transition under one short state lock. Pre-mutation
        // failures reject here with nothing to roll back.
        let (checkpoint, transition, updated) = {
            let mut state = self.state_guard();
            let quest = state
                .quests
                .get(id)
                .ok_or_else(|| CommandError::NotFound(id.clone()))?;
            let transition = transition::apply(command, quest, &state.snapshots, Utc::now())?;
            let checkpoint = Checkpoint {
                quests: state.quests.clone(),
                snapshots: state.snapshots.clone(),
            };
            Self::apply_optimistic(&mut state, &transition);
            let updated: Vec<Quest> = state.quests.values().cloned().collect();
            (checkpoint, transition, updated)
        };

        self.checkpoint_cache(&updated).await;

        if let Err(error) = self.repository.update(transition.quest.clone()).await {
            self.rollback(checkpoint).await;
            return Err(CommandError::Remote(error));
        }

        if transition.effect != RewardEffect::None {
            self.settle_rewards(&transition).await;
        }

        if let Some(outcome) = transition.outcome {
            // A send error only means nobody is subscribed right now.
            let _ = self.events.send(QuestEvent {
                outcome,
                quest_id: transition.quest.id.clone(),
                title: transition.quest.title.clone(),
            });
        }

        info!(status = %transition.quest.status, "command committed");
        Ok(transition.quest)
    }

    fn apply_optimistic(state: &mut EngineState, transition: &Transition) {
        state
            .quests
            .insert(transition.quest.id.clone(), transition.quest.clone());
        match &transition.snapshot {
            SnapshotInstruction::Keep => {}
            SnapshotInstruction::Store(prior) => state.snapshots.put(prior.clone()),
            SnapshotInstruction::Spend => {
                state.snapshots.take(&transition.quest.id);
            }
        }
    }

    /// Restore the pre-command checkpoint to memory and to the cache.
    async fn rollback(&self, checkpoint: Checkpoint) {
        let restored: Vec<Quest> = {
            let mut state = self.state_guard();
            state.quests = checkpoint.quests;
            state.snapshots = checkpoint.snapshots;
            state.quests.values().cloned().collect()
        };
        self.checkpoint_cache(&restored).await;
        info!("rolled back to pre-command state");
    }

    /// Write the quest list to the durable cache. Best-effort: the cache is
    /// never the source of truth, so failures are logged and ignored.
    async fn checkpoint_cache(&self, quests: &[Quest]) {
        let blob = match serde_json::to_string(quests) {
            Ok(blob) => blob,
            Err(error) => {
                warn!(%error, "could not encode quest list for cache checkpoint");
                return;
            }
        };
        if let Err(error) = self
            .cache
            .set(&self.cache_key(), blob, self.config.cache_ttl())
            .await
        {
            warn!(%error, "durable cache checkpoint failed; continuing");
        }
    }

    /// Apply the payout or reversal: discipline, then each explicit stat
    /// delta, then the completed tally -- sequentially, in that fixed order.
    async fn settle_rewards(&self, transition: &Transition) {
        let sign: i64 = match transition.effect {
            RewardEffect::Payout => 1,
            RewardEffect::Reversal => -1,
            RewardEffect::None => return,
        };
        let quest = &transition.quest;

        let discipline = sign * i64::from(quest.discipline_increment);
        self.with_rewards(|rewards| rewards.apply_discipline(discipline));
        if let Err(error) = self
            .profile
            .increment_discipline_bonus(&self.user, discipline)
            .await
        {
            warn!(%error, "discipline bonus update failed; quest transition stays committed");
        }

        for increment in &quest.stat_increments {
            let amount = sign * increment.amount;
            self.with_rewards(|rewards| rewards.apply_stat(&increment.label, amount));
            if let Err(error) = self
                .profile
                .increment_stat_bonus(&self.user, &increment.label, amount)
                .await
            {
                warn!(
                    %error,
                    label = %increment.label,
                    "stat bonus update failed; quest transition stays committed"
                );
            }
        }

        let completed = self.with_rewards(|rewards| {
            rewards.record_completed(sign);
            rewards.completed_quests()
        });
        if let Err(error) = self
            .profile
            .update_profile(
                &self.user,
                ProfileUpdate {
                    completed_quests_count: completed,
                },
            )
            .await
        {
            warn!(%error, "completed-quest counter update failed; quest transition stays committed");
        }
    }

    async fn flight(&self, id: &QuestId) -> Arc<Mutex<()>> {
        let mut flights = self.flights.lock().await;
        flights.entry(id.clone()).or_default().clone()
    }

    fn cache_key(&self) -> String {
        format!("{}:{}", self.config.cache_key_prefix, self.user)
    }

    fn state_guard(&self) -> std::sync::MutexGuard<'_, EngineState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poison) => poison.into_inner(),
        }
    }

    fn with_rewards<T>(&self, f: impl FnOnce(&mut RewardLedger) -> T) -> T {
        let mut state = self.state_guard();
        f(&mut state.rewards)
    }
}
