//! Transition events and the notification boundary.
//!
//! The engine publishes structured [`QuestEvent`]s on a broadcast channel
//! after a command fully commits; rendering them to the user is a subscriber
//! concern. [`spawn_notifier`] bridges the channel to a [`NotificationEmitter`]
//! so hosts that just want toasts can attach one without touching the engine.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::quest::QuestId;
use crate::transition::QuestOutcome;

/// Published once per committed completing/skipping/undoing command. Partial
/// progress updates publish nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestEvent {
    pub outcome: QuestOutcome,
    pub quest_id: QuestId,
    pub title: String,
}

/// Fire-and-forget notification sink; delivery is best-effort and purely
/// informational.
#[async_trait]
pub trait NotificationEmitter: Send + Sync + 'static {
    async fn emit(&self, outcome: QuestOutcome, title: &str);
}

/// Default emitter: renders outcomes as log lines.
#[derive(Debug, Default, Clone)]
pub struct TracingEmitter;

#[async_trait]
impl NotificationEmitter for TracingEmitter {
    async fn emit(&self, outcome: QuestOutcome, title: &str) {
        info!(%outcome, title, "quest {outcome}: {title}");
    }
}

/// Forward engine events to an emitter until the engine is dropped.
///
/// A lagged receiver drops the missed events and keeps going; notifications
/// carry no delivery guarantee.
pub fn spawn_notifier<E: NotificationEmitter>(
    mut events: broadcast::Receiver<QuestEvent>,
    emitter: E,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => emitter.emit(event.outcome, &event.title).await,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!("notifier lagged, dropped {missed} events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
