//! Session Registry — at most one autonomous loop per session id.
//!
//! The registry owns the shared inbox and event bus and hands both to every
//! loop it creates.

use std::collections::HashMap;
use std::sync::Arc;

use autoclaw_core::config::{AutoClawConfig, AutonomousConfig};
use autoclaw_core::error::{AutoClawError, Result};
use autoclaw_core::traits::{Executor, GoalSource};
use autoclaw_core::types::Priority;
use tokio::sync::Mutex;

use crate::events::{EventBus, EventSubscription};
use crate::inbox::{Inbox, Metadata, QueueEntry};
use crate::runner::{AutonomousLoop, LoopStatus};

pub struct SessionRegistry {
    config: AutonomousConfig,
    inbox: Arc<Inbox>,
    events: Arc<EventBus>,
    loops: Mutex<HashMap<String, Arc<AutonomousLoop>>>,
}

impl SessionRegistry {
    pub fn new(config: AutonomousConfig, inbox: Arc<Inbox>, events: Arc<EventBus>) -> Self {
        Self {
            config,
            inbox,
            events,
            loops: Mutex::new(HashMap::new()),
        }
    }

    /// Fresh inbox and event bus sized from config.
    pub fn from_config(config: &AutoClawConfig) -> Self {
        Self::new(
            config.autonomous.clone(),
            Arc::new(Inbox::new()),
            Arc::new(EventBus::new(config.events.capacity)),
        )
    }

    pub fn inbox(&self) -> &Arc<Inbox> {
        &self.inbox
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Return the session's loop, creating it on first use.
    ///
    /// An existing loop is returned unchanged; the collaborators passed in
    /// are ignored then. Creating a loop requires an executor.
    pub async fn get_or_create(
        &self,
        session_id: &str,
        executor: Option<Arc<dyn Executor>>,
        goals: Arc<dyn GoalSource>,
    ) -> Result<Arc<AutonomousLoop>> {
        let mut loops = self.loops.lock().await;
        if let Some(existing) = loops.get(session_id) {
            return Ok(existing.clone());
        }

        let Some(executor) = executor else {
            return Err(AutoClawError::InvalidSession(format!(
                "no loop for session '{session_id}' and no executor to create one"
            )));
        };

        let lp = Arc::new(AutonomousLoop::new(
            session_id,
            self.config.clone(),
            executor,
            goals,
            self.inbox.clone(),
            self.events.clone(),
        ));
        loops.insert(session_id.to_string(), lp.clone());
        tracing::info!("🆕 Created autonomous loop for session '{}'", session_id);
        Ok(lp)
    }

    pub async fn get(&self, session_id: &str) -> Option<Arc<AutonomousLoop>> {
        self.loops.lock().await.get(session_id).cloned()
    }

    /// Stop and forget a session's loop. Its queued messages stay in the inbox.
    pub async fn remove(&self, session_id: &str) -> bool {
        let removed = self.loops.lock().await.remove(session_id);
        match removed {
            Some(lp) => {
                lp.stop().await;
                tracing::info!("🗑️ Removed autonomous loop for session '{}'", session_id);
                true
            }
            None => false,
        }
    }

    /// Session ids with a loop, sorted.
    pub async fn sessions(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.loops.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn statuses(&self) -> Vec<LoopStatus> {
        let loops = self.snapshot().await;
        let mut statuses = futures::future::join_all(loops.iter().map(|lp| lp.status())).await;
        statuses.sort_by(|a, b| a.session_id.cmp(&b.session_id));
        statuses
    }

    /// Queue a message for a session's loop.
    pub async fn enqueue(
        &self,
        session_id: &str,
        message: impl Into<String>,
        priority: Priority,
        metadata: Option<Metadata>,
    ) -> QueueEntry {
        self.inbox.enqueue(session_id, message, priority, metadata).await
    }

    pub fn subscribe_events(&self, session_id: &str) -> EventSubscription {
        self.events.subscribe(session_id)
    }

    /// Stop every loop concurrently. Loops stay registered and can be restarted.
    pub async fn shutdown(&self) {
        let loops = self.snapshot().await;
        futures::future::join_all(loops.iter().map(|lp| lp.stop())).await;
        tracing::info!("🛑 Stopped {} autonomous loop(s)", loops.len());
    }

    async fn snapshot(&self) -> Vec<Arc<AutonomousLoop>> {
        self.loops.lock().await.values().cloned().collect()
    }
}
