//! Per-user session runtimes
//!
//! One event loop per active user: events for a session are processed
//! strictly in order, while sessions for distinct users run on independent
//! tasks.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::SessionRuntime;
pub use traits::{DatabaseProfiles, ProfileStore};

use crate::db::Database;
use crate::llm::CompletionService;
use crate::state_machine::{Event, Keyboard, SessionContext};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, RwLock};

/// Events pushed to connected chat frontends
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundEvent {
    /// A message for the user
    Reply {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        keyboard: Option<Keyboard>,
    },
    /// An update to the control that produced the latest selection
    EditControl {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        keyboard: Option<Keyboard>,
    },
}

/// Handle to interact with a running session
pub struct SessionHandle {
    pub event_tx: mpsc::Sender<Event>,
    pub broadcast_tx: broadcast::Sender<OutboundEvent>,
}

/// Manager for all per-user session runtimes
pub struct SessionManager {
    db: Database,
    completions: Option<Arc<dyn CompletionService>>,
    catalog: Arc<Vec<String>>,
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionManager {
    pub fn new(
        db: Database,
        completions: Option<Arc<dyn CompletionService>>,
        catalog: Vec<String>,
    ) -> Self {
        Self {
            db,
            completions,
            catalog: Arc::new(catalog),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Get or lazily create the runtime for `user_id`
    async fn get_or_create(&self, user_id: &str, username: Option<&str>) -> SessionHandle {
        {
            let sessions = self.sessions.read().await;
            if let Some(handle) = sessions.get(user_id) {
                return SessionHandle {
                    event_tx: handle.event_tx.clone(),
                    broadcast_tx: handle.broadcast_tx.clone(),
                };
            }
        }

        let context = SessionContext::new(user_id, username.map(String::from), self.catalog.clone());
        let (event_tx, event_rx) = mpsc::channel(32);
        let (broadcast_tx, _) = broadcast::channel(128);

        let runtime = SessionRuntime::new(
            context,
            DatabaseProfiles::new(self.db.clone()),
            self.completions.clone(),
            broadcast_tx.clone(),
        );

        let owner = user_id.to_string();
        tokio::spawn(async move {
            runtime.run(event_rx).await;
            tracing::info!(user_id = %owner, "Session runtime finished");
        });

        let mut sessions = self.sessions.write().await;
        // A concurrent request may have raced us here; the loser's runtime
        // stops on its own once its channel sender is dropped.
        let entry = sessions
            .entry(user_id.to_string())
            .or_insert(SessionHandle {
                event_tx,
                broadcast_tx,
            });
        SessionHandle {
            event_tx: entry.event_tx.clone(),
            broadcast_tx: entry.broadcast_tx.clone(),
        }
    }

    /// Queue an event for a user's session
    pub async fn send_event(
        &self,
        user_id: &str,
        username: Option<&str>,
        event: Event,
    ) -> Result<(), String> {
        let handle = self.get_or_create(user_id, username).await;
        handle
            .event_tx
            .send(event)
            .await
            .map_err(|e| format!("Failed to queue event: {e}"))
    }

    /// Subscribe to a user's outbound replies
    pub async fn subscribe(&self, user_id: &str) -> broadcast::Receiver<OutboundEvent> {
        self.get_or_create(user_id, None)
            .await
            .broadcast_tx
            .subscribe()
    }
}
