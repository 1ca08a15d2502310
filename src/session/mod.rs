//! Session store
//!
//! Process-wide table of session-id → execution-progress record.
//! Owned by one `SessionManager` constructed at startup and injected into the
//! coordinator; safe for concurrent read/write from independent session
//! executions. Sessions are evicted after a TTL since the last update.

use crate::models::{CapabilityStatus, Session, SessionStatus};
use crate::Result;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

/// Default time-to-live for a session record since its last update.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(3600);

/// Concurrency-safe session table with TTL eviction.
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<Uuid, Session>>>,
    ttl: chrono::Duration,
}

impl SessionManager {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::hours(1)),
        }
    }

    /// Create a session for a newly submitted query.
    pub async fn create(&self, query: &str) -> Uuid {
        let session_id = Uuid::new_v4();
        let now = Utc::now();

        let session = Session {
            session_id,
            query: query.to_string(),
            current_step: "Initializing".to_string(),
            overall_status: SessionStatus::Initializing,
            progress_percentage: 0.0,
            capabilities_status: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        let mut sessions = self.sessions.write().await;
        sessions.insert(session_id, session);

        debug!(session_id = %session_id, "Session created");
        session_id
    }

    /// Fetch a session's progress record. Expired sessions are evicted lazily
    /// here so a stale id reports not-found even between sweeps.
    pub async fn get(&self, session_id: Uuid) -> Result<Session> {
        {
            let sessions = self.sessions.read().await;
            if let Some(session) = sessions.get(&session_id) {
                if !self.is_expired(session) {
                    return Ok(session.clone());
                }
            } else {
                return Err(crate::error::OrchestrationError::SessionNotFound(session_id));
            }
        }

        let mut sessions = self.sessions.write().await;
        sessions.remove(&session_id);
        Err(crate::error::OrchestrationError::SessionNotFound(session_id))
    }

    /// Update the step label, overall status and progress for a session.
    ///
    /// Progress never decreases: a write below the stored value is clamped to
    /// the stored maximum.
    pub async fn update_step(
        &self,
        session_id: Uuid,
        step: &str,
        overall_status: SessionStatus,
        progress: f32,
    ) {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(&session_id) {
            session.current_step = step.to_string();
            session.overall_status = overall_status;
            session.progress_percentage = session.progress_percentage.max(progress.clamp(0.0, 100.0));
            session.updated_at = Utc::now();
        }
    }

    /// Replace the status record for a capability, appending if new.
    /// Idempotent with respect to the capability: two upserts with the same
    /// capability leave exactly one record holding the latest payload.
    pub async fn upsert_capability_status(&self, session_id: Uuid, status: CapabilityStatus) {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(&session_id) else {
            return;
        };

        match session
            .capabilities_status
            .iter_mut()
            .find(|existing| existing.capability == status.capability)
        {
            Some(existing) => *existing = status,
            None => session.capabilities_status.push(status),
        }
        session.updated_at = Utc::now();
    }

    /// Remove a session. Returns not-found on the second call for the same id.
    pub async fn delete(&self, session_id: Uuid) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        if sessions.remove(&session_id).is_some() {
            debug!(session_id = %session_id, "Session deleted");
            Ok(())
        } else {
            Err(crate::error::OrchestrationError::SessionNotFound(session_id))
        }
    }

    /// Number of live (non-expired) sessions.
    pub async fn active_count(&self) -> usize {
        let sessions = self.sessions.read().await;
        sessions
            .values()
            .filter(|session| !self.is_expired(session))
            .count()
    }

    /// Sweep out sessions whose last update is older than the TTL.
    pub async fn evict_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !self.is_expired(session));
        let evicted = before - sessions.len();

        if evicted > 0 {
            info!(evicted, "Evicted expired sessions");
        }
        evicted
    }

    fn is_expired(&self, session: &Session) -> bool {
        Utc::now() - session.updated_at > self.ttl
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Capability, CapabilityState};

    #[tokio::test]
    async fn test_create_and_get() {
        let manager = SessionManager::default();
        let id = manager.create("what is RSI?").await;

        let session = manager.get(id).await.unwrap();
        assert_eq!(session.query, "what is RSI?");
        assert_eq!(session.overall_status, SessionStatus::Initializing);
        assert_eq!(session.progress_percentage, 0.0);
    }

    #[tokio::test]
    async fn test_get_unknown_session() {
        let manager = SessionManager::default();
        let result = manager.get(Uuid::new_v4()).await;
        assert!(matches!(
            result,
            Err(crate::error::OrchestrationError::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_progress_never_decreases() {
        let manager = SessionManager::default();
        let id = manager.create("q").await;

        manager
            .update_step(id, "Executing", SessionStatus::Executing, 60.0)
            .await;
        manager
            .update_step(id, "Executing", SessionStatus::Executing, 40.0)
            .await;

        let session = manager.get(id).await.unwrap();
        assert_eq!(session.progress_percentage, 60.0);
        assert_eq!(session.current_step, "Executing");
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent_by_capability() {
        let manager = SessionManager::default();
        let id = manager.create("q").await;

        let mut status = CapabilityStatus::waiting(Capability::MarketData);
        manager.upsert_capability_status(id, status.clone()).await;

        status.state = CapabilityState::Completed;
        status.description = "Retrieved stock price data".to_string();
        manager.upsert_capability_status(id, status).await;

        let session = manager.get(id).await.unwrap();
        assert_eq!(session.capabilities_status.len(), 1);
        assert_eq!(
            session.capabilities_status[0].state,
            CapabilityState::Completed
        );
    }

    #[tokio::test]
    async fn test_delete_not_idempotent_but_safe() {
        let manager = SessionManager::default();
        let id = manager.create("q").await;

        assert!(manager.delete(id).await.is_ok());
        assert!(manager.delete(id).await.is_err());
    }

    #[tokio::test]
    async fn test_ttl_eviction() {
        let manager = SessionManager::new(Duration::from_millis(10));
        let id = manager.create("q").await;

        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(manager.evict_expired().await, 1);
        assert!(manager.get(id).await.is_err());
        assert_eq!(manager.active_count().await, 0);
    }

    #[tokio::test]
    async fn test_lazy_eviction_on_get() {
        let manager = SessionManager::new(Duration::from_millis(10));
        let id = manager.create("q").await;

        tokio::time::sleep(Duration::from_millis(30)).await;

        // No sweep has run, but the stale id must still be not-found
        assert!(manager.get(id).await.is_err());
    }
}
