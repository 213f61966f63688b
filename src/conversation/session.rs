//! Session storage: where per-user dialogue state lives between messages.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::conversation::state::Session;
use crate::directory::model::ExternalId;
use crate::error::DatabaseError;
use crate::store::Database;

/// Per-user session storage.
///
/// A user with no stored session is Idle with nothing pending.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, user: ExternalId) -> Result<Session, DatabaseError>;

    /// Store `session`. A blank session is dropped rather than stored.
    async fn save(&self, user: ExternalId, session: &Session) -> Result<(), DatabaseError>;
}

/// Process-local sessions; lost on restart.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<ExternalId, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, user: ExternalId) -> Result<Session, DatabaseError> {
        Ok(self
            .sessions
            .read()
            .await
            .get(&user)
            .cloned()
            .unwrap_or_default())
    }

    async fn save(&self, user: ExternalId, session: &Session) -> Result<(), DatabaseError> {
        let mut sessions = self.sessions.write().await;
        if session.is_blank() {
            sessions.remove(&user);
        } else {
            sessions.insert(user, session.clone());
        }
        Ok(())
    }
}

/// Sessions persisted as JSON in the database; survive restarts.
pub struct DbSessionStore {
    db: Arc<dyn Database>,
}

impl DbSessionStore {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionStore for DbSessionStore {
    async fn load(&self, user: ExternalId) -> Result<Session, DatabaseError> {
        match self.db.get_session(user).await? {
            Some(value) => serde_json::from_value(value)
                .map_err(|e| DatabaseError::Serialization(format!("session {user}: {e}"))),
            None => Ok(Session::default()),
        }
    }

    async fn save(&self, user: ExternalId, session: &Session) -> Result<(), DatabaseError> {
        if session.is_blank() {
            self.db.delete_session(user).await?;
            return Ok(());
        }
        let value = serde_json::to_value(session)
            .map_err(|e| DatabaseError::Serialization(format!("session {user}: {e}")))?;
        self.db.set_session(user, &value).await
    }
}
