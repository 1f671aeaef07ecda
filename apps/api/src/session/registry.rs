use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use uuid::Uuid;

use crate::errors::AppError;
use crate::session::store::{SessionPhase, SessionState};

pub type SharedSession = Arc<Mutex<SessionState>>;

struct RegisteredSession {
    session: SharedSession,
    last_seen: Instant,
}

/// Process-local map of live sessions. Each session has its own lock, so
/// actions on different sessions never wait on each other.
///
/// Sessions untouched for longer than the idle TTL are dropped by
/// `evict_idle`, which `main` runs on an interval.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, RegisteredSession>>,
    idle_ttl: Duration,
}

impl SessionRegistry {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_ttl,
        }
    }

    pub async fn create(&self) -> (Uuid, SharedSession) {
        let id = Uuid::new_v4();
        let session = Arc::new(Mutex::new(SessionState::new()));
        self.sessions.write().await.insert(
            id,
            RegisteredSession {
                session: session.clone(),
                last_seen: Instant::now(),
            },
        );
        tracing::info!(session_id = %id, "Session created");
        (id, session)
    }

    /// Looks a session up and marks it as recently used.
    pub async fn get(&self, id: Uuid) -> Result<SharedSession, AppError> {
        let mut sessions = self.sessions.write().await;
        let registered = sessions
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))?;
        registered.last_seen = Instant::now();
        Ok(registered.session.clone())
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drops sessions idle for longer than the TTL and returns how many went.
    /// A session that is locked or still submitting counts as active.
    pub async fn evict_idle(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();

        sessions.retain(|id, registered| {
            if now.duration_since(registered.last_seen) < self.idle_ttl {
                return true;
            }
            let busy = match registered.session.try_lock() {
                Ok(state) => state.phase == SessionPhase::Submitting,
                Err(_) => true,
            };
            if !busy {
                tracing::info!(session_id = %id, "Evicting idle session");
            }
            busy
        });

        before - sessions.len()
    }
}
