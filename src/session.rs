use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use uuid::Uuid;

// 1. SessionStore Contract

/// SessionStore
///
/// Defines the abstract contract for the session layer: mapping opaque bearer
/// tokens to signed-in user identifiers with an inactivity window. The trait
/// boundary lets the in-memory implementation used here be swapped for an
/// external store (Redis, database-backed) without touching the extractors
/// or handlers, and makes the auth path trivially mockable in tests.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Creates a new session for `user_id` and returns the opaque token the
    /// client must present on subsequent requests.
    async fn create(&self, user_id: Uuid) -> String;

    /// Resolves a token to its user identifier. Returns `None` for unknown,
    /// revoked, or idle-expired tokens — never an error; an anonymous caller
    /// is a normal outcome. A successful resolution refreshes the idle timer.
    async fn resolve(&self, token: &str) -> Option<Uuid>;

    /// Drops the session. Unknown tokens are a no-op, making logout idempotent.
    async fn revoke(&self, token: &str);
}

/// SessionState
///
/// The concrete type used to share the session service across the application state.
pub type SessionState = Arc<dyn SessionStore>;

// 2. The In-Memory Implementation

struct SessionEntry {
    user_id: Uuid,
    // Refreshed on every successful resolve; drives idle expiry.
    last_seen: Instant,
}

/// InMemorySessionStore
///
/// Process-local session storage keyed by random UUID tokens. Expiry is lazy:
/// an entry older than the idle window is removed the next time its token is
/// presented. The lock is held only for map access, never across an await.
pub struct InMemorySessionStore {
    idle: Duration,
    entries: RwLock<HashMap<String, SessionEntry>>,
}

impl InMemorySessionStore {
    pub fn new(idle: Duration) -> Self {
        Self {
            idle,
            entries: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, user_id: Uuid) -> String {
        let token = Uuid::new_v4().to_string();
        let entry = SessionEntry {
            user_id,
            last_seen: Instant::now(),
        };
        self.entries
            .write()
            .expect("session lock poisoned")
            .insert(token.clone(), entry);
        token
    }

    async fn resolve(&self, token: &str) -> Option<Uuid> {
        let now = Instant::now();
        let mut entries = self.entries.write().expect("session lock poisoned");

        match entries.get_mut(token) {
            Some(entry) if now.duration_since(entry.last_seen) <= self.idle => {
                entry.last_seen = now;
                Some(entry.user_id)
            }
            Some(_) => {
                // Past the inactivity window: expire it now.
                entries.remove(token);
                None
            }
            None => None,
        }
    }

    async fn revoke(&self, token: &str) {
        self.entries
            .write()
            .expect("session lock poisoned")
            .remove(token);
    }
}
