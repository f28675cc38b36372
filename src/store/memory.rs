//! In-process stores backed by `tokio` read/write locks.

use super::token::{generate_session_token, hash_session_token};
use super::{CredentialStore, SessionStore, StoreError, User, SESSION_INSERT_ATTEMPTS};
use crate::clock::{duration_to_ms, Clock};
use async_trait::async_trait;
use std::collections::{hash_map::Entry, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Users {
    by_email: HashMap<String, User>,
    email_by_id: HashMap<Uuid, String>,
}

pub struct MemoryCredentialStore {
    clock: Arc<dyn Clock>,
    users: RwLock<Users>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            users: RwLock::new(Users::default()),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn register(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        // Check and insert under one write guard.
        let mut users = self.users.write().await;
        let Entry::Vacant(slot) = users.by_email.entry(email.to_string()) else {
            return Err(StoreError::DuplicateEmail);
        };

        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at_unix_ms: self.clock.now_unix_ms(),
        };
        slot.insert(user.clone());
        users.email_by_id.insert(user.id, user.email.clone());

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.by_email.get(email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users
            .email_by_id
            .get(&id)
            .and_then(|email| users.by_email.get(email))
            .cloned())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let users = self.users.read().await;
        Ok(u64::try_from(users.by_email.len()).unwrap_or(u64::MAX))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
struct SessionEntry {
    user_id: Uuid,
    expires_at_unix_ms: i64,
}

impl SessionEntry {
    fn is_live(&self, now_unix_ms: i64) -> bool {
        now_unix_ms < self.expires_at_unix_ms
    }
}

pub struct MemorySessionStore {
    clock: Arc<dyn Clock>,
    sessions: RwLock<HashMap<Vec<u8>, SessionEntry>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored sessions, expired ones included.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, user_id: Uuid, ttl: Duration) -> Result<String, StoreError> {
        let now = self.clock.now_unix_ms();
        let entry = SessionEntry {
            user_id,
            expires_at_unix_ms: now.saturating_add(duration_to_ms(ttl)),
        };

        let mut sessions = self.sessions.write().await;
        for _ in 0..SESSION_INSERT_ATTEMPTS {
            let token = generate_session_token()?;
            if let Entry::Vacant(slot) = sessions.entry(hash_session_token(&token)) {
                slot.insert(entry);
                return Ok(token);
            }
        }

        Err(StoreError::TokenCollision(SESSION_INSERT_ATTEMPTS))
    }

    async fn resolve(&self, token: &str) -> Result<Option<Uuid>, StoreError> {
        let token_hash = hash_session_token(token);
        let now = self.clock.now_unix_ms();

        {
            let sessions = self.sessions.read().await;
            match sessions.get(&token_hash) {
                None => return Ok(None),
                Some(entry) if entry.is_live(now) => return Ok(Some(entry.user_id)),
                Some(_) => {}
            }
        }

        // Expired: drop it, unless someone else already did.
        let mut sessions = self.sessions.write().await;
        if sessions
            .get(&token_hash)
            .is_some_and(|entry| !entry.is_live(now))
        {
            sessions.remove(&token_hash);
        }

        Ok(None)
    }

    async fn revoke(&self, token: &str) -> Result<(), StoreError> {
        self.sessions
            .write()
            .await
            .remove(&hash_session_token(token));
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let now = self.clock.now_unix_ms();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| entry.is_live(now));
        Ok(u64::try_from(before - sessions.len()).unwrap_or(u64::MAX))
    }
}
