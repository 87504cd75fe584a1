//! In-memory storage implementation for sessions, users and identities.
//!
//! This implementation stores all records in memory using concurrent data
//! structures. It's suitable for testing and single-process deployments;
//! records are lost on restart. Writes are last-write-wins: there is no
//! cross-call atomicity, which is acceptable for the reference store but not
//! for a durable backing implementation.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::storage::errors::{Result, StoreError};
use crate::storage::models::identities::{Identity, IdentityCreateRequest};
use crate::storage::models::sessions::{PLACEHOLDER_TOKEN, Session, SessionCreateRequest};
use crate::storage::models::users::{User, UserCreateRequest};
use crate::storage::{IdentityStore, SessionStore, UserStore};
use crate::types::{IdentityId, SessionId, UserId};

/// In-memory implementation of the [`SessionStore`] trait.
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<SessionId, Session>>>,
}

impl InMemorySessionStore {
    /// Create a new in-memory session store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently held, regardless of state.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

impl SessionStore for InMemorySessionStore {
    async fn create(&self, request: &SessionCreateRequest) -> Result<Session> {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4(),
            user_id: request.user_id,
            access_token: request.access_token.clone(),
            refresh_token: request.refresh_token.clone(),
            device_info: request.device_info.clone(),
            ip_address: request.ip_address.clone(),
            user_agent: request.user_agent.clone(),
            is_active: true,
            expires_at: request.expires_at,
            created_at: now,
            last_access_at: now,
        };

        self.sessions.write().insert(session.id, session.clone());
        Ok(session)
    }

    async fn get_by_id(&self, id: SessionId) -> Result<Option<Session>> {
        let now = Utc::now();
        let sessions = self.sessions.read();
        Ok(sessions.get(&id).filter(|s| s.is_resolvable(now)).cloned())
    }

    async fn get_by_token(&self, access_token: &str) -> Result<Option<Session>> {
        if access_token == PLACEHOLDER_TOKEN {
            return Ok(None);
        }
        let now = Utc::now();
        let sessions = self.sessions.read();
        Ok(sessions
            .values()
            .find(|s| s.access_token == access_token && s.is_resolvable(now))
            .cloned())
    }

    async fn get_by_refresh_token(&self, refresh_token: &str) -> Result<Option<Session>> {
        if refresh_token == PLACEHOLDER_TOKEN {
            return Ok(None);
        }
        let now = Utc::now();
        let sessions = self.sessions.read();
        Ok(sessions
            .values()
            .find(|s| s.refresh_token == refresh_token && s.is_resolvable(now))
            .cloned())
    }

    async fn get_active_by_user(&self, user_id: UserId) -> Result<Vec<Session>> {
        let now = Utc::now();
        let sessions = self.sessions.read();
        Ok(sessions
            .values()
            .filter(|s| s.user_id == user_id && s.is_resolvable(now))
            .cloned()
            .collect())
    }

    async fn update_token(&self, id: SessionId, access_token: &str) -> Result<()> {
        let mut sessions = self.sessions.write();
        let session = sessions.get_mut(&id).ok_or(StoreError::NotFound)?;
        session.access_token = access_token.to_string();
        session.last_access_at = Utc::now();
        Ok(())
    }

    async fn update_refresh_token(&self, id: SessionId, refresh_token: &str) -> Result<()> {
        let mut sessions = self.sessions.write();
        let session = sessions.get_mut(&id).ok_or(StoreError::NotFound)?;
        session.refresh_token = refresh_token.to_string();
        session.last_access_at = Utc::now();
        Ok(())
    }

    async fn update_last_access(&self, id: SessionId) -> Result<()> {
        let mut sessions = self.sessions.write();
        let session = sessions.get_mut(&id).ok_or(StoreError::NotFound)?;
        session.last_access_at = Utc::now();
        Ok(())
    }

    async fn deactivate(&self, id: SessionId) -> Result<bool> {
        let now = Utc::now();
        let mut sessions = self.sessions.write();
        match sessions.get_mut(&id) {
            Some(session) if session.is_resolvable(now) => {
                session.is_active = false;
                session.last_access_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn deactivate_all_for_user(&self, user_id: UserId) -> Result<usize> {
        let now = Utc::now();
        let mut sessions = self.sessions.write();
        let mut deactivated = 0;
        for session in sessions.values_mut() {
            if session.user_id == user_id && session.is_resolvable(now) {
                session.is_active = false;
                session.last_access_at = now;
                deactivated += 1;
            }
        }
        Ok(deactivated)
    }

    async fn delete_expired(&self) -> Result<usize> {
        let now = Utc::now();
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, s| s.is_resolvable(now));
        Ok(before - sessions.len())
    }
}

/// In-memory implementation of the [`UserStore`] trait.
#[derive(Clone, Default)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<HashMap<UserId, User>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserStore for InMemoryUserStore {
    async fn create(&self, request: &UserCreateRequest) -> Result<User> {
        let mut users = self.users.write();

        if users.values().any(|u| u.identity_id == request.identity_id) {
            return Err(StoreError::AlreadyExists);
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            identity_id: request.identity_id,
            military_id: request.military_id.clone(),
            role: request.role.clone(),
            password_hash: request.password_hash.clone(),
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.users.read().get(&id).cloned())
    }

    async fn get_by_identity(&self, identity_id: IdentityId) -> Result<Option<User>> {
        let users = self.users.read();
        Ok(users.values().find(|u| u.identity_id == identity_id).cloned())
    }
}

/// In-memory implementation of the [`IdentityStore`] trait.
#[derive(Clone, Default)]
pub struct InMemoryIdentityStore {
    identities: Arc<RwLock<HashMap<IdentityId, Identity>>>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdentityStore for InMemoryIdentityStore {
    async fn create(&self, request: &IdentityCreateRequest) -> Result<Identity> {
        let mut identities = self.identities.write();

        if identities.values().any(|i| i.rg == request.rg) {
            return Err(StoreError::AlreadyExists);
        }

        let identity = Identity {
            id: Uuid::new_v4(),
            rg: request.rg,
            name: request.name.clone(),
            created_at: Utc::now(),
        };
        identities.insert(identity.id, identity.clone());
        Ok(identity)
    }

    async fn get_by_rg(&self, rg: i64) -> Result<Option<Identity>> {
        let identities = self.identities.read();
        Ok(identities.values().find(|i| i.rg == rg).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::users::Role;
    use chrono::Duration;

    fn sample_session_request(user_id: UserId) -> SessionCreateRequest {
        SessionCreateRequest {
            user_id,
            access_token: PLACEHOLDER_TOKEN.to_string(),
            refresh_token: PLACEHOLDER_TOKEN.to_string(),
            device_info: "integration test".to_string(),
            ip_address: "10.0.0.1".to_string(),
            user_agent: "test-agent/1.0".to_string(),
            expires_at: Utc::now() + Duration::days(7),
        }
    }

    #[tokio::test]
    async fn test_create_sets_timestamps_and_active() {
        let store = InMemorySessionStore::new();
        let session = store.create(&sample_session_request(Uuid::new_v4())).await.unwrap();

        assert!(session.is_active);
        assert_eq!(session.created_at, session.last_access_at);
    }

    #[tokio::test]
    async fn test_token_lookup_round_trip() {
        let store = InMemorySessionStore::new();
        let session = store.create(&sample_session_request(Uuid::new_v4())).await.unwrap();

        store.update_token(session.id, "access-abc").await.unwrap();
        store.update_refresh_token(session.id, "refresh-xyz").await.unwrap();

        let by_token = store.get_by_token("access-abc").await.unwrap().unwrap();
        assert_eq!(by_token.id, session.id);

        let by_refresh = store.get_by_refresh_token("refresh-xyz").await.unwrap().unwrap();
        assert_eq!(by_refresh.id, session.id);
    }

    #[tokio::test]
    async fn test_placeholder_tokens_never_resolve() {
        let store = InMemorySessionStore::new();
        store.create(&sample_session_request(Uuid::new_v4())).await.unwrap();

        assert!(store.get_by_token(PLACEHOLDER_TOKEN).await.unwrap().is_none());
        assert!(store.get_by_refresh_token(PLACEHOLDER_TOKEN).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_updates_bump_last_access() {
        let store = InMemorySessionStore::new();
        let session = store.create(&sample_session_request(Uuid::new_v4())).await.unwrap();

        store.update_last_access(session.id).await.unwrap();
        let after = store.get_by_id(session.id).await.unwrap().unwrap();
        assert!(after.last_access_at >= session.last_access_at);
    }

    #[tokio::test]
    async fn test_deactivated_sessions_are_unresolvable() {
        let store = InMemorySessionStore::new();
        let session = store.create(&sample_session_request(Uuid::new_v4())).await.unwrap();
        store.update_token(session.id, "access-abc").await.unwrap();

        assert!(store.deactivate(session.id).await.unwrap());
        assert!(store.get_by_id(session.id).await.unwrap().is_none());
        assert!(store.get_by_token("access-abc").await.unwrap().is_none());

        // A second deactivation is a no-op, not an error
        assert!(!store.deactivate(session.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_deactivate_all_for_user() {
        let store = InMemorySessionStore::new();
        let user_id = Uuid::new_v4();
        store.create(&sample_session_request(user_id)).await.unwrap();
        store.create(&sample_session_request(user_id)).await.unwrap();
        store.create(&sample_session_request(Uuid::new_v4())).await.unwrap();

        assert_eq!(store.deactivate_all_for_user(user_id).await.unwrap(), 2);
        assert!(store.get_active_by_user(user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_expired_sessions_are_unresolvable_and_purged() {
        let store = InMemorySessionStore::new();
        let mut request = sample_session_request(Uuid::new_v4());
        request.expires_at = Utc::now() - Duration::seconds(1);
        let session = store.create(&request).await.unwrap();

        assert!(store.get_by_id(session.id).await.unwrap().is_none());
        assert_eq!(store.delete_expired().await.unwrap(), 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_user_store_unique_per_identity() {
        let store = InMemoryUserStore::new();
        let identity_id = Uuid::new_v4();
        let request = UserCreateRequest {
            identity_id,
            military_id: "MIL-1234".to_string(),
            role: Role::Officer,
            password_hash: None,
        };

        let user = store.create(&request).await.unwrap();
        assert!(matches!(store.create(&request).await, Err(StoreError::AlreadyExists)));

        let found = store.get_by_identity(identity_id).await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
    }

    #[tokio::test]
    async fn test_identity_store_unique_rg() {
        let store = InMemoryIdentityStore::new();
        let request = IdentityCreateRequest {
            rg: 123456,
            name: "J. Silva".to_string(),
        };

        store.create(&request).await.unwrap();
        assert!(matches!(store.create(&request).await, Err(StoreError::AlreadyExists)));

        assert!(store.get_by_rg(123456).await.unwrap().is_some());
        assert!(store.get_by_rg(999999).await.unwrap().is_none());
    }
}
