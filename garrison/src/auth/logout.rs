//! Best-effort logout.
//!
//! Logout never fails from the caller's perspective: a sign-out button that
//! errors teaches users to ignore errors, and a store hiccup must not leak
//! to an unauthenticated-by-now client. The real outcome is still reported
//! internally as a [`LogoutOutcome`] and logged.

use std::sync::Arc;

use tracing::{instrument, warn};

use crate::{
    auth::audit::SecurityLog,
    storage::SessionStore,
    types::{SessionId, UserId, abbrev_uuid},
};

/// What actually happened during a logout call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutOutcome {
    /// An active session was deactivated
    Deactivated,
    /// Nothing to do: unknown, expired or already inactive session
    AlreadyInactive,
    /// The store errored; swallowed by contract
    Failed,
}

/// Tears down sessions on sign-out.
#[derive(Clone)]
pub struct LogoutService<S> {
    sessions: Arc<S>,
    audit: SecurityLog,
}

impl<S: SessionStore> LogoutService<S> {
    pub fn new(sessions: Arc<S>, audit: SecurityLog) -> Self {
        Self { sessions, audit }
    }

    /// Deactivate `session_id`, swallowing every error.
    ///
    /// The security logout event is only emitted when the deactivation call
    /// itself succeeded and a user id was supplied for attribution.
    #[instrument(skip_all, fields(session_id = %abbrev_uuid(&session_id)))]
    pub async fn logout(&self, session_id: SessionId, user_id: Option<UserId>) -> LogoutOutcome {
        match self.sessions.deactivate(session_id).await {
            Ok(deactivated) => {
                if let Some(user_id) = user_id {
                    self.audit.logout(user_id, session_id);
                }
                if deactivated {
                    LogoutOutcome::Deactivated
                } else {
                    LogoutOutcome::AlreadyInactive
                }
            }
            Err(err) => {
                warn!(
                    error = %err,
                    session_id = %abbrev_uuid(&session_id),
                    "session deactivation failed during logout"
                );
                LogoutOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::auth::LoginRequest;
    use crate::storage::errors::{Result as StoreResult, StoreError};
    use crate::storage::models::sessions::{Session, SessionCreateRequest};
    use crate::test_utils::{TestStack, seed_officer};

    #[tokio::test]
    async fn test_logout_deactivates_session() {
        let stack = TestStack::new();
        let seeded = seed_officer(&stack, 123456).await;
        let response = stack
            .login
            .login(
                LoginRequest {
                    rg: 123456,
                    password: seeded.password.clone(),
                    device_info: None,
                },
                "10.0.0.1",
                "agent",
            )
            .await
            .unwrap();

        let session = stack.sessions.get_by_token(&response.access_token).await.unwrap().unwrap();
        let outcome = stack.logout.logout(session.id, Some(seeded.user.id)).await;

        assert_eq!(outcome, LogoutOutcome::Deactivated);
        assert!(stack.sessions.get_by_token(&response.access_token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let stack = TestStack::new();
        let store = stack.sessions.clone();
        let session = store
            .create(&SessionCreateRequest {
                user_id: uuid::Uuid::new_v4(),
                access_token: "a".to_string(),
                refresh_token: "r".to_string(),
                device_info: "d".to_string(),
                ip_address: "10.0.0.1".to_string(),
                user_agent: "agent".to_string(),
                expires_at: chrono::Utc::now() + chrono::Duration::days(1),
            })
            .await
            .unwrap();

        assert_eq!(stack.logout.logout(session.id, None).await, LogoutOutcome::Deactivated);
        assert_eq!(stack.logout.logout(session.id, None).await, LogoutOutcome::AlreadyInactive);
        assert_eq!(stack.logout.logout(uuid::Uuid::new_v4(), None).await, LogoutOutcome::AlreadyInactive);
    }

    /// Session store that fails every call, for exercising the swallow-all
    /// contract.
    #[derive(Clone, Default)]
    struct BrokenSessionStore;

    impl SessionStore for BrokenSessionStore {
        async fn create(&self, _request: &SessionCreateRequest) -> StoreResult<Session> {
            Err(StoreError::Other(anyhow::anyhow!("store offline")))
        }
        async fn get_by_id(&self, _id: SessionId) -> StoreResult<Option<Session>> {
            Err(StoreError::Other(anyhow::anyhow!("store offline")))
        }
        async fn get_by_token(&self, _access_token: &str) -> StoreResult<Option<Session>> {
            Err(StoreError::Other(anyhow::anyhow!("store offline")))
        }
        async fn get_by_refresh_token(&self, _refresh_token: &str) -> StoreResult<Option<Session>> {
            Err(StoreError::Other(anyhow::anyhow!("store offline")))
        }
        async fn get_active_by_user(&self, _user_id: UserId) -> StoreResult<Vec<Session>> {
            Err(StoreError::Other(anyhow::anyhow!("store offline")))
        }
        async fn update_token(&self, _id: SessionId, _access_token: &str) -> StoreResult<()> {
            Err(StoreError::Other(anyhow::anyhow!("store offline")))
        }
        async fn update_refresh_token(&self, _id: SessionId, _refresh_token: &str) -> StoreResult<()> {
            Err(StoreError::Other(anyhow::anyhow!("store offline")))
        }
        async fn update_last_access(&self, _id: SessionId) -> StoreResult<()> {
            Err(StoreError::Other(anyhow::anyhow!("store offline")))
        }
        async fn deactivate(&self, _id: SessionId) -> StoreResult<bool> {
            Err(StoreError::Other(anyhow::anyhow!("store offline")))
        }
        async fn deactivate_all_for_user(&self, _user_id: UserId) -> StoreResult<usize> {
            Err(StoreError::Other(anyhow::anyhow!("store offline")))
        }
        async fn delete_expired(&self) -> StoreResult<usize> {
            Err(StoreError::Other(anyhow::anyhow!("store offline")))
        }
    }

    #[tokio::test]
    async fn test_store_failure_is_swallowed() {
        let service = LogoutService::new(Arc::new(BrokenSessionStore), SecurityLog::new());

        // The call resolves instead of erroring; the outcome records the
        // failure for internal eyes only.
        let outcome = service.logout(uuid::Uuid::new_v4(), Some(uuid::Uuid::new_v4())).await;
        assert_eq!(outcome, LogoutOutcome::Failed);
    }

    #[tokio::test]
    async fn test_unused_broken_store_methods_error() {
        // Sanity-check the stub itself so the swallow test cannot pass by
        // accident against a store that silently succeeds.
        let store = BrokenSessionStore;
        assert!(store.get_by_id(uuid::Uuid::new_v4()).await.is_err());
        assert!(store.delete_expired().await.is_err());
    }
}
