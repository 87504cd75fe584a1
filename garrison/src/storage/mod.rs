//! Storage traits for sessions, users and identities.
//!
//! Orchestration services are written against these traits so a durable
//! backing store (SQL, KV) can be substituted for the in-memory reference
//! implementation without touching any service logic.

use std::future::Future;

use crate::storage::errors::Result;
use crate::storage::models::identities::{Identity, IdentityCreateRequest};
use crate::storage::models::sessions::{Session, SessionCreateRequest};
use crate::storage::models::users::{User, UserCreateRequest};
use crate::types::{IdentityId, SessionId, UserId};

pub mod errors;
pub mod memory;
pub mod models;

/// Storage trait for session records.
///
/// Every lookup (`get_by_*`) only returns *resolvable* sessions, i.e. rows
/// with `is_active && expires_at > now`; deactivated or expired sessions
/// behave as absent. Token lookups additionally never match the placeholder
/// token value written during two-phase creation.
///
/// The reference in-memory implementation provides no cross-call atomicity:
/// a `deactivate_all_for_user` followed by `create` can interleave with a
/// concurrent login for the same user. Durable implementations must make
/// that sequence atomic (transaction or single-writer) so that exactly one
/// active session survives.
pub trait SessionStore: Send + Sync {
    /// Insert a new session row and return it with its assigned id.
    fn create(&self, request: &SessionCreateRequest) -> impl Future<Output = Result<Session>> + Send;

    /// Look up a resolvable session by id.
    fn get_by_id(&self, id: SessionId) -> impl Future<Output = Result<Option<Session>>> + Send;

    /// Look up a resolvable session by the literal access-token string.
    fn get_by_token(&self, access_token: &str) -> impl Future<Output = Result<Option<Session>>> + Send;

    /// Look up a resolvable session by the literal refresh-token string.
    fn get_by_refresh_token(&self, refresh_token: &str) -> impl Future<Output = Result<Option<Session>>> + Send;

    /// All resolvable sessions for a user.
    fn get_active_by_user(&self, user_id: UserId) -> impl Future<Output = Result<Vec<Session>>> + Send;

    /// Replace the stored access token, bumping `last_access_at`.
    ///
    /// # Errors
    /// - `NotFound` - if the session row doesn't exist
    fn update_token(&self, id: SessionId, access_token: &str) -> impl Future<Output = Result<()>> + Send;

    /// Replace the stored refresh token, bumping `last_access_at`.
    ///
    /// # Errors
    /// - `NotFound` - if the session row doesn't exist
    fn update_refresh_token(&self, id: SessionId, refresh_token: &str) -> impl Future<Output = Result<()>> + Send;

    /// Bump `last_access_at` to now.
    ///
    /// # Errors
    /// - `NotFound` - if the session row doesn't exist
    fn update_last_access(&self, id: SessionId) -> impl Future<Output = Result<()>> + Send;

    /// Deactivate a session. Returns `true` when a resolvable session was
    /// flipped to inactive, `false` when there was nothing to deactivate
    /// (unknown id, already inactive, or expired).
    fn deactivate(&self, id: SessionId) -> impl Future<Output = Result<bool>> + Send;

    /// Deactivate every resolvable session of a user, returning how many
    /// were affected.
    fn deactivate_all_for_user(&self, user_id: UserId) -> impl Future<Output = Result<usize>> + Send;

    /// Purge rows that are inactive or past their expiry, returning how many
    /// were removed.
    fn delete_expired(&self) -> impl Future<Output = Result<usize>> + Send;
}

/// Storage trait for credential-bearing user accounts.
pub trait UserStore: Send + Sync {
    /// Insert a new user and return it with its assigned id.
    ///
    /// # Errors
    /// - `AlreadyExists` - if the identity already has an account
    fn create(&self, request: &UserCreateRequest) -> impl Future<Output = Result<User>> + Send;

    fn get_by_id(&self, id: UserId) -> impl Future<Output = Result<Option<User>>> + Send;

    fn get_by_identity(&self, identity_id: IdentityId) -> impl Future<Output = Result<Option<User>>> + Send;
}

/// Storage trait for personnel registry identities.
pub trait IdentityStore: Send + Sync {
    /// Insert a new identity and return it with its assigned id.
    ///
    /// # Errors
    /// - `AlreadyExists` - if the RG number is already registered
    fn create(&self, request: &IdentityCreateRequest) -> impl Future<Output = Result<Identity>> + Send;

    fn get_by_rg(&self, rg: i64) -> impl Future<Output = Result<Option<Identity>>> + Send;
}
