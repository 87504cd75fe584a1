//! Storage models for user accounts.

use crate::api::models::users::Role;
use crate::types::{IdentityId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Credential-bearing account record.
///
/// `password_hash` is `None` for accounts that have not been provisioned with
/// credentials yet; such accounts cannot log in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub identity_id: IdentityId,
    pub military_id: String,
    pub role: Role,
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Storage request for creating a new user
#[derive(Debug, Clone)]
pub struct UserCreateRequest {
    pub identity_id: IdentityId,
    pub military_id: String,
    pub role: Role,
    pub password_hash: Option<String>,
}
