//! Storage models for sessions.

use crate::types::{SessionId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Value written into the token columns of a freshly created session row.
///
/// Tokens embed the session id in their claims, so they can only be generated
/// after the row exists and an id has been assigned; the row is patched with
/// the real tokens immediately afterwards. Token lookups never resolve this
/// value, so a half-created session cannot authenticate.
pub const PLACEHOLDER_TOKEN: &str = "__pending__";

/// A server-side session binding a user to issued tokens, device and IP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    pub access_token: String,
    pub refresh_token: String,
    pub device_info: String,
    pub ip_address: String,
    pub user_agent: String,
    pub is_active: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub last_access_at: DateTime<Utc>,
}

impl Session {
    /// Whether this session can still be resolved by token or id lookups.
    ///
    /// A deactivated session stays deactivated; there is no transition back.
    pub fn is_resolvable(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at > now
    }
}

/// Storage request for creating a new session
#[derive(Debug, Clone)]
pub struct SessionCreateRequest {
    pub user_id: UserId,
    pub access_token: String,
    pub refresh_token: String,
    pub device_info: String,
    pub ip_address: String,
    pub user_agent: String,
    pub expires_at: DateTime<Utc>,
}
