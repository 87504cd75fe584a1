//! Storage models for personnel registry identities.

use crate::types::IdentityId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Personnel registry record, looked up by RG number at login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: IdentityId,
    pub rg: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Storage request for creating a new identity
#[derive(Debug, Clone)]
pub struct IdentityCreateRequest {
    pub rg: i64,
    pub name: String,
}
