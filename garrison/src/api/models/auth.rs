//! API request/response models for authentication.

use crate::api::models::users::Role;
use crate::types::UserId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Login request carrying the RG number and password.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Personnel registry (RG) number
    pub rg: i64,
    pub password: String,
    /// Free-form device description; defaults to the user agent when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_info: Option<String>,
}

/// Request to exchange a refresh token for a new access token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Slice of the user record exposed to authenticated clients.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub military_id: String,
    pub role: Role,
}

/// Response returned by both login and token refresh.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: AuthenticatedUser,
    /// Access token lifetime in seconds
    pub expires_in: u64,
}
