//! API models for users.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// Role enum for different job functions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Supervisor,
    Officer,
}
