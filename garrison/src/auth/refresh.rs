//! Refresh-token orchestration.
//!
//! Exchanges a refresh token for a new access token. The refresh token
//! itself is not rotated; its compensating control is IP pinning: a refresh
//! attempted from any IP other than the one recorded at session creation
//! kills the session on the spot, so a stolen refresh token and its session
//! die the first time the thief uses them.

use std::sync::Arc;

use tracing::{error, instrument, warn};

use crate::{
    api::models::auth::{AuthenticatedUser, LoginResponse, RefreshTokenRequest},
    auth::audit::SecurityLog,
    auth::tokens::TokenCodec,
    errors::{Error, Result},
    storage::{SessionStore, UserStore},
    types::abbrev_uuid,
};

/// Orchestrates access-token renewal.
#[derive(Clone)]
pub struct RefreshTokenService<U, S> {
    users: Arc<U>,
    sessions: Arc<S>,
    codec: Arc<TokenCodec>,
    audit: SecurityLog,
}

impl<U, S> RefreshTokenService<U, S>
where
    U: UserStore,
    S: SessionStore,
{
    pub fn new(users: Arc<U>, sessions: Arc<S>, codec: Arc<TokenCodec>, audit: SecurityLog) -> Self {
        Self {
            users,
            sessions,
            codec,
            audit,
        }
    }

    /// Issue a new access token for the session bound to the refresh token.
    ///
    /// Returns the same response shape as login, with the refresh token
    /// unchanged. Non-domain failures collapse to a generic error.
    #[instrument(skip_all, fields(ip = %request_ip))]
    pub async fn refresh(&self, request: RefreshTokenRequest, request_ip: &str) -> Result<LoginResponse> {
        match self.rotate_access_token(&request.refresh_token, request_ip).await {
            Ok(response) => Ok(response),
            Err(err @ (Error::Unauthorized { .. } | Error::NotFound { .. })) => Err(err),
            Err(other) => {
                error!(error = %other, "token refresh failed unexpectedly");
                Err(Error::Unauthorized {
                    message: Some("Token refresh error".to_string()),
                })
            }
        }
    }

    async fn rotate_access_token(&self, refresh_token: &str, request_ip: &str) -> Result<LoginResponse> {
        let claims = self.codec.verify_refresh_token(refresh_token)?;

        let session = self
            .sessions
            .get_by_refresh_token(refresh_token)
            .await?
            .ok_or_else(|| Error::Unauthorized {
                message: Some("Invalid or expired session".to_string()),
            })?;

        if session.ip_address != request_ip {
            // Simple IP pinning, not device fingerprinting: kill the session
            // first, then deny. A retry from the original IP stays denied.
            if let Err(err) = self.sessions.deactivate(session.id).await {
                warn!(
                    error = %err,
                    session_id = %abbrev_uuid(&session.id),
                    "failed to deactivate session after ip mismatch"
                );
            }
            self.audit.hijack_suspected(claims.sub, session.id, &session.ip_address, request_ip);
            return Err(Error::Unauthorized {
                message: Some("Compromised session detected".to_string()),
            });
        }

        let user = self.users.get_by_id(claims.sub).await?.ok_or_else(|| Error::NotFound {
            resource: "User".to_string(),
            id: claims.sub.to_string(),
        })?;

        let access_token = self.codec.generate_access_token(&user, session.id)?;
        self.sessions.update_token(session.id, &access_token).await?;
        self.audit.token_refresh(user.id, session.id, request_ip);

        Ok(LoginResponse {
            access_token,
            refresh_token: refresh_token.to_string(),
            user: AuthenticatedUser {
                id: user.id,
                military_id: user.military_id.clone(),
                role: user.role.clone(),
            },
            expires_in: self.codec.access_token_expiry().as_secs(),
        })
    }
}
