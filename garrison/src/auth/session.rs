//! Session lifecycle management.
//!
//! Creation enforces the single-active-session invariant and runs in two
//! phases: the row is inserted with placeholder token values first, because
//! real tokens embed the session id in their claims and the id only exists
//! once the row does; the row is then patched with the generated tokens.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::{
    auth::tokens::TokenCodec,
    errors::Result,
    storage::SessionStore,
    storage::models::sessions::{PLACEHOLDER_TOKEN, SessionCreateRequest},
    storage::models::users::User,
    types::{SessionId, abbrev_uuid},
};

/// Longest device description persisted on a session row
const MAX_DEVICE_INFO_LEN: usize = 255;

/// Tokens and metadata of a freshly created session.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub access_token: String,
    pub refresh_token: String,
    pub session_id: SessionId,
    /// Access token lifetime in seconds
    pub expires_in: u64,
}

/// Creates sessions and issues their token pair.
#[derive(Clone)]
pub struct SessionManager<S> {
    sessions: Arc<S>,
    codec: Arc<TokenCodec>,
}

impl<S: SessionStore> SessionManager<S> {
    pub fn new(sessions: Arc<S>, codec: Arc<TokenCodec>) -> Self {
        Self { sessions, codec }
    }

    /// Create a session for `user`, superseding any session it already has.
    ///
    /// At most one session per user is active at any instant: all existing
    /// active sessions are deactivated before the new row is inserted.
    /// `device_info` falls back to the user agent, truncated to a fixed cap.
    pub async fn create_session(&self, user: &User, ip: &str, user_agent: &str, device_info: Option<&str>) -> Result<IssuedSession> {
        let superseded = self.sessions.deactivate_all_for_user(user.id).await?;
        if superseded > 0 {
            debug!(
                user_id = %abbrev_uuid(&user.id),
                superseded,
                "deactivated previous sessions before login"
            );
        }

        let device_info = device_info
            .map(str::trim)
            .filter(|info| !info.is_empty())
            .unwrap_or(user_agent);

        let session = self
            .sessions
            .create(&SessionCreateRequest {
                user_id: user.id,
                access_token: PLACEHOLDER_TOKEN.to_string(),
                refresh_token: PLACEHOLDER_TOKEN.to_string(),
                device_info: truncate_chars(device_info, MAX_DEVICE_INFO_LEN),
                ip_address: ip.to_string(),
                user_agent: user_agent.to_string(),
                expires_at: Utc::now() + self.codec.refresh_token_expiry(),
            })
            .await?;

        // The id now exists; mint the real tokens and patch the row
        let access_token = self.codec.generate_access_token(user, session.id)?;
        let refresh_token = self.codec.generate_refresh_token(user, session.id)?;
        self.sessions.update_token(session.id, &access_token).await?;
        self.sessions.update_refresh_token(session.id, &refresh_token).await?;

        Ok(IssuedSession {
            access_token,
            refresh_token,
            session_id: session.id,
            expires_in: self.codec.access_token_expiry().as_secs(),
        })
    }
}

fn truncate_chars(input: &str, max_chars: usize) -> String {
    input.chars().take(max_chars).collect()
}
