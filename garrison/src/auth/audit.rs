//! Security audit logging.
//!
//! Emits structured `tracing` events at the `security` target so deployments
//! can route the audit trail independently of application logs (for example
//! `RUST_LOG=warn,security=info`). UUIDs are abbreviated; tokens and
//! passwords never appear in fields.

use tracing::{info, warn};

use crate::types::{SessionId, UserId, abbrev_uuid};

/// Emitter for security-relevant lifecycle events.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecurityLog;

impl SecurityLog {
    pub fn new() -> Self {
        Self
    }

    /// Successful login with a freshly created session.
    pub fn login(&self, user_id: UserId, session_id: SessionId, ip: &str) {
        info!(
            target: "security",
            event = "login",
            user_id = %abbrev_uuid(&user_id),
            session_id = %abbrev_uuid(&session_id),
            ip,
            "user logged in"
        );
    }

    /// Login attempt denied by the rate limiter before credentials were checked.
    pub fn login_blocked(&self, scope: &str, ip: &str, wait_minutes: i64) {
        warn!(
            target: "security",
            event = "login_blocked",
            scope,
            ip,
            wait_minutes,
            "login attempt blocked by rate limiter"
        );
    }

    /// Session ended on user request.
    pub fn logout(&self, user_id: UserId, session_id: SessionId) {
        info!(
            target: "security",
            event = "logout",
            user_id = %abbrev_uuid(&user_id),
            session_id = %abbrev_uuid(&session_id),
            "user logged out"
        );
    }

    /// New access token issued from a refresh token.
    pub fn token_refresh(&self, user_id: UserId, session_id: SessionId, ip: &str) {
        info!(
            target: "security",
            event = "token_refresh",
            user_id = %abbrev_uuid(&user_id),
            session_id = %abbrev_uuid(&session_id),
            ip,
            "access token refreshed"
        );
    }

    /// Refresh attempted from an IP other than the one the session was
    /// created from; the session has been deactivated.
    pub fn hijack_suspected(&self, user_id: UserId, session_id: SessionId, session_ip: &str, request_ip: &str) {
        warn!(
            target: "security",
            event = "session_hijack_suspected",
            user_id = %abbrev_uuid(&user_id),
            session_id = %abbrev_uuid(&session_id),
            session_ip,
            request_ip,
            "refresh token used from unexpected ip, session deactivated"
        );
    }
}
