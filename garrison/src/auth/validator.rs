//! Bearer and refresh token validation against the session store.
//!
//! A token is only as good as its session: signature and claims are checked
//! first, then the session is resolved by the literal token string and must
//! still be active. Any failure that is not already an authorization error
//! is logged internally and collapsed into the generic authorization
//! failure, so callers can never probe for internal causes.

use std::sync::Arc;

use tracing::error;

use crate::{
    auth::tokens::{AccessTokenClaims, RefreshTokenClaims, TokenCodec, extract_token_from_header},
    errors::{Error, Result},
    storage::SessionStore,
    types::SessionId,
};

/// Outcome of access-token validation.
#[derive(Debug)]
pub struct ValidatedAccess {
    pub claims: AccessTokenClaims,
    pub session_id: SessionId,
}

/// Outcome of refresh-token validation.
#[derive(Debug)]
pub struct ValidatedRefresh {
    pub claims: RefreshTokenClaims,
    pub session_id: SessionId,
}

/// Validates bearer credentials for request authorization.
#[derive(Clone)]
pub struct TokenValidator<S> {
    codec: Arc<TokenCodec>,
    sessions: Arc<S>,
}

impl<S: SessionStore> TokenValidator<S> {
    pub fn new(codec: Arc<TokenCodec>, sessions: Arc<S>) -> Self {
        Self { codec, sessions }
    }

    /// Validate the `Authorization` header of an incoming request.
    ///
    /// Requires a well-formed `Bearer <token>` value, a verifiable token and
    /// an active session bound to that exact token string.
    pub async fn validate_access_token(&self, authorization: Option<&str>) -> Result<ValidatedAccess> {
        let token = authorization
            .and_then(extract_token_from_header)
            .ok_or_else(|| Error::Unauthorized {
                message: Some("Authorization required".to_string()),
            })?;

        match self.check_access(token).await {
            Ok(validated) => Ok(validated),
            Err(err @ Error::Unauthorized { .. }) => Err(err),
            Err(err) => {
                error!(error = %err, "access token validation failed");
                Err(Error::Unauthorized { message: None })
            }
        }
    }

    /// Validate a refresh token and resolve its active session.
    pub async fn validate_refresh_token(&self, token: &str) -> Result<ValidatedRefresh> {
        match self.check_refresh(token).await {
            Ok(validated) => Ok(validated),
            Err(err @ Error::Unauthorized { .. }) => Err(err),
            Err(err) => {
                error!(error = %err, "refresh token validation failed");
                Err(Error::Unauthorized { message: None })
            }
        }
    }

    async fn check_access(&self, token: &str) -> Result<ValidatedAccess> {
        let claims = self.codec.verify_access_token(token)?;
        let session = self
            .sessions
            .get_by_token(token)
            .await?
            .ok_or_else(invalid_session)?;

        // Session activity tracking; feeds the expiry sweep
        self.sessions.update_last_access(session.id).await?;

        Ok(ValidatedAccess {
            claims,
            session_id: session.id,
        })
    }

    async fn check_refresh(&self, token: &str) -> Result<ValidatedRefresh> {
        let claims = self.codec.verify_refresh_token(token)?;
        let session = self
            .sessions
            .get_by_refresh_token(token)
            .await?
            .ok_or_else(invalid_session)?;

        Ok(ValidatedRefresh {
            claims,
            session_id: session.id,
        })
    }
}

fn invalid_session() -> Error {
    Error::Unauthorized {
        message: Some("Invalid or expired session".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::SessionManager;
    use crate::storage::memory::InMemorySessionStore;
    use crate::test_utils::{create_test_codec, create_test_user};

    struct Fixture {
        validator: TokenValidator<InMemorySessionStore>,
        manager: SessionManager<InMemorySessionStore>,
        sessions: Arc<InMemorySessionStore>,
    }

    fn fixture() -> Fixture {
        let codec = Arc::new(create_test_codec());
        let sessions = Arc::new(InMemorySessionStore::new());
        Fixture {
            validator: TokenValidator::new(codec.clone(), sessions.clone()),
            manager: SessionManager::new(sessions.clone(), codec),
            sessions,
        }
    }

    #[tokio::test]
    async fn test_validates_issued_access_token() {
        let f = fixture();
        let user = create_test_user();
        let issued = f.manager.create_session(&user, "10.0.0.1", "agent", None).await.unwrap();
        let before = f.sessions.get_by_id(issued.session_id).await.unwrap().unwrap();

        let header = format!("Bearer {}", issued.access_token);
        let validated = f.validator.validate_access_token(Some(&header)).await.unwrap();
        assert_eq!(validated.claims.sub, user.id);
        assert_eq!(validated.session_id, issued.session_id);
        assert_eq!(validated.claims.sid, issued.session_id);

        // Validation is a session use and bumps the activity timestamp
        let after = f.sessions.get_by_id(issued.session_id).await.unwrap().unwrap();
        assert!(after.last_access_at >= before.last_access_at);
    }

    #[tokio::test]
    async fn test_missing_or_malformed_header_is_rejected() {
        let f = fixture();

        for header in [None, Some(""), Some("Token abc"), Some("Bearer "), Some("Bearer a b")] {
            let err = f.validator.validate_access_token(header).await.unwrap_err();
            match err {
                Error::Unauthorized { message } => {
                    assert_eq!(message.as_deref(), Some("Authorization required"));
                }
                other => panic!("expected Unauthorized, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_deactivated_session_fails_even_with_valid_token() {
        let f = fixture();
        let user = create_test_user();
        let issued = f.manager.create_session(&user, "10.0.0.1", "agent", None).await.unwrap();
        f.sessions.deactivate(issued.session_id).await.unwrap();

        let header = format!("Bearer {}", issued.access_token);
        let err = f.validator.validate_access_token(Some(&header)).await.unwrap_err();
        assert!(matches!(err, Error::Unauthorized { .. }));
    }

    #[tokio::test]
    async fn test_token_without_session_is_rejected() {
        // A signature-valid token whose session row never existed (or was
        // purged) must not authenticate.
        let f = fixture();
        let user = create_test_user();
        let codec = create_test_codec();
        let orphan = codec.generate_access_token(&user, uuid::Uuid::new_v4()).unwrap();

        let header = format!("Bearer {orphan}");
        let err = f.validator.validate_access_token(Some(&header)).await.unwrap_err();
        assert!(matches!(err, Error::Unauthorized { .. }));
    }

    #[tokio::test]
    async fn test_validate_refresh_token() {
        let f = fixture();
        let user = create_test_user();
        let issued = f.manager.create_session(&user, "10.0.0.1", "agent", None).await.unwrap();

        let validated = f.validator.validate_refresh_token(&issued.refresh_token).await.unwrap();
        assert_eq!(validated.session_id, issued.session_id);

        let err = f.validator.validate_refresh_token("garbage").await.unwrap_err();
        assert!(matches!(err, Error::Unauthorized { .. }));
    }
}
