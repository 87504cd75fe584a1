//! Access and refresh token creation and verification.
//!
//! Both token classes are HS256 JWTs with fixed issuer/audience values but
//! separate signing secrets and lifetimes. Claims embed the session id, so
//! tokens can only be minted once a session row exists.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{
    api::models::users::Role,
    config::Config,
    errors::Error,
    storage::models::users::User,
    types::{SessionId, UserId},
};

/// Issuer claim stamped into every token
pub const TOKEN_ISSUER: &str = "garrison-auth";

/// Audience claim stamped into every token
pub const TOKEN_AUDIENCE: &str = "garrison-platform";

/// Claims carried by short-lived access tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub sub: UserId,        // Subject (user ID)
    pub sid: SessionId,     // Session ID
    pub role: Role,         // User role
    pub military_id: String,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// Claims carried by long-lived refresh tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshTokenClaims {
    pub sub: UserId,
    pub sid: SessionId,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signs and verifies both token classes.
///
/// Built once from [`Config`] at startup; key material is never re-read from
/// the environment afterwards.
#[derive(Clone)]
pub struct TokenCodec {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_expiry: Duration,
    refresh_expiry: Duration,
}

impl TokenCodec {
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let access_secret = config.access_token_secret.as_ref().ok_or_else(|| Error::Configuration {
            message: "access_token_secret is required. Set GARRISON_ACCESS_TOKEN_SECRET or add it to the config file.".to_string(),
        })?;
        let refresh_secret = config.refresh_token_secret.as_ref().ok_or_else(|| Error::Configuration {
            message: "refresh_token_secret is required. Set GARRISON_REFRESH_TOKEN_SECRET or add it to the config file.".to_string(),
        })?;

        Ok(Self {
            access_encoding: EncodingKey::from_secret(access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(refresh_secret.as_bytes()),
            access_expiry: config.auth.security.access_token_expiry,
            refresh_expiry: config.auth.security.refresh_token_expiry,
        })
    }

    /// Access token lifetime
    pub fn access_token_expiry(&self) -> Duration {
        self.access_expiry
    }

    /// Refresh token lifetime (also bounds the session lifetime)
    pub fn refresh_token_expiry(&self) -> Duration {
        self.refresh_expiry
    }

    /// Create an access token bound to a user and session
    pub fn generate_access_token(&self, user: &User, session_id: SessionId) -> Result<String, Error> {
        let now = Utc::now();
        let claims = AccessTokenClaims {
            sub: user.id,
            sid: session_id,
            role: user.role.clone(),
            military_id: user.military_id.clone(),
            iss: TOKEN_ISSUER.to_string(),
            aud: TOKEN_AUDIENCE.to_string(),
            iat: now.timestamp(),
            exp: (now + self.access_expiry).timestamp(),
        };

        encode(&Header::default(), &claims, &self.access_encoding).map_err(|e| Error::Internal {
            operation: format!("create access token: {e}"),
        })
    }

    /// Create a refresh token bound to a user and session
    pub fn generate_refresh_token(&self, user: &User, session_id: SessionId) -> Result<String, Error> {
        let now = Utc::now();
        let claims = RefreshTokenClaims {
            sub: user.id,
            sid: session_id,
            iss: TOKEN_ISSUER.to_string(),
            aud: TOKEN_AUDIENCE.to_string(),
            iat: now.timestamp(),
            exp: (now + self.refresh_expiry).timestamp(),
        };

        encode(&Header::default(), &claims, &self.refresh_encoding).map_err(|e| Error::Internal {
            operation: format!("create refresh token: {e}"),
        })
    }

    /// Verify and decode an access token
    pub fn verify_access_token(&self, token: &str) -> Result<AccessTokenClaims, Error> {
        let token_data =
            decode::<AccessTokenClaims>(token, &self.access_decoding, &validation()).map_err(|e| triage_jwt_error(e, "access token"))?;
        Ok(token_data.claims)
    }

    /// Verify and decode a refresh token
    pub fn verify_refresh_token(&self, token: &str) -> Result<RefreshTokenClaims, Error> {
        let token_data =
            decode::<RefreshTokenClaims>(token, &self.refresh_decoding, &validation()).map_err(|e| triage_jwt_error(e, "refresh token"))?;
        Ok(token_data.claims)
    }
}

fn validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[TOKEN_ISSUER]);
    validation.set_audience(&[TOKEN_AUDIENCE]);
    validation
}

/// Map verification failures to either a client-class authorization error or
/// an internal error, so key/crypto trouble never masquerades as "try again".
fn triage_jwt_error(e: jsonwebtoken::errors::Error, what: &str) -> Error {
    match e.kind() {
        // Client errors (401) - malformed tokens, invalid claims, expired tokens
        jsonwebtoken::errors::ErrorKind::InvalidToken
        | jsonwebtoken::errors::ErrorKind::InvalidSignature
        | jsonwebtoken::errors::ErrorKind::ExpiredSignature
        | jsonwebtoken::errors::ErrorKind::MissingRequiredClaim(_)
        | jsonwebtoken::errors::ErrorKind::InvalidIssuer
        | jsonwebtoken::errors::ErrorKind::InvalidAudience
        | jsonwebtoken::errors::ErrorKind::InvalidSubject
        | jsonwebtoken::errors::ErrorKind::ImmatureSignature
        | jsonwebtoken::errors::ErrorKind::Base64(_)
        | jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => Error::Unauthorized { message: None },

        // Server errors (500) - key issues, internal failures
        jsonwebtoken::errors::ErrorKind::InvalidEcdsaKey
        | jsonwebtoken::errors::ErrorKind::InvalidRsaKey(_)
        | jsonwebtoken::errors::ErrorKind::RsaFailedSigning
        | jsonwebtoken::errors::ErrorKind::InvalidAlgorithmName
        | jsonwebtoken::errors::ErrorKind::InvalidKeyFormat
        | jsonwebtoken::errors::ErrorKind::MissingAlgorithm
        | jsonwebtoken::errors::ErrorKind::Json(_)
        | jsonwebtoken::errors::ErrorKind::Utf8(_)
        | jsonwebtoken::errors::ErrorKind::Crypto(_) => Error::Internal {
            operation: format!("verify {what}: {e}"),
        },

        // Catch-all for any future error variants (default to server error for safety)
        _ => Error::Internal {
            operation: format!("verify {what} (unknown error): {e}"),
        },
    }
}

/// Extract the bearer token from an `Authorization` header value.
///
/// Accepts exactly `Bearer <token>`; anything else yields `None`.
pub fn extract_token_from_header(header: &str) -> Option<&str> {
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() || token.contains(' ') {
        return None;
    }
    Some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_config, create_test_user};

    fn create_codec() -> TokenCodec {
        TokenCodec::from_config(&create_test_config()).unwrap()
    }

    #[test]
    fn test_access_token_round_trip() {
        let codec = create_codec();
        let user = create_test_user();
        let session_id = uuid::Uuid::new_v4();

        let token = codec.generate_access_token(&user, session_id).unwrap();
        assert!(!token.is_empty());

        let claims = codec.verify_access_token(&token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.sid, session_id);
        assert_eq!(claims.role, user.role);
        assert_eq!(claims.military_id, user.military_id);
        assert_eq!(claims.iss, TOKEN_ISSUER);
        assert_eq!(claims.aud, TOKEN_AUDIENCE);
    }

    #[test]
    fn test_refresh_token_round_trip() {
        let codec = create_codec();
        let user = create_test_user();
        let session_id = uuid::Uuid::new_v4();

        let token = codec.generate_refresh_token(&user, session_id).unwrap();
        let claims = codec.verify_refresh_token(&token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.sid, session_id);
    }

    #[test]
    fn test_token_classes_are_not_interchangeable() {
        // Separate secrets: a refresh token must not verify as an access
        // token even though both carry the same issuer/audience.
        let codec = create_codec();
        let user = create_test_user();
        let session_id = uuid::Uuid::new_v4();

        let refresh = codec.generate_refresh_token(&user, session_id).unwrap();
        let result = codec.verify_access_token(&refresh);
        assert!(matches!(result.unwrap_err(), Error::Unauthorized { .. }));
    }

    #[test]
    fn test_verify_token_wrong_secret() {
        let codec = create_codec();
        let user = create_test_user();
        let token = codec.generate_access_token(&user, uuid::Uuid::new_v4()).unwrap();

        let mut other_config = create_test_config();
        other_config.access_token_secret = Some("another-secret-that-is-32-chars-long!".to_string());
        let other_codec = TokenCodec::from_config(&other_config).unwrap();

        let result = other_codec.verify_access_token(&token);
        assert!(matches!(result.unwrap_err(), Error::Unauthorized { .. }));
    }

    #[test]
    fn test_verify_expired_token() {
        let config = create_test_config();
        let codec = TokenCodec::from_config(&config).unwrap();
        let user = create_test_user();

        // Manually build claims expired well past the default leeway
        let now = Utc::now();
        let claims = AccessTokenClaims {
            sub: user.id,
            sid: uuid::Uuid::new_v4(),
            role: user.role.clone(),
            military_id: user.military_id.clone(),
            iss: TOKEN_ISSUER.to_string(),
            aud: TOKEN_AUDIENCE.to_string(),
            iat: (now - chrono::Duration::seconds(7200)).timestamp(),
            exp: (now - chrono::Duration::seconds(3600)).timestamp(),
        };
        let key = EncodingKey::from_secret(config.access_token_secret.as_ref().unwrap().as_bytes());
        let token = encode(&Header::default(), &claims, &key).unwrap();

        let result = codec.verify_access_token(&token);
        assert!(matches!(result.unwrap_err(), Error::Unauthorized { .. }));
    }

    #[test]
    fn test_verify_malformed_tokens() {
        let codec = create_codec();

        let malformed_tokens = vec!["not.a.token", "invalid", "", "too.many.parts.in.this.token"];
        for token in malformed_tokens {
            let result = codec.verify_access_token(token);
            assert!(
                matches!(result.unwrap_err(), Error::Unauthorized { .. }),
                "Expected Unauthorized error for token: {token}"
            );
        }
    }

    #[test]
    fn test_extract_token_from_header() {
        assert_eq!(extract_token_from_header("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(extract_token_from_header("bearer abc.def.ghi"), None);
        assert_eq!(extract_token_from_header("Basic dXNlcjpwYXNz"), None);
        assert_eq!(extract_token_from_header("Bearer "), None);
        assert_eq!(extract_token_from_header("Bearer two tokens"), None);
        assert_eq!(extract_token_from_header(""), None);
    }
}
