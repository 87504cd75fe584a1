//! Login orchestration.
//!
//! The credential chain (identity lookup, account lookup, password compare)
//! fails with one uniform "Invalid credentials" error no matter which step
//! broke, and every such failure counts against both rate-limit keys. The
//! distinct reason is only visible in internal logs - the response is the
//! same whether the RG exists or not, which is what keeps user enumeration
//! off the table.

use std::sync::Arc;

use tracing::{debug, error, instrument};

use crate::{
    api::models::auth::{AuthenticatedUser, LoginRequest, LoginResponse},
    auth::audit::SecurityLog,
    auth::password,
    auth::rate_limit::{LoginRateKeys, RateLimitingService},
    auth::session::SessionManager,
    config::PasswordConfig,
    errors::{Error, Result},
    storage::{IdentityStore, SessionStore, UserStore},
    types::abbrev_uuid,
};

/// Orchestrates the full login flow.
#[derive(Clone)]
pub struct LoginService<I, U, S> {
    identities: Arc<I>,
    users: Arc<U>,
    sessions: SessionManager<S>,
    rate_limits: RateLimitingService,
    passwords: PasswordConfig,
    audit: SecurityLog,
}

impl<I, U, S> LoginService<I, U, S>
where
    I: IdentityStore,
    U: UserStore,
    S: SessionStore,
{
    pub fn new(
        identities: Arc<I>,
        users: Arc<U>,
        sessions: SessionManager<S>,
        rate_limits: RateLimitingService,
        passwords: PasswordConfig,
        audit: SecurityLog,
    ) -> Self {
        Self {
            identities,
            users,
            sessions,
            rate_limits,
            passwords,
            audit,
        }
    }

    /// Authenticate a user and open a session.
    ///
    /// A rate-limit denial fails fast and is not itself counted as an
    /// attempt. Everything after the limit check that goes wrong - including
    /// infrastructure trouble - counts as one failed attempt on both keys.
    #[instrument(skip_all, fields(rg = request.rg, ip = %ip))]
    pub async fn login(&self, request: LoginRequest, ip: &str, user_agent: &str) -> Result<LoginResponse> {
        let request = sanitize(request, &self.passwords)?;
        let keys = self.rate_limits.validate_login_attempt(ip, request.rg)?;

        match self.authenticate(&request, ip, user_agent, &keys).await {
            Ok(response) => Ok(response),
            Err(err) => {
                self.rate_limits.record_failed_attempt(&keys);
                match err {
                    Error::Unauthorized { .. } => Err(err),
                    other => {
                        error!(error = %other, "login flow failed unexpectedly");
                        Err(Error::Unauthorized {
                            message: Some("Authentication process error".to_string()),
                        })
                    }
                }
            }
        }
    }

    async fn authenticate(&self, request: &LoginRequest, ip: &str, user_agent: &str, keys: &LoginRateKeys) -> Result<LoginResponse> {
        let identity = self.identities.get_by_rg(request.rg).await?.ok_or_else(|| {
            debug!(rg = request.rg, "login failed: unknown rg");
            invalid_credentials()
        })?;

        let user = self.users.get_by_identity(identity.id).await?.ok_or_else(|| {
            debug!(identity_id = %abbrev_uuid(&identity.id), "login failed: no account for identity");
            invalid_credentials()
        })?;

        let password_hash = user.password_hash.clone().ok_or_else(|| {
            debug!(user_id = %abbrev_uuid(&user.id), "login failed: account has no credentials");
            invalid_credentials()
        })?;

        // Argon2 is deliberately slow; keep it off the async runtime
        let candidate = request.password.clone();
        let is_valid = tokio::task::spawn_blocking(move || password::verify_string(&candidate, &password_hash))
            .await
            .map_err(|e| Error::Internal {
                operation: format!("spawn password verification task: {e}"),
            })??;

        if !is_valid {
            debug!(user_id = %abbrev_uuid(&user.id), "login failed: password mismatch");
            return Err(invalid_credentials());
        }

        let issued = self
            .sessions
            .create_session(&user, ip, user_agent, request.device_info.as_deref())
            .await?;

        self.rate_limits.reset_limits(keys);
        self.audit.login(user.id, issued.session_id, ip);

        Ok(LoginResponse {
            access_token: issued.access_token,
            refresh_token: issued.refresh_token,
            user: AuthenticatedUser {
                id: user.id,
                military_id: user.military_id.clone(),
                role: user.role.clone(),
            },
            expires_in: issued.expires_in,
        })
    }
}

/// Reject inputs that cannot belong to any account before touching the
/// rate limiter, the stores or the password hasher. No stored credential can
/// sit outside the configured length bounds, so out-of-bounds candidates are
/// denied without burning an Argon2 compare on them.
fn sanitize(request: LoginRequest, passwords: &PasswordConfig) -> Result<LoginRequest> {
    if request.rg <= 0 || request.password.is_empty() {
        return Err(invalid_credentials());
    }
    if request.password.len() < passwords.min_length || request.password.len() > passwords.max_length {
        debug!(rg = request.rg, "login failed: password length outside policy bounds");
        return Err(invalid_credentials());
    }
    Ok(request)
}

fn invalid_credentials() -> Error {
    Error::Unauthorized {
        message: Some("Invalid credentials".to_string()),
    }
}
