//! # garrison: Authentication & Session Control Layer
//!
//! `garrison` is the authentication subsystem of the personnel-management
//! platform. It authenticates users against the personnel registry, issues
//! and validates bearer credentials, and manages session lifecycle under
//! adversarial conditions: credential stuffing, session hijacking and
//! user-enumeration probing.
//!
//! ## Overview
//!
//! The crate is transport-agnostic: it exposes orchestration services that a
//! host application (HTTP layer, RPC layer) drives with plain request and
//! response types. Persistence sits behind storage traits with an in-memory
//! reference implementation, so a durable backing store can be substituted
//! without touching any orchestration logic.
//!
//! ### What It Does
//!
//! A login request flows through input sanitation, a dual-key rate limiter
//! (caller IP and claimed identity are throttled independently, with a fixed
//! penalty block once a threshold trips), identity and account resolution,
//! and an Argon2 password compare. Every credential-chain failure produces
//! the same generic error and counts against both rate-limit keys, which
//! closes the timing/oracle channel an attacker would use to enumerate
//! accounts. A successful login supersedes any previous session - at most
//! one session per user is active at any instant - and issues a short-lived
//! access token plus a longer-lived refresh token, both JWTs that embed the
//! session id.
//!
//! Request authorization resolves the access token back to an active
//! session. Token refresh is IP-pinned: a refresh attempted from an IP other
//! than the one the session was created from deactivates the session
//! immediately and fails. Logout is best-effort and never fails from the
//! caller's perspective.
//!
//! ### Core Components
//!
//! The **authentication layer** ([`auth`]) carries the services: login,
//! refresh and logout orchestration, the token codec, the rate limiter, the
//! session manager and the request validator, plus the `security`-target
//! audit log.
//!
//! The **storage layer** ([`storage`]) defines the `SessionStore`,
//! `UserStore` and `IdentityStore` traits and ships the in-memory reference
//! implementation. Reference-store writes are last-write-wins; durable
//! implementations must provide atomic read-modify-write for the
//! deactivate-all-then-create and check-then-record sequences.
//!
//! The **configuration layer** ([`config`]) loads a YAML file merged with
//! `GARRISON_`-prefixed environment variables, validates once at startup and
//! fails fast on missing or weak token secrets.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use garrison::{AuthSystem, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = garrison::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     garrison::telemetry::init_telemetry()?;
//!
//!     let auth = AuthSystem::in_memory(&config)?;
//!     let response = auth
//!         .login
//!         .login(
//!             garrison::api::models::auth::LoginRequest {
//!                 rg: 123456,
//!                 password: "secret".to_string(),
//!                 device_info: None,
//!             },
//!             "203.0.113.7",
//!             "cli/1.0",
//!         )
//!         .await?;
//!     println!("expires in {}s", response.expires_in);
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

pub mod api;
pub mod auth;
pub mod config;
pub mod errors;
pub mod storage;
pub mod telemetry;
#[cfg(test)]
pub mod test_utils;
pub mod types;

pub use config::Config;
pub use errors::{Error, Result};

use crate::{
    auth::audit::SecurityLog,
    auth::login::LoginService,
    auth::logout::LogoutService,
    auth::rate_limit::{RateLimiter, RateLimitingService},
    auth::refresh::RefreshTokenService,
    auth::session::SessionManager,
    auth::tokens::TokenCodec,
    auth::validator::TokenValidator,
    storage::memory::{InMemoryIdentityStore, InMemorySessionStore, InMemoryUserStore},
};

/// The fully wired authentication subsystem over the in-memory reference
/// stores.
///
/// Construction validates the configuration-derived pieces (token secrets)
/// and is the composition root a host application embeds. The stores are
/// exposed so hosts can seed identities/accounts and run maintenance sweeps
/// (`delete_expired`, limiter `cleanup`).
pub struct AuthSystem {
    pub login: LoginService<InMemoryIdentityStore, InMemoryUserStore, InMemorySessionStore>,
    pub refresh: RefreshTokenService<InMemoryUserStore, InMemorySessionStore>,
    pub logout: LogoutService<InMemorySessionStore>,
    pub validator: TokenValidator<InMemorySessionStore>,
    pub rate_limiter: Arc<RateLimiter>,
    pub identities: Arc<InMemoryIdentityStore>,
    pub users: Arc<InMemoryUserStore>,
    pub sessions: Arc<InMemorySessionStore>,
    passwords: config::PasswordConfig,
}

impl std::fmt::Debug for AuthSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSystem").finish_non_exhaustive()
    }
}

impl AuthSystem {
    /// Build the subsystem over fresh in-memory stores.
    pub fn in_memory(config: &Config) -> Result<Self> {
        let codec = Arc::new(TokenCodec::from_config(config)?);
        let audit = SecurityLog::new();
        let rate_limiter = Arc::new(RateLimiter::new());
        let identities = Arc::new(InMemoryIdentityStore::new());
        let users = Arc::new(InMemoryUserStore::new());
        let sessions = Arc::new(InMemorySessionStore::new());

        let rate_limits = RateLimitingService::new(rate_limiter.clone(), config.auth.rate_limit.clone(), audit);
        let session_manager = SessionManager::new(sessions.clone(), codec.clone());

        Ok(Self {
            login: LoginService::new(
                identities.clone(),
                users.clone(),
                session_manager,
                rate_limits,
                config.auth.password.clone(),
                audit,
            ),
            refresh: RefreshTokenService::new(users.clone(), sessions.clone(), codec.clone(), audit),
            logout: LogoutService::new(sessions.clone(), audit),
            validator: TokenValidator::new(codec, sessions.clone()),
            rate_limiter,
            identities,
            users,
            sessions,
            passwords: config.auth.password.clone(),
        })
    }

    /// Hash a candidate password under the configured policy.
    ///
    /// For hosts provisioning or rotating account credentials. Length bounds
    /// are enforced here; hashing runs on a blocking thread because Argon2
    /// is deliberately slow.
    pub async fn hash_password(&self, password: &str) -> Result<String> {
        let policy = &self.passwords;
        if password.len() < policy.min_length {
            return Err(Error::BadRequest {
                message: format!("Password must be at least {} characters", policy.min_length),
            });
        }
        if password.len() > policy.max_length {
            return Err(Error::BadRequest {
                message: format!("Password must be no more than {} characters", policy.max_length),
            });
        }

        let params = policy.argon2_params();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || auth::password::hash_string_with_params(&password, Some(params)))
            .await
            .map_err(|e| Error::Internal {
                operation: format!("spawn password hashing task: {e}"),
            })?
    }
}
