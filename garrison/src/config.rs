//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable
//! overrides. The configuration file path defaults to `config.yaml` but can
//! be specified via the `-f` flag or the `GARRISON_CONFIG` environment
//! variable.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources
//! override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `GARRISON_`
//!
//! For nested config values, use double underscores in environment
//! variables. For example, `GARRISON_AUTH__RATE_LIMIT__IP_MAX_ATTEMPTS=20`
//! sets the `auth.rate_limit.ip_max_attempts` field.
//!
//! ## Configuration Structure
//!
//! - **Secrets**: `access_token_secret`, `refresh_token_secret` - HS256
//!   signing secrets, required, at least 32 characters
//! - **Security**: `auth.security.access_token_expiry`,
//!   `auth.security.refresh_token_expiry` - humantime strings ("15m", "7d")
//! - **Rate limiting**: `auth.rate_limit.ip_max_attempts`,
//!   `auth.rate_limit.identity_max_attempts`
//! - **Passwords**: `auth.password.*` - length bounds and Argon2 cost
//!
//! Validation runs once at load time and fails fast; services never re-read
//! the environment afterwards.

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::auth::password::Argon2Params;
use crate::errors::Error;

/// Shortest signing secret accepted for either token class
pub const MIN_SECRET_LENGTH: usize = 32;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "GARRISON_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the service.
    /// Useful for CI/CD pipelines to catch config errors before deployment.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// All fields have sensible defaults except the token signing secrets,
/// which must be provided explicitly.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HS256 secret for access tokens (required, min 32 chars)
    pub access_token_secret: Option<String>,
    /// HS256 secret for refresh tokens (required, min 32 chars)
    pub refresh_token_secret: Option<String>,
    /// Authentication configuration
    pub auth: AuthConfig,
}

/// Authentication configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// Token lifetimes
    pub security: SecurityConfig,
    /// Login brute-force thresholds
    pub rate_limit: RateLimitConfig,
    /// Password validation rules and hashing cost
    pub password: PasswordConfig,
}

/// Security configuration for token lifetimes.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SecurityConfig {
    /// Access token expiry duration
    #[serde(with = "humantime_serde")]
    pub access_token_expiry: Duration,
    /// Refresh token expiry duration (also bounds the session lifetime)
    #[serde(with = "humantime_serde")]
    pub refresh_token_expiry: Duration,
}

/// Login rate-limit thresholds.
///
/// Attempts are counted per caller IP and per claimed identity
/// independently; either threshold denies on its own.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Failed attempts tolerated per source IP inside the window
    pub ip_max_attempts: u32,
    /// Failed attempts tolerated per claimed identity inside the window
    pub identity_max_attempts: u32,
}

/// Password validation rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PasswordConfig {
    /// Minimum password length
    pub min_length: usize,
    /// Maximum password length
    pub max_length: usize,
    /// Argon2 memory cost in KiB (default: 19456 KiB = 19 MB, secure for production)
    pub argon2_memory_kib: u32,
    /// Argon2 iterations (default: 2, secure for production)
    pub argon2_iterations: u32,
    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,
}

impl PasswordConfig {
    /// Hashing parameters derived from this configuration
    pub fn argon2_params(&self) -> Argon2Params {
        Argon2Params {
            memory_kib: self.argon2_memory_kib,
            iterations: self.argon2_iterations,
            parallelism: self.argon2_parallelism,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            access_token_secret: None,
            refresh_token_secret: None,
            auth: AuthConfig::default(),
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            access_token_expiry: Duration::from_secs(15 * 60),            // 15 minutes
            refresh_token_expiry: Duration::from_secs(7 * 24 * 60 * 60), // 7 days
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            ip_max_attempts: 10,
            identity_max_attempts: 5,
        }
    }
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 64,
            // Secure defaults for production (Argon2id RFC recommendations)
            argon2_memory_kib: 19456, // 19 MB
            argon2_iterations: 2,
            argon2_parallelism: 1,
        }
    }
}

impl Config {
    pub fn load(args: &Args) -> Result<Self, Error> {
        let config: Self = Self::figment(args).extract().map_err(|e| Error::Configuration {
            message: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can still override specific values
            .merge(Env::prefixed("GARRISON_").split("__"))
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        validate_secret(&self.access_token_secret, "access_token_secret", "GARRISON_ACCESS_TOKEN_SECRET")?;
        validate_secret(&self.refresh_token_secret, "refresh_token_secret", "GARRISON_REFRESH_TOKEN_SECRET")?;

        // Validate password requirements
        if self.auth.password.min_length > self.auth.password.max_length {
            return Err(Error::Configuration {
                message: format!(
                    "Invalid password configuration: min_length ({}) cannot be greater than max_length ({})",
                    self.auth.password.min_length, self.auth.password.max_length
                ),
            });
        }

        if self.auth.password.min_length < 1 {
            return Err(Error::Configuration {
                message: "Invalid password configuration: min_length must be at least 1".to_string(),
            });
        }

        // Validate token expiry durations are reasonable
        if self.auth.security.access_token_expiry.as_secs() < 60 {
            return Err(Error::Configuration {
                message: "Access token expiry is too short (minimum 1 minute)".to_string(),
            });
        }

        if self.auth.security.access_token_expiry.as_secs() > 86400 {
            return Err(Error::Configuration {
                message: "Access token expiry is too long (maximum 24 hours)".to_string(),
            });
        }

        if self.auth.security.refresh_token_expiry < self.auth.security.access_token_expiry {
            return Err(Error::Configuration {
                message: "Refresh token expiry cannot be shorter than the access token expiry".to_string(),
            });
        }

        if self.auth.security.refresh_token_expiry.as_secs() > 86400 * 30 {
            return Err(Error::Configuration {
                message: "Refresh token expiry is too long (maximum 30 days)".to_string(),
            });
        }

        // A zero threshold would deny every login unconditionally
        if self.auth.rate_limit.ip_max_attempts == 0 || self.auth.rate_limit.identity_max_attempts == 0 {
            return Err(Error::Configuration {
                message: "Rate limit thresholds must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

fn validate_secret(secret: &Option<String>, field: &str, env_var: &str) -> Result<(), Error> {
    let Some(secret) = secret else {
        return Err(Error::Configuration {
            message: format!("{field} is not configured. Please set the {env_var} environment variable or add {field} to the config file."),
        });
    };

    if secret.len() < MIN_SECRET_LENGTH {
        return Err(Error::Configuration {
            message: format!("{field} is too weak: must be at least {MIN_SECRET_LENGTH} characters"),
        });
    }

    Ok(())
}
