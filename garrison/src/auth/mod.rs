//! Authentication and session subsystem.
//!
//! This module provides the full credential-to-session pipeline:
//! - Login orchestration with dual-key brute-force protection
//! - Password hashing and verification using Argon2
//! - Access/refresh token issuance and validation (JWT)
//! - Session lifecycle with a single-active-session guarantee
//! - IP-pinned refresh with hijack teardown
//! - Best-effort logout
//!
//! # Flow
//!
//! Login runs sanitize → rate-limit check → credential verification →
//! session creation → rate-limit reset. Refresh substitutes the credential
//! step with IP-pinning validation against the stored session. Every failure
//! the caller can observe is generic; the concrete reason only reaches the
//! internal logs.
//!
//! # Modules
//!
//! - [`audit`]: security event log
//! - [`login`]: login orchestration
//! - [`logout`]: best-effort session teardown
//! - [`password`]: Argon2 hashing and verification
//! - [`rate_limit`]: sliding-window limiter and login policy
//! - [`refresh`]: access-token renewal
//! - [`session`]: session creation and token issuance
//! - [`tokens`]: JWT codec for both token classes
//! - [`validator`]: bearer/refresh validation for request authorization

pub mod audit;
pub mod login;
pub mod logout;
pub mod password;
pub mod rate_limit;
pub mod refresh;
pub mod session;
pub mod tokens;
pub mod validator;
