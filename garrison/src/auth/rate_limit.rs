//! Rate limiting for authentication attempts.
//!
//! [`RateLimiter`] is a generic sliding-window attempt counter with penalty
//! blocking; [`RateLimitingService`] applies it to the login use case with a
//! dual key (caller IP plus claimed identity) so neither a botnet cycling
//! identities nor a single host hammering one account slips through.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::auth::audit::SecurityLog;
use crate::config::RateLimitConfig;
use crate::errors::{Error, Result};

/// Penalty applied once a key exceeds its limit, independent of the window
pub const DEFAULT_BLOCK_DURATION: StdDuration = StdDuration::from_secs(15 * 60);

/// Entries with no attempt inside this threshold are eligible for cleanup
const STALE_AFTER: StdDuration = StdDuration::from_secs(60 * 60);

/// Counting window shared by both login keys
const LOGIN_WINDOW: StdDuration = StdDuration::from_secs(15 * 60);

/// Result of a limit check.
#[derive(Debug, Clone)]
pub struct RateLimitCheck {
    pub allowed: bool,
    pub remaining_attempts: u32,
    /// When the window resets, or - if the key is blocked - when the block expires
    pub reset_time: DateTime<Utc>,
    pub total_attempts: u32,
}

/// Entry in the rate limit map
#[derive(Debug, Clone, Default)]
struct RateLimitEntry {
    /// Timestamps of attempts inside the current window
    attempts: Vec<DateTime<Utc>>,
    /// While set and in the future, the key is blocked regardless of the window
    blocked_until: Option<DateTime<Utc>>,
}

impl RateLimitEntry {
    /// Drop attempts that have slid out of the window
    fn prune(&mut self, now: DateTime<Utc>, window: Duration) {
        let cutoff = now.checked_sub_signed(window).unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.attempts.retain(|t| *t > cutoff);
    }

    fn last_attempt(&self) -> Option<DateTime<Utc>> {
        self.attempts.last().copied()
    }
}

/// Sliding-window attempt counter with penalty blocking.
///
/// Keys are opaque strings. Exceeding `max_attempts` within the window at
/// check time transitions the key to blocked for a fixed penalty duration;
/// while blocked, the key stays denied even after the counting window has
/// independently expired.
#[derive(Debug)]
pub struct RateLimiter {
    entries: DashMap<String, RateLimitEntry>,
    block_duration: Duration,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    /// Create a rate limiter with the standard 15-minute block penalty.
    pub fn new() -> Self {
        Self::with_block_duration(DEFAULT_BLOCK_DURATION)
    }

    /// Create a rate limiter with a custom block penalty.
    pub fn with_block_duration(block_duration: StdDuration) -> Self {
        Self {
            entries: DashMap::new(),
            block_duration: Duration::from_std(block_duration).unwrap_or(Duration::MAX),
        }
    }

    /// Check whether `key` may proceed, given `max_attempts` per `window`.
    ///
    /// `max_attempts == 0` always denies. Checking is where the transition to
    /// blocked happens; [`RateLimiter::record_attempt`] only counts.
    pub fn check_limit(&self, key: &str, max_attempts: u32, window: StdDuration) -> RateLimitCheck {
        let now = Utc::now();
        let window = Duration::from_std(window).unwrap_or(Duration::MAX);

        if max_attempts == 0 {
            return RateLimitCheck {
                allowed: false,
                remaining_attempts: 0,
                reset_time: now,
                total_attempts: 0,
            };
        }

        let Some(mut entry) = self.entries.get_mut(key) else {
            return RateLimitCheck {
                allowed: true,
                remaining_attempts: max_attempts,
                reset_time: saturating_add(now, window),
                total_attempts: 0,
            };
        };

        // An expired block is lifted lazily on the next check
        if entry.blocked_until.is_some_and(|until| until <= now) {
            entry.blocked_until = None;
        }

        entry.prune(now, window);
        let total_attempts = entry.attempts.len() as u32;

        if let Some(blocked_until) = entry.blocked_until {
            return RateLimitCheck {
                allowed: false,
                remaining_attempts: 0,
                reset_time: blocked_until,
                total_attempts,
            };
        }

        if total_attempts >= max_attempts {
            let blocked_until = saturating_add(now, self.block_duration);
            entry.blocked_until = Some(blocked_until);
            return RateLimitCheck {
                allowed: false,
                remaining_attempts: 0,
                reset_time: blocked_until,
                total_attempts,
            };
        }

        let reset_time = entry
            .attempts
            .first()
            .map(|first| saturating_add(*first, window))
            .unwrap_or_else(|| saturating_add(now, window));

        RateLimitCheck {
            allowed: true,
            remaining_attempts: max_attempts - total_attempts,
            reset_time,
            total_attempts,
        }
    }

    /// Count one attempt against `key`.
    pub fn record_attempt(&self, key: &str, window: StdDuration) {
        let now = Utc::now();
        let window = Duration::from_std(window).unwrap_or(Duration::MAX);
        let mut entry = self.entries.entry(key.to_string()).or_default();
        entry.prune(now, window);
        entry.attempts.push(now);
    }

    /// Forget everything about `key`, including an active block. Idempotent.
    pub fn reset(&self, key: &str) {
        self.entries.remove(key);
    }

    /// Whether `key` currently sits in the block penalty.
    pub fn is_blocked(&self, key: &str) -> bool {
        let now = Utc::now();
        self.entries
            .get(key)
            .is_some_and(|entry| entry.blocked_until.is_some_and(|until| until > now))
    }

    /// Evict entries with no recent attempts. Blocked entries are retained
    /// until the block naturally expires, so cleanup can never lift a
    /// penalty early.
    pub fn cleanup(&self) {
        let now = Utc::now();
        let stale_cutoff = now
            .checked_sub_signed(Duration::from_std(STALE_AFTER).unwrap_or(Duration::MAX))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        self.entries.retain(|_, entry| {
            if entry.blocked_until.is_some_and(|until| until > now) {
                return true;
            }
            entry.last_attempt().is_some_and(|last| last > stale_cutoff)
        });
    }
}

fn saturating_add(instant: DateTime<Utc>, delta: Duration) -> DateTime<Utc> {
    instant.checked_add_signed(delta).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Limiter keys tracking one login attempt.
#[derive(Debug, Clone)]
pub struct LoginRateKeys {
    pub ip: String,
    pub identity: String,
}

/// Login rate-limiting policy over a shared [`RateLimiter`].
#[derive(Clone)]
pub struct RateLimitingService {
    limiter: Arc<RateLimiter>,
    policy: RateLimitConfig,
    audit: SecurityLog,
}

impl RateLimitingService {
    pub fn new(limiter: Arc<RateLimiter>, policy: RateLimitConfig, audit: SecurityLog) -> Self {
        Self { limiter, policy, audit }
    }

    /// Check both login keys before any credential work happens.
    ///
    /// The IP key is checked first; when it denies, the identity key is not
    /// consulted at all, so a blocked caller learns nothing about the state
    /// of the account-level limit. The returned keys are what later gets
    /// recorded (failure) or reset (success).
    pub fn validate_login_attempt(&self, ip: &str, rg: i64) -> Result<LoginRateKeys> {
        let keys = LoginRateKeys {
            ip: format!("login:ip:{ip}"),
            identity: format!("login:user:{rg}"),
        };

        let check = self.limiter.check_limit(&keys.ip, self.policy.ip_max_attempts, LOGIN_WINDOW);
        if !check.allowed {
            let wait = wait_minutes(check.reset_time);
            self.audit.login_blocked("ip", ip, wait);
            return Err(too_many_attempts(wait));
        }

        let check = self
            .limiter
            .check_limit(&keys.identity, self.policy.identity_max_attempts, LOGIN_WINDOW);
        if !check.allowed {
            let wait = wait_minutes(check.reset_time);
            self.audit.login_blocked("identity", ip, wait);
            return Err(too_many_attempts(wait));
        }

        Ok(keys)
    }

    /// Count one failed attempt on both keys.
    pub fn record_failed_attempt(&self, keys: &LoginRateKeys) {
        self.limiter.record_attempt(&keys.ip, LOGIN_WINDOW);
        self.limiter.record_attempt(&keys.identity, LOGIN_WINDOW);
    }

    /// Clear both keys after a successful login.
    pub fn reset_limits(&self, keys: &LoginRateKeys) {
        self.limiter.reset(&keys.ip);
        self.limiter.reset(&keys.identity);
    }
}

/// Minutes until `reset_time`, rounded up, never less than one.
fn wait_minutes(reset_time: DateTime<Utc>) -> i64 {
    let millis = (reset_time - Utc::now()).num_milliseconds().max(0);
    ((millis as u64).div_ceil(60_000) as i64).max(1)
}

fn too_many_attempts(wait: i64) -> Error {
    Error::TooManyRequests {
        message: format!("Too many login attempts. Try again in {wait} minute(s)."),
    }
}
