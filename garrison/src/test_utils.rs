//! Shared fixtures for the test suite.

use std::ops::Deref;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    AuthSystem,
    api::models::users::Role,
    auth::password::{Argon2Params, hash_string_with_params},
    auth::tokens::TokenCodec,
    config::Config,
    storage::models::identities::{Identity, IdentityCreateRequest},
    storage::models::users::{User, UserCreateRequest},
    storage::{IdentityStore, UserStore},
};

/// The password every seeded account gets
pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// A password guaranteed not to match any seeded account
pub const WRONG_PASSWORD: &str = "definitely-not-the-password";

pub fn create_test_config() -> Config {
    Config {
        access_token_secret: Some("test-access-secret-0123456789-abcdef".to_string()),
        refresh_token_secret: Some("test-refresh-secret-0123456789-abcdef".to_string()),
        ..Default::default()
    }
}

pub fn create_test_codec() -> TokenCodec {
    TokenCodec::from_config(&create_test_config()).expect("test codec should build")
}

/// A user record that exists nowhere; useful for codec and session tests.
pub fn create_test_user() -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        identity_id: Uuid::new_v4(),
        military_id: "MIL-4821".to_string(),
        role: Role::Officer,
        password_hash: None,
        created_at: now,
        updated_at: now,
    }
}

/// Fully wired in-memory auth system for end-to-end style tests.
pub struct TestStack(pub AuthSystem);

impl TestStack {
    pub fn new() -> Self {
        Self(AuthSystem::in_memory(&create_test_config()).expect("test auth system should build"))
    }
}

impl Default for TestStack {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for TestStack {
    type Target = AuthSystem;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Identity, account and known-good password seeded into a [`TestStack`].
pub struct SeededUser {
    pub identity: Identity,
    pub user: User,
    pub password: String,
}

/// Seed an officer account reachable by `rg`, with [`TEST_PASSWORD`] as its
/// password. Hashing uses a small Argon2 cost to keep tests fast; the
/// parameters travel inside the hash, so verification is unaffected.
pub async fn seed_officer(stack: &TestStack, rg: i64) -> SeededUser {
    let identity = stack
        .identities
        .create(&IdentityCreateRequest {
            rg,
            name: "Test Officer".to_string(),
        })
        .await
        .expect("identity should seed");

    let cheap_params = Argon2Params {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    };
    let password_hash = hash_string_with_params(TEST_PASSWORD, Some(cheap_params)).expect("password should hash");

    let user = stack
        .users
        .create(&UserCreateRequest {
            identity_id: identity.id,
            military_id: format!("MIL-{rg:04}"),
            role: Role::Officer,
            password_hash: Some(password_hash),
        })
        .await
        .expect("user should seed");

    SeededUser {
        identity,
        user,
        password: TEST_PASSWORD.to_string(),
    }
}
