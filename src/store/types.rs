// Directory entity types
// Serialized as-is into the TOML directory file

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A system user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    /// Unique identifier
    pub id: u64,
    /// Unique login name, 6-64 chars of [A-Za-z0-9_-]
    pub username: String,
    /// Unique email address
    pub email: String,
    /// Whether the email address has been confirmed
    pub email_confirmed: bool,
    /// When the account was created
    pub date_joined: DateTime<Utc>,
    /// Last successful authentication, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

/// A named permission group
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Role {
    pub id: u64,
    pub name: String,
}

/// Membership of a user in a role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRole {
    pub user_id: u64,
    pub role_id: u64,
}

/// Credential provider tag for login keys
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum KeyProvider {
    /// Password credential, key holds the Argon2 hash
    Basic,
    Facebook,
    Twitter,
}

/// A credential bound to a user and provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginKey {
    pub user_id: u64,
    pub provider: KeyProvider,
    /// Provider-specific secret; the Argon2 hash for `Basic`
    pub key: String,
}

/// An authenticated API session bound to an opaque token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiSession {
    pub id: u64,
    pub user_id: u64,
    pub token: String,
    /// Host that originated the session
    pub hostname: String,
    /// IP address that originated the session
    pub address: String,
    pub created: DateTime<Utc>,
}
