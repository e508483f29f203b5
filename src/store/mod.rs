//! Directory store module
//!
//! File-persisted directory of users, roles, memberships, login keys, and API
//! sessions. State lives in memory behind a lock and is written through to a
//! TOML file on every mutation; a path-less store stays in memory only.

mod types;

pub use types::{ApiSession, KeyProvider, LoginKey, Role, User, UserRole};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by directory operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("duplicate {0}")]
    Duplicate(&'static str),
    #[error("{0}")]
    Validation(String),
    #[error("failed to access directory file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse directory file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to encode directory file: {0}")]
    Encode(#[from] toml::ser::Error),
}

/// Serialized shape of the directory file
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct StoreData {
    #[serde(default)]
    users: Vec<User>,
    #[serde(default)]
    roles: Vec<Role>,
    #[serde(default)]
    user_roles: Vec<UserRole>,
    #[serde(default)]
    login_keys: Vec<LoginKey>,
    #[serde(default)]
    sessions: Vec<ApiSession>,
}

/// The directory store
pub struct Store {
    /// Path to the TOML directory file, None for in-memory stores
    path: Option<PathBuf>,
    data: RwLock<StoreData>,
}

impl Store {
    /// Open the directory at `path`, loading existing state if the file exists
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let file = Path::new(path);
        let data = if file.exists() {
            toml::from_str(&fs::read_to_string(file)?)?
        } else {
            StoreData::default()
        };

        Ok(Self {
            path: Some(file.to_path_buf()),
            data: RwLock::new(data),
        })
    }

    /// Create an empty store with no backing file
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: RwLock::new(StoreData::default()),
        }
    }

    /// Write the current state through to the directory file
    fn save(&self, data: &StoreData) -> Result<(), StoreError> {
        let Some(ref path) = self.path else {
            return Ok(());
        };

        let encoded = toml::to_string_pretty(data)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        fs::write(path, encoded)?;

        Ok(())
    }

    // ---- users ----

    pub fn user_by_id(&self, id: u64) -> Option<User> {
        let data = self.data.read().ok()?;
        data.users.iter().find(|u| u.id == id).cloned()
    }

    pub fn user_by_username(&self, username: &str) -> Option<User> {
        let data = self.data.read().ok()?;
        data.users.iter().find(|u| u.username == username).cloned()
    }

    pub fn user_by_email(&self, email: &str) -> Option<User> {
        let data = self.data.read().ok()?;
        data.users.iter().find(|u| u.email == email).cloned()
    }

    /// Resolve a login identifier against usernames first, then emails
    pub fn user_by_username_or_email(&self, value: &str) -> Option<User> {
        let data = self.data.read().ok()?;
        data.users
            .iter()
            .find(|u| u.username == value)
            .or_else(|| data.users.iter().find(|u| u.email == value))
            .cloned()
    }

    /// All users ordered by identifier
    pub fn all_users(&self) -> Vec<User> {
        match self.data.read() {
            Ok(data) => {
                let mut users = data.users.clone();
                users.sort_by_key(|u| u.id);
                users
            }
            Err(_) => Vec::new(),
        }
    }

    /// Create a user, enforcing username/email validity and uniqueness
    pub fn create_user(
        &self,
        username: &str,
        email: &str,
        email_confirmed: bool,
    ) -> Result<User, StoreError> {
        self.validate_username(username, true)
            .map_err(StoreError::Validation)?;
        self.validate_email(email, true)
            .map_err(StoreError::Validation)?;

        let mut data = lock_write(&self.data);
        let id = data.users.iter().map(|u| u.id).max().unwrap_or(0) + 1;
        let user = User {
            id,
            username: username.to_string(),
            email: email.to_string(),
            email_confirmed,
            date_joined: Utc::now(),
            last_login: None,
        };

        data.users.push(user.clone());
        self.save(&data)?;

        Ok(user)
    }

    /// Update an existing user record (matched by id)
    pub fn update_user(&self, user: &User) -> Result<(), StoreError> {
        let mut data = lock_write(&self.data);

        if data
            .users
            .iter()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(StoreError::Duplicate("email address"));
        }

        if data
            .users
            .iter()
            .any(|u| u.id != user.id && u.username == user.username)
        {
            return Err(StoreError::Duplicate("username"));
        }

        let slot = data
            .users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or(StoreError::NotFound("user"))?;
        *slot = user.clone();
        self.save(&data)?;

        Ok(())
    }

    /// Stamp a user's last successful login
    pub fn touch_last_login(&self, user_id: u64, when: DateTime<Utc>) -> Result<(), StoreError> {
        let mut data = lock_write(&self.data);
        let user = data
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or(StoreError::NotFound("user"))?;
        user.last_login = Some(when);
        self.save(&data)?;

        Ok(())
    }

    /// Delete a user, cascading login keys, sessions, and role memberships
    pub fn delete_user(&self, id: u64) -> Result<(), StoreError> {
        let mut data = lock_write(&self.data);
        let before = data.users.len();
        data.users.retain(|u| u.id != id);

        if data.users.len() == before {
            return Err(StoreError::NotFound("user"));
        }

        data.login_keys.retain(|k| k.user_id != id);
        data.sessions.retain(|s| s.user_id != id);
        data.user_roles.retain(|ur| ur.user_id != id);
        self.save(&data)?;

        Ok(())
    }

    // ---- validation ----

    /// Check username shape (6-64 chars of [A-Za-z0-9_-]) and optionally
    /// uniqueness
    pub fn validate_username(&self, username: &str, check_unique: bool) -> Result<(), String> {
        const MIN_LENGTH: usize = 6;
        const MAX_LENGTH: usize = 64;

        if username.len() < MIN_LENGTH || username.len() > MAX_LENGTH {
            return Err(format!(
                "Empty or wrong length (must be between {MIN_LENGTH} and {MAX_LENGTH} characters long)"
            ));
        }

        if let Some(bad) = username
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && *c != '-' && *c != '_')
        {
            return Err(format!("Invalid character ({bad})"));
        }

        if check_unique && self.user_by_username(username).is_some() {
            return Err("Duplicate username in directory".to_string());
        }

        Ok(())
    }

    /// Check email shape and optionally uniqueness
    pub fn validate_email(&self, email: &str, check_unique: bool) -> Result<(), String> {
        if email.is_empty() || !email.contains('@') {
            return Err("Empty or invalid format".to_string());
        }

        if check_unique && self.user_by_email(email).is_some() {
            return Err("Duplicate email address in directory".to_string());
        }

        Ok(())
    }

    /// Check password length (8-72 bytes)
    pub fn validate_password(password: &str) -> Result<(), String> {
        const MIN_LENGTH: usize = 8;
        const MAX_LENGTH: usize = 72;

        if password.len() < MIN_LENGTH || password.len() > MAX_LENGTH {
            return Err(format!(
                "Empty or wrong length (must be between {MIN_LENGTH} and {MAX_LENGTH} characters long)"
            ));
        }

        Ok(())
    }

    // ---- roles ----

    pub fn role_by_name(&self, name: &str) -> Option<Role> {
        let data = self.data.read().ok()?;
        data.roles.iter().find(|r| r.name == name).cloned()
    }

    /// Create a role unless one with the same name already exists
    pub fn create_role_if_missing(&self, name: &str) -> Result<Role, StoreError> {
        if name.is_empty() {
            return Err(StoreError::Validation("Empty role name".to_string()));
        }

        let mut data = lock_write(&self.data);

        if let Some(role) = data.roles.iter().find(|r| r.name == name) {
            return Ok(role.clone());
        }

        let id = data.roles.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        let role = Role {
            id,
            name: name.to_string(),
        };
        data.roles.push(role.clone());
        self.save(&data)?;

        Ok(role)
    }

    /// Whether the user belongs to the named role; false on any miss
    pub fn user_in_role(&self, user_id: u64, role_name: &str) -> bool {
        if user_id < 1 || role_name.is_empty() {
            return false;
        }

        let Ok(data) = self.data.read() else {
            return false;
        };
        let Some(role) = data.roles.iter().find(|r| r.name == role_name) else {
            return false;
        };

        data.user_roles
            .iter()
            .any(|ur| ur.user_id == user_id && ur.role_id == role.id)
    }

    /// Add the user to the named role; no-op when already a member
    pub fn add_user_to_role(&self, user_id: u64, role_name: &str) -> Result<(), StoreError> {
        let mut data = lock_write(&self.data);
        let role = data
            .roles
            .iter()
            .find(|r| r.name == role_name)
            .ok_or(StoreError::NotFound("role"))?
            .clone();

        if !data
            .user_roles
            .iter()
            .any(|ur| ur.user_id == user_id && ur.role_id == role.id)
        {
            data.user_roles.push(UserRole {
                user_id,
                role_id: role.id,
            });
            self.save(&data)?;
        }

        Ok(())
    }

    /// Remove the user from the named role
    pub fn remove_user_from_role(&self, user_id: u64, role_name: &str) -> Result<(), StoreError> {
        let mut data = lock_write(&self.data);
        let role = data
            .roles
            .iter()
            .find(|r| r.name == role_name)
            .ok_or(StoreError::NotFound("role"))?
            .clone();

        data.user_roles
            .retain(|ur| !(ur.user_id == user_id && ur.role_id == role.id));
        self.save(&data)?;

        Ok(())
    }

    // ---- login keys ----

    pub fn login_key(&self, user_id: u64, provider: KeyProvider) -> Option<LoginKey> {
        let data = self.data.read().ok()?;
        data.login_keys
            .iter()
            .find(|k| k.user_id == user_id && k.provider == provider)
            .cloned()
    }

    /// Create or replace the key for (user, provider)
    pub fn set_login_key(
        &self,
        user_id: u64,
        provider: KeyProvider,
        key: &str,
    ) -> Result<(), StoreError> {
        let mut data = lock_write(&self.data);

        match data
            .login_keys
            .iter_mut()
            .find(|k| k.user_id == user_id && k.provider == provider)
        {
            Some(existing) => existing.key = key.to_string(),
            None => data.login_keys.push(LoginKey {
                user_id,
                provider,
                key: key.to_string(),
            }),
        }

        self.save(&data)?;

        Ok(())
    }

    /// Remove the key for (user, provider)
    pub fn remove_login_key(&self, user_id: u64, provider: KeyProvider) -> Result<(), StoreError> {
        let mut data = lock_write(&self.data);
        let before = data.login_keys.len();
        data.login_keys
            .retain(|k| !(k.user_id == user_id && k.provider == provider));

        if data.login_keys.len() == before {
            return Err(StoreError::NotFound("login key"));
        }

        self.save(&data)?;

        Ok(())
    }

    // ---- sessions ----

    /// Create a session for the user with a fresh opaque token
    pub fn create_session(
        &self,
        user_id: u64,
        hostname: &str,
        address: &str,
    ) -> Result<ApiSession, StoreError> {
        if user_id < 1 {
            return Err(StoreError::Validation(
                "Cannot create a session without a user identifier".to_string(),
            ));
        }

        let mut data = lock_write(&self.data);
        let id = data.sessions.iter().map(|s| s.id).max().unwrap_or(0) + 1;
        let session = ApiSession {
            id,
            user_id,
            token: Uuid::new_v4().to_string(),
            hostname: hostname.to_string(),
            address: address.to_string(),
            created: Utc::now(),
        };

        data.sessions.push(session.clone());
        self.save(&data)?;

        Ok(session)
    }

    pub fn session_by_token(&self, token: &str) -> Option<ApiSession> {
        let data = self.data.read().ok()?;
        data.sessions.iter().find(|s| s.token == token).cloned()
    }

    pub fn delete_session_by_token(&self, token: &str) -> Result<(), StoreError> {
        let mut data = lock_write(&self.data);
        let before = data.sessions.len();
        data.sessions.retain(|s| s.token != token);

        if data.sessions.len() == before {
            return Err(StoreError::NotFound("session"));
        }

        self.save(&data)?;

        Ok(())
    }
}

/// Acquire the write lock, recovering from a poisoned lock
fn lock_write(lock: &RwLock<StoreData>) -> std::sync::RwLockWriteGuard<'_, StoreData> {
    lock.write().unwrap_or_else(std::sync::PoisonError::into_inner)
}
