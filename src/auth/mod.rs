//! Authorization lookup contracts
//!
//! The dispatcher consumes these two traits when a route declares a role
//! requirement. Both are pure lookups: "not found" and "lookup failed" are
//! indistinguishable to the caller.

pub mod password;

use crate::store::{ApiSession, Store};

/// Resolves an opaque token to an authenticated session
pub trait SessionLookup: Send + Sync {
    fn session_by_token(&self, token: &str) -> Option<ApiSession>;
}

/// Resolves a user's membership in a named role
pub trait RoleLookup: Send + Sync {
    fn user_in_role(&self, user_id: u64, role_name: &str) -> bool;
}

impl SessionLookup for Store {
    fn session_by_token(&self, token: &str) -> Option<ApiSession> {
        Store::session_by_token(self, token)
    }
}

impl RoleLookup for Store {
    fn user_in_role(&self, user_id: u64, role_name: &str) -> bool {
        Store::user_in_role(self, user_id, role_name)
    }
}
