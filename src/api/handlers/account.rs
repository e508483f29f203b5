//! Account endpoints
//!
//! Read, update, create, and delete user accounts. The dispatcher's auth gate
//! guarantees a valid token before these run, but each handler still resolves
//! the session itself to decide whose account is being touched and whether the
//! executor outranks the target.

use hyper::StatusCode;
use serde_json::json;
use std::sync::Arc;

use crate::api::params::Params;
use crate::api::request::ApiRequest;
use crate::api::response::{ApiResponse, HandlerOutput};
use crate::api::routes::{RouteCaptures, AUTH_TOKEN_FIELD};
use crate::auth::password;
use crate::logger;
use crate::store::{ApiSession, KeyProvider, Store, User};

const FIELD_ID: &str = "id";
const FIELD_EMAIL: &str = "email";
const FIELD_USERNAME: &str = "username";
const FIELD_CURRENT_PASSWORD: &str = "current-password";
const FIELD_NEW_PASSWORD: &str = "new-password";
const FIELD_NEW_PASSWORD_2: &str = "new-password-2";

/// Handlers for the account endpoints
pub struct AccountApi {
    store: Arc<Store>,
    admin_role: String,
}

impl AccountApi {
    pub fn new(store: Arc<Store>, admin_role: &str) -> Self {
        Self {
            store,
            admin_role: admin_role.to_string(),
        }
    }

    fn session_for(&self, params: &Params) -> Option<ApiSession> {
        let token = params.get_str(AUTH_TOKEN_FIELD)?;
        self.store.session_by_token(&token)
    }

    fn is_admin(&self, user_id: u64) -> bool {
        self.store.user_in_role(user_id, &self.admin_role)
    }

    /// Retrieve account information for the logged-in user, or for another
    /// user when `id` is supplied by an admin
    pub fn get_account(&self, request: &ApiRequest, _caps: &RouteCaptures) -> Option<HandlerOutput> {
        let Ok(params) = request.parameterized_input() else {
            return error("Invalid parameters provided");
        };

        if !params.has_value(AUTH_TOKEN_FIELD) {
            return error("Invalid parameters provided");
        }

        let Some(session) = self.session_for(&params) else {
            let token = params.get_str(AUTH_TOKEN_FIELD).unwrap_or_default();
            logger::log_error(&format!("Failed to find session for token: {token}"));
            return error(&format!(
                "Invalid session data provided, please contact administrator with code: {token}"
            ));
        };

        let target = if params.has_value(FIELD_ID) {
            if !self.is_admin(session.user_id) {
                return error("Non-admin cannot retrieve other user account information");
            }

            params.get_i64(FIELD_ID).and_then(|id| {
                u64::try_from(id)
                    .ok()
                    .and_then(|id| self.store.user_by_id(id))
            })
        } else {
            self.store.user_by_id(session.user_id)
        };

        match target {
            Some(user) => Some(HandlerOutput::Response(ApiResponse::ok(account_payload(
                "userId", &user,
            )))),
            None => error("Failed to retrieve account information"),
        }
    }

    /// Push updates to account information: email, and password (self-change
    /// with current password, or admin set without)
    pub fn update_account(
        &self,
        request: &ApiRequest,
        _caps: &RouteCaptures,
    ) -> Option<HandlerOutput> {
        let Ok(params) = request.parameterized_input() else {
            return error("Invalid account information provided for update");
        };

        let account_id = params.get_i64(FIELD_ID).unwrap_or(0);
        let Ok(account_id) = u64::try_from(account_id) else {
            return error("Invalid account information provided for update");
        };

        if account_id < 1 {
            return error("Invalid account information provided for update");
        }

        let Some(session) = self.session_for(&params) else {
            return error("Invalid account information given for update");
        };

        let executor_is_admin = self.is_admin(session.user_id);
        let mut can_continue = true;
        let mut error_message: Option<String> = None;

        // Editing someone else requires the admin role, and admins are not
        // editable by other admins.
        if session.user_id != account_id
            && (!executor_is_admin || self.is_admin(account_id))
        {
            can_continue = false;
        }

        let Some(user) = self.store.user_by_id(account_id) else {
            logger::log_error(&format!(
                "Failed to update account for user #{account_id}: no such user"
            ));
            return error("Failed to update account, please contact an administrator");
        };

        if !can_continue {
            logger::log_error(&format!(
                "Failed to update account for user #{account_id}: Other user edit attempted by non-admin"
            ));
            return error("Failed to update account, please contact an administrator");
        }

        let mut updated = user.clone();

        let requested_email = params.get_str(FIELD_EMAIL).unwrap_or_default();
        if !requested_email.is_empty() && requested_email != user.email {
            if self.store.user_by_email(&requested_email).is_some() {
                can_continue = false;
                error_message =
                    Some("Failed to update account, email address already exists".to_string());
                logger::log_error(&format!(
                    "Failed to update account for user #{account_id}: Duplicate email address requested"
                ));
            } else {
                updated.email = requested_email;
                // Only an admin's word keeps the address confirmed
                updated.email_confirmed = executor_is_admin;
            }
        }

        let current = params.get_str(FIELD_CURRENT_PASSWORD).unwrap_or_default();
        let new1 = params.get_str(FIELD_NEW_PASSWORD).unwrap_or_default();
        let new2 = params.get_str(FIELD_NEW_PASSWORD_2).unwrap_or_default();

        if can_continue && !current.is_empty() {
            if new1.is_empty() || new2.is_empty() {
                can_continue = false;
                error_message =
                    Some("Failed to update account, invalid password information supplied".to_string());
                logger::log_error(&format!(
                    "Failed to update account for user #{account_id}: Missing new password(s)"
                ));
            } else if new1 != new2 {
                can_continue = false;
                error_message =
                    Some("Failed to update account, invalid password information supplied".to_string());
                logger::log_error(&format!(
                    "Failed to update account for user #{account_id}: Mismatched new passwords"
                ));
            } else {
                match self.store.login_key(account_id, KeyProvider::Basic) {
                    Some(key) if password::verify_password(&current, &key.key) => {
                        if let Some(err) = self.set_password(account_id, &new1) {
                            can_continue = false;
                            error_message = Some(err);
                        }
                    }
                    Some(_) => {
                        can_continue = false;
                        error_message = Some(
                            "Failed to update account, invalid password information supplied"
                                .to_string(),
                        );
                        logger::log_error(&format!(
                            "Failed to update account for user #{account_id}: Mismatched current password"
                        ));
                    }
                    None => {
                        can_continue = false;
                        error_message = Some(
                            "Failed to update account, invalid password information supplied"
                                .to_string(),
                        );
                        logger::log_error(&format!(
                            "Failed to update account for user #{account_id}: BASIC login key not found"
                        ));
                    }
                }
            }
        } else if can_continue && !new1.is_empty() && !new2.is_empty() {
            // Password set without the current value is an admin-only move
            if !executor_is_admin {
                can_continue = false;
                error_message = Some("Failed to update account, invalid permissions".to_string());
                logger::log_error(&format!(
                    "Failed to update account for user #{account_id}: Attempt by non-admin user #{} to edit user",
                    session.user_id
                ));
            } else if new1 != new2 {
                can_continue = false;
                error_message =
                    Some("Failed to update account, invalid password information supplied".to_string());
                logger::log_error(&format!(
                    "Failed to update account for user #{account_id}: Mismatched new passwords"
                ));
            } else if self.store.login_key(account_id, KeyProvider::Basic).is_none() {
                can_continue = false;
                error_message =
                    Some("Failed to update account, invalid password information supplied".to_string());
                logger::log_error(&format!(
                    "Failed to update account for user #{account_id}: BASIC login key not found"
                ));
            } else if let Some(err) = self.set_password(account_id, &new1) {
                can_continue = false;
                error_message = Some(err);
            }
        }

        if !can_continue {
            return error(
                error_message
                    .as_deref()
                    .unwrap_or("Failed to update account, please contact an administrator"),
            );
        }

        // Username and join/login stamps are not editable through this door;
        // only email and confirmation state changed above
        match self.store.update_user(&updated) {
            Ok(()) => {
                logger::log_info(&format!("Updated user #{account_id}"));
                Some(HandlerOutput::Response(ApiResponse::ok(account_payload(
                    "id", &updated,
                ))))
            }
            Err(e) => {
                logger::log_error(&format!(
                    "Failed to update account for user #{account_id}: {e}"
                ));
                error("Failed to update account, please contact an administrator")
            }
        }
    }

    /// Create a new user account with a basic login key (admin only, enforced
    /// at registration)
    pub fn create_account(
        &self,
        request: &ApiRequest,
        _caps: &RouteCaptures,
    ) -> Option<HandlerOutput> {
        let Ok(params) = request.parameterized_input() else {
            logger::log_error(
                "Failed to create account: Invalid parameter set for account creation",
            );
            return error("Failed to create account, please contact an administrator");
        };

        if !params.has_value(FIELD_USERNAME)
            || !params.has_value(FIELD_EMAIL)
            || !params.has_value(FIELD_NEW_PASSWORD)
            || !params.has_value(FIELD_NEW_PASSWORD_2)
        {
            logger::log_error(
                "Failed to create account: Invalid parameter set for account creation",
            );
            return error("Failed to create account, please contact an administrator");
        }

        let new1 = params.get_str(FIELD_NEW_PASSWORD).unwrap_or_default();
        let new2 = params.get_str(FIELD_NEW_PASSWORD_2).unwrap_or_default();

        if new1 != new2 {
            logger::log_error("Failed to create account: Invalid password set for account creation");
            return error("Failed to create account, please contact an administrator");
        }

        if self.session_for(&params).is_none() {
            return error("Invalid account information given for update");
        }

        let username = params.get_str(FIELD_USERNAME).unwrap_or_default();
        let email = params.get_str(FIELD_EMAIL).unwrap_or_default();

        let user = match self.store.create_user(&username, &email, true) {
            Ok(user) => user,
            Err(e) => {
                logger::log_error(&format!("Failed to create account: {e}"));
                return error("Failed to create account, please contact an administrator");
            }
        };

        let outcome = password::hash_password(&new1)
            .map_err(|e| e.to_string())
            .and_then(|hash| {
                self.store
                    .set_login_key(user.id, KeyProvider::Basic, &hash)
                    .map_err(|e| e.to_string())
            });

        match outcome {
            Ok(()) => {
                logger::log_info(&format!(
                    "Created user #{} with username {}",
                    user.id, user.username
                ));
                Some(HandlerOutput::Response(ApiResponse::ok(account_payload(
                    "id", &user,
                ))))
            }
            Err(e) => {
                logger::log_error(&format!("Failed to create account: {e}"));
                error("Failed to create account, please contact an administrator")
            }
        }
    }

    /// Delete a user account (admin only); admins are not deletable
    pub fn delete_account(
        &self,
        request: &ApiRequest,
        _caps: &RouteCaptures,
    ) -> Option<HandlerOutput> {
        let Ok(params) = request.parameterized_input() else {
            return error("Failed to delete user, invalid user token");
        };

        let Some(session) = self.session_for(&params) else {
            return error("Failed to delete user, invalid user token");
        };

        if !params.has_value(FIELD_ID) {
            return error("Failed to delete user, incomplete parameters");
        }

        let target_id = params
            .get_i64(FIELD_ID)
            .and_then(|id| u64::try_from(id).ok())
            .unwrap_or(0);

        let executor_is_admin = self.is_admin(session.user_id);
        let target_is_admin = self.is_admin(target_id);

        if !executor_is_admin || target_is_admin {
            return error("Failed to delete user, admin role mismatch");
        }

        match self.store.delete_user(target_id) {
            Ok(()) => Some(HandlerOutput::Response(ApiResponse::ok("User was deleted"))),
            Err(e) => {
                logger::log_error(&format!("Failed to delete user #{target_id}: {e}"));
                error("Failed to delete user, please contact an administrator")
            }
        }
    }

    /// Hash and store a new basic-provider password; Some(message) on failure
    fn set_password(&self, user_id: u64, plain: &str) -> Option<String> {
        let result = password::hash_password(plain)
            .map_err(|e| e.to_string())
            .and_then(|hash| {
                self.store
                    .set_login_key(user_id, KeyProvider::Basic, &hash)
                    .map_err(|e| e.to_string())
            });

        match result {
            Ok(()) => None,
            Err(e) => {
                logger::log_error(&format!("Failed to update account for user #{user_id}: {e}"));
                Some("Failed to update account, please contact an administrator".to_string())
            }
        }
    }
}

/// Account payload with the original wire field names; `id_field` differs
/// between the read endpoint (`userId`) and the mutating ones (`id`)
fn account_payload(id_field: &str, user: &User) -> serde_json::Value {
    let mut payload = serde_json::Map::new();
    payload.insert(id_field.to_string(), json!(user.id));
    payload.insert("email".to_string(), json!(user.email));
    payload.insert("username".to_string(), json!(user.username));
    payload.insert(
        "dateJoined".to_string(),
        json!(user.date_joined.to_rfc3339()),
    );
    payload.insert(
        "lastLogin".to_string(),
        json!(user.last_login.map(|t| t.to_rfc3339())),
    );

    serde_json::Value::Object(payload)
}

fn error(message: &str) -> Option<HandlerOutput> {
    Some(HandlerOutput::Response(ApiResponse::error(
        StatusCode::INTERNAL_SERVER_ERROR,
        message,
    )))
}
