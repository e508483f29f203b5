//! Authentication endpoints
//!
//! `authenticate` trades credentials for a session token; `logout` destroys
//! the session. Neither route carries a role requirement: these are the doors
//! into the authenticated surface.

use chrono::Utc;
use hyper::StatusCode;
use std::sync::Arc;

use crate::api::request::ApiRequest;
use crate::api::response::{ApiResponse, HandlerOutput};
use crate::api::routes::{RouteCaptures, AUTH_TOKEN_FIELD};
use crate::auth::password;
use crate::logger;
use crate::store::{KeyProvider, Store};

const FIELD_EMAIL: &str = "email";
const FIELD_PASSWORD: &str = "password";

/// Handlers for session creation and destruction
pub struct AuthApi {
    store: Arc<Store>,
}

impl AuthApi {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Authenticate with email (or username) and password, returning a
    /// session token for future authorization
    pub fn do_auth(&self, request: &ApiRequest, _caps: &RouteCaptures) -> Option<HandlerOutput> {
        let Ok(params) = request.parameterized_input() else {
            return error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Invalid parameter combination for authorization",
            );
        };

        if !params.has_value(FIELD_EMAIL) || !params.has_value(FIELD_PASSWORD) {
            return error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Invalid parameter combination for authorization",
            );
        }

        let identifier = params.get_str(FIELD_EMAIL).unwrap_or_default();
        let supplied = params.get_str(FIELD_PASSWORD).unwrap_or_default();

        let user = match self.store.user_by_username_or_email(&identifier) {
            Some(user) if user.id > 0 && user.email_confirmed => user,
            _ => {
                logger::log_error(&format!(
                    "Login failed because of bad username/email: {identifier}"
                ));
                return error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Invalid credentials provided",
                );
            }
        };

        let Some(key) = self.store.login_key(user.id, KeyProvider::Basic) else {
            logger::log_error(&format!(
                "Login failed because of missing BASIC key for user: {}",
                user.username
            ));
            return error(StatusCode::INTERNAL_SERVER_ERROR, "No login available for user");
        };

        if !password::verify_password(&supplied, &key.key) {
            logger::log_error(&format!(
                "Invalid password provided for user: {}",
                user.username
            ));
            return error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Invalid credentials provided",
            );
        }

        if password::needs_rehash(&key.key) {
            match password::hash_password(&supplied) {
                Ok(rehashed) => {
                    if let Err(e) = self.store.set_login_key(user.id, KeyProvider::Basic, &rehashed)
                    {
                        logger::log_warning(&format!(
                            "Failed to rehash password for user: {}\n{e}",
                            user.username
                        ));
                    }
                }
                Err(e) => logger::log_warning(&format!(
                    "Failed to rehash password for user: {}\n{e}",
                    user.username
                )),
            }
        }

        if let Err(e) = self.store.touch_last_login(user.id, Utc::now()) {
            logger::log_warning(&format!(
                "Failed to update user's last login: {}\n{e}",
                user.username
            ));
        }

        let address = request
            .remote_addr()
            .map_or_else(|| "unknown".to_string(), |addr| addr.ip().to_string());

        match self.store.create_session(user.id, &address, &address) {
            Ok(session) => Some(HandlerOutput::Response(ApiResponse::ok(serde_json::json!({
                "token": session.token,
                "userId": session.user_id,
            })))),
            Err(e) => {
                logger::log_error(&format!(
                    "Failed to create API session for user: {}\n{e}",
                    user.username
                ));
                error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to create API session, please contact an administrator",
                )
            }
        }
    }

    /// Destroy the session named by the token parameter
    pub fn do_logout(&self, request: &ApiRequest, _caps: &RouteCaptures) -> Option<HandlerOutput> {
        let Ok(params) = request.parameterized_input() else {
            return error(StatusCode::INTERNAL_SERVER_ERROR, "Invalid parameters for logout");
        };

        if !params.has_value(AUTH_TOKEN_FIELD) {
            return error(StatusCode::INTERNAL_SERVER_ERROR, "Invalid parameters for logout");
        }

        let token = params.get_str(AUTH_TOKEN_FIELD).unwrap_or_default();

        if self.store.session_by_token(&token).is_none() {
            logger::log_error(&format!(
                "Invalid session token provided for logout: {token}"
            ));
            return error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Invalid session token provided",
            );
        }

        match self.store.delete_session_by_token(&token) {
            Ok(()) => Some(HandlerOutput::Response(ApiResponse::ok(
                "Successfully logged out",
            ))),
            Err(e) => {
                logger::log_error(&format!("Failed to delete session: {token}\n{e}"));
                error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    &format!(
                        "Failed to delete session, please contact an administrator with value: '{token}'"
                    ),
                )
            }
        }
    }
}

fn error(status: StatusCode, message: &str) -> Option<HandlerOutput> {
    Some(HandlerOutput::Response(ApiResponse::error(status, message)))
}
