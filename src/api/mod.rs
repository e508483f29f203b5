//! API module entry
//!
//! Wires the endpoint registry and adapts hyper requests into the dispatch
//! pipeline: body-size check, request construction, dispatch, access logging.

pub mod dispatcher;
pub mod handlers;
pub mod params;
pub mod request;
pub mod response;
pub mod routes;

pub use dispatcher::Dispatcher;
pub use params::Params;
pub use request::{ApiRequest, RequestError};
pub use response::{ApiResponse, HandlerOutput};
pub use routes::{
    Handler, RoleRequirement, RouteCaptures, RouteError, RouteTable, AUTH_TOKEN_FIELD,
};

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::{Request, Response, StatusCode};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::config::AppState;
use crate::logger;
use crate::store::Store;
use handlers::{AccountApi, AuthApi};

/// Register the account/auth endpoint set and the default not-found handler
pub fn register_api(
    table: &mut RouteTable,
    store: &Arc<Store>,
    admin_role: &str,
) -> Result<(), RouteError> {
    let default: Handler = Arc::new(|_req, _caps| {
        Some(HandlerOutput::Response(ApiResponse::with(
            StatusCode::NOT_FOUND,
            serde_json::json!({"message": "Not a valid API endpoint"}),
        )))
    });
    table.register("*", None, default, None)?;

    let auth = Arc::new(AuthApi::new(Arc::clone(store)));

    let h = Arc::clone(&auth);
    table.register(
        "POST",
        Some("^authenticate$"),
        Arc::new(move |req, caps| h.do_auth(req, caps)),
        None,
    )?;

    let h = Arc::clone(&auth);
    table.register(
        "POST",
        Some("^logout$"),
        Arc::new(move |req, caps| h.do_logout(req, caps)),
        None,
    )?;

    let account = Arc::new(AccountApi::new(Arc::clone(store), admin_role));

    let h = Arc::clone(&account);
    table.register(
        "GET",
        Some("(?i)^account$"),
        Arc::new(move |req, caps| h.get_account(req, caps)),
        Some(RoleRequirement::Authenticated),
    )?;

    let h = Arc::clone(&account);
    table.register(
        "POST",
        Some("(?i)^account$"),
        Arc::new(move |req, caps| h.update_account(req, caps)),
        Some(RoleRequirement::Authenticated),
    )?;

    let h = Arc::clone(&account);
    table.register(
        "PUT",
        Some("(?i)^account$"),
        Arc::new(move |req, caps| h.create_account(req, caps)),
        Some(RoleRequirement::role(admin_role)),
    )?;

    let h = Arc::clone(&account);
    table.register(
        "POST",
        Some("(?i)^account/create$"),
        Arc::new(move |req, caps| h.create_account(req, caps)),
        Some(RoleRequirement::role(admin_role)),
    )?;

    let h = Arc::clone(&account);
    table.register(
        "DELETE",
        Some("(?i)^account$"),
        Arc::new(move |req, caps| h.delete_account(req, caps)),
        Some(RoleRequirement::role(admin_role)),
    )?;

    let h = Arc::clone(&account);
    table.register(
        "POST",
        Some("(?i)^account/delete$"),
        Arc::new(move |req, caps| h.delete_account(req, caps)),
        Some(RoleRequirement::role(admin_role)),
    )?;

    Ok(())
}

/// Main entry point for HTTP request handling
pub async fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    // 1. Check body size
    if let Some(resp) = check_body_size(&req, state.config.http.max_body_size) {
        return Ok(resp);
    }

    // 2. Extract the wire pieces the request model needs
    let method = req.method().clone();
    let query = req.uri().query().map(ToString::to_string);
    let cookie = header_value(&req, "cookie");
    let user_agent = header_value(&req, "user-agent");

    // 3. Collect the body; a failed read dispatches as an empty payload
    let body = match req.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            logger::log_warning(&format!("Failed to read request body: {e}"));
            Bytes::new()
        }
    };

    let api_request = ApiRequest::new(
        method.clone(),
        query.as_deref(),
        cookie.as_deref(),
        &body,
        Some(peer_addr),
    );

    let endpoint = api_request
        .query_param(&state.config.api.url_param)
        .unwrap_or("-")
        .to_string();

    // 4. Dispatch
    let response = state.dispatcher.dispatch(&api_request);

    // 5. Access log
    if state.cached_access_log.load(Ordering::Relaxed) {
        let mut entry = logger::AccessLogEntry::new(
            peer_addr.ip().to_string(),
            method.to_string(),
            endpoint,
        );
        entry.status = response.status().as_u16();
        entry.body_bytes = body_size(&response);
        entry.user_agent = user_agent;
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

fn header_value(req: &Request<hyper::body::Incoming>, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

fn body_size(response: &Response<Full<Bytes>>) -> usize {
    use hyper::body::Body;

    usize::try_from(response.body().size_hint().exact().unwrap_or(0)).unwrap_or(0)
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size(
    req: &Request<hyper::body::Incoming>,
    max_body_size: u64,
) -> Option<Response<Full<Bytes>>> {
    let content_length = req.headers().get("content-length")?;
    content_length.to_str().map_or_else(
        |_| {
            logger::log_warning("Content-Length header contains non-ASCII characters");
            None
        },
        |size_str| match size_str.parse::<u64>() {
            Ok(size) if size > max_body_size => {
                logger::log_error(&format!(
                    "Request body too large: {size} bytes (max: {max_body_size})"
                ));
                Some(response::api_response(
                    StatusCode::PAYLOAD_TOO_LARGE,
                    "\"Request body too large\"".to_string(),
                ))
            }
            Err(_) => {
                logger::log_warning(&format!(
                    "Invalid Content-Length value: '{size_str}', skipping size check"
                ));
                None
            }
            _ => None,
        },
    )
}
