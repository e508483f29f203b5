//! Dispatcher module
//!
//! Resolves one incoming request to one response: extracts the logical path
//! from the configured URL parameter, scans the route table in registration
//! order, enforces the authorization gate, invokes the matched handler, and
//! renders its envelope as JSON. Every failure branch is terminal.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use std::sync::Arc;

use super::request::ApiRequest;
use super::response::{api_response, encode_json, HandlerOutput};
use super::routes::{RoleRequirement, RouteCaptures, RouteTable, AUTH_TOKEN_FIELD};
use crate::auth::{RoleLookup, SessionLookup};
use crate::logger;

const MSG_INVALID_URL: &str = "Invalid URL";
const MSG_NO_AUTH: &str = "No authentication parameter provided for auth-only endpoint";
const MSG_BAD_AUTH: &str = "Invalid authentication parameter provided for auth-only endpoint";
const MSG_UNAUTHORIZED: &str = "Unauthorized access for auth-only endpoint";

/// Resolves requests against an immutable route table
pub struct Dispatcher {
    table: RouteTable,
    sessions: Arc<dyn SessionLookup>,
    roles: Arc<dyn RoleLookup>,
    url_param: String,
}

impl Dispatcher {
    pub fn new(
        table: RouteTable,
        sessions: Arc<dyn SessionLookup>,
        roles: Arc<dyn RoleLookup>,
    ) -> Self {
        Self {
            table,
            sessions,
            roles,
            url_param: "url".to_string(),
        }
    }

    /// Override the query parameter carrying the logical path
    pub fn with_url_param(mut self, name: &str) -> Self {
        self.url_param = name.to_string();
        self
    }

    /// Resolve the request to exactly one response
    pub fn dispatch(&self, request: &ApiRequest) -> Response<Full<Bytes>> {
        // An empty URL-parameter name disables dispatch entirely; inherited
        // behavior, kept for compatibility.
        if self.url_param.is_empty() {
            return Response::new(Full::new(Bytes::new()));
        }

        let Some(url) = request.query_param(&self.url_param) else {
            return self.fall_through(request);
        };

        if let Some(entries) = self.table.entries_for(request.method()) {
            for entry in entries {
                let Some(caps) = entry.regex.captures(url) else {
                    continue;
                };

                if let Some(required) = &entry.required_roles {
                    if let Some(denied) = self.authorize(request, required) {
                        logger::log_api_request(request.method().as_str(), url, 403);
                        return denied;
                    }
                }

                let captures = RouteCaptures::from_regex(&caps);
                let output = (entry.handler)(request, &captures);
                let response = render(output);
                logger::log_api_request(
                    request.method().as_str(),
                    url,
                    response.status().as_u16(),
                );

                return response;
            }
        }

        self.fall_through(request)
    }

    /// Authorization gate; Some(response) short-circuits with a 403
    fn authorize(
        &self,
        request: &ApiRequest,
        required: &RoleRequirement,
    ) -> Option<Response<Full<Bytes>>> {
        let token = match request.parameterized_input() {
            Ok(params) => params.get_str(AUTH_TOKEN_FIELD),
            // Unparameterizable input carries no token
            Err(_) => None,
        };

        let Some(token) = token else {
            return Some(forbidden(MSG_NO_AUTH));
        };

        let Some(session) = self.sessions.session_by_token(&token) else {
            return Some(forbidden(MSG_BAD_AUTH));
        };

        match required {
            RoleRequirement::Authenticated => None,
            RoleRequirement::AnyOf(roles) => {
                if roles
                    .iter()
                    .any(|role| self.roles.user_in_role(session.user_id, role))
                {
                    None
                } else {
                    Some(forbidden(MSG_UNAUTHORIZED))
                }
            }
        }
    }

    /// No route matched: the default handler with empty capture data, else a
    /// 404 envelope
    fn fall_through(&self, request: &ApiRequest) -> Response<Full<Bytes>> {
        match self.table.default_handler() {
            Some(handler) => {
                let output = handler(request, &RouteCaptures::empty());
                let response = render(output);
                logger::log_api_request(
                    request.method().as_str(),
                    "<default>",
                    response.status().as_u16(),
                );

                response
            }
            None => {
                logger::log_api_request(request.method().as_str(), "<none>", 404);
                api_response(
                    StatusCode::NOT_FOUND,
                    encode_json(&serde_json::Value::String(MSG_INVALID_URL.to_string())),
                )
            }
        }
    }
}

/// Render a handler's output: typed envelopes are serialized as JSON, raw
/// output is emitted verbatim, and no output is an empty 200
fn render(output: Option<HandlerOutput>) -> Response<Full<Bytes>> {
    match output {
        Some(HandlerOutput::Response(resp)) => {
            api_response(resp.status(), encode_json(resp.data()))
        }
        Some(HandlerOutput::Raw(body)) => api_response(StatusCode::OK, body),
        None => api_response(StatusCode::OK, String::new()),
    }
}

fn forbidden(message: &str) -> Response<Full<Bytes>> {
    api_response(
        StatusCode::FORBIDDEN,
        encode_json(&serde_json::Value::String(message.to_string())),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::response::ApiResponse;
    use crate::api::routes::Handler;
    use crate::store::Store;
    use http_body_util::BodyExt;
    use hyper::Method;

    fn tagged_handler(tag: &'static str) -> Handler {
        Arc::new(move |_req, _caps| Some(HandlerOutput::Response(ApiResponse::ok(tag))))
    }

    async fn body_string(response: Response<Full<Bytes>>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn get_request(query: &str) -> ApiRequest {
        ApiRequest::new(Method::GET, Some(query), None, b"", None)
    }

    fn post_request(query: &str, body: &str) -> ApiRequest {
        ApiRequest::new(Method::POST, Some(query), None, body.as_bytes(), None)
    }

    /// Store with one user holding role Y (not X) and one live session
    fn seeded_store() -> (Arc<Store>, String, u64) {
        let store = Arc::new(Store::in_memory());
        let user = store
            .create_user("someuser", "someuser@example.com", true)
            .unwrap();
        store.create_role_if_missing("X").unwrap();
        store.create_role_if_missing("Y").unwrap();
        store.add_user_to_role(user.id, "Y").unwrap();
        let session = store.create_session(user.id, "host", "addr").unwrap();
        (store, session.token, user.id)
    }

    fn dispatcher_with(table: RouteTable, store: &Arc<Store>) -> Dispatcher {
        Dispatcher::new(
            table,
            Arc::clone(store) as Arc<dyn SessionLookup>,
            Arc::clone(store) as Arc<dyn RoleLookup>,
        )
    }

    #[tokio::test]
    async fn test_first_match_wins_over_later_broader_pattern() {
        let (store, _token, _uid) = seeded_store();
        let mut table = RouteTable::new();
        table
            .register("GET", Some("^account$"), tagged_handler("exact"), None)
            .unwrap();
        table
            .register("GET", Some("^account"), tagged_handler("broad"), None)
            .unwrap();
        let dispatcher = dispatcher_with(table, &store);

        let response = dispatcher.dispatch(&get_request("url=account"));
        assert_eq!(body_string(response).await, "\"exact\"");
    }

    #[tokio::test]
    async fn test_registration_order_decides_between_overlaps() {
        let (store, _token, _uid) = seeded_store();
        let mut table = RouteTable::new();
        table
            .register("GET", Some("^account"), tagged_handler("broad"), None)
            .unwrap();
        table
            .register("GET", Some("^account$"), tagged_handler("exact"), None)
            .unwrap();
        let dispatcher = dispatcher_with(table, &store);

        // The broader pattern registered first shadows the exact one.
        let response = dispatcher.dispatch(&get_request("url=account"));
        assert_eq!(body_string(response).await, "\"broad\"");
    }

    #[tokio::test]
    async fn test_missing_token_is_forbidden_without_invoking_handler() {
        let (store, _token, _uid) = seeded_store();
        let invoked = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let seen = Arc::clone(&invoked);
        let handler: Handler = Arc::new(move |_req, _caps| {
            seen.store(true, std::sync::atomic::Ordering::SeqCst);
            Some(HandlerOutput::Response(ApiResponse::ok("secret")))
        });

        let mut table = RouteTable::new();
        table
            .register(
                "GET",
                Some("^account$"),
                handler,
                Some(RoleRequirement::Authenticated),
            )
            .unwrap();
        let dispatcher = dispatcher_with(table, &store);

        let response = dispatcher.dispatch(&get_request("url=account"));
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            body_string(response).await,
            "\"No authentication parameter provided for auth-only endpoint\""
        );
        assert!(!invoked.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_unknown_token_is_forbidden() {
        let (store, _token, _uid) = seeded_store();
        let mut table = RouteTable::new();
        table
            .register(
                "GET",
                Some("^account$"),
                tagged_handler("secret"),
                Some(RoleRequirement::Authenticated),
            )
            .unwrap();
        let dispatcher = dispatcher_with(table, &store);

        let response = dispatcher.dispatch(&get_request("url=account&token=bad"));
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            body_string(response).await,
            "\"Invalid authentication parameter provided for auth-only endpoint\""
        );
    }

    #[tokio::test]
    async fn test_wrong_role_is_forbidden() {
        // User holds role Y; the route requires X. Only named roles count.
        let (store, token, _uid) = seeded_store();
        let mut table = RouteTable::new();
        table
            .register(
                "GET",
                Some("^account$"),
                tagged_handler("secret"),
                Some(RoleRequirement::role("X")),
            )
            .unwrap();
        let dispatcher = dispatcher_with(table, &store);

        let response = dispatcher.dispatch(&get_request(&format!("url=account&token={token}")));
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            body_string(response).await,
            "\"Unauthorized access for auth-only endpoint\""
        );
    }

    #[tokio::test]
    async fn test_any_listed_role_passes() {
        let (store, token, _uid) = seeded_store();
        let mut table = RouteTable::new();
        table
            .register(
                "GET",
                Some("^account$"),
                tagged_handler("secret"),
                Some(RoleRequirement::AnyOf(vec![
                    "X".to_string(),
                    "Y".to_string(),
                ])),
            )
            .unwrap();
        let dispatcher = dispatcher_with(table, &store);

        let response = dispatcher.dispatch(&get_request(&format!("url=account&token={token}")));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "\"secret\"");
    }

    #[tokio::test]
    async fn test_authenticate_only_passes_any_valid_token() {
        let (store, token, _uid) = seeded_store();
        let mut table = RouteTable::new();
        table
            .register(
                "GET",
                Some("^account$"),
                tagged_handler("mine"),
                Some(RoleRequirement::Authenticated),
            )
            .unwrap();
        let dispatcher = dispatcher_with(table, &store);

        let response = dispatcher.dispatch(&get_request(&format!("url=account&token={token}")));
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_no_match_without_default_is_invalid_url() {
        let (store, _token, _uid) = seeded_store();
        let mut table = RouteTable::new();
        table
            .register("GET", Some("^ping$"), tagged_handler("pong"), None)
            .unwrap();
        let dispatcher = dispatcher_with(table, &store);

        let response = dispatcher.dispatch(&get_request("url=nothing-here"));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_string(response).await, "\"Invalid URL\"");
    }

    #[tokio::test]
    async fn test_missing_url_param_without_default_is_invalid_url() {
        let (store, _token, _uid) = seeded_store();
        let dispatcher = dispatcher_with(RouteTable::new(), &store);

        let response = dispatcher.dispatch(&get_request("other=1"));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_string(response).await, "\"Invalid URL\"");
    }

    #[tokio::test]
    async fn test_default_handler_gets_empty_captures() {
        let (store, _token, _uid) = seeded_store();
        let mut table = RouteTable::new();
        let handler: Handler = Arc::new(|_req, caps| {
            assert!(caps.is_empty());
            Some(HandlerOutput::Response(ApiResponse::with(
                StatusCode::NOT_FOUND,
                serde_json::json!({"message": "Not a valid API endpoint"}),
            )))
        });
        table.register("*", None, handler, None).unwrap();
        let dispatcher = dispatcher_with(table, &store);

        let response = dispatcher.dispatch(&get_request("url=unknown"));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_string(response).await,
            "{\"message\":\"Not a valid API endpoint\"}"
        );
    }

    #[tokio::test]
    async fn test_ping_end_to_end() {
        let (store, _token, _uid) = seeded_store();
        let mut table = RouteTable::new();
        let handler: Handler = Arc::new(|_req, caps| {
            assert_eq!(caps.full_match(), Some("ping"));
            Some(HandlerOutput::Response(ApiResponse::ok("pong")))
        });
        table
            .register("GET", Some("(?i)^ping$"), handler, None)
            .unwrap();
        let dispatcher = dispatcher_with(table, &store);

        let response = dispatcher.dispatch(&get_request("url=ping"));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "\"pong\"");
    }

    #[tokio::test]
    async fn test_auth_token_in_json_body() {
        let (store, token, _uid) = seeded_store();
        let mut table = RouteTable::new();
        table
            .register(
                "POST",
                Some("(?i)^account$"),
                tagged_handler("updated"),
                Some(RoleRequirement::Authenticated),
            )
            .unwrap();
        let dispatcher = dispatcher_with(table, &store);

        let ok = dispatcher.dispatch(&post_request(
            "url=account",
            &format!("{{\"token\":\"{token}\"}}"),
        ));
        assert_eq!(ok.status(), StatusCode::OK);

        let denied = dispatcher.dispatch(&post_request("url=account", "{\"token\":\"bad\"}"));
        assert_eq!(denied.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_non_json_body_counts_as_missing_token() {
        let (store, _token, _uid) = seeded_store();
        let mut table = RouteTable::new();
        table
            .register(
                "POST",
                Some("^account$"),
                tagged_handler("secret"),
                Some(RoleRequirement::Authenticated),
            )
            .unwrap();
        let dispatcher = dispatcher_with(table, &store);

        let response = dispatcher.dispatch(&post_request("url=account", "not json at all"));
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            body_string(response).await,
            "\"No authentication parameter provided for auth-only endpoint\""
        );
    }

    #[tokio::test]
    async fn test_raw_output_is_emitted_verbatim() {
        let (store, _token, _uid) = seeded_store();
        let mut table = RouteTable::new();
        let handler: Handler =
            Arc::new(|_req, _caps| Some(HandlerOutput::Raw("<raw>payload</raw>".to_string())));
        table.register("GET", Some("^raw$"), handler, None).unwrap();
        let dispatcher = dispatcher_with(table, &store);

        let response = dispatcher.dispatch(&get_request("url=raw"));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "<raw>payload</raw>");
    }

    #[tokio::test]
    async fn test_no_output_is_empty_ok() {
        let (store, _token, _uid) = seeded_store();
        let mut table = RouteTable::new();
        let handler: Handler = Arc::new(|_req, _caps| None);
        table
            .register("GET", Some("^quiet$"), handler, None)
            .unwrap();
        let dispatcher = dispatcher_with(table, &store);

        let response = dispatcher.dispatch(&get_request("url=quiet"));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "");
    }

    #[tokio::test]
    async fn test_headers_applied_on_error_branches() {
        let (store, _token, _uid) = seeded_store();
        let dispatcher = dispatcher_with(RouteTable::new(), &store);

        let response = dispatcher.dispatch(&get_request("url=missing"));
        let headers = response.headers();
        assert_eq!(headers["Content-Type"], "application/json");
        assert_eq!(headers["Access-Control-Allow-Origin"], "*");
        assert_eq!(headers["Cache-Control"], "max-age=500");
    }

    #[tokio::test]
    async fn test_empty_url_param_name_disables_dispatch() {
        let (store, _token, _uid) = seeded_store();
        let mut table = RouteTable::new();
        table
            .register("GET", Some("^ping$"), tagged_handler("pong"), None)
            .unwrap();
        let dispatcher = dispatcher_with(table, &store).with_url_param("");

        let response = dispatcher.dispatch(&get_request("url=ping"));
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get("Content-Type").is_none());
        assert_eq!(body_string(response).await, "");
    }

    #[tokio::test]
    async fn test_verb_without_routes_falls_through() {
        let (store, _token, _uid) = seeded_store();
        let mut table = RouteTable::new();
        table
            .register("POST", Some("^ping$"), tagged_handler("pong"), None)
            .unwrap();
        let dispatcher = dispatcher_with(table, &store);

        let response = dispatcher.dispatch(&get_request("url=ping"));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
