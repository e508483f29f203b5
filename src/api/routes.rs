//! Route table module
//!
//! Holds the registered endpoints: per verb, an ordered collection of
//! (pattern, handler, required-roles) entries, plus a single process-wide
//! default handler. Built once at startup and read-only thereafter.

use hyper::Method;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use super::request::ApiRequest;
use super::response::HandlerOutput;
use crate::logger;

/// Shared constant for the auth-token field carried in request input
pub const AUTH_TOKEN_FIELD: &str = "token";

/// Verbs the wildcard spec expands to
const ALL_VERBS: [Method; 6] = [
    Method::DELETE,
    Method::GET,
    Method::HEAD,
    Method::OPTIONS,
    Method::POST,
    Method::PUT,
];

/// A unit of business logic invoked for a matched route
pub type Handler = Arc<dyn Fn(&ApiRequest, &RouteCaptures) -> Option<HandlerOutput> + Send + Sync>;

/// Errors surfaced at registration time
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("invalid route pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Authorization requirement attached to a route
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleRequirement {
    /// Any valid session suffices
    Authenticated,
    /// Membership in any one of the named roles suffices
    AnyOf(Vec<String>),
}

impl RoleRequirement {
    /// Require a single named role
    pub fn role(name: &str) -> Self {
        Self::AnyOf(vec![name.to_string()])
    }
}

/// Ordered regex capture groups from a matched pattern
///
/// Group 0 is the whole match; unmatched optional groups stay None.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteCaptures {
    groups: Vec<Option<String>>,
}

impl RouteCaptures {
    /// The empty capture list handed to the default handler
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_regex(caps: &regex::Captures<'_>) -> Self {
        let groups = caps
            .iter()
            .map(|m| m.map(|m| m.as_str().to_string()))
            .collect();

        Self { groups }
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.groups.get(index)?.as_deref()
    }

    /// The full matched span, when anything matched
    pub fn full_match(&self) -> Option<&str> {
        self.get(0)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// A registered endpoint
pub(crate) struct RouteEntry {
    /// Pattern source string, the identity for duplicate detection
    pub(crate) pattern: String,
    pub(crate) regex: Regex,
    pub(crate) handler: Handler,
    pub(crate) required_roles: Option<RoleRequirement>,
}

/// The endpoint registry
#[derive(Default)]
pub struct RouteTable {
    routes: HashMap<Method, Vec<RouteEntry>>,
    default_handler: Option<Handler>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for the given verbs and pattern.
    ///
    /// `verbs` is a single verb, a pipe-delimited list, or `*` for all verbs.
    /// `pattern = None` designates the process-wide default handler, which is
    /// overwritten on re-registration. For each verb, a pattern string that is
    /// already registered is a silent no-op: the first registration wins.
    pub fn register(
        &mut self,
        verbs: &str,
        pattern: Option<&str>,
        handler: Handler,
        required_roles: Option<RoleRequirement>,
    ) -> Result<(), RouteError> {
        let Some(pattern) = pattern else {
            self.default_handler = Some(handler);
            return Ok(());
        };

        let regex = Regex::new(pattern)?;

        for verb in split_verbs(verbs) {
            let entries = self.routes.entry(verb).or_default();

            if entries.iter().any(|e| e.pattern == pattern) {
                continue;
            }

            entries.push(RouteEntry {
                pattern: pattern.to_string(),
                regex: regex.clone(),
                handler: Arc::clone(&handler),
                required_roles: required_roles.clone(),
            });
        }

        Ok(())
    }

    /// Registered entries for a verb, in registration order
    pub(crate) fn entries_for(&self, method: &Method) -> Option<&[RouteEntry]> {
        self.routes.get(method).map(Vec::as_slice)
    }

    pub(crate) fn default_handler(&self) -> Option<&Handler> {
        self.default_handler.as_ref()
    }

    /// Number of entries registered for a verb
    pub fn route_count(&self, method: &Method) -> usize {
        self.routes.get(method).map_or(0, Vec::len)
    }
}

/// Expand a verb spec into methods: `*` for all, otherwise a pipe-delimited
/// list; unrecognized verb names are skipped with a warning
fn split_verbs(verbs: &str) -> Vec<Method> {
    if verbs == "*" {
        return ALL_VERBS.to_vec();
    }

    verbs
        .split('|')
        .filter_map(|v| {
            let name = v.trim().to_ascii_uppercase();
            match Method::from_bytes(name.as_bytes()) {
                Ok(method) => Some(method),
                Err(_) => {
                    logger::log_warning(&format!("Skipping unrecognized verb in route spec: {v}"));
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::response::ApiResponse;

    fn tagged_handler(tag: &'static str) -> Handler {
        Arc::new(move |_req, _caps| Some(HandlerOutput::Response(ApiResponse::ok(tag))))
    }

    fn invoke(entry: &RouteEntry) -> String {
        let req = ApiRequest::new(Method::GET, None, None, b"", None);
        match (entry.handler)(&req, &RouteCaptures::empty()) {
            Some(HandlerOutput::Response(resp)) => resp.data().as_str().unwrap().to_string(),
            _ => panic!("expected envelope"),
        }
    }

    #[test]
    fn test_duplicate_registration_keeps_first_handler() {
        let mut table = RouteTable::new();
        table
            .register("GET", Some("^account$"), tagged_handler("first"), None)
            .unwrap();
        table
            .register("GET", Some("^account$"), tagged_handler("second"), None)
            .unwrap();

        let entries = table.entries_for(&Method::GET).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(invoke(&entries[0]), "first");
    }

    #[test]
    fn test_wildcard_registers_all_verbs() {
        let mut table = RouteTable::new();
        table
            .register("*", Some("^status$"), tagged_handler("status"), None)
            .unwrap();

        for method in [
            Method::DELETE,
            Method::GET,
            Method::HEAD,
            Method::OPTIONS,
            Method::POST,
            Method::PUT,
        ] {
            assert_eq!(table.route_count(&method), 1, "missing verb {method}");
        }
    }

    #[test]
    fn test_pipe_delimited_verbs() {
        let mut table = RouteTable::new();
        table
            .register("GET|POST", Some("^account$"), tagged_handler("h"), None)
            .unwrap();

        assert_eq!(table.route_count(&Method::GET), 1);
        assert_eq!(table.route_count(&Method::POST), 1);
        assert_eq!(table.route_count(&Method::PUT), 0);
    }

    #[test]
    fn test_unknown_verbs_are_skipped() {
        let mut table = RouteTable::new();
        table
            .register("GET|BOGU S", Some("^x$"), tagged_handler("h"), None)
            .unwrap();

        assert_eq!(table.route_count(&Method::GET), 1);
    }

    #[test]
    fn test_default_handler_is_overwritten() {
        let mut table = RouteTable::new();
        table
            .register("GET", None, tagged_handler("first"), None)
            .unwrap();
        table
            .register("GET", None, tagged_handler("second"), None)
            .unwrap();

        let handler = table.default_handler().expect("default registered");
        let req = ApiRequest::new(Method::GET, None, None, b"", None);
        match handler(&req, &RouteCaptures::empty()) {
            Some(HandlerOutput::Response(resp)) => {
                assert_eq!(resp.data().as_str(), Some("second"));
            }
            _ => panic!("expected envelope"),
        }
    }

    #[test]
    fn test_registration_order_is_preserved() {
        let mut table = RouteTable::new();
        table
            .register("GET", Some("^a$"), tagged_handler("a"), None)
            .unwrap();
        table
            .register("GET", Some("^b$"), tagged_handler("b"), None)
            .unwrap();
        table
            .register("GET", Some("^c$"), tagged_handler("c"), None)
            .unwrap();

        let patterns: Vec<_> = table
            .entries_for(&Method::GET)
            .unwrap()
            .iter()
            .map(|e| e.pattern.as_str())
            .collect();
        assert_eq!(patterns, vec!["^a$", "^b$", "^c$"]);
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        let mut table = RouteTable::new();
        let result = table.register("GET", Some("(unclosed"), tagged_handler("h"), None);
        assert!(matches!(result, Err(RouteError::Pattern(_))));
    }

    #[test]
    fn test_capture_groups_are_ordered_spans() {
        let regex = Regex::new("^user/(\\d+)(?:/(posts))?$").unwrap();
        let caps = regex.captures("user/42").unwrap();
        let captures = RouteCaptures::from_regex(&caps);

        assert_eq!(captures.full_match(), Some("user/42"));
        assert_eq!(captures.get(1), Some("42"));
        assert_eq!(captures.get(2), None);
        assert_eq!(captures.len(), 3);
    }
}
