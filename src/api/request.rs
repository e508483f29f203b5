//! Request model module
//!
//! Wraps one incoming HTTP call: method, decoded query pairs, cookies, the raw
//! body, and whether that body parses as JSON. Immutable after construction;
//! built once per request before dispatch.

use hyper::Method;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use thiserror::Error;

use super::params::Params;

/// Errors surfaced when reading parameterized input
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    /// Non-GET request with an empty body
    #[error("can't get input on an invalid request")]
    Invalid,
    /// Non-GET request whose body is not a JSON object
    #[error("can't get parameterized input for non-json payload")]
    NotJson,
}

/// A single API request
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    raw_body: String,
    is_json: bool,
    /// Body parsed as a JSON object, when it is one
    input: Option<Map<String, Value>>,
    query: HashMap<String, String>,
    cookies: HashMap<String, String>,
    remote_addr: Option<SocketAddr>,
}

impl ApiRequest {
    /// Construct a request from its wire pieces
    pub fn new(
        method: Method,
        query_string: Option<&str>,
        cookie_header: Option<&str>,
        body: &[u8],
        remote_addr: Option<SocketAddr>,
    ) -> Self {
        let raw_body = String::from_utf8_lossy(body).into_owned();
        let trimmed = raw_body.trim();
        let is_json = !trimmed.is_empty()
            && (trimmed.starts_with('{')
                || trimmed.starts_with('[')
                || serde_json::from_str::<Value>(trimmed).is_ok());

        let input = if is_json {
            match serde_json::from_str::<Value>(trimmed) {
                Ok(Value::Object(map)) => Some(map),
                _ => None,
            }
        } else {
            None
        };

        Self {
            method,
            raw_body,
            is_json,
            input,
            query: parse_query(query_string),
            cookies: parse_cookies(cookie_header),
            remote_addr,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn raw_body(&self) -> &str {
        &self.raw_body
    }

    pub fn is_json(&self) -> bool {
        self.is_json
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// A single decoded query parameter
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// A single cookie value
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Request input as a parameter bag: the query string for GET requests,
    /// the JSON object body otherwise
    pub fn parameterized_input(&self) -> Result<Params, RequestError> {
        if self.method == Method::GET {
            return Ok(Params::from_query(&self.query));
        }

        if self.raw_body.trim().is_empty() {
            return Err(RequestError::Invalid);
        }

        match &self.input {
            Some(map) => Ok(Params::from_json_object(map.clone())),
            None => Err(RequestError::NotJson),
        }
    }
}

/// Decode one query/form component (percent-escapes and `+`)
fn decode_component(raw: &str) -> String {
    let plus = raw.replace('+', " ");
    match urlencoding::decode(&plus) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => plus,
    }
}

/// Parse a raw query string into decoded pairs
fn parse_query(query: Option<&str>) -> HashMap<String, String> {
    let mut map = HashMap::new();
    let Some(query) = query else {
        return map;
    };

    for pair in query.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        map.insert(decode_component(key), decode_component(value));
    }

    map
}

/// Parse a Cookie header into name/value pairs
fn parse_cookies(header: Option<&str>) -> HashMap<String, String> {
    let mut map = HashMap::new();
    let Some(header) = header else {
        return map;
    };

    for pair in header.split(';') {
        let pair = pair.trim();
        if let Some((key, value)) = pair.split_once('=') {
            map.insert(key.to_string(), value.to_string());
        }
    }

    map
}
