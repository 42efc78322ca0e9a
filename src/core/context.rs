//! Request context management
//!
//! This module provides the RequestContext that carries everything the router
//! reads from the inbound request: method, path, query and form parameters,
//! headers, cookies and the raw body.

use std::collections::HashMap;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Request};

use crate::utils::request;

/// Context that holds the parsed state of one inbound request
#[derive(Debug, Clone)]
pub struct RequestContext {
    method: Method,
    path: String,
    query: HashMap<String, String>,
    form: HashMap<String, String>,
    headers: HeaderMap,
    cookies: HashMap<String, String>,
    body: Bytes,
}

impl RequestContext {
    /// Create a context for `method` on `uri` (path plus optional query string)
    pub fn new(method: Method, uri: &str) -> Self {
        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path, request::parse_query(query)),
            None => (uri, HashMap::new()),
        };

        Self {
            method,
            path: path.to_string(),
            query,
            form: HashMap::new(),
            headers: HeaderMap::new(),
            cookies: HashMap::new(),
            body: Bytes::new(),
        }
    }

    /// Build a context from an `http::Request`, decoding cookies and
    /// url-encoded form bodies.
    pub fn from_http(req: Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        let uri = parts
            .uri
            .path_and_query()
            .map_or_else(|| parts.uri.path().to_string(), |pq| pq.to_string());

        let mut ctx = Self::new(parts.method, &uri);
        ctx.cookies = request::parse_cookie_header(&parts.headers);
        if request::is_form_body(&parts.headers) {
            ctx.form = request::parse_query(&String::from_utf8_lossy(&body));
        }
        ctx.headers = parts.headers;
        ctx.body = body;
        ctx
    }

    /// Add a request header
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => log::warn!("Dropping invalid header {name}"),
        }
        self
    }

    /// Add a submitted form field
    pub fn with_form_field(mut self, name: &str, value: &str) -> Self {
        self.form.insert(name.to_string(), value.to_string());
        self
    }

    /// Add a cookie as sent by the client
    pub fn with_cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.insert(name.to_string(), value.to_string());
        self
    }

    /// Set the raw request body
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Get a query-string parameter
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// Get a form-post field
    pub fn form(&self, name: &str) -> Option<&str> {
        self.form.get(name).map(String::as_str)
    }

    /// Whether the request carries any form-post data
    pub fn has_form_data(&self) -> bool {
        self.method == Method::POST && !self.form.is_empty()
    }

    /// Get a header value as a string
    pub fn header(&self, name: &str) -> Option<&str> {
        request::get_req_header_value(&self.headers, name)
    }

    pub fn cookies(&self) -> &HashMap<String, String> {
        &self.cookies
    }

    /// Get a cookie value sent by the client
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }
}
