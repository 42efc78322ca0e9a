//! Unified response handling utilities for page and API responses.
//!
//! This module provides a consistent interface for building HTML, redirect,
//! plain-text error and JSON responses.

use http::{header, HeaderValue, Response, StatusCode};

/// Standard content types
pub mod content_type {
    pub const TEXT_PLAIN: &str = "text/plain";
    pub const TEXT_HTML: &str = "text/html; charset=UTF-8";
    pub const APPLICATION_JSON: &str = "application/json";
}

/// Reason phrase chosen for a response status line.
///
/// `http::Response` only carries the numeric code, so the phrase rides along
/// in the response extensions for writers that emit a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReasonPhrase(pub &'static str);

/// Unified response builder for different response types
pub struct ResponseBuilder;

impl ResponseBuilder {
    /// Build an HTML response
    pub fn html(status: StatusCode, body: String) -> Response<Vec<u8>> {
        Self::with_body(status, content_type::TEXT_HTML, body.into_bytes())
    }

    /// Build a plain-text error response
    pub fn error_http(status: StatusCode, message: &str) -> Response<Vec<u8>> {
        Self::with_body(status, content_type::TEXT_PLAIN, message.as_bytes().to_vec())
    }

    /// Build a `302 Found` redirect to `location`
    pub fn redirect(location: &str) -> Response<Vec<u8>> {
        let mut response = Self::with_body(StatusCode::FOUND, content_type::TEXT_PLAIN, Vec::new());
        match HeaderValue::from_str(location) {
            Ok(value) => {
                response.headers_mut().insert(header::LOCATION, value);
            }
            Err(e) => {
                log::error!("Invalid redirect location '{}': {}", location, e);
                return Self::error_http(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error");
            }
        }
        response
    }

    /// Build a JSON response whose status line uses `reason` verbatim.
    ///
    /// Codes `http` cannot represent are sent as 500.
    pub fn json(status: u16, reason: &'static str, body: Vec<u8>) -> Response<Vec<u8>> {
        let status = StatusCode::from_u16(status).unwrap_or_else(|_| {
            log::error!("Invalid HTTP status code {status}, sending 500");
            StatusCode::INTERNAL_SERVER_ERROR
        });
        let mut response = Self::with_body(status, content_type::APPLICATION_JSON, body);
        response.extensions_mut().insert(ReasonPhrase(reason));
        response
    }

    fn with_body(status: StatusCode, content_type: &'static str, body: Vec<u8>) -> Response<Vec<u8>> {
        let mut response = Response::new(body);
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        response
    }
}

/// Reason phrase for a response, falling back to the canonical one.
pub fn reason_phrase(response: &Response<Vec<u8>>) -> &'static str {
    response
        .extensions()
        .get::<ReasonPhrase>()
        .map(|r| r.0)
        .or_else(|| response.status().canonical_reason())
        .unwrap_or("Unknown")
}
