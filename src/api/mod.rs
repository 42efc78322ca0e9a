//! REST API dispatch
//!
//! Unlike page dispatch, nothing here fails loudly: unknown endpoints,
//! misconfigured handlers and handler errors all become JSON envelopes.

pub mod handler;

use http::{header, HeaderValue, Response};
use log::{debug, error, info, warn};
use serde_json::Value as JsonValue;

pub use handler::{ApiRequest, Handler, Reply, METHOD_OVERRIDE_HEADER};

use crate::{
    core::{AdapterRegistry, CoreError, Implementation, RequestContext},
    utils::response::ResponseBuilder,
};

/// Reason phrase for an envelope status. Codes outside the table get the
/// 500 phrase while keeping their numeric value.
pub fn status_reason(code: u16) -> &'static str {
    match code {
        200 => "OK",
        404 => "Not Found",
        405 => "Method Not Allowed",
        _ => "Internal Server Error",
    }
}

/// Catalog name of the handler serving `endpoint`: `widgets` maps to `apiWidgets`
pub fn handler_name(endpoint: &str) -> String {
    let mut chars = endpoint.chars();
    match chars.next() {
        Some(first) => format!("api{}{}", first.to_uppercase(), chars.as_str()),
        None => "api".to_string(),
    }
}

/// JSON response with the permissive CORS headers every API reply carries
pub fn envelope(status: u16, body: &JsonValue) -> Response<Vec<u8>> {
    let (status, bytes) = match serde_json::to_vec(body) {
        Ok(bytes) => (status, bytes),
        Err(e) => {
            error!("Unable to encode API response: {e}");
            (500, b"\"Internal Server Error\"".to_vec())
        }
    };

    let mut response = ResponseBuilder::json(status, status_reason(status), bytes);
    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static("*"));
    response
}

/// Resolves API requests to handlers and serialises their replies
pub struct RestApi<'a> {
    registry: &'a AdapterRegistry,
    prefix: &'a str,
    expose_errors: bool,
}

impl<'a> RestApi<'a> {
    pub fn new(registry: &'a AdapterRegistry, prefix: &'a str) -> Self {
        Self {
            registry,
            prefix,
            expose_errors: false,
        }
    }

    /// Include handler error messages in 500 envelopes
    pub fn expose_errors(mut self, expose: bool) -> Self {
        self.expose_errors = expose;
        self
    }

    pub fn process(&self, ctx: &RequestContext) -> Response<Vec<u8>> {
        let request = match ApiRequest::parse(ctx, self.prefix) {
            Ok(request) => request,
            Err(e @ CoreError::UnexpectedHeader(_)) => {
                warn!("Rejected API request {}: {e}", ctx.path());
                return envelope(405, &JsonValue::String(e.to_string()));
            }
            Err(e) => return self.failure(e),
        };

        let endpoint = request.endpoint().to_string();
        let name = handler_name(&endpoint);
        let factory = match self.registry.catalog().resolve(&name) {
            Some(Implementation::Handler(factory)) => factory,
            Some(other) => {
                error!("Endpoint '{endpoint}' resolves to a {}, not a handler", other.kind());
                return envelope(
                    500,
                    &JsonValue::String(format!("Endpoint configuration error: {endpoint}")),
                );
            }
            None => {
                debug!("No handler {name} for endpoint '{endpoint}'");
                return envelope(404, &JsonValue::String(format!("No Endpoint: {endpoint}")));
            }
        };

        info!("API {} {endpoint} ({} args)", request.method(), request.args().len());
        let mut handler = factory(request);
        match handler.handle(self.registry) {
            Ok(reply) => envelope(reply.status, &reply.body),
            Err(e) => self.failure(e),
        }
    }

    fn failure(&self, e: CoreError) -> Response<Vec<u8>> {
        error!("API request failed: {e}");
        let message = if self.expose_errors {
            e.to_string()
        } else {
            status_reason(500).to_string()
        };
        envelope(500, &JsonValue::String(message))
    }
}
