use bytes::Bytes;
use http::Method;
use log::debug;
use serde_json::Value as JsonValue;

use crate::core::{AdapterRegistry, CoreError, CoreResult, RequestContext};

/// Header a POST can use to stand in for PUT or DELETE
pub const METHOD_OVERRIDE_HEADER: &str = "X-HTTP-Method";

/// An API request split into endpoint, positional arguments and body
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    method: Method,
    endpoint: String,
    args: Vec<String>,
    file: Option<Bytes>,
}

impl ApiRequest {
    /// Parse the request below `prefix`.
    ///
    /// `/api/widgets/7/parts` gives endpoint `widgets` and arguments
    /// `["7", "parts"]`. Empty segments are skipped.
    pub fn parse(ctx: &RequestContext, prefix: &str) -> CoreResult<Self> {
        let path = ctx.path().strip_prefix(prefix).unwrap_or(ctx.path());
        let mut segments = path.split('/').filter(|s| !s.is_empty()).map(|segment| {
            urlencoding::decode(segment)
                .map(|decoded| decoded.into_owned())
                .unwrap_or_else(|_| segment.to_string())
        });
        let endpoint = segments.next().unwrap_or_default();
        let args: Vec<String> = segments.collect();

        let mut method = ctx.method().clone();
        if method == Method::POST {
            if let Some(value) = ctx.header(METHOD_OVERRIDE_HEADER) {
                method = match value {
                    "DELETE" => Method::DELETE,
                    "PUT" => Method::PUT,
                    other => return Err(CoreError::UnexpectedHeader(other.to_string())),
                };
                debug!("Method overridden to {method} by {METHOD_OVERRIDE_HEADER}");
            }
        }

        let file = (method == Method::PUT).then(|| ctx.body().clone());

        Ok(Self {
            method,
            endpoint,
            args,
            file,
        })
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    /// Raw body, present for PUT requests only
    pub fn file(&self) -> Option<&Bytes> {
        self.file.as_ref()
    }
}

/// Result of a handler: the JSON body and its status
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub body: JsonValue,
}

impl Reply {
    pub fn ok(body: impl Into<JsonValue>) -> Self {
        Self::with_status(200, body)
    }

    pub fn with_status(status: u16, body: impl Into<JsonValue>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

impl From<JsonValue> for Reply {
    fn from(body: JsonValue) -> Self {
        Reply::ok(body)
    }
}

/// An API endpoint. Built per request from the parsed [`ApiRequest`].
pub trait Handler {
    fn handle(&mut self, registry: &AdapterRegistry) -> CoreResult<Reply>;
}
