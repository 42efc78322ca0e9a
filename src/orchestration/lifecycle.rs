//! Per-request lifecycle
//!
//! Phases, in order: load or start the session, build the storage transport,
//! create the registry and register the configured adapters, initialise the
//! web module, route the request, then flush cookies and save the session.

use std::sync::Arc;

use http::{header, HeaderValue, Response, StatusCode};
use log::{debug, error, info, warn};
use rand::Rng;

use super::Application;
use crate::{
    adapters::{StorageAdapter, CONFIG_ADAPTER_NAME},
    api::RestApi,
    config::Config,
    core::{AdapterRegistry, CoreError, CoreResult, RequestContext},
    storage::{
        backend::{is_valid_session_id, new_session_id},
        CookieExpiry, CookieJar, SessionBackend, SessionData, SessionHandle, SetCookie,
        StorageTransport,
    },
    utils::{general::html_escape, response::ResponseBuilder},
    web::{self, PageDispatcher, PageResponse, SYSTEM_STORAGE},
};

pub struct RequestLifecycle {
    config: Arc<Config>,
    sessions: Arc<dyn SessionBackend>,
    session_id: String,
    registry: AdapterRegistry,
}

impl RequestLifecycle {
    /// Prepare session, transport and registry for `ctx`
    pub fn begin(app: &Application, ctx: &RequestContext) -> CoreResult<Self> {
        let config = app.config().clone();
        let sessions = app.sessions().clone();

        // Phase 1: session
        collect_expired_sessions(sessions.as_ref(), config.session_gc_probability);
        let cookies = CookieJar::new(ctx.cookies().clone());
        let (session_id, data) = match load_session(sessions.as_ref(), &config, ctx)? {
            Some(found) => found,
            None => {
                let id = new_session_id();
                debug!("Starting session {id}");
                cookies.queue(SetCookie {
                    name: config.session_name.clone(),
                    value: id.clone(),
                    expiry: CookieExpiry::Session,
                    http_only: true,
                });
                (id, SessionData::new())
            }
        };

        // Phase 2: transport
        let transport = StorageTransport::new(SessionHandle::new(data), cookies);

        // Phase 3: registry
        let mut registry = AdapterRegistry::new(app.catalog().clone(), transport);
        registry.register_instance(CONFIG_ADAPTER_NAME, app.config_adapter().clone())?;
        registry.register_all(&config.adapters)?;

        // Phase 4: web module, whichever route the request takes
        if config.use_web {
            let storage = StorageAdapter::from_registry(&registry, SYSTEM_STORAGE)?;
            web::init_web_module(&config, &storage);
        }

        Ok(Self {
            config,
            sessions,
            session_id,
            registry,
        })
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Phase 5: hand the request to the API or the page dispatcher
    pub fn route(&self, ctx: &RequestContext) -> Response<Vec<u8>> {
        if self.config.use_api && is_api_path(ctx.path(), &self.config.api_prefix) {
            return RestApi::new(&self.registry, &self.config.api_prefix)
                .expose_errors(self.config.display_errors)
                .process(ctx);
        }
        if !self.config.use_web {
            debug!("Web module disabled, nothing serves {}", ctx.path());
            return ResponseBuilder::error_http(StatusCode::NOT_FOUND, "Not Found");
        }

        match self.serve_page(ctx) {
            Ok(PageResponse::Render(html)) => ResponseBuilder::html(StatusCode::OK, html),
            Ok(PageResponse::Redirect(location)) => ResponseBuilder::redirect(&location),
            Ok(PageResponse::Json(payload)) => match serde_json::to_vec(&payload) {
                Ok(body) => ResponseBuilder::json(200, "OK", body),
                Err(e) => failure_page(
                    &self.config,
                    &CoreError::serialization_error("Unable to encode ajax reply", e),
                ),
            },
            Err(e) => failure_page(&self.config, &e),
        }
    }

    /// Phase 6: attach queued cookies and persist the session
    pub fn finish(self, mut response: Response<Vec<u8>>) -> Response<Vec<u8>> {
        let transport = self.registry.storage_transport();
        for cookie in transport.cookies.take_outgoing() {
            match HeaderValue::from_str(&cookie.header_value()) {
                Ok(value) => {
                    response.headers_mut().append(header::SET_COOKIE, value);
                }
                Err(e) => error!("Dropping unencodable cookie {}: {e}", cookie.name),
            }
        }

        if let Err(e) = self.sessions.save(&self.session_id, &transport.session.snapshot()) {
            error!("Unable to save session {}: {e}", self.session_id);
        }
        response
    }

    fn serve_page(&self, ctx: &RequestContext) -> CoreResult<PageResponse> {
        let page = ctx
            .query("page")
            .filter(|page| !page.is_empty())
            .unwrap_or(self.config.default_page.as_str());
        info!("Serving page {page}");
        PageDispatcher::new(&self.config, &self.registry, ctx).dispatch(page)
    }
}

fn load_session(
    sessions: &dyn SessionBackend,
    config: &Config,
    ctx: &RequestContext,
) -> CoreResult<Option<(String, SessionData)>> {
    let Some(id) = ctx.cookie(&config.session_name) else {
        return Ok(None);
    };
    if !is_valid_session_id(id) {
        debug!("Ignoring malformed session id");
        return Ok(None);
    }
    match sessions.load(id) {
        Ok(data) => Ok(data.map(|data| (id.to_string(), data))),
        Err(CoreError::Serialization(e)) => {
            warn!("Discarding unreadable session: {e}");
            if let Err(e) = sessions.remove(id) {
                warn!("Unable to remove unreadable session: {e}");
            }
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Sweep expired sessions on a random share of requests
fn collect_expired_sessions(sessions: &dyn SessionBackend, probability: f64) {
    if probability.is_nan() || probability <= 0.0 || !rand::thread_rng().gen_bool(probability.min(1.0)) {
        return;
    }
    match sessions.gc() {
        Ok(0) => {}
        Ok(removed) => info!("Removed {removed} expired sessions"),
        Err(e) => warn!("Session cleanup failed: {e}"),
    }
}

fn is_api_path(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// HTML error page for a failed request. The error text is only shown when
/// `display_errors` is on.
pub fn failure_page(config: &Config, e: &CoreError) -> Response<Vec<u8>> {
    error!("Request failed: {e}");
    let status = StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let reason = status.canonical_reason().unwrap_or("Error");
    let body = if config.display_errors {
        format!("<h1>{reason}</h1>\n<p>{}</p>\n", html_escape(&e.to_string()))
    } else {
        format!("<h1>{reason}</h1>\n")
    };
    ResponseBuilder::html(status, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_api_path() {
        assert!(is_api_path("/api", "/api"));
        assert!(is_api_path("/api/widgets", "/api"));
        assert!(!is_api_path("/apis", "/api"));
        assert!(!is_api_path("/", "/api"));
    }
}
