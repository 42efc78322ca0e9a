//! Page dispatch
//!
//! Stages run in order for every page request: resolve style and skin, load
//! the controller, handle a posted form, handle a user action, handle an ajax
//! request, run `main`. Posted forms and user actions only reach the
//! controller when they carry the session's CSRF token; a bad token is
//! dropped silently and the page renders as a plain view.

use log::{debug, info, warn};
use serde_json::Value as JsonValue;

use super::{
    controller::{Controller, PageContext},
    form::{build_controller_post, FormSource},
    loader::load_controller,
};
use crate::{
    adapters::StorageAdapter,
    config::Config,
    core::{AdapterRegistry, CoreResult, RequestContext},
    storage::NamespacedStore,
    utils::general::constant_time_eq,
};

/// Session key and form field holding the CSRF token
pub const TOKEN_KEY: &str = "token";
/// Query parameter naming a user action
pub const ACTION_PARAM: &str = "action";
/// Query parameter naming an ajax request
pub const REQUEST_PARAM: &str = "request";
/// Adapter name of the framework's own storage namespace
pub const SYSTEM_STORAGE: &str = "storage";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStage {
    ResolveTemplateStyle,
    LoadController,
    CheckCsrfForPost,
    CheckCsrfForAction,
    HandleAjax,
    Main,
}

/// Result of a page dispatch
#[derive(Debug, Clone, PartialEq)]
pub enum PageResponse {
    Render(String),
    Redirect(String),
    Json(JsonValue),
}

pub struct PageDispatcher<'a> {
    config: &'a Config,
    registry: &'a AdapterRegistry,
    request: &'a RequestContext,
}

impl<'a> PageDispatcher<'a> {
    pub fn new(config: &'a Config, registry: &'a AdapterRegistry, request: &'a RequestContext) -> Self {
        Self {
            config,
            registry,
            request,
        }
    }

    pub fn dispatch(&self, page: &str) -> CoreResult<PageResponse> {
        let storage = StorageAdapter::from_registry(self.registry, SYSTEM_STORAGE)?;
        let session_token = storage
            .session()
            .get(TOKEN_KEY)
            .and_then(|token| token.as_str().map(str::to_string));

        enter(DispatchStage::ResolveTemplateStyle, page);
        let (style, skin) = self.resolve_presentation(&storage);

        enter(DispatchStage::LoadController, page);
        let mut controller = load_controller(
            self.registry,
            page,
            &self.config.template_root,
            &style,
            &skin,
        )?;
        let ctx = PageContext::new(self.registry, self.request);

        if self.request.has_form_data() {
            enter(DispatchStage::CheckCsrfForPost, page);
            let submitted = ctx.form_data(TOKEN_KEY, FormSource::Post);
            if token_matches(session_token.as_deref(), submitted) {
                let post = build_controller_post(self.request, controller.page().post_fields());
                info!("Post accepted for page {page} ({} fields)", post.len());
                controller.on_post_received(&ctx, &post)?;
            } else {
                warn!("Ignoring post to page {page}: token mismatch");
            }
        }

        if let Some(action) = ctx.form_data(ACTION_PARAM, FormSource::Get).filter(|a| !a.is_empty()) {
            enter(DispatchStage::CheckCsrfForAction, page);
            let submitted = ctx.form_data(TOKEN_KEY, FormSource::Get);
            if token_matches(session_token.as_deref(), submitted) {
                let action = action.to_lowercase();
                info!("User action '{action}' on page {page}");
                controller.on_user_action(&ctx, &action)?;
            } else {
                warn!("Ignoring action '{action}' on page {page}: token mismatch");
            }
        }

        // ajax requests are not token checked
        let mut ajax = None;
        if let Some(request) = ctx.form_data(REQUEST_PARAM, FormSource::Get) {
            enter(DispatchStage::HandleAjax, page);
            ajax = controller.ajax(&ctx, request)?;
        }

        enter(DispatchStage::Main, page);
        controller.main(&ctx)?;

        self.finish(controller, session_token, ajax)
    }

    /// Style and skin from the visitor's cookies, else the configured defaults
    fn resolve_presentation(&self, storage: &StorageAdapter) -> (String, String) {
        let pick = |cookie: &str, default: &str| match storage.cookies().get(cookie) {
            Some(value) if is_safe_segment(&value) => value,
            Some(value) => {
                warn!("Ignoring invalid presentation cookie {cookie}={value}");
                default.to_string()
            }
            None => default.to_string(),
        };
        let style = pick(&self.config.template_cookie, &self.config.default_template_style);
        let skin = pick(&self.config.skin_cookie, &self.config.default_skin_style);
        debug!("Presentation resolved to style '{style}', skin '{skin}'");
        (style, skin)
    }

    fn finish(
        &self,
        mut controller: Box<dyn Controller>,
        session_token: Option<String>,
        ajax: Option<JsonValue>,
    ) -> CoreResult<PageResponse> {
        if let Some(redirect) = controller.page().pending_redirect() {
            return Ok(PageResponse::Redirect(redirect.location(self.request)));
        }
        if let Some(payload) = ajax {
            return Ok(PageResponse::Json(payload));
        }

        let page = controller.page_mut();
        let title = page.title().to_string();
        let base_url = page.base_url().to_string();
        let style = page.style().to_string();
        let use_main_template = page.use_main_template();

        let template = page.template_mut();
        template.set_data("title", title);
        template.set_data("base_url", base_url);
        template.set_data("style", style);
        template.set_data("use_main_template", use_main_template);
        if let Some(token) = session_token {
            template.set_data(TOKEN_KEY, token);
        }
        template.render().map(PageResponse::Render)
    }
}

fn enter(stage: DispatchStage, page: &str) {
    debug!("Page {page}: {stage:?}");
}

fn token_matches(expected: Option<&str>, submitted: Option<&str>) -> bool {
    match (expected, submitted) {
        (Some(expected), Some(submitted)) => constant_time_eq(expected, submitted),
        _ => false,
    }
}

/// Cookie supplied style names become path segments
fn is_safe_segment(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
