use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

use super::{
    form::{self, FormSource, Redirect},
    template::Template,
};
use crate::core::{AdapterRegistry, CoreResult, RequestContext};

const DEFAULT_TITLE: &str = "Default Page";

/// State every page controller carries: title, accepted post fields,
/// presentation and the bound template.
#[derive(Debug, Clone)]
pub struct PageState {
    title: String,
    post_fields: Vec<String>,
    style: String,
    skin: String,
    template: Template,
    base_url: String,
    use_main_template: bool,
    redirect: Option<Redirect>,
}

impl PageState {
    pub fn new(template: Template, style: &str, skin: &str) -> Self {
        let page = template.name().replace("Template", "");
        Self {
            title: DEFAULT_TITLE.to_string(),
            post_fields: Vec::new(),
            style: style.to_string(),
            skin: skin.to_string(),
            template,
            base_url: format!("?page={page}"),
            use_main_template: false,
            redirect: None,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Field names passed to `on_post_received`
    pub fn post_fields(&self) -> &[String] {
        &self.post_fields
    }

    pub fn set_post_fields<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.post_fields = fields.into_iter().map(Into::into).collect();
    }

    pub fn style(&self) -> &str {
        &self.style
    }

    pub fn skin(&self) -> &str {
        &self.skin
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn template_mut(&mut self) -> &mut Template {
        &mut self.template
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn set_base_url(&mut self, base_url: impl Into<String>) {
        self.base_url = base_url.into();
    }

    pub fn use_main_template(&self) -> bool {
        self.use_main_template
    }

    pub fn set_use_main_template(&mut self, use_main_template: bool) {
        self.use_main_template = use_main_template;
    }

    /// Finish the request with a redirect instead of rendering
    pub fn redirect(&mut self, target: Redirect) {
        self.redirect = Some(target);
    }

    pub fn pending_redirect(&self) -> Option<&Redirect> {
        self.redirect.as_ref()
    }
}

/// What a controller callback can reach: the request and the adapters
#[derive(Clone, Copy)]
pub struct PageContext<'a> {
    registry: &'a AdapterRegistry,
    request: &'a RequestContext,
}

impl<'a> PageContext<'a> {
    pub fn new(registry: &'a AdapterRegistry, request: &'a RequestContext) -> Self {
        Self { registry, request }
    }

    pub fn registry(&self) -> &'a AdapterRegistry {
        self.registry
    }

    pub fn request(&self) -> &'a RequestContext {
        self.request
    }

    pub fn form_data(&self, name: &str, source: FormSource) -> Option<&'a str> {
        form::form_data(self.request, name, source)
    }
}

/// A page controller. Every callback except `main` is optional.
pub trait Controller {
    fn page(&self) -> &PageState;

    fn page_mut(&mut self) -> &mut PageState;

    /// Called once per request, after the other callbacks
    fn main(&mut self, _ctx: &PageContext<'_>) -> CoreResult<()> {
        Ok(())
    }

    /// Called with the declared post fields when a post carries a valid token
    fn on_post_received(
        &mut self,
        _ctx: &PageContext<'_>,
        _data: &BTreeMap<String, Option<String>>,
    ) -> CoreResult<()> {
        Ok(())
    }

    /// Called with the lower-cased action name when an action carries a valid token
    fn on_user_action(&mut self, _ctx: &PageContext<'_>, _action: &str) -> CoreResult<()> {
        Ok(())
    }

    /// Called for every `request` parameter. A returned value is sent as JSON
    /// in place of the rendered page.
    fn ajax(&mut self, _ctx: &PageContext<'_>, _request: &str) -> CoreResult<Option<JsonValue>> {
        Ok(None)
    }
}
