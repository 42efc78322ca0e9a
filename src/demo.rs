//! Sample page controller and API handlers served by the binary

use std::collections::BTreeMap;

use serde_json::{json, Value as JsonValue};

use crate::{
    api::{ApiRequest, Handler, Reply},
    core::{AdapterRegistry, Catalog, CoreResult},
    web::{Controller, PageContext, PageState, Redirect},
};

pub struct HomeController {
    page: PageState,
}

pub fn create_home_controller(
    mut page: PageState,
    _registry: &AdapterRegistry,
) -> CoreResult<Box<dyn Controller>> {
    page.set_title("Home");
    page.set_post_fields(["message"]);
    Ok(Box::new(HomeController { page }))
}

impl Controller for HomeController {
    fn page(&self) -> &PageState {
        &self.page
    }

    fn page_mut(&mut self) -> &mut PageState {
        &mut self.page
    }

    fn on_post_received(
        &mut self,
        _ctx: &PageContext<'_>,
        data: &BTreeMap<String, Option<String>>,
    ) -> CoreResult<()> {
        if let Some(Some(message)) = data.get("message") {
            self.page.template_mut().set_data("message", message.as_str());
        }
        Ok(())
    }

    fn on_user_action(&mut self, _ctx: &PageContext<'_>, action: &str) -> CoreResult<()> {
        match action {
            "back" => self.page.redirect(Redirect::Referrer),
            _ => self.page.template_mut().set_data("last_action", action),
        }
        Ok(())
    }

    fn ajax(&mut self, _ctx: &PageContext<'_>, request: &str) -> CoreResult<Option<JsonValue>> {
        Ok(match request {
            "ping" => Some(json!({ "pong": true })),
            _ => None,
        })
    }
}

/// Echoes the parsed request back
pub struct EchoHandler {
    request: ApiRequest,
}

pub fn create_echo_handler(request: ApiRequest) -> Box<dyn Handler> {
    Box::new(EchoHandler { request })
}

impl Handler for EchoHandler {
    fn handle(&mut self, _registry: &AdapterRegistry) -> CoreResult<Reply> {
        let file = self
            .request
            .file()
            .map(|body| String::from_utf8_lossy(body).into_owned());
        Ok(Reply::ok(json!({
            "method": self.request.method().as_str(),
            "args": self.request.args(),
            "file": file,
        })))
    }
}

/// Lists the adapters registered for the request
pub struct StatusHandler;

pub fn create_status_handler(_request: ApiRequest) -> Box<dyn Handler> {
    Box::new(StatusHandler)
}

impl Handler for StatusHandler {
    fn handle(&mut self, registry: &AdapterRegistry) -> CoreResult<Reply> {
        Ok(Reply::ok(json!({ "adapters": registry.names() })))
    }
}

/// Built-in adapters plus the sample pages and endpoints
pub fn catalog() -> Catalog {
    Catalog::with_builtin_adapters()
        .register_controller("HomeController", create_home_controller)
        .register_handler("apiEcho", create_echo_handler)
        .register_handler("apiStatus", create_status_handler)
}
