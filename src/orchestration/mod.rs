//! Request orchestration layer
//!
//! `Application` holds what lives for the whole process: configuration, the
//! catalog and the session backend. Each request gets its own
//! [`RequestLifecycle`] wiring registry, storage and router together.

pub mod lifecycle;

use std::{path::Path, sync::Arc, time::Duration};

use bytes::Bytes;
use http::{Request, Response};
use log::info;

pub use lifecycle::{failure_page, RequestLifecycle};

use crate::{
    adapters::ConfigAdapter,
    config::Config,
    core::{Catalog, CoreResult, RequestContext},
    storage::{FileSessionBackend, MemorySessionBackend, SessionBackend},
};

pub struct Application {
    config_adapter: Arc<ConfigAdapter>,
    catalog: Arc<Catalog>,
    sessions: Arc<dyn SessionBackend>,
}

impl Application {
    pub fn new(
        config_adapter: ConfigAdapter,
        catalog: Catalog,
        sessions: Arc<dyn SessionBackend>,
    ) -> Self {
        info!(
            "Application ready: web {}, api {}, {} catalog entries",
            config_adapter.config().use_web,
            config_adapter.config().use_api,
            catalog.len()
        );
        Self {
            config_adapter: Arc::new(config_adapter),
            catalog: Arc::new(catalog),
            sessions,
        }
    }

    /// Load the configuration file and pick the session backend it names:
    /// files under `session_dir` when set, process memory otherwise.
    pub fn from_config_file(path: impl AsRef<Path>, catalog: Catalog) -> CoreResult<Self> {
        Self::from_config_adapter(ConfigAdapter::load(path)?, catalog)
    }

    /// Like [`Application::from_config_file`] for an already loaded configuration
    pub fn from_config_adapter(config_adapter: ConfigAdapter, catalog: Catalog) -> CoreResult<Self> {
        let lifetime = Duration::from_secs(config_adapter.config().session_lifetime);
        let sessions: Arc<dyn SessionBackend> = match &config_adapter.config().session_dir {
            Some(dir) => Arc::new(FileSessionBackend::new(dir)?.with_lifetime(lifetime)),
            None => Arc::new(MemorySessionBackend::with_lifetime(lifetime)),
        };
        Ok(Self::new(config_adapter, catalog, sessions))
    }

    pub fn config(&self) -> &Arc<Config> {
        self.config_adapter.config()
    }

    pub fn config_adapter(&self) -> &Arc<ConfigAdapter> {
        &self.config_adapter
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn sessions(&self) -> &Arc<dyn SessionBackend> {
        &self.sessions
    }

    pub fn handle(&self, req: Request<Bytes>) -> Response<Vec<u8>> {
        self.handle_context(RequestContext::from_http(req))
    }

    /// Run one request through its lifecycle. Setup failures end in the
    /// failure page.
    pub fn handle_context(&self, ctx: RequestContext) -> Response<Vec<u8>> {
        let lifecycle = match RequestLifecycle::begin(self, &ctx) {
            Ok(lifecycle) => lifecycle,
            Err(e) => return failure_page(self.config(), &e),
        };
        let response = lifecycle.route(&ctx);
        lifecycle.finish(response)
    }
}
