//! Page controllers and their dispatch

pub mod controller;
pub mod dispatch;
pub mod form;
pub mod loader;
pub mod template;

use log::info;

pub use controller::{Controller, PageContext, PageState};
pub use dispatch::{PageDispatcher, PageResponse, SYSTEM_STORAGE, TOKEN_KEY};
pub use form::{FormSource, Redirect};
pub use template::Template;

use crate::{
    adapters::StorageAdapter,
    config::Config,
    storage::NamespacedStore,
    utils::general::generate_token,
};

/// Prepare the web module for this request. Returns false when the web
/// module is disabled.
///
/// A session seen for the first time gets its CSRF token here.
pub fn init_web_module(config: &Config, storage: &StorageAdapter) -> bool {
    if !config.use_web {
        return false;
    }
    if storage.session().just_created() {
        storage
            .session()
            .set(TOKEN_KEY, generate_token(config.token_length).into());
        info!("Issued CSRF token for a new session");
    }
    true
}
