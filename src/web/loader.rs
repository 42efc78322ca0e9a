use std::path::Path;

use log::debug;

use super::{
    controller::{Controller, PageState},
    template::Template,
};
use crate::core::{AdapterRegistry, CoreError, CoreResult, Implementation};

/// Controller name for a page: `home` and `Home` both map to `HomeController`
pub fn controller_name(page: &str) -> String {
    let mut chars = page.chars();
    match chars.next() {
        Some(first) => format!("{}{}Controller", first.to_uppercase(), chars.as_str()),
        None => "Controller".to_string(),
    }
}

/// Template name belonging to a controller name
pub fn template_name(controller_name: &str) -> String {
    controller_name.replace("Controller", "Template")
}

/// Resolve the controller for `page` and bind it to its template.
pub fn load_controller(
    registry: &AdapterRegistry,
    page: &str,
    template_root: &Path,
    style: &str,
    skin: &str,
) -> CoreResult<Box<dyn Controller>> {
    let name = controller_name(page);
    let factory = match registry.catalog().resolve(&name) {
        Some(Implementation::Controller(factory)) => factory,
        Some(other) => {
            return Err(CoreError::ContractViolation(format!(
                "'{name}' is a {}; only controllers can be loaded as pages",
                other.kind()
            )))
        }
        None => return Err(CoreError::ControllerNotFound(name)),
    };

    let template = Template::locate(template_root, &template_name(&name), style, skin)?;
    debug!("Loading {name} with template {}", template.path().display());
    factory(PageState::new(template, style, skin), registry)
}
