use std::{
    fs,
    path::{Path, PathBuf},
};

use minijinja::Environment;
use serde_json::{Map, Value as JsonValue};

use crate::{
    core::{CoreError, CoreResult, ErrorContext},
    utils::general::html_escape,
};

const TEMPLATE_EXTENSION: &str = "html";

/// A page template bound to one style, plus the data it renders with.
///
/// Files live at `{root}/{style}/{name}.html`. The skin is always bound under
/// `skin`.
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    style: String,
    path: PathBuf,
    data: Map<String, JsonValue>,
}

impl Template {
    /// Bind the template `name` of `style`, failing when its file is missing
    pub fn locate(root: &Path, name: &str, style: &str, skin: &str) -> CoreResult<Self> {
        let path = root
            .join(style)
            .join(format!("{name}.{TEMPLATE_EXTENSION}"));
        if !path.is_file() {
            log::debug!("Template file {} not found", path.display());
            return Err(CoreError::TemplateNotFound(name.to_string()));
        }

        let mut template = Self {
            name: name.to_string(),
            style: style.to_string(),
            path,
            data: Map::new(),
        };
        template.set_data("skin", skin);
        Ok(template)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn style(&self) -> &str {
        &self.style
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn set_data(&mut self, key: &str, value: impl Into<JsonValue>) {
        self.data.insert(key.to_string(), value.into());
    }

    pub fn set_data_map<I, K, V>(&mut self, data: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<JsonValue>,
    {
        for (key, value) in data {
            self.data.insert(key.into(), value.into());
        }
    }

    /// Bound value with strings HTML-escaped
    pub fn get(&self, key: &str) -> Option<JsonValue> {
        self.data.get(key).map(|value| match value {
            JsonValue::String(s) => JsonValue::String(html_escape(s)),
            other => other.clone(),
        })
    }

    /// Bound value exactly as it was set
    pub fn display_raw(&self, key: &str) -> Option<&JsonValue> {
        self.data.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.get(key).is_some_and(|value| !value.is_null())
    }

    /// Render the template file with the bound data. Output is auto-escaped;
    /// templates opt out per value with `|safe`.
    pub fn render(&self) -> CoreResult<String> {
        let source = fs::read_to_string(&self.path)?;
        let tpl_name = format!("{}.{TEMPLATE_EXTENSION}", self.name);
        let mut env = Environment::new();
        env.add_template(&tpl_name, &source)
            .with_context("Invalid template")?;
        let tmpl = env.get_template(&tpl_name).with_context("Invalid template")?;
        tmpl.render(&self.data).with_context("Unable to render template")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn fixture(body: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("default")).unwrap();
        fs::write(dir.path().join("default/HomeTemplate.html"), body).unwrap();
        dir
    }

    #[test]
    fn test_locate_missing_template() {
        let dir = fixture("");
        let result = Template::locate(dir.path(), "HomeTemplate", "dark", "light");
        assert!(matches!(result, Err(CoreError::TemplateNotFound(name)) if name == "HomeTemplate"));
    }

    #[test]
    fn test_data_access() {
        let dir = fixture("");
        let mut template = Template::locate(dir.path(), "HomeTemplate", "default", "light").unwrap();
        template.set_data("greeting", "<b>hi</b>");
        template.set_data_map([("count", json!(3)), ("empty", JsonValue::Null)]);

        assert_eq!(template.get("skin"), Some(json!("light")));
        assert_eq!(template.get("greeting"), Some(json!("&lt;b&gt;hi&lt;/b&gt;")));
        assert_eq!(template.display_raw("greeting"), Some(&json!("<b>hi</b>")));
        assert_eq!(template.get("count"), Some(json!(3)));
        assert!(template.contains("count"));
        assert!(!template.contains("empty"));
        assert!(!template.contains("missing"));
    }

    #[test]
    fn test_render_escapes_values() {
        let dir = fixture("<p class=\"{{ skin }}\">{{ greeting }}</p>");
        let mut template = Template::locate(dir.path(), "HomeTemplate", "default", "light").unwrap();
        template.set_data("greeting", "<b>hi");
        assert_eq!(template.render().unwrap(), "<p class=\"light\">&lt;b&gt;hi</p>");
    }
}
