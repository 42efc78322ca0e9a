//! Form and redirect helpers for page controllers

use std::collections::BTreeMap;

use crate::core::RequestContext;

/// Where a form value is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormSource {
    Get,
    Post,
}

/// Redirect target requested by a controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redirect {
    /// A caller supplied location
    To(String),
    /// The page that linked to this one
    Referrer,
    /// The path this request was made to
    Base,
}

impl Redirect {
    pub fn location(&self, request: &RequestContext) -> String {
        match self {
            Redirect::To(url) => url.clone(),
            Redirect::Referrer => referrer(request),
            Redirect::Base if request.path().is_empty() => "/".to_string(),
            Redirect::Base => request.path().to_string(),
        }
    }
}

pub fn form_data<'a>(request: &'a RequestContext, name: &str, source: FormSource) -> Option<&'a str> {
    match source {
        FormSource::Get => request.query(name),
        FormSource::Post => request.form(name),
    }
}

/// Posted values of `fields`, absent ones included as `None`
pub fn build_controller_post(
    request: &RequestContext,
    fields: &[String],
) -> BTreeMap<String, Option<String>> {
    fields
        .iter()
        .map(|field| {
            let value = form_data(request, field, FormSource::Post).map(str::to_string);
            (field.clone(), value)
        })
        .collect()
}

/// The `Referer` header, or the site root when there is none
pub fn referrer(request: &RequestContext) -> String {
    match request.header(http::header::REFERER.as_str()) {
        Some(referer) if !referer.is_empty() => referer.to_string(),
        _ => "/".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use http::Method;

    use super::*;

    #[test]
    fn test_build_controller_post() {
        let request = RequestContext::new(Method::POST, "/?page=Home&title=query")
            .with_form_field("title", "posted")
            .with_form_field("ignored", "x");
        let post = build_controller_post(&request, &["title".to_string(), "body".to_string()]);

        assert_eq!(post.len(), 2);
        assert_eq!(post["title"].as_deref(), Some("posted"));
        assert_eq!(post["body"], None);
    }

    #[test]
    fn test_redirect_locations() {
        let request = RequestContext::new(Method::GET, "/index?page=Home");
        assert_eq!(Redirect::To("/x".to_string()).location(&request), "/x");
        assert_eq!(Redirect::Referrer.location(&request), "/");
        assert_eq!(Redirect::Base.location(&request), "/index");

        let request = request.with_header("Referer", "/?page=List");
        assert_eq!(Redirect::Referrer.location(&request), "/?page=List");
    }
}
