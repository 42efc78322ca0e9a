use std::collections::HashMap;

use http::{header, HeaderMap};

/// Decodes an `application/x-www-form-urlencoded` string (query string or form
/// body) into a map.
///
/// When a key repeats, the last occurrence wins.
pub fn parse_query(query: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Whether the request body is a url-encoded form submission.
pub fn is_form_body(headers: &HeaderMap) -> bool {
    get_req_header_value(headers, header::CONTENT_TYPE.as_str())
        .map(|ct| {
            ct.split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .eq_ignore_ascii_case("application/x-www-form-urlencoded")
        })
        .unwrap_or(false)
}

/// Retrieves the value of a specific header from the request.
///
/// Returns `None` if the header is not present or its value is not valid UTF-8.
pub fn get_req_header_value<'a>(headers: &'a HeaderMap, key: &str) -> Option<&'a str> {
    headers.get(key).and_then(|value| value.to_str().ok())
}

/// Parses every `Cookie` header into a name → value map.
///
/// Values are percent-decoded; pairs without `=` are skipped. The first
/// occurrence of a name wins, matching how browsers order more specific
/// cookies first.
pub fn parse_cookie_header(headers: &HeaderMap) -> HashMap<String, String> {
    let mut cookies = HashMap::new();

    for value in headers.get_all(header::COOKIE) {
        let Ok(value) = value.to_str() else {
            log::debug!("Skipping non UTF-8 Cookie header");
            continue;
        };
        for item in value.split(';') {
            let Some((k, v)) = item.trim().split_once('=') else {
                continue;
            };
            let v = v.trim();
            let decoded = urlencoding::decode(v)
                .map(|d| d.into_owned())
                .unwrap_or_else(|_| v.to_string());
            cookies.entry(k.trim().to_string()).or_insert(decoded);
        }
    }

    cookies
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_parse_query_decodes_values() {
        let query = parse_query("page=Home&action=Save%20Now&token=a%2Bb");
        assert_eq!(query.get("page").map(String::as_str), Some("Home"));
        assert_eq!(query.get("action").map(String::as_str), Some("Save Now"));
        assert_eq!(query.get("token").map(String::as_str), Some("a+b"));
    }

    #[test]
    fn test_parse_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("core_system_skin=dark; broken; SID=abc%3D1"),
        );
        let cookies = parse_cookie_header(&headers);
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies.get("core_system_skin").map(String::as_str), Some("dark"));
        assert_eq!(cookies.get("SID").map(String::as_str), Some("abc=1"));
    }

    #[test]
    fn test_is_form_body() {
        let mut headers = HeaderMap::new();
        assert!(!is_form_body(&headers));
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded; charset=UTF-8"),
        );
        assert!(is_form_body(&headers));
    }
}
