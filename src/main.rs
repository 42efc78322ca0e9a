//! CGI entry point: the web server hands over one request through the
//! environment and stdin, the response goes back on stdout.

use std::{
    env,
    io::{self, Read, Write},
    path::PathBuf,
    process::ExitCode,
};

use bytes::Bytes;
use clap::Parser;
use http::{Request, Response};

use pagecore::{
    adapters::ConfigAdapter,
    core::{CoreError, CoreResult, ErrorContext},
    demo,
    logging::{init_logger, LogConfig},
    orchestration::Application,
    utils::response::reason_phrase,
};

/// Serve one CGI request
#[derive(Parser, Debug)]
#[command(name = "pagecore")]
#[command(about = "Serve one CGI request through pagecore", long_about = None)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, env = "PAGECORE_CONFIG", default_value = "conf/pagecore.yaml")]
    config: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_adapter = match ConfigAdapter::load(&cli.config) {
        Ok(config_adapter) => config_adapter,
        Err(e) => {
            // no logger yet
            eprintln!("pagecore: failed to load {}: {e}", cli.config.display());
            let _ = write_response(&mut io::stdout().lock(), &startup_failure());
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logger(&LogConfig::from(config_adapter.config().as_ref())) {
        eprintln!("pagecore: {e}");
    }

    let app = match Application::from_config_adapter(config_adapter, demo::catalog()) {
        Ok(app) => app,
        Err(e) => {
            log::error!("Unable to start: {e}");
            let _ = write_response(&mut io::stdout().lock(), &startup_failure());
            return ExitCode::FAILURE;
        }
    };

    let request = match read_request(env::vars(), io::stdin().lock()) {
        Ok(request) => request,
        Err(e) => {
            log::error!("Unable to read CGI request: {e}");
            let _ = write_response(&mut io::stdout().lock(), &startup_failure());
            return ExitCode::FAILURE;
        }
    };

    let response = app.handle(request);
    match write_response(&mut io::stdout().lock(), &response) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("Unable to write CGI response: {e}");
            ExitCode::FAILURE
        }
    }
}

fn startup_failure() -> Response<Vec<u8>> {
    pagecore::utils::response::ResponseBuilder::error_http(
        http::StatusCode::INTERNAL_SERVER_ERROR,
        "Internal Server Error",
    )
}

/// Build the request from CGI meta-variables and the body on `stdin`
fn read_request(
    vars: impl Iterator<Item = (String, String)>,
    mut stdin: impl Read,
) -> CoreResult<Request<Bytes>> {
    let mut method = "GET".to_string();
    let mut path = "/".to_string();
    let mut query = String::new();
    let mut content_length = 0usize;
    let mut builder = Request::builder();

    for (key, value) in vars {
        match key.as_str() {
            "REQUEST_METHOD" => method = value,
            "PATH_INFO" if !value.is_empty() => path = value,
            "QUERY_STRING" => query = value,
            "CONTENT_TYPE" if !value.is_empty() => {
                builder = builder.header(http::header::CONTENT_TYPE, value);
            }
            "CONTENT_LENGTH" => content_length = value.trim().parse().unwrap_or(0),
            _ => {
                if let Some(name) = key.strip_prefix("HTTP_") {
                    builder = builder.header(name.replace('_', "-").to_ascii_lowercase(), value);
                }
            }
        }
    }

    // the declared length is client input; read at most that much
    let mut body = Vec::new();
    stdin
        .take(content_length as u64)
        .read_to_end(&mut body)?;

    let uri = if query.is_empty() {
        path
    } else {
        format!("{path}?{query}")
    };
    builder
        .method(method.as_str())
        .uri(uri)
        .body(Bytes::from(body))
        .with_context("Invalid CGI request")
}

/// Emit a CGI response: `Status` line, headers, blank line, body
fn write_response(out: &mut impl Write, response: &Response<Vec<u8>>) -> Result<(), CoreError> {
    write!(
        out,
        "Status: {} {}\r\n",
        response.status().as_u16(),
        reason_phrase(response)
    )?;
    for (name, value) in response.headers() {
        out.write_all(name.as_str().as_bytes())?;
        out.write_all(b": ")?;
        out.write_all(value.as_bytes())?;
        out.write_all(b"\r\n")?;
    }
    out.write_all(b"\r\n")?;
    out.write_all(response.body())?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Iterator<Item = (String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn test_read_request() {
        let env = vars(&[
            ("REQUEST_METHOD", "POST"),
            ("PATH_INFO", "/api/echo/1"),
            ("QUERY_STRING", "a=b"),
            ("CONTENT_TYPE", "application/x-www-form-urlencoded"),
            ("CONTENT_LENGTH", "5"),
            ("HTTP_X_HTTP_METHOD", "PUT"),
            ("HTTP_COOKIE", "CORESESSID=abc"),
        ]);
        let req = read_request(env, &b"token=ignored"[..]).unwrap();

        assert_eq!(req.method(), http::Method::POST);
        assert_eq!(req.uri(), "/api/echo/1?a=b");
        assert_eq!(req.headers().get("x-http-method").unwrap(), "PUT");
        assert_eq!(req.headers().get("cookie").unwrap(), "CORESESSID=abc");
        assert_eq!(req.body().as_ref(), b"token");
    }

    #[test]
    fn test_read_request_with_oversized_content_length() {
        let env = vars(&[
            ("REQUEST_METHOD", "POST"),
            ("CONTENT_LENGTH", "99999999999999999"),
        ]);
        let req = read_request(env, &b"x"[..]).unwrap();
        assert_eq!(req.body().as_ref(), b"x");
    }

    #[test]
    fn test_read_request_defaults() {
        let req = read_request(vars(&[]), io::empty()).unwrap();
        assert_eq!(req.method(), http::Method::GET);
        assert_eq!(req.uri(), "/");
        assert!(req.body().is_empty());
    }

    #[test]
    fn test_write_response() {
        let response = pagecore::api::envelope(404, &serde_json::json!("No Endpoint: widgets"));
        let mut out = Vec::new();
        write_response(&mut out, &response).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("Status: 404 Not Found\r\n"), "{text}");
        assert!(text.contains("content-type: application/json\r\n"));
        assert!(text.ends_with("\r\n\r\n\"No Endpoint: widgets\""));
    }
}
