//! Per-request session and cookie transport.
//!
//! The host environment owns the session data and the cookies; the storage
//! namespaces only read and write through these handles.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use serde_json::{Map, Value as JsonValue};

/// Raw session contents as persisted by a session backend
pub type SessionData = Map<String, JsonValue>;

/// Shared handle to the current request's session data
#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    data: Arc<Mutex<SessionData>>,
}

impl SessionHandle {
    pub fn new(data: SessionData) -> Self {
        Self {
            data: Arc::new(Mutex::new(data)),
        }
    }

    /// Run `f` with exclusive access to the session data
    pub fn with<R>(&self, f: impl FnOnce(&mut SessionData) -> R) -> R {
        f(&mut self.lock())
    }

    /// Copy of the session data, used when handing it back to the backend
    pub fn snapshot(&self) -> SessionData {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, SessionData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Lifetime attribute of an outgoing cookie
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookieExpiry {
    /// Expires `n` seconds from now
    MaxAge(u64),
    /// Already expired; instructs the client to drop the cookie
    Expired,
    /// Lives until the browser session ends
    Session,
}

/// A cookie queued for the response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    pub expiry: CookieExpiry,
    pub http_only: bool,
}

impl SetCookie {
    /// Render the `Set-Cookie` header value
    pub fn header_value(&self) -> String {
        let mut out = format!("{}={}", self.name, urlencoding::encode(&self.value));
        match self.expiry {
            CookieExpiry::MaxAge(secs) => out.push_str(&format!("; Max-Age={secs}")),
            CookieExpiry::Expired => {
                out.push_str("; Expires=Thu, 01 Jan 1970 00:00:01 GMT; Max-Age=0")
            }
            CookieExpiry::Session => {}
        }
        out.push_str("; Path=/");
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        out
    }
}

#[derive(Debug, Default)]
struct JarState {
    incoming: HashMap<String, String>,
    outgoing: Vec<SetCookie>,
}

/// Cookies sent by the client plus the ones queued for the response.
///
/// Reads only ever see what the client sent; a cookie queued during this
/// request becomes visible on the next one.
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    state: Arc<Mutex<JarState>>,
}

impl CookieJar {
    pub fn new(incoming: HashMap<String, String>) -> Self {
        Self {
            state: Arc::new(Mutex::new(JarState {
                incoming,
                outgoing: Vec::new(),
            })),
        }
    }

    /// Value of a cookie sent by the client
    pub fn get(&self, name: &str) -> Option<String> {
        self.lock().incoming.get(name).cloned()
    }

    /// Queue a cookie for the response
    pub fn queue(&self, cookie: SetCookie) {
        log::debug!("Queueing cookie {}", cookie.name);
        self.lock().outgoing.push(cookie);
    }

    /// Cookies queued so far, without draining them
    pub fn outgoing(&self) -> Vec<SetCookie> {
        self.lock().outgoing.clone()
    }

    /// Drain the queued cookies
    pub fn take_outgoing(&self) -> Vec<SetCookie> {
        std::mem::take(&mut self.lock().outgoing)
    }

    fn lock(&self) -> MutexGuard<'_, JarState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Session and cookie transport for one request
#[derive(Debug, Clone, Default)]
pub struct StorageTransport {
    pub session: SessionHandle,
    pub cookies: CookieJar,
}

impl StorageTransport {
    pub fn new(session: SessionHandle, cookies: CookieJar) -> Self {
        Self { session, cookies }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_cookie_header_value() {
        let cookie = SetCookie {
            name: "core_system_skin".to_string(),
            value: "dark mode".to_string(),
            expiry: CookieExpiry::MaxAge(604_800),
            http_only: true,
        };
        assert_eq!(
            cookie.header_value(),
            "core_system_skin=dark%20mode; Max-Age=604800; Path=/; HttpOnly"
        );
    }

    #[test]
    fn test_expired_cookie_header_value() {
        let cookie = SetCookie {
            name: "core_system_skin".to_string(),
            value: String::new(),
            expiry: CookieExpiry::Expired,
            http_only: true,
        };
        assert_eq!(
            cookie.header_value(),
            "core_system_skin=; Expires=Thu, 01 Jan 1970 00:00:01 GMT; Max-Age=0; Path=/; HttpOnly"
        );
    }

    #[test]
    fn test_jar_reads_only_incoming() {
        let jar = CookieJar::new(HashMap::from([("a".to_string(), "1".to_string())]));
        jar.queue(SetCookie {
            name: "b".to_string(),
            value: "2".to_string(),
            expiry: CookieExpiry::Session,
            http_only: false,
        });
        assert_eq!(jar.get("a").as_deref(), Some("1"));
        assert_eq!(jar.get("b"), None);
        assert_eq!(jar.take_outgoing().len(), 1);
        assert!(jar.outgoing().is_empty());
    }
}
