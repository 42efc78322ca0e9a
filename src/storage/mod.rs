//! Namespaced session and cookie storage
//!
//! Every subsystem gets its own owner name, so two stores never observe each
//! other's entries: session entries live under
//! `session[session_index][owner][id]`, cookies are named
//! `{prefix}_{owner}_{id}`.

pub mod backend;
pub mod transport;

use serde_json::{Map, Value as JsonValue};

pub use backend::{FileSessionBackend, MemorySessionBackend, SessionBackend};
pub use transport::{CookieExpiry, CookieJar, SessionData, SessionHandle, SetCookie, StorageTransport};

/// Cookie lifetime for values written through [`CookieStorage`]: one week
pub const COOKIE_LIFETIME_SECS: u64 = 3600 * 24 * 7;

/// Contract shared by every storage namespace.
///
/// Missing keys are not errors: `get` returns `None` and `delete` is a no-op.
pub trait NamespacedStore {
    type Value;

    /// Store `value` under `id`
    fn set(&self, id: &str, value: Self::Value);

    /// Fetch the value stored under `id`
    fn get(&self, id: &str) -> Option<Self::Value>;

    /// Remove the value stored under `id`
    fn delete(&self, id: &str);
}

fn empty_map() -> JsonValue {
    JsonValue::Object(Map::new())
}

/// Turns `slot` into an empty map unless it already is one. Returns whether it
/// had to be replaced.
fn ensure_map(slot: &mut JsonValue) -> bool {
    if slot.is_object() {
        false
    } else {
        *slot = empty_map();
        true
    }
}

/// Walks `session[index][name]`, creating missing levels. The flag is true
/// when the namespace itself had to be created.
fn ensure_namespace<'a>(
    data: &'a mut SessionData,
    index: &str,
    name: &str,
) -> (bool, Option<&'a mut Map<String, JsonValue>>) {
    let index_slot = data.entry(index.to_string()).or_insert_with(empty_map);
    if ensure_map(index_slot) {
        log::debug!("Initialised session index '{index}'");
    }
    let Some(owners) = index_slot.as_object_mut() else {
        return (false, None);
    };
    let slot = owners.entry(name.to_string()).or_insert(JsonValue::Null);
    let created = ensure_map(slot);
    (created, slot.as_object_mut())
}

/// Session-backed namespace
#[derive(Debug, Clone)]
pub struct SessionStorage {
    session: SessionHandle,
    session_index: String,
    session_name: String,
    name: String,
    just_created: bool,
}

impl SessionStorage {
    /// Attach to the `name` namespace, creating the session index and the
    /// namespace map when they do not exist yet.
    pub fn open(session: SessionHandle, session_index: &str, session_name: &str, name: &str) -> Self {
        let just_created =
            session.with(|data| ensure_namespace(data, session_index, name).0);

        if just_created {
            log::debug!("Created session namespace '{session_index}.{name}'");
        }

        Self {
            session,
            session_index: session_index.to_string(),
            session_name: session_name.to_string(),
            name: name.to_string(),
            just_created,
        }
    }

    /// True only on the request that created this namespace
    pub fn just_created(&self) -> bool {
        self.just_created
    }

    /// Owner name of the namespace
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Transport name of the session this namespace lives in
    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    /// Remove the whole namespace from the session
    pub fn destroy_storage(&self) {
        self.session.with(|data| {
            if let Some(JsonValue::Object(owners)) = data.get_mut(&self.session_index) {
                owners.remove(&self.name);
            }
        });
    }

    /// Snapshot of every entry in the namespace
    pub fn values(&self) -> Map<String, JsonValue> {
        self.session.with(|data| {
            self.namespace(data).cloned().unwrap_or_default()
        })
    }

    fn namespace<'a>(&self, data: &'a SessionData) -> Option<&'a Map<String, JsonValue>> {
        data.get(&self.session_index)?
            .as_object()?
            .get(&self.name)?
            .as_object()
    }
}

impl NamespacedStore for SessionStorage {
    type Value = JsonValue;

    fn set(&self, id: &str, value: JsonValue) {
        self.session.with(|data| {
            if let (_, Some(entries)) = ensure_namespace(data, &self.session_index, &self.name) {
                entries.insert(id.to_string(), value);
            }
        });
    }

    fn get(&self, id: &str) -> Option<JsonValue> {
        self.session.with(|data| {
            self.namespace(data)
                .and_then(|entries| entries.get(id))
                .filter(|value| !value.is_null())
                .cloned()
        })
    }

    fn delete(&self, id: &str) {
        self.session.with(|data| {
            if let Some(JsonValue::Object(owners)) = data.get_mut(&self.session_index) {
                if let Some(JsonValue::Object(entries)) = owners.get_mut(&self.name) {
                    entries.remove(id);
                }
            }
        });
    }
}

/// Cookie-backed namespace
#[derive(Debug, Clone)]
pub struct CookieStorage {
    jar: CookieJar,
    prefix: String,
    name: String,
}

impl CookieStorage {
    pub fn new(jar: CookieJar, prefix: &str, name: &str) -> Self {
        Self {
            jar,
            prefix: prefix.to_string(),
            name: name.to_string(),
        }
    }

    /// Full cookie name for an entry: `{prefix}_{owner}_{id}`
    pub fn cookie_name(&self, id: &str) -> String {
        format!("{}_{}_{}", self.prefix, self.name, id)
    }
}

impl NamespacedStore for CookieStorage {
    type Value = String;

    fn set(&self, id: &str, value: String) {
        self.jar.queue(SetCookie {
            name: self.cookie_name(id),
            value,
            expiry: CookieExpiry::MaxAge(COOKIE_LIFETIME_SECS),
            http_only: true,
        });
    }

    fn get(&self, id: &str) -> Option<String> {
        self.jar.get(&self.cookie_name(id))
    }

    /// Cookies cannot be removed out-of-band; the client is told to expire it.
    /// Nothing is sent when the client did not send the cookie.
    fn delete(&self, id: &str) {
        let name = self.cookie_name(id);
        if self.jar.get(&name).is_none() {
            return;
        }
        self.jar.queue(SetCookie {
            name,
            value: String::new(),
            expiry: CookieExpiry::Expired,
            http_only: true,
        });
    }
}
