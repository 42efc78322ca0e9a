//! Session backends
//!
//! The host keeps session data between requests; the core only needs to load
//! it when a request starts and hand it back when the request ends.

use std::{
    fs,
    path::{Path, PathBuf},
    time::{Duration, Instant, SystemTime},
};

use dashmap::DashMap;
use log::{debug, warn};

use super::transport::SessionData;
use crate::core::{CoreError, CoreResult};

/// Storage for session data keyed by session id
pub trait SessionBackend: Send + Sync {
    /// Load the data of session `id`, `None` if the session is unknown
    fn load(&self, id: &str) -> CoreResult<Option<SessionData>>;

    /// Persist the data of session `id`
    fn save(&self, id: &str, data: &SessionData) -> CoreResult<()>;

    /// Forget session `id`
    fn remove(&self, id: &str) -> CoreResult<()>;

    /// Drop every session idle for longer than the backend's lifetime.
    /// Returns the number of sessions removed.
    fn gc(&self) -> CoreResult<usize>;
}

/// Idle time after which a session is discarded, unless configured otherwise
pub const DEFAULT_SESSION_LIFETIME: Duration = Duration::from_secs(1440);

/// Creates a fresh random session id.
pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Session ids only ever contain ASCII alphanumerics; anything else sent by a
/// client is ignored and a new session is started.
pub fn is_valid_session_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= 128 && id.chars().all(|c| c.is_ascii_alphanumeric())
}

struct StoredSession {
    data: SessionData,
    touched: Instant,
}

/// Process-local session storage
pub struct MemorySessionBackend {
    sessions: DashMap<String, StoredSession>,
    lifetime: Duration,
}

impl Default for MemorySessionBackend {
    fn default() -> Self {
        Self::with_lifetime(DEFAULT_SESSION_LIFETIME)
    }
}

impl MemorySessionBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lifetime(lifetime: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            lifetime,
        }
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl SessionBackend for MemorySessionBackend {
    fn load(&self, id: &str) -> CoreResult<Option<SessionData>> {
        Ok(self
            .sessions
            .get(id)
            .filter(|entry| entry.touched.elapsed() < self.lifetime)
            .map(|entry| entry.data.clone()))
    }

    fn save(&self, id: &str, data: &SessionData) -> CoreResult<()> {
        self.sessions.insert(
            id.to_string(),
            StoredSession {
                data: data.clone(),
                touched: Instant::now(),
            },
        );
        Ok(())
    }

    fn remove(&self, id: &str) -> CoreResult<()> {
        self.sessions.remove(id);
        Ok(())
    }

    fn gc(&self) -> CoreResult<usize> {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, stored| stored.touched.elapsed() < self.lifetime);
        Ok(before.saturating_sub(self.sessions.len()))
    }
}

const SESSION_FILE_PREFIX: &str = "sess_";

/// Session storage as one JSON file per session in a directory.
///
/// A session's age is the modification time of its file.
pub struct FileSessionBackend {
    dir: PathBuf,
    lifetime: Duration,
}

impl FileSessionBackend {
    /// Use `dir` for session files, creating it if needed
    pub fn new(dir: impl AsRef<Path>) -> CoreResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        debug!("Session files stored in {}", dir.display());
        Ok(Self {
            dir,
            lifetime: DEFAULT_SESSION_LIFETIME,
        })
    }

    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    fn is_expired(&self, metadata: &fs::Metadata) -> bool {
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        SystemTime::now()
            .duration_since(modified)
            .unwrap_or_default()
            >= self.lifetime
    }

    fn path_for(&self, id: &str) -> CoreResult<PathBuf> {
        if !is_valid_session_id(id) {
            return Err(CoreError::Internal(format!("invalid session id '{id}'")));
        }
        Ok(self.dir.join(format!("{SESSION_FILE_PREFIX}{id}.json")))
    }
}

impl SessionBackend for FileSessionBackend {
    fn load(&self, id: &str) -> CoreResult<Option<SessionData>> {
        let path = self.path_for(id)?;
        match fs::metadata(&path) {
            Ok(metadata) if self.is_expired(&metadata) => return Ok(None),
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        }
        let raw = fs::read(&path)?;
        let data = serde_json::from_slice(&raw)
            .map_err(|e| CoreError::serialization_error("Invalid session file", e))?;
        Ok(Some(data))
    }

    fn save(&self, id: &str, data: &SessionData) -> CoreResult<()> {
        let path = self.path_for(id)?;
        let raw = serde_json::to_vec(data)
            .map_err(|e| CoreError::serialization_error("Unable to encode session", e))?;

        // Write atomically via a temp file; readers never see a partial session
        let temp_path = path.with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));
        fs::write(&temp_path, raw)?;
        if let Err(e) = fs::rename(&temp_path, &path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }
        Ok(())
    }

    fn remove(&self, id: &str) -> CoreResult<()> {
        let path = self.path_for(id)?;
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    fn gc(&self) -> CoreResult<usize> {
        let mut removed = 0;
        for entry in fs::read_dir(&self.dir)?.flatten() {
            let is_session_file = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(SESSION_FILE_PREFIX));
            if !is_session_file {
                continue;
            }
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            if !metadata.is_file() || !self.is_expired(&metadata) {
                continue;
            }
            match fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) => warn!("Unable to remove expired session file {}: {e}", entry.path().display()),
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> SessionData {
        let mut data = SessionData::new();
        data.insert("core".to_string(), json!({"system": {"token": "T1"}}));
        data
    }

    #[test]
    fn test_memory_backend_roundtrip() {
        let backend = MemorySessionBackend::new();
        assert!(backend.load("abc").unwrap().is_none());
        backend.save("abc", &sample()).unwrap();
        assert_eq!(backend.load("abc").unwrap(), Some(sample()));
        backend.remove("abc").unwrap();
        assert!(backend.is_empty());
    }

    #[test]
    fn test_file_backend_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileSessionBackend::new(dir.path().join("sessions")).unwrap();
        let id = new_session_id();
        assert!(backend.load(&id).unwrap().is_none());
        backend.save(&id, &sample()).unwrap();
        assert_eq!(backend.load(&id).unwrap(), Some(sample()));
        backend.remove(&id).unwrap();
        assert!(backend.load(&id).unwrap().is_none());
    }

    #[test]
    fn test_memory_backend_expires_idle_sessions() {
        let backend = MemorySessionBackend::with_lifetime(Duration::ZERO);
        backend.save("abc", &sample()).unwrap();
        assert!(backend.load("abc").unwrap().is_none());
        assert_eq!(backend.gc().unwrap(), 1);
        assert!(backend.is_empty());

        let backend = MemorySessionBackend::new();
        backend.save("abc", &sample()).unwrap();
        assert_eq!(backend.gc().unwrap(), 0);
        assert_eq!(backend.len(), 1);
    }

    #[test]
    fn test_file_backend_gc_removes_expired_files() {
        let dir = tempfile::tempdir().unwrap();
        let expiring = FileSessionBackend::new(dir.path())
            .unwrap()
            .with_lifetime(Duration::ZERO);
        expiring.save("abc", &sample()).unwrap();
        expiring.save("def", &sample()).unwrap();
        fs::write(dir.path().join("notes.txt"), "keep").unwrap();

        let keeping = FileSessionBackend::new(dir.path()).unwrap();
        assert_eq!(keeping.gc().unwrap(), 0);
        assert_eq!(keeping.load("abc").unwrap(), Some(sample()));

        assert!(expiring.load("abc").unwrap().is_none());
        assert_eq!(expiring.gc().unwrap(), 2);
        assert!(keeping.load("abc").unwrap().is_none());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn test_file_backend_save_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileSessionBackend::new(dir.path()).unwrap();
        backend.save("abc", &sample()).unwrap();
        backend.save("abc", &sample()).unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["sess_abc.json".to_string()]);
    }

    #[test]
    fn test_file_backend_reports_corrupt_session() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileSessionBackend::new(dir.path()).unwrap();
        fs::write(dir.path().join("sess_abc.json"), r#"{"core": {"sys"#).unwrap();
        assert!(matches!(
            backend.load("abc"),
            Err(CoreError::Serialization(_))
        ));
    }

    #[test]
    fn test_file_backend_rejects_path_like_ids() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileSessionBackend::new(dir.path()).unwrap();
        assert!(backend.load("../etc/passwd").is_err());
        assert!(!is_valid_session_id(""));
        assert!(is_valid_session_id(&new_session_id()));
    }
}
