use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::accounts::UserRecord;
use super::{Ledger, LedgerError, SessionRecord, UserBucket};

/// On-disk layout: `{"users": {...}, "stats": {...}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreDocument {
    /// username -> credentials
    #[serde(default)]
    pub users: BTreeMap<String, UserRecord>,
    /// user id -> ledger entry
    #[serde(default)]
    pub stats: BTreeMap<String, UserBucket>,
}

/// Single JSON file holding accounts and per-user stats.
///
/// The document lives in memory behind one mutex. Every mutation runs under
/// that lock, is written to `<path>.tmp` and renamed over the store file.
pub struct JsonStore {
    path: PathBuf,
    doc: Mutex<StoreDocument>,
}

impl JsonStore {
    /// Load `path`, or start empty if it does not exist yet.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LedgerError> {
        let path = path.as_ref().to_path_buf();
        let doc = match fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => StoreDocument::default(),
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!("store {} not found, starting empty", path.display());
                StoreDocument::default()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            doc: Mutex::new(doc),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create an account and its empty bucket. Returns the user id.
    pub fn register(&self, username: &str, password: &str) -> Result<String, LedgerError> {
        self.update(|doc| {
            if doc.users.contains_key(username) {
                return Err(LedgerError::UsernameTaken(username.to_string()));
            }
            doc.users.insert(username.to_string(), UserRecord::new(password));
            doc.stats.entry(username.to_string()).or_default();
            Ok(username.to_string())
        })
    }

    /// Check credentials and make sure the user's bucket exists. Returns the user id.
    pub fn login(&self, username: &str, password: &str) -> Result<String, LedgerError> {
        {
            let doc = self.doc.lock().map_err(|_| LedgerError::Poisoned)?;
            match doc.users.get(username) {
                Some(record) if record.verify(password) => {
                    if doc.stats.contains_key(username) {
                        return Ok(username.to_string());
                    }
                }
                _ => return Err(LedgerError::AuthenticationFailed),
            }
        }
        self.update(|doc| {
            doc.stats.entry(username.to_string()).or_default();
            Ok(username.to_string())
        })
    }

    /// Run `f` on a copy of the document and commit it only if it persists.
    fn update<T>(
        &self,
        f: impl FnOnce(&mut StoreDocument) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let mut doc = self.doc.lock().map_err(|_| LedgerError::Poisoned)?;
        let mut next = doc.clone();
        let out = f(&mut next)?;
        self.persist(&next)?;
        *doc = next;
        Ok(out)
    }

    fn persist(&self, doc: &StoreDocument) -> Result<(), LedgerError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let mut tmp: OsString = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let json = serde_json::to_string_pretty(doc)?;
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl Ledger for JsonStore {
    fn record_session(
        &self,
        user_id: &str,
        count: u64,
        duration_seconds: f64,
        cadence_spm: f64,
    ) -> Result<Vec<String>, LedgerError> {
        let record = SessionRecord {
            timestamp: Utc::now(),
            count,
            duration_seconds,
            cadence_spm,
        };
        self.update(|doc| {
            let bucket = doc.stats.entry(user_id.to_string()).or_default();
            Ok(bucket.apply_session(record))
        })
    }

    fn get_bucket(&self, user_id: &str) -> Result<UserBucket, LedgerError> {
        let doc = self.doc.lock().map_err(|_| LedgerError::Poisoned)?;
        Ok(doc.stats.get(user_id).cloned().unwrap_or_default())
    }

    fn reset(&self, user_id: &str) -> Result<UserBucket, LedgerError> {
        self.update(|doc| {
            let bucket = doc.stats.entry(user_id.to_string()).or_default();
            bucket.reset();
            Ok(bucket.clone())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn temp_store() -> (tempfile::TempDir, JsonStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path().join("data.json")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_register_then_login() {
        let (_dir, store) = temp_store();
        assert_eq!(store.register("alice", "pw1").unwrap(), "alice");
        assert_eq!(store.login("alice", "pw1").unwrap(), "alice");
        assert!(matches!(
            store.login("alice", "wrong"),
            Err(LedgerError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_unknown_user_cannot_login() {
        let (_dir, store) = temp_store();
        assert!(matches!(
            store.login("nobody", "pw"),
            Err(LedgerError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let (_dir, store) = temp_store();
        store.register("alice", "pw1").unwrap();
        assert!(matches!(
            store.register("alice", "pw2"),
            Err(LedgerError::UsernameTaken(name)) if name == "alice"
        ));
        // original password still works
        assert!(store.login("alice", "pw1").is_ok());
    }

    #[test]
    fn test_register_creates_bucket() {
        let (dir, store) = temp_store();
        store.register("bob", "pw").unwrap();
        let on_disk: StoreDocument =
            serde_json::from_str(&fs::read_to_string(dir.path().join("data.json")).unwrap()).unwrap();
        assert!(on_disk.stats.contains_key("bob"));
        assert!(on_disk.users.contains_key("bob"));
    }

    #[test]
    fn test_record_and_reload() {
        let (dir, store) = temp_store();
        assert!(store.record_session("u1", 80, 40.0, 120.0).unwrap().is_empty());
        assert_eq!(
            store.record_session("u1", 30, 15.0, 120.0).unwrap(),
            vec!["初级跳绳达人"]
        );

        let reopened = JsonStore::open(dir.path().join("data.json")).unwrap();
        let bucket = reopened.get_bucket("u1").unwrap();
        assert_eq!(bucket.total_count, 110);
        assert_eq!(bucket.sessions.len(), 2);
        assert!(bucket.achievements.contains("初级跳绳达人"));
        assert!(!dir.path().join("data.json.tmp").exists());
    }

    #[test]
    fn test_reset_preserves_sessions() {
        let (_dir, store) = temp_store();
        store.record_session("u1", 550, 300.0, 110.0).unwrap();
        let before = store.get_bucket("u1").unwrap();

        let after = store.reset("u1").unwrap();
        assert_eq!(after.total_count, 0);
        assert!(after.achievements.is_empty());
        assert_eq!(after.sessions, before.sessions);
        assert_eq!(store.get_bucket("u1").unwrap(), after);
    }

    #[test]
    fn test_unknown_bucket_is_empty() {
        let (_dir, store) = temp_store();
        assert_eq!(store.get_bucket("ghost").unwrap(), UserBucket::default());
    }

    #[test]
    fn test_reads_existing_store_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        fs::write(
            &path,
            r#"{
              "users": {"alice": {"salt": "c2FsdA==", "password_hash": "x"}},
              "stats": {"alice": {"total_count": 120, "achievements": ["初级跳绳达人"],
                "sessions": [{"time": "2024-05-01T08:30:00.123456Z", "count": 120,
                              "duration_seconds": 60.0, "cadence_spm": 120.0}]}}
            }"#,
        )
        .unwrap();

        let store = JsonStore::open(&path).unwrap();
        let bucket = store.get_bucket("alice").unwrap();
        assert_eq!(bucket.total_count, 120);
        assert_eq!(bucket.sessions[0].count, 120);
    }

    #[test]
    fn test_corrupt_store_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(JsonStore::open(&path), Err(LedgerError::Json(_))));
    }

    #[test]
    fn test_concurrent_sessions_are_not_lost() {
        let (_dir, store) = temp_store();
        let store = Arc::new(store);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..10 {
                        store.record_session("shared", 1, 1.0, 60.0).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let bucket = store.get_bucket("shared").unwrap();
        assert_eq!(bucket.total_count, 80);
        assert_eq!(bucket.sessions.len(), 80);
    }
}
