//! JSON-file persistence for user profiles.
//!
//! All users share one table file keyed by `user_id`. Every write rewrites
//! the whole table, so writes are serialized through a lock held across the
//! read, the merge and the rename.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use serde_json::{json, Map, Value};
use tracing::{debug, error, warn};

use crate::error::{ErrorCode, ZhimiError, ZhimiResult};

use super::merge::deep_merge;
use super::profile::{StructuredInfo, UserProfile};

type Table = Map<String, Value>;

/// Store for the persisted memory table.
pub struct UserMemoryStorage {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl UserMemoryStorage {
    /// Open the store at `path`, creating its parent directory.
    ///
    /// The table file itself is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> ZhimiResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load one user's profile.
    ///
    /// Missing files, unknown users and unreadable records all yield an empty
    /// profile.
    pub fn load_memory(&self, user_id: &str) -> UserProfile {
        let table = match self.read_table() {
            Ok(Some(table)) => table,
            Ok(None) => return UserProfile::new(user_id),
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "Failed to load memory table, using defaults");
                return UserProfile::new(user_id);
            }
        };

        match table.get(user_id) {
            None => UserProfile::new(user_id),
            Some(record) => UserProfile::from_value(user_id, record).unwrap_or_else(|| {
                warn!(user_id, "Memory record is not an object, using defaults");
                UserProfile::new(user_id)
            }),
        }
    }

    /// Merge extracted information into a user's profile.
    pub fn update_memory(&self, user_id: &str, info: &StructuredInfo) -> bool {
        self.update_memory_value(user_id, &Value::Object(info.to_object()))
    }

    /// Merge an arbitrary JSON object into a user's profile.
    ///
    /// Returns `false` when `updates` is not an object or the table cannot be
    /// written.
    pub fn update_memory_value(&self, user_id: &str, updates: &Value) -> bool {
        let Some(updates) = updates.as_object() else {
            warn!(user_id, "Memory update is not a JSON object");
            return false;
        };

        let result = self.modify(|table| {
            let record = table
                .entry(user_id.to_string())
                .or_insert_with(|| default_record(user_id));
            if !record.is_object() {
                *record = default_record(user_id);
            }
            if let Value::Object(record) = record {
                deep_merge(record, updates);
                record.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));
            }
        });

        match result {
            Ok(()) => {
                debug!(user_id, "Memory updated");
                true
            }
            Err(e) => {
                error!(user_id, error = %e, "Failed to save memory");
                false
            }
        }
    }

    /// Reset a user's profile to empty defaults; the entry itself stays.
    pub fn clear_memory(&self, user_id: &str) -> bool {
        let result = self.modify(|table| {
            table.insert(user_id.to_string(), default_record(user_id));
        });

        match result {
            Ok(()) => true,
            Err(e) => {
                error!(user_id, error = %e, "Failed to clear memory");
                false
            }
        }
    }

    /// Users present in the table.
    pub fn user_ids(&self) -> Vec<String> {
        match self.read_table() {
            Ok(Some(table)) => table.keys().cloned().collect(),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "Failed to read memory table");
                Vec::new()
            }
        }
    }

    /// Read-modify-write the whole table under the write lock.
    fn modify(&self, apply: impl FnOnce(&mut Table)) -> ZhimiResult<()> {
        let _guard = self.lock();
        let mut table = self.table_for_write()?;
        apply(&mut table);
        self.write_table(&table)
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        // The guarded value is (), so a poisoned lock carries no bad state.
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// `Ok(None)` when the file does not exist yet.
    fn read_table(&self) -> ZhimiResult<Option<Table>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ZhimiError::read_failed(
                    format!("cannot read {}", self.path.display()),
                    e,
                ))
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(table)) => Ok(Some(table)),
            Ok(_) => Err(ZhimiError::corrupted("memory table is not a JSON object")),
            Err(e) => Err(ZhimiError::corrupted(format!("invalid memory table: {}", e))),
        }
    }

    /// Current table for a write; a corrupt file is moved aside first.
    fn table_for_write(&self) -> ZhimiResult<Table> {
        match self.read_table() {
            Ok(Some(table)) => Ok(table),
            Ok(None) => Ok(Table::new()),
            Err(e) if e.code() == ErrorCode::MemCorrupted => {
                let backup = self.sibling(&format!(
                    "corrupt-{}",
                    Utc::now().format("%Y%m%dT%H%M%S%.3fZ")
                ));
                fs::rename(&self.path, &backup)?;
                warn!(
                    error = %e,
                    backup = %backup.display(),
                    "Memory table was corrupt, moved aside and starting fresh"
                );
                Ok(Table::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Write to `<file>.tmp`, fsync, then rename over the table.
    fn write_table(&self, table: &Table) -> ZhimiResult<()> {
        let tmp = self.sibling("tmp");
        {
            let mut file = File::create(&tmp)?;
            serde_json::to_writer_pretty(&mut file, table)?;
            file.write_all(b"\n")?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".");
        name.push(suffix);
        self.path.with_file_name(name)
    }
}

fn default_record(user_id: &str) -> Value {
    json!({
        "user_id": user_id,
        "preferences": {
            "programming_languages": [],
            "tools": [],
            "topics": []
        },
        "background": {
            "profession": "",
            "experience": "",
            "projects": []
        },
        "updated_at": Utc::now().to_rfc3339()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn storage() -> (TempDir, UserMemoryStorage) {
        let dir = TempDir::new().unwrap();
        let storage = UserMemoryStorage::new(dir.path().join("memory/user_memory.json")).unwrap();
        (dir, storage)
    }

    fn go_engineer() -> StructuredInfo {
        let mut info = StructuredInfo::default();
        info.preferences.programming_languages = vec!["Go".to_string()];
        info.background.profession = "后端工程师".to_string();
        info
    }

    #[test]
    fn test_new_creates_parent_directory() {
        let (dir, storage) = storage();
        assert!(dir.path().join("memory").is_dir());
        assert!(!storage.path().exists());
    }

    #[test]
    fn test_load_missing_user_is_default() {
        let (_dir, storage) = storage();
        let profile = storage.load_memory("nobody");
        assert_eq!(profile.user_id, "nobody");
        assert!(!profile.has_info());
    }

    #[test]
    fn test_update_then_load() {
        let (_dir, storage) = storage();
        assert!(storage.update_memory("u1", &go_engineer()));

        let profile = storage.load_memory("u1");
        assert_eq!(profile.preferences.programming_languages, vec!["Go"]);
        assert_eq!(profile.background.profession, "后端工程师");
    }

    #[test]
    fn test_file_is_pretty_utf8() {
        let (_dir, storage) = storage();
        storage.update_memory("u1", &go_engineer());

        let raw = fs::read_to_string(storage.path()).unwrap();
        assert!(raw.contains("后端工程师"));
        assert!(!raw.contains("\\u"));
        assert!(raw.contains("\n  \"u1\": {"));
        assert!(!storage.sibling("tmp").exists());
    }

    #[test]
    fn test_updates_merge_incrementally() {
        let (_dir, storage) = storage();
        let mut first = StructuredInfo::default();
        first.preferences.programming_languages = vec!["Go".into(), "Rust".into()];
        first.background.profession = "Engineer".into();
        storage.update_memory("u1", &first);

        let mut second = StructuredInfo::default();
        second.preferences.programming_languages = vec!["Python".into(), "Go".into()];
        storage.update_memory("u1", &second);

        let profile = storage.load_memory("u1");
        assert_eq!(
            profile.preferences.programming_languages,
            vec!["Go", "Rust", "Python"]
        );
        assert_eq!(profile.background.profession, "Engineer");
    }

    #[test]
    fn test_users_are_independent() {
        let (_dir, storage) = storage();
        storage.update_memory("alice", &go_engineer());
        assert!(storage.clear_memory("bob"));

        let mut ids = storage.user_ids();
        ids.sort();
        assert_eq!(ids, vec!["alice", "bob"]);
        assert!(storage.load_memory("alice").has_info());
        assert!(!storage.load_memory("bob").has_info());
    }

    #[test]
    fn test_clear_keeps_entry() {
        let (_dir, storage) = storage();
        storage.update_memory("u1", &go_engineer());
        assert!(storage.clear_memory("u1"));

        assert_eq!(storage.user_ids(), vec!["u1"]);
        assert!(!storage.load_memory("u1").has_info());
    }

    #[test]
    fn test_corrupt_file_loads_default_and_is_backed_up_on_write() {
        let (dir, storage) = storage();
        fs::write(storage.path(), "{ not json").unwrap();

        assert!(!storage.load_memory("u1").has_info());
        assert!(storage.update_memory("u1", &go_engineer()));
        assert!(storage.load_memory("u1").has_info());

        let backups: Vec<_> = fs::read_dir(dir.path().join("memory"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".corrupt-"))
            .collect();
        assert_eq!(backups.len(), 1);
        assert_eq!(fs::read_to_string(backups[0].path()).unwrap(), "{ not json");
    }

    #[test]
    fn test_non_object_update_is_rejected() {
        let (_dir, storage) = storage();
        assert!(!storage.update_memory_value("u1", &json!(["Go"])));
        assert!(!storage.path().exists());
    }

    #[test]
    fn test_write_failure_returns_false() {
        let dir = TempDir::new().unwrap();
        // The table path is a directory, so the final rename fails.
        let path = dir.path().join("table.json");
        fs::create_dir_all(path.join("occupied")).unwrap();
        let storage = UserMemoryStorage::new(&path).unwrap();

        assert!(!storage.update_memory("u1", &go_engineer()));
        assert!(!storage.clear_memory("u1"));
    }

    #[test]
    fn test_unreadable_table_is_not_treated_as_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("table.json");
        fs::create_dir_all(&path).unwrap();
        let storage = UserMemoryStorage::new(&path).unwrap();

        let err = storage.read_table().unwrap_err();
        assert_eq!(err.code(), ErrorCode::MemReadFailed);

        assert!(!storage.update_memory("u1", &go_engineer()));
        // Nothing was moved aside: only corrupt content is backed up.
        let backups = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".corrupt-"))
            .count();
        assert_eq!(backups, 0);
        assert!(path.is_dir());
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let (_dir, storage) = storage();
        let storage = Arc::new(storage);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let storage = storage.clone();
                std::thread::spawn(move || {
                    let mut info = StructuredInfo::default();
                    info.preferences.topics = vec![format!("topic-{}", i)];
                    storage.update_memory(&format!("user-{}", i), &info)
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert_eq!(storage.user_ids().len(), 8);
    }
}
