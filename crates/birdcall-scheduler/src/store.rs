//! Schedule persistence — whole-document load/save.
//!
//! The file is rewritten in full on every mutation. O(n) per change, but the
//! document stays trivially inspectable and a write can never leave one
//! record half-serialized. Expected cardinality is tens of posts, not
//! millions.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use birdcall_core::{BirdcallError, Result};

use crate::post::ScheduledPost;

/// Repository boundary between the engine and its backing storage.
pub trait ScheduleStore: Send + Sync {
    /// The whole persisted collection; empty when nothing exists yet or the
    /// backing state is unreadable (availability over strict durability).
    fn load(&self) -> Vec<ScheduledPost>;

    /// Atomically replace the persisted collection.
    fn save(&self, posts: &[ScheduledPost]) -> Result<()>;
}

/// On-disk document shape: one top-level field holding the ordered list.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ScheduleFile {
    schedules: Vec<ScheduledPost>,
}

/// File-backed store — `schedules.json` under a data directory.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Create a store rooted at `dir`, creating the directory if needed.
    pub fn new(dir: &Path) -> Self {
        std::fs::create_dir_all(dir).ok();
        Self {
            path: dir.join("schedules.json"),
        }
    }
}

impl ScheduleStore for JsonFileStore {
    fn load(&self) -> Vec<ScheduledPost> {
        if !self.path.exists() {
            return Vec::new();
        }
        match std::fs::read_to_string(&self.path) {
            Ok(json) => match serde_json::from_str::<ScheduleFile>(&json) {
                Ok(file) => file.schedules,
                Err(e) => {
                    tracing::warn!("⚠️ Failed to parse {}: {e}", self.path.display());
                    Vec::new()
                }
            },
            Err(e) => {
                tracing::warn!("⚠️ Failed to read {}: {e}", self.path.display());
                Vec::new()
            }
        }
    }

    fn save(&self, posts: &[ScheduledPost]) -> Result<()> {
        let file = ScheduleFile {
            schedules: posts.to_vec(),
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| BirdcallError::Persistence(format!("Serialize error: {e}")))?;
        // Write whole document to a sibling temp file, then rename over the
        // old one — a crash mid-write leaves the previous file intact.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)
            .map_err(|e| BirdcallError::Persistence(format!("Write error: {e}")))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| BirdcallError::Persistence(format!("Rename error: {e}")))?;
        tracing::debug!("💾 Saved {} schedules to {}", posts.len(), self.path.display());
        Ok(())
    }
}

/// In-memory store. Backs the engine tests and doubles as proof that the
/// engine's behavior holds against any `ScheduleStore` implementation.
#[derive(Default)]
pub struct MemoryStore {
    posts: Mutex<Vec<ScheduledPost>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScheduleStore for MemoryStore {
    fn load(&self) -> Vec<ScheduledPost> {
        self.posts.lock().expect("store poisoned").clone()
    }

    fn save(&self, posts: &[ScheduledPost]) -> Result<()> {
        *self.posts.lock().expect("store poisoned") = posts.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(name: &str) -> (PathBuf, JsonFileStore) {
        let dir = std::env::temp_dir().join(name);
        std::fs::remove_dir_all(&dir).ok();
        let store = JsonFileStore::new(&dir);
        (dir, store)
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let (dir, store) = temp_store("birdcall-test-empty");
        assert!(store.load().is_empty());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_round_trip() {
        let (dir, store) = temp_store("birdcall-test-roundtrip");
        let posts = vec![
            ScheduledPost::new("first", "0 9 * * *", false),
            ScheduledPost::new("second", "*/30 * * * *", true),
        ];
        store.save(&posts).unwrap();
        let loaded = store.load();
        assert_eq!(loaded, posts);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_document_is_pretty_printed_with_top_level_field() {
        let (dir, store) = temp_store("birdcall-test-pretty");
        store
            .save(&[ScheduledPost::new("hello", "0 9 * * *", false)])
            .unwrap();
        let raw = std::fs::read_to_string(dir.join("schedules.json")).unwrap();
        assert!(raw.starts_with("{\n  \"schedules\": ["));
        assert!(raw.contains("\n      \"cronExpression\""));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_corrupt_file_degrades_to_empty() {
        let (dir, store) = temp_store("birdcall-test-corrupt");
        std::fs::write(dir.join("schedules.json"), "{not json").unwrap();
        assert!(store.load().is_empty());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_save_replaces_previous_document() {
        let (dir, store) = temp_store("birdcall-test-replace");
        store
            .save(&[ScheduledPost::new("old", "0 9 * * *", false)])
            .unwrap();
        store.save(&[]).unwrap();
        assert!(store.load().is_empty());
        std::fs::remove_dir_all(&dir).ok();
    }
}
