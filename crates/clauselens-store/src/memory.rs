//! Append-only memory log, one JSON file per contract id.
//!
//! Each file holds a JSON array of [`MemoryRecord`]s and is rewritten whole on
//! every append through a temp file in the same directory followed by an atomic
//! rename. Appends to the same contract are serialized by a per-id async mutex;
//! different contracts never contend. A mutex is dropped from the table once no
//! append holds or waits on it.
//!
//! A log that no longer parses is never overwritten: the next append renames it
//! to `<id>.json.corrupt` and starts a new log.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use clauselens_core::model::MemoryRecord;

use crate::error::StoreError;

pub struct MemoryStore {
    dir: PathBuf,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl MemoryStore {
    /// Store rooted at `dir`. The directory is created on first append.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            locks: DashMap::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the log for `contract_id`. Ids that could escape the directory
    /// are rejected.
    pub fn path_for(&self, contract_id: &str) -> Result<PathBuf, StoreError> {
        let valid = !contract_id.is_empty()
            && contract_id != "."
            && contract_id != ".."
            && contract_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !valid {
            return Err(StoreError::InvalidId(contract_id.to_string()));
        }
        Ok(self.dir.join(format!("{contract_id}.json")))
    }

    fn lock_for(&self, contract_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(contract_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// All records for `contract_id`, oldest first.
    ///
    /// A missing file is an empty log. A file that does not parse is logged and
    /// read as empty; it is left in place.
    pub async fn load(&self, contract_id: &str) -> Result<Vec<MemoryRecord>, StoreError> {
        let path = self.path_for(contract_id)?;
        Ok(read_records(&path).await?.unwrap_or_default())
    }

    /// Append one record and return the new record count.
    pub async fn append(&self, contract_id: &str, record: MemoryRecord) -> Result<usize, StoreError> {
        let path = self.path_for(contract_id)?;
        let lock = self.lock_for(contract_id);
        let _guard = lock.lock().await;

        let mut records = match read_records(&path).await? {
            Some(records) => records,
            None => {
                set_aside(&path).await?;
                Vec::new()
            }
        };
        records.push(record);
        let count = records.len();
        let bytes = serde_json::to_vec_pretty(&records)?;

        let dir = self.dir.clone();
        let target = path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&dir, &target, &bytes))
            .await
            .map_err(|e| StoreError::Other(format!("memory write task failed: {e}")))??;

        info!(contract_id, records = count, path = %path.display(), "appended memory record");

        // Map entry plus this call's clone: nobody else holds or waits on it.
        self.locks.remove_if(contract_id, |_, l| Arc::strong_count(l) <= 2);
        Ok(count)
    }
}

/// Records in the log at `path`; `None` when the file exists but does not parse.
async fn read_records(path: &Path) -> Result<Option<Vec<MemoryRecord>>, StoreError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no memory log yet");
            return Ok(Some(Vec::new()));
        }
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    match serde_json::from_slice::<Vec<MemoryRecord>>(&bytes) {
        Ok(records) => Ok(Some(records)),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "unreadable memory log");
            Ok(None)
        }
    }
}

/// Rename an unreadable log to `<name>.corrupt`.
async fn set_aside(path: &Path) -> Result<PathBuf, StoreError> {
    let mut name = path.as_os_str().to_owned();
    name.push(".corrupt");
    let aside = PathBuf::from(name);
    tokio::fs::rename(path, &aside)
        .await
        .map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    warn!(path = %path.display(), aside = %aside.display(), "moved unreadable memory log aside");
    Ok(aside)
}

fn write_atomic(dir: &Path, target: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: target.to_path_buf(),
        source,
    };
    std::fs::create_dir_all(dir).map_err(io_err)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(bytes).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(target).map_err(|e| io_err(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(question: &str) -> MemoryRecord {
        MemoryRecord {
            kind: "final".into(),
            timestamp: Utc::now(),
            question: question.into(),
            question_embedding: vec![0.6, 0.8],
            final_json: serde_json::json!({ "no_evidence": false }),
        }
    }

    #[tokio::test]
    async fn missing_log_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new(dir.path());
        assert!(store.load("uploaded_abc").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn append_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new(dir.path().join("memory"));
        assert_eq!(store.append("uploaded_abc", record("first")).await.unwrap(), 1);
        assert_eq!(store.append("uploaded_abc", record("second")).await.unwrap(), 2);

        let records = store.load("uploaded_abc").await.unwrap();
        let questions: Vec<&str> = records.iter().map(|r| r.question.as_str()).collect();
        assert_eq!(questions, vec!["first", "second"]);
        assert_eq!(records[0].kind, "final");
    }

    #[tokio::test]
    async fn file_is_json_array_with_type_field() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new(dir.path());
        store.append("c1", record("q")).await.unwrap();

        let raw = std::fs::read_to_string(dir.path().join("c1.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 1);
        assert_eq!(value[0]["type"], "final");
    }

    #[tokio::test]
    async fn corrupt_log_is_kept_aside_on_append() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("c1.json"), "{not json").unwrap();
        let store = MemoryStore::new(dir.path());

        assert!(store.load("c1").await.unwrap().is_empty());
        assert_eq!(std::fs::read_to_string(dir.path().join("c1.json")).unwrap(), "{not json");

        assert_eq!(store.append("c1", record("q")).await.unwrap(), 1);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("c1.json.corrupt")).unwrap(),
            "{not json"
        );
        assert_eq!(store.load("c1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn idle_locks_are_released() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new(dir.path());
        for id in ["a", "b", "c"] {
            store.append(id, record("q")).await.unwrap();
        }
        assert!(store.locks.is_empty());
    }

    #[tokio::test]
    async fn rejects_path_like_ids() {
        let store = MemoryStore::new("/tmp");
        for id in ["", "..", "../etc/passwd", "a/b", "a b"] {
            assert!(matches!(store.load(id).await, Err(StoreError::InvalidId(_))), "{id:?}");
        }
    }

    #[tokio::test]
    async fn concurrent_appends_are_serialized() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new(dir.path()));

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.append("shared", record(&format!("q{i}"))).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let records = store.load("shared").await.unwrap();
        assert_eq!(records.len(), 16);
    }
}
