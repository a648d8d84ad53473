// ABOUTME: XDG-compliant storage layer with atomic writes and quotas
// ABOUTME: Key-value stores plus the document library persisted through them

use crate::model::{Document, UNTITLED};
use crate::node::{rendered_text, RichNode};
use crate::util::title_from_text;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const DOCUMENTS_KEY: &str = "focus_documents";
pub const CURRENT_KEY: &str = "focus_current_document";

pub struct Paths {
    pub data_dir: PathBuf,
    pub store_dir: PathBuf,
    pub exports_dir: PathBuf,
    pub tmp_dir: PathBuf,
}

impl Paths {
    pub fn new(data_dir_override: Option<PathBuf>) -> Result<Self> {
        let data_dir = if let Some(dir) = data_dir_override {
            dir
        } else {
            ProjectDirs::from("", "", "focusmd")
                .ok_or_else(|| {
                    Error::Filesystem(std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "Could not determine data directory",
                    ))
                })?
                .data_dir()
                .to_path_buf()
        };

        Ok(Paths {
            store_dir: data_dir.join("store"),
            exports_dir: data_dir.join("exports"),
            tmp_dir: data_dir.join("tmp"),
            data_dir,
        })
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in &[&self.store_dir, &self.exports_dir, &self.tmp_dir] {
            fs::create_dir_all(dir)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let perms = fs::Permissions::from_mode(0o700);
                fs::set_permissions(dir, perms)?;
            }
        }
        Ok(())
    }
}

pub fn write_atomic(path: &Path, content: &[u8], tmp_dir: &Path) -> Result<()> {
    use rand::Rng;

    let random: u32 = rand::thread_rng().gen();
    let tmp_path = tmp_dir.join(format!(".{:x}.part", random));

    fs::write(&tmp_path, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o600);
        fs::set_permissions(&tmp_path, perms)?;
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }

    Ok(())
}

/// String key-value persistence with an optional byte quota.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`. Fails with [`Error::QuotaExceeded`] without
    /// touching the previous value when the store would grow past its quota.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    fn remove(&mut self, key: &str) -> Result<()>;
}

fn check_quota(quota: Option<u64>, used_by_others: u64, needed: u64) -> Result<()> {
    if let Some(quota) = quota {
        let available = quota.saturating_sub(used_by_others);
        if needed > available {
            return Err(Error::QuotaExceeded { needed, available });
        }
    }
    Ok(())
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
    quota: Option<u64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota: u64) -> Self {
        MemoryStore {
            entries: BTreeMap::new(),
            quota: Some(quota),
        }
    }

    pub fn used_bytes(&self) -> u64 {
        self.entries.values().map(|v| v.len() as u64).sum()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let existing = self.entries.get(key).map_or(0, |v| v.len() as u64);
        check_quota(self.quota, self.used_bytes() - existing, value.len() as u64)?;
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One file per key under the store directory.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    tmp_dir: PathBuf,
    quota: Option<u64>,
}

impl FileStore {
    pub fn open(paths: &Paths, quota: Option<u64>) -> Result<Self> {
        paths.ensure_dirs()?;
        Ok(FileStore {
            dir: paths.store_dir.clone(),
            tmp_dir: paths.tmp_dir.clone(),
            quota,
        })
    }

    fn key_path(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(Error::Filesystem(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Invalid store key: {:?}", key),
            )));
        }
        Ok(self.dir.join(key))
    }

    fn used_bytes_except(&self, path: &Path) -> Result<u64> {
        let mut used = 0;
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.path() == path {
                continue;
            }
            let meta = entry.metadata()?;
            if meta.is_file() {
                used += meta.len();
            }
        }
        Ok(used)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.key_path(key)?;
        if self.quota.is_some() {
            let used = self.used_bytes_except(&path)?;
            check_quota(self.quota, used, value.len() as u64)?;
        }
        write_atomic(&path, value.as_bytes(), &self.tmp_dir)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.key_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Documents keyed by id, plus the id of the document being edited.
pub struct Library<S> {
    store: S,
    documents: BTreeMap<String, Document>,
    current: Option<String>,
}

impl<S: KeyValueStore> Library<S> {
    pub fn open(store: S) -> Result<Self> {
        let documents: BTreeMap<String, Document> = match store.get(DOCUMENTS_KEY)? {
            Some(json) => serde_json::from_str(&json)?,
            None => BTreeMap::new(),
        };

        let current = store
            .get(CURRENT_KEY)?
            .filter(|id| documents.contains_key(id));

        tracing::debug!(
            documents = documents.len(),
            current = ?current,
            "opened document library"
        );

        Ok(Library {
            store,
            documents,
            current,
        })
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn get(&self, id: &str) -> Result<&Document> {
        self.documents
            .get(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// Newest `updated` first.
    pub fn list(&self) -> Vec<&Document> {
        let mut docs: Vec<&Document> = self.documents.values().collect();
        docs.sort_by(|a, b| b.updated.cmp(&a.updated).then_with(|| b.id.cmp(&a.id)));
        docs
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Creates an empty untitled document and makes it current.
    pub fn create_document(&mut self, now: DateTime<Utc>) -> Result<String> {
        self.add_document(UNTITLED, Vec::new(), now)
    }

    /// Stores a new document with the given title and content and makes it
    /// current.
    pub fn add_document(
        &mut self,
        title: &str,
        content: Vec<RichNode>,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let id = self.fresh_id(now);
        let mut doc = Document::new(id.clone(), now);
        doc.title = if title.trim().is_empty() {
            UNTITLED.to_string()
        } else {
            title.to_string()
        };
        doc.content = content;

        self.commit(|docs| {
            docs.insert(id.clone(), doc);
            Ok(())
        })?;
        self.set_current(&id)?;

        tracing::debug!(id = %id, "created document");
        Ok(id)
    }

    fn fresh_id(&self, now: DateTime<Utc>) -> String {
        let base = format!("doc_{}", now.timestamp_millis());
        if !self.documents.contains_key(&base) {
            return base;
        }
        (2..)
            .map(|n| format!("{}_{}", base, n))
            .find(|id| !self.documents.contains_key(id))
            .unwrap_or(base)
    }

    /// Replaces a document's content. The title follows the first line of
    /// its text.
    pub fn save_content(
        &mut self,
        id: &str,
        content: Vec<RichNode>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let title = title_from_text(&rendered_text(&content));
        self.commit(|docs| {
            let doc = docs
                .get_mut(id)
                .ok_or_else(|| Error::NotFound(id.to_string()))?;
            doc.title = title;
            doc.content = content;
            doc.updated = now;
            Ok(())
        })?;
        tracing::debug!(id, "saved document");
        Ok(())
    }

    pub fn rename(&mut self, id: &str, title: &str) -> Result<()> {
        let title = match title.trim() {
            "" => UNTITLED.to_string(),
            t => t.to_string(),
        };
        self.commit(|docs| {
            let doc = docs
                .get_mut(id)
                .ok_or_else(|| Error::NotFound(id.to_string()))?;
            doc.title = title;
            Ok(())
        })
    }

    /// Deletes a document. Deleting the current document opens a fresh one.
    pub fn delete(&mut self, id: &str, now: DateTime<Utc>) -> Result<()> {
        self.commit(|docs| {
            docs.remove(id)
                .map(|_| ())
                .ok_or_else(|| Error::NotFound(id.to_string()))
        })?;
        tracing::debug!(id, "deleted document");

        if self.current.as_deref() == Some(id) {
            self.current = None;
            self.store.remove(CURRENT_KEY)?;
            self.create_document(now)?;
        }
        Ok(())
    }

    pub fn set_current(&mut self, id: &str) -> Result<()> {
        if !self.documents.contains_key(id) {
            return Err(Error::NotFound(id.to_string()));
        }
        self.store.set(CURRENT_KEY, id)?;
        self.current = Some(id.to_string());
        Ok(())
    }

    /// The current document id, creating a document when there is none.
    pub fn ensure_current(&mut self, now: DateTime<Utc>) -> Result<String> {
        match &self.current {
            Some(id) => Ok(id.clone()),
            None => self.create_document(now),
        }
    }

    fn commit<F>(&mut self, change: F) -> Result<()>
    where
        F: FnOnce(&mut BTreeMap<String, Document>) -> Result<()>,
    {
        let mut next = self.documents.clone();
        change(&mut next)?;

        let json = serde_json::to_string(&next)?;
        if let Err(e) = self.store.set(DOCUMENTS_KEY, &json) {
            tracing::warn!(error = %e, "failed to persist documents, keeping previous state");
            return Err(e);
        }

        self.documents = next;
        Ok(())
    }
}


#[cfg(test)]
mod store_tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_quota_keeps_previous_value() {
        let mut store = MemoryStore::with_quota(8);
        store.set("k", "12345").unwrap();
        store.set("k", "12345678").unwrap();

        let err = store.set("k", "123456789").unwrap_err();
        assert!(matches!(
            err,
            Error::QuotaExceeded {
                needed: 9,
                available: 8
            }
        ));
        assert_eq!(store.get("k").unwrap().as_deref(), Some("12345678"));
    }

    #[test]
    fn test_memory_store_quota_counts_other_keys() {
        let mut store = MemoryStore::with_quota(10);
        store.set("a", "123456").unwrap();
        assert!(store.set("b", "12345").is_err());
        store.remove("a").unwrap();
        store.set("b", "12345").unwrap();
    }

    #[test]
    fn test_file_store_roundtrip() {
        let temp = TempDir::new().unwrap();
        let paths = Paths::new(Some(temp.path().to_path_buf())).unwrap();
        let mut store = FileStore::open(&paths, None).unwrap();

        assert_eq!(store.get("focus_documents").unwrap(), None);
        store.set("focus_documents", "{}").unwrap();
        assert_eq!(store.get("focus_documents").unwrap().as_deref(), Some("{}"));
        assert!(paths.store_dir.join("focus_documents").exists());

        store.remove("focus_documents").unwrap();
        store.remove("focus_documents").unwrap();
        assert_eq!(store.get("focus_documents").unwrap(), None);
    }

    #[test]
    fn test_file_store_rejects_path_keys() {
        let temp = TempDir::new().unwrap();
        let paths = Paths::new(Some(temp.path().to_path_buf())).unwrap();
        let mut store = FileStore::open(&paths, None).unwrap();
        assert!(store.set("../escape", "x").is_err());
        assert!(store.get("").is_err());
    }

    #[test]
    fn test_file_store_quota() {
        let temp = TempDir::new().unwrap();
        let paths = Paths::new(Some(temp.path().to_path_buf())).unwrap();
        let mut store = FileStore::open(&paths, Some(6)).unwrap();

        store.set("a", "1234").unwrap();
        let err = store.set("b", "123").unwrap_err();
        assert_eq!(err.exit_code(), 7);
        assert_eq!(store.get("b").unwrap(), None);
        store.set("a", "123456").unwrap();
    }
}
