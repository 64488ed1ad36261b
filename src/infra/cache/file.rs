//! File-backed persistent cache stores.
//!
//! Each named store is one JSON document `<dir>/<name>.json` mapping request
//! URLs to entries, with the name percent-encoded so it round-trips through
//! [`CacheStore::list_stores`]. The whole document is rewritten on every change, which
//! keeps each write a single-file replacement. An unreadable document is
//! logged and treated as empty; the next write replaces it.

use std::collections::HashMap;
use std::fs::{self, create_dir_all};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::core::{CacheEntry, CacheStore, QueryError};

const EXTENSION: &str = "json";

type Document = HashMap<String, CacheEntry>;

/// Directory of JSON documents, one per cache name.
#[derive(Debug)]
pub struct FileCacheStore {
    root: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    io: Mutex<()>,
}

impl FileCacheStore {
    /// Open (and create if needed) the store directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, QueryError> {
        let root = root.as_ref().to_path_buf();
        create_dir_all(&root).map_err(|e| QueryError::Cache(e.to_string()))?;
        Ok(Self {
            root,
            io: Mutex::new(()),
        })
    }

    /// Directory holding the store documents.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn document_path(&self, cache_name: &str) -> Result<PathBuf, QueryError> {
        if cache_name.is_empty() {
            return Err(QueryError::Cache("cache name must not be empty".into()));
        }
        Ok(self.root.join(format!("{}.{EXTENSION}", encode_name(cache_name))))
    }

    fn load(&self, cache_name: &str) -> Result<Document, QueryError> {
        let path = self.document_path(cache_name)?;
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Document::new()),
            Err(e) => return Err(QueryError::Cache(e.to_string())),
        };
        match serde_json::from_str(&text) {
            Ok(document) => Ok(document),
            Err(e) => {
                tracing::warn!(path = %path.display(), "corrupt cache document ignored: {}", e);
                Ok(Document::new())
            }
        }
    }

    fn save(&self, cache_name: &str, document: &Document) -> Result<(), QueryError> {
        let path = self.document_path(cache_name)?;
        let tmp = path.with_extension("json.tmp");
        let text = serde_json::to_string(document)?;
        fs::write(&tmp, text).map_err(|e| QueryError::Cache(e.to_string()))?;
        fs::rename(&tmp, &path).map_err(|e| QueryError::Cache(e.to_string()))
    }
}

impl CacheStore for FileCacheStore {
    fn read(&self, cache_name: &str, key: &str) -> Result<Option<CacheEntry>, QueryError> {
        let _guard = self.io.lock();
        Ok(self.load(cache_name)?.remove(key))
    }

    fn write(&self, cache_name: &str, key: &str, entry: &CacheEntry) -> Result<(), QueryError> {
        let _guard = self.io.lock();
        let mut document = self.load(cache_name)?;
        document.insert(key.to_string(), entry.clone());
        self.save(cache_name, &document)
    }

    fn remove(&self, cache_name: &str, key: &str) -> Result<bool, QueryError> {
        let _guard = self.io.lock();
        let mut document = self.load(cache_name)?;
        if document.remove(key).is_none() {
            return Ok(false);
        }
        self.save(cache_name, &document)?;
        Ok(true)
    }

    fn delete_store(&self, cache_name: &str) -> Result<bool, QueryError> {
        let path = self.document_path(cache_name)?;
        let _guard = self.io.lock();
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(QueryError::Cache(e.to_string())),
        }
    }

    fn list_stores(&self) -> Result<Vec<String>, QueryError> {
        let entries = fs::read_dir(&self.root).map_err(|e| QueryError::Cache(e.to_string()))?;
        let mut names = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(EXTENSION) {
                continue;
            }
            match path.file_stem().and_then(|stem| stem.to_str()).and_then(decode_name) {
                Some(name) => names.push(name),
                None => tracing::debug!(path = %path.display(), "foreign file in cache directory skipped"),
            }
        }
        Ok(names)
    }
}

/// Percent-encode every byte outside `[A-Za-z0-9_-]` so any name maps to a
/// distinct, dot-free file stem.
fn encode_name(name: &str) -> String {
    let mut encoded = String::with_capacity(name.len());
    for byte in name.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_') {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    encoded
}

fn decode_name(stem: &str) -> Option<String> {
    let bytes = stem.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = stem.get(i + 1..i + 3)?;
            decoded.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(decoded).ok().filter(|name| !name.is_empty())
}
