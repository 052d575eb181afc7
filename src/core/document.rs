use crate::models::error::PackError;
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Generic JSON document store: one aggregate per file. Writes go through a
/// uniquely named temp file and an atomic rename, so a reader never observes
/// a half-written document, and saves against the same path serialize
/// through a per-path mutex while different paths proceed independently.
pub struct DocumentStore {
    root: Utf8PathBuf,
    locks: Mutex<HashMap<Utf8PathBuf, Arc<Mutex<()>>>>,
}

impl DocumentStore {
    pub fn open(root: impl Into<Utf8PathBuf>) -> Result<Self, PackError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;

        Ok(Self {
            root,
            locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Resolves a store-relative path. Absolute paths and anything that
    /// could climb out of the root are rejected here, once, instead of in
    /// every caller.
    pub fn resolve(&self, rel: &Utf8Path) -> Result<Utf8PathBuf, PackError> {
        if rel.is_absolute() {
            return Err(PackError::InvalidPath(rel.to_string()));
        }

        for component in rel.components() {
            match component {
                Utf8Component::Normal(_) => {}
                _ => return Err(PackError::InvalidPath(rel.to_string())),
            }
        }

        Ok(self.root.join(rel))
    }

    fn lock_for(&self, path: &Utf8Path) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .entry(path.to_owned())
            .or_default()
            .clone()
    }

    pub fn exists(&self, rel: &Utf8Path) -> bool {
        self.resolve(rel).map(|p| p.exists()).unwrap_or(false)
    }

    /// A missing document is a `None`, not an error.
    pub fn load<T: DeserializeOwned>(&self, rel: &Utf8Path) -> Result<Option<T>, PackError> {
        let path = self.resolve(rel)?;

        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    pub fn save<T: Serialize>(&self, rel: &Utf8Path, document: &T) -> Result<(), PackError> {
        let path = self.resolve(rel)?;
        let lock = self.lock_for(&path);
        // Scoped acquisition: the guard drops on every exit path, so a
        // failed write never wedges the queue.
        let _guard = lock.lock();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let raw = serde_json::to_string_pretty(document)?;

        // Unique temp name in the destination directory keeps the rename on
        // one filesystem.
        let tmp = path.with_file_name(format!(
            ".{}.{}.tmp",
            path.file_name().unwrap_or("document"),
            uuid::Uuid::new_v4()
        ));
        std::fs::write(&tmp, raw)?;

        if let Err(e) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }

        debug!("saved document {rel}");
        Ok(())
    }

    pub fn delete(&self, rel: &Utf8Path) -> Result<(), PackError> {
        let path = self.resolve(rel)?;
        let lock = self.lock_for(&path);
        let _guard = lock.lock();

        if path.exists() {
            std::fs::remove_file(&path)?;
        }

        Ok(())
    }

    pub fn delete_tree(&self, rel: &Utf8Path) -> Result<(), PackError> {
        let path = self.resolve(rel)?;

        if path.exists() {
            std::fs::remove_dir_all(&path)?;
        }

        Ok(())
    }
}
