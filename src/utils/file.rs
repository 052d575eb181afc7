use crate::models::error::PackError;
use camino::{Utf8Path, Utf8PathBuf};
use std::time::UNIX_EPOCH;
use walkdir::WalkDir;

pub struct FileUtils;

impl FileUtils {
    /// Recursively copies a directory tree from source to destination,
    /// skipping everything under `exclude`. Creates all necessary
    /// directories and overwrites existing files.
    pub fn copy_recursive(
        src: &Utf8Path,
        dst: &Utf8Path,
        exclude: Option<&Utf8Path>,
    ) -> Result<(), PackError> {
        std::fs::create_dir_all(dst)?;

        for entry in WalkDir::new(src).into_iter().filter_map(|e| e.ok()) {
            let src_path = Utf8Path::from_path(entry.path()).ok_or_else(|| {
                PackError::ParseError(format!("Invalid UTF-8 path: {:?}", entry.path()))
            })?;

            if exclude.is_some_and(|ex| src_path.starts_with(ex)) {
                continue;
            }

            let rel_path = src_path.strip_prefix(src)?;
            let dst_path = dst.join(rel_path);

            if entry.file_type().is_dir() {
                std::fs::create_dir_all(&dst_path)?;
            } else {
                if let Some(parent) = dst_path.parent() {
                    if !parent.exists() {
                        std::fs::create_dir_all(parent)?;
                    }
                }
                std::fs::copy(src_path, &dst_path)?;
            }
        }

        Ok(())
    }

    /// Removes every entry inside `dir` without removing `dir` itself,
    /// leaving anything under `exclude` in place.
    pub fn clear_dir(dir: &Utf8Path, exclude: Option<&Utf8Path>) -> Result<(), PackError> {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = Utf8PathBuf::from_path_buf(entry.path())
                .map_err(|p| PackError::ParseError(format!("Invalid UTF-8 path: {:?}", p)))?;

            if exclude.is_some_and(|ex| path.starts_with(ex)) {
                continue;
            }

            if path.is_dir() {
                std::fs::remove_dir_all(&path)?;
            } else {
                std::fs::remove_file(&path)?;
            }
        }

        Ok(())
    }

    /// Collects `(relative path, size, mtime seconds)` for every file under
    /// `root`, sorted deterministically. The basis of the overlay
    /// fingerprint.
    pub fn stat_entries(
        root: &Utf8Path,
        exclude: Option<&Utf8Path>,
    ) -> Result<Vec<(Utf8PathBuf, u64, u64)>, PackError> {
        let mut entries = Vec::new();

        for entry in WalkDir::new(root) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = Utf8Path::from_path(entry.path()).ok_or_else(|| {
                PackError::ParseError(format!("Invalid UTF-8 path: {:?}", entry.path()))
            })?;

            if exclude.is_some_and(|ex| path.starts_with(ex)) {
                continue;
            }

            let meta = entry.metadata()?;
            let mtime = meta
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs())
                .unwrap_or(0);

            entries.push((path.strip_prefix(root)?.to_owned(), meta.len(), mtime));
        }

        entries.sort();
        Ok(entries)
    }
}
