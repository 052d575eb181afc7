use camino::Utf8PathBuf;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

const APP_NAME: &str = "pack_keeper";

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct GlobalConfig {
    /// Root directory of the document store. Defaults to the platform data
    /// dir when unset.
    pub data_root: Option<Utf8PathBuf>,
    /// Timeout handed to the remote manifest collaborator.
    pub fetch_timeout_secs: u64,
    /// Chunk size for batch catalog resolutions.
    pub resolve_batch_size: usize,
    /// Switches the overlay fingerprint from stat-based to content hashing.
    /// Slower, but catches edits that preserve size and mtime.
    pub verify_snapshot_contents: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            data_root: None,
            fetch_timeout_secs: 30,
            resolve_batch_size: 20,
            verify_snapshot_contents: false,
        }
    }
}

impl GlobalConfig {
    /// Resolves the effective store root: explicit override, then the
    /// platform data dir, then the current directory.
    pub fn effective_data_root(&self) -> Utf8PathBuf {
        if let Some(root) = &self.data_root {
            return root.clone();
        }

        ProjectDirs::from("com", "martes", APP_NAME)
            .and_then(|dirs| Utf8PathBuf::from_path_buf(dirs.data_dir().to_path_buf()).ok())
            .unwrap_or_else(|| Utf8PathBuf::from("."))
    }
}

pub fn load_config() -> GlobalConfig {
    confy::load(APP_NAME, "config").unwrap_or_default()
}

pub fn save_config(config: GlobalConfig) {
    let _ = confy::store(APP_NAME, "config", config);
}
