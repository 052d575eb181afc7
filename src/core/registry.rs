use crate::config::global::GlobalConfig;
use crate::core::document::DocumentStore;
use crate::core::library::LibraryDoc;
use crate::core::reconcile::ReconcileReport;
use crate::models::config_change::ConfigJournal;
use crate::models::error::PackError;
use crate::models::pack::Modpack;
use crate::models::paths::StorePaths;
use crate::models::version::VersionHistory;
use camino::Utf8PathBuf;
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::error;

/// Explicit per-session context: the document store, the store layout, the
/// loaded global configuration, and the pending-update map. Passed into
/// every operation instead of living in a process-wide static.
pub struct PackContext {
    pub store: DocumentStore,
    /// Store-relative layout, fed to the document store.
    pub paths: StorePaths,
    /// Absolute counterparts for direct tree access (snapshots).
    pub abs: StorePaths,
    pub config: GlobalConfig,
    pending_updates: Mutex<HashMap<String, ReconcileReport>>,
}

impl PackContext {
    pub fn open(root: impl Into<Utf8PathBuf>, config: GlobalConfig) -> Result<Self, PackError> {
        let store = DocumentStore::open(root)?;
        let abs = StorePaths::new(store.root());

        Ok(Self {
            store,
            paths: StorePaths::default(),
            abs,
            config,
            pending_updates: Mutex::new(HashMap::new()),
        })
    }

    pub fn load_library(&self) -> Result<LibraryDoc, PackError> {
        Ok(self.store.load(&self.paths.library)?.unwrap_or_default())
    }

    pub fn save_library(&self, library: &LibraryDoc) -> Result<(), PackError> {
        self.store.save(&self.paths.library, library)
    }

    pub fn pack_exists(&self, pack_id: &str) -> bool {
        self.store.exists(&self.paths.pack_doc(pack_id))
    }

    pub fn load_pack(&self, pack_id: &str) -> Result<Modpack, PackError> {
        self.store
            .load(&self.paths.pack_doc(pack_id))?
            .ok_or_else(|| PackError::PackNotFound(pack_id.to_string()))
    }

    pub fn save_pack(&self, pack: &Modpack) -> Result<(), PackError> {
        self.store.save(&self.paths.pack_doc(&pack.id), pack)
    }

    /// All readable pack aggregates. Unreadable documents are logged and
    /// skipped, never propagated.
    pub fn list_packs(&self) -> Result<Vec<Modpack>, PackError> {
        if !self.abs.packs.exists() {
            return Ok(Vec::new());
        }

        let mut packs = Vec::new();
        for entry in std::fs::read_dir(&self.abs.packs)? {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            let Some(pack_id) = name.strip_suffix(".json") else {
                continue;
            };

            match self.load_pack(pack_id) {
                Ok(pack) => packs.push(pack),
                Err(e) => error!("skipping unreadable modpack document {name}: {e}"),
            }
        }

        Ok(packs)
    }

    pub fn load_history(&self, pack_id: &str) -> Result<Option<VersionHistory>, PackError> {
        self.store.load(&self.paths.history_doc(pack_id))
    }

    pub fn save_history(&self, history: &VersionHistory) -> Result<(), PackError> {
        self.store
            .save(&self.paths.history_doc(&history.modpack_id), history)
    }

    pub fn load_journal(&self, pack_id: &str) -> Result<ConfigJournal, PackError> {
        Ok(self
            .store
            .load(&self.paths.journal_doc(pack_id))?
            .unwrap_or_else(|| ConfigJournal::new(pack_id)))
    }

    pub fn save_journal(&self, journal: &ConfigJournal) -> Result<(), PackError> {
        self.store
            .save(&self.paths.journal_doc(&journal.modpack_id), journal)
    }

    pub fn snapshot_root(&self, pack_id: &str) -> Utf8PathBuf {
        self.abs.snapshot_root(pack_id)
    }

    /// Deletes a modpack and everything hanging off it: aggregate, version
    /// history, config journal, snapshot subtree, pending update.
    pub fn delete_pack(&self, pack_id: &str) -> Result<(), PackError> {
        if !self.pack_exists(pack_id) {
            return Err(PackError::PackNotFound(pack_id.to_string()));
        }

        self.store.delete(&self.paths.pack_doc(pack_id))?;
        self.store.delete(&self.paths.history_doc(pack_id))?;
        self.store.delete(&self.paths.journal_doc(pack_id))?;
        self.store.delete_tree(&self.paths.snapshot_root(pack_id))?;
        self.pending_updates.lock().remove(pack_id);

        Ok(())
    }

    pub fn park_pending_update(&self, pack_id: impl Into<String>, report: ReconcileReport) {
        self.pending_updates.lock().insert(pack_id.into(), report);
    }

    pub fn take_pending_update(&self, pack_id: &str) -> Option<ReconcileReport> {
        self.pending_updates.lock().remove(pack_id)
    }
}
