use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// A structured key change recorded by the external configuration editor.
/// The core never parses or rewrites configuration syntax; it only reads
/// these records and marks them committed.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ConfigChange {
    pub id: String,
    pub file_path: Utf8PathBuf,
    pub key_path: String,
    #[serde(default)]
    pub old_value: Option<String>,
    #[serde(default)]
    pub new_value: Option<String>,
    pub timestamp: u64,
    #[serde(default)]
    pub committed: bool,
}

/// Per-modpack journal document holding the editor's records.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ConfigJournal {
    pub modpack_id: String,
    #[serde(default)]
    pub changes: Vec<ConfigChange>,
}

impl ConfigJournal {
    pub fn new(modpack_id: impl Into<String>) -> Self {
        Self {
            modpack_id: modpack_id.into(),
            changes: Vec::new(),
        }
    }

    pub fn uncommitted(&self) -> Vec<ConfigChange> {
        self.changes.iter().filter(|c| !c.committed).cloned().collect()
    }

    pub fn has_uncommitted(&self) -> bool {
        self.changes.iter().any(|c| !c.committed)
    }

    pub fn mark_committed(&mut self, ids: &[String]) {
        for change in &mut self.changes {
            if ids.iter().any(|id| *id == change.id) {
                change.committed = true;
            }
        }
    }

    pub fn discard_uncommitted(&mut self) {
        self.changes.retain(|c| c.committed);
    }
}
