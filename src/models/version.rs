use crate::models::config_change::ConfigChange;
use crate::models::pack::{Loader, Modpack};
use crate::models::package::PackageRef;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A complete snapshot of an aggregate's versionable fields. Restoring from
/// a state never requires consulting any other version.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PackState {
    pub mods: BTreeSet<String>,
    pub disabled: BTreeSet<String>,
    pub locked: BTreeSet<String>,
    pub loader: Loader,
    pub game_version: String,
}

impl PackState {
    pub fn capture(pack: &Modpack) -> Self {
        Self {
            mods: pack.mods.clone(),
            disabled: pack.disabled.clone(),
            locked: pack.locked.clone(),
            loader: pack.loader.clone(),
            game_version: pack.game_version.clone(),
        }
    }

    pub fn apply_to(&self, pack: &mut Modpack) {
        pack.mods = self.mods.clone();
        pack.disabled = self.disabled.clone();
        pack.locked = self.locked.clone();
        pack.loader = self.loader.clone();
        pack.game_version = self.game_version.clone();
    }
}

/// One entry of a version's change list.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Change {
    Add {
        package_id: String,
        name: String,
        version: String,
    },
    Remove {
        package_id: String,
        name: String,
        version: String,
    },
    Update {
        package_id: String,
        name: String,
        previous_version: String,
        new_version: String,
        previous_file: String,
        new_file: String,
    },
    Enable {
        package_id: String,
        name: String,
    },
    Disable {
        package_id: String,
        name: String,
    },
    Lock {
        package_id: String,
        name: String,
    },
    Unlock {
        package_id: String,
        name: String,
    },
    LoaderChange {
        previous: String,
        new: String,
    },
    /// Synthetic marker for commits with no package-level change
    /// ("Configuration files changed", "Rollback to v3", ...).
    Note {
        text: String,
    },
}

/// Immutable once appended to a history.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Version {
    pub id: String,
    pub tag: String,
    pub message: String,
    pub created_at: u64,
    #[serde(default)]
    pub parent: Option<String>,
    pub state: PackState,
    #[serde(default)]
    pub changes: Vec<Change>,
    #[serde(default)]
    pub package_refs: Vec<PackageRef>,
    #[serde(default)]
    pub config_snapshot: Option<String>,
    #[serde(default)]
    pub config_changes: Vec<ConfigChange>,
}

/// Append-only version list per modpack plus the current pointer.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct VersionHistory {
    pub modpack_id: String,
    #[serde(default)]
    pub current: Option<String>,
    #[serde(default)]
    pub versions: Vec<Version>,
}

impl VersionHistory {
    pub fn new(modpack_id: impl Into<String>) -> Self {
        Self {
            modpack_id: modpack_id.into(),
            current: None,
            versions: Vec::new(),
        }
    }

    pub fn get(&self, version_id: &str) -> Option<&Version> {
        self.versions.iter().find(|v| v.id == version_id)
    }

    pub fn current_version(&self) -> Option<&Version> {
        self.current.as_deref().and_then(|id| self.get(id))
    }

    pub fn next_id(&self) -> String {
        format!("v{}", self.versions.len() + 1)
    }
}
