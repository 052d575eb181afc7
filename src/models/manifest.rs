use crate::models::error::PackError;
use crate::models::pack::{Loader, LoaderKind};
use crate::models::package::{PackageIdentity, PackageSource};
use crate::models::version::Version;
use crate::utils::id::stable_id;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

pub const MANIFEST_FORMAT: u32 = 2;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ManifestEntry {
    pub source: PackageSource,
    pub project_id: String,
    pub file_id: String,
    pub name: String,
    pub version: String,
}

impl ManifestEntry {
    pub fn identity(&self) -> PackageIdentity {
        PackageIdentity::new(self.source, self.project_id.clone(), self.file_id.clone())
    }

    pub fn project_key(&self) -> String {
        format!("{}:{}", self.source, self.project_id)
    }
}

/// The canonical published shape. `disabled` and `locked` carry project
/// keys, never internal package ids, so toggles survive file updates and
/// reimports.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SharedManifest {
    pub format: u32,
    pub id: String,
    pub name: String,
    pub loader: Loader,
    pub game_version: String,
    #[serde(default)]
    pub mods: Vec<ManifestEntry>,
    #[serde(default)]
    pub disabled: Vec<String>,
    #[serde(default)]
    pub locked: Vec<String>,
    #[serde(default)]
    pub history: Option<Vec<Version>>,
}

impl SharedManifest {
    pub fn validate(&self) -> Result<(), PackError> {
        if self.name.trim().is_empty() {
            return Err(PackError::InvalidManifest("name is empty".into()));
        }
        for (i, entry) in self.mods.iter().enumerate() {
            if entry.project_id.trim().is_empty() {
                return Err(PackError::InvalidManifest(format!(
                    "mods[{i}].project_id is empty"
                )));
            }
            if entry.file_id.trim().is_empty() {
                return Err(PackError::InvalidManifest(format!(
                    "mods[{i}].file_id is empty"
                )));
            }
        }
        Ok(())
    }
}

/// Legacy object shape: no format marker, `disabled_mods` keyed by internal
/// package id instead of project identity.
#[derive(Deserialize, Clone, Debug)]
pub struct LegacyManifest {
    pub name: String,
    #[serde(default)]
    pub loader: Option<Loader>,
    #[serde(default)]
    pub game_version: Option<String>,
    #[serde(default)]
    pub mods: Vec<ManifestEntry>,
    #[serde(default)]
    pub disabled_mods: Vec<String>,
}

/// Every manifest shape this crate has ever published. Parsed once at the
/// boundary and normalized into [`SharedManifest`]; nothing downstream
/// branches on shape.
#[derive(Clone, Debug)]
pub enum ManifestDocument {
    Modern(SharedManifest),
    LegacyObject(LegacyManifest),
    LegacyList(Vec<ManifestEntry>),
}

impl ManifestDocument {
    pub fn parse(raw: &str) -> Result<Self, PackError> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| PackError::ParseError(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, PackError> {
        match &value {
            Value::Array(_) => serde_json::from_value(value)
                .map(Self::LegacyList)
                .map_err(|e| PackError::InvalidManifest(e.to_string())),
            Value::Object(map) if map.contains_key("format") => serde_json::from_value(value)
                .map(Self::Modern)
                .map_err(|e| PackError::InvalidManifest(e.to_string())),
            Value::Object(_) => serde_json::from_value(value)
                .map(Self::LegacyObject)
                .map_err(|e| PackError::InvalidManifest(e.to_string())),
            _ => Err(PackError::InvalidManifest(
                "expected an object or an array at the top level".into(),
            )),
        }
    }

    pub fn normalize(self) -> Result<SharedManifest, PackError> {
        let manifest = match self {
            Self::Modern(manifest) => {
                if manifest.format > MANIFEST_FORMAT {
                    return Err(PackError::InvalidManifest(format!(
                        "unsupported manifest format {}",
                        manifest.format
                    )));
                }
                manifest
            }
            Self::LegacyObject(legacy) => migrate_legacy_object(legacy),
            Self::LegacyList(entries) => migrate_legacy_list(entries),
        };

        manifest.validate()?;
        Ok(manifest)
    }
}

fn migrate_legacy_object(legacy: LegacyManifest) -> SharedManifest {
    // Old publishes keyed the disabled list by internal package id. Rekey to
    // project identity; ids that no longer match any entry are dropped.
    let disabled = legacy
        .disabled_mods
        .iter()
        .filter_map(|id| {
            let found = legacy
                .mods
                .iter()
                .find(|e| e.identity().stable_id() == *id || e.name == *id);
            if found.is_none() {
                warn!("dropping unmatched legacy disabled entry: {id}");
            }
            found.map(ManifestEntry::project_key)
        })
        .collect();

    SharedManifest {
        format: MANIFEST_FORMAT,
        id: stable_id(&["legacy", &legacy.name]),
        name: legacy.name,
        loader: legacy.loader.unwrap_or(Loader {
            kind: LoaderKind::Unknown,
            version: String::new(),
        }),
        game_version: legacy.game_version.unwrap_or_default(),
        mods: legacy.mods,
        disabled,
        locked: Vec::new(),
        history: None,
    }
}

fn migrate_legacy_list(entries: Vec<ManifestEntry>) -> SharedManifest {
    // The oldest shape was a bare entry array with no metadata at all. The
    // id is derived from the entry identities so reimports stay stable.
    let keys: Vec<String> = entries.iter().map(ManifestEntry::project_key).collect();
    let mut parts: Vec<&str> = vec!["legacy-list"];
    parts.extend(keys.iter().map(String::as_str));

    SharedManifest {
        format: MANIFEST_FORMAT,
        id: stable_id(&parts),
        name: "Imported modpack".into(),
        loader: Loader {
            kind: LoaderKind::Unknown,
            version: String::new(),
        },
        game_version: String::new(),
        mods: entries,
        disabled: Vec::new(),
        locked: Vec::new(),
        history: None,
    }
}
