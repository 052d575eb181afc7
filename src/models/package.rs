use crate::models::pack::LoaderKind;
use crate::utils::id::stable_id;
use derive_more::Display;
use serde::{Deserialize, Serialize};

#[derive(Display, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum PackageSource {
    #[display("curseforge")]
    #[serde(rename = "curseforge")]
    CurseForge,
    #[display("modrinth")]
    Modrinth,
}

/// The composite identity of a package. The `(source, project_id)` pair is
/// stable across file updates of the same logical package; `file_id` changes
/// with every published file.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PackageIdentity {
    pub source: PackageSource,
    pub project_id: String,
    pub file_id: String,
}

impl PackageIdentity {
    pub fn new(
        source: PackageSource,
        project_id: impl Into<String>,
        file_id: impl Into<String>,
    ) -> Self {
        Self {
            source,
            project_id: project_id.into(),
            file_id: file_id.into(),
        }
    }

    /// Internal library id. The same identity tuple always hashes to the
    /// same id, so the library can never hold two entries for one tuple.
    pub fn stable_id(&self) -> String {
        stable_id(&[&self.source.to_string(), &self.project_id, &self.file_id])
    }

    /// Identity of the logical project, ignoring the concrete file.
    pub fn project_key(&self) -> String {
        format!("{}:{}", self.source, self.project_id)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    Required,
    Optional,
    Other,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DependencyRef {
    pub project_id: String,
    pub kind: DependencyKind,
}

/// A library entry. Identity fields never change after creation; the
/// remaining metadata may be refreshed from the catalog.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Package {
    pub id: String,
    pub identity: PackageIdentity,
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub loader: Option<LoaderKind>,
    #[serde(default)]
    pub game_version: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<DependencyRef>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub published_at: Option<u64>,
    pub added_at: u64,
}

impl Package {
    pub fn to_ref(&self) -> PackageRef {
        PackageRef {
            id: self.id.clone(),
            identity: self.identity.clone(),
            name: self.name.clone(),
            version: self.version.clone(),
        }
    }
}

/// Identity snapshot embedded in versions. Enough to display and re-resolve
/// a package even after it has been deleted from the library.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PackageRef {
    pub id: String,
    pub identity: PackageIdentity,
    pub name: String,
    pub version: String,
}

impl PackageRef {
    pub fn project_key(&self) -> String {
        self.identity.project_key()
    }
}
