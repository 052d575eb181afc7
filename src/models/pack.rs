use crate::models::package::PackageRef;
use camino::Utf8PathBuf;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Display, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoaderKind {
    #[display("forge")]
    Forge,
    #[display("neoforge")]
    NeoForge,
    #[display("fabric")]
    Fabric,
    #[display("quilt")]
    Quilt,
    #[display("unknown")]
    Unknown,
}

#[derive(Display, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[display("{kind} {version}")]
pub struct Loader {
    pub kind: LoaderKind,
    pub version: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RemoteSource {
    pub url: String,
    #[serde(default)]
    pub last_checked: Option<u64>,
}

/// The mutable head state of one bundle. `disabled` and `locked` are always
/// subsets of `mods`; every membership operation maintains that in a single
/// document write.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Modpack {
    pub id: String,
    pub name: String,
    pub loader: Loader,
    pub game_version: String,
    /// Mirror of the current version tag. History is the source of truth;
    /// a crash between the history and pack writes leaves this stale.
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub mods: BTreeSet<String>,
    #[serde(default)]
    pub disabled: BTreeSet<String>,
    #[serde(default)]
    pub locked: BTreeSet<String>,
    #[serde(default)]
    pub remote: Option<RemoteSource>,
    #[serde(default)]
    pub incompatible: Vec<PackageRef>,
    #[serde(default)]
    pub overlay_dir: Option<Utf8PathBuf>,
}
