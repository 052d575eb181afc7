use crate::core::registry::PackContext;
use crate::models::error::PackError;
use crate::models::pack::LoaderKind;
use crate::models::package::{DependencyRef, Package, PackageIdentity};
use crate::utils::time::get_unix_timestamp;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// The shared, deduplicated package library. One document for the whole
/// store, keyed by the identity-derived internal id.
#[derive(Serialize, Deserialize, Default, Clone, Debug)]
pub struct LibraryDoc {
    pub packages: BTreeMap<String, Package>,
}

impl LibraryDoc {
    pub fn get(&self, package_id: &str) -> Option<&Package> {
        self.packages.get(package_id)
    }

    pub fn resolve(&self, identity: &PackageIdentity) -> Option<&Package> {
        self.packages.get(&identity.stable_id())
    }
}

/// Everything needed to create a library entry. Identity is the only
/// required part; the rest is catalog metadata.
#[derive(Clone, Debug)]
pub struct LibraryEntry {
    pub identity: PackageIdentity,
    pub name: String,
    pub version: String,
    pub loader: Option<LoaderKind>,
    pub game_version: Option<String>,
    pub dependencies: Vec<DependencyRef>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub file_name: Option<String>,
    pub size: Option<u64>,
    pub published_at: Option<u64>,
}

impl LibraryEntry {
    pub fn new(identity: PackageIdentity, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            identity,
            name: name.into(),
            version: version.into(),
            loader: None,
            game_version: None,
            dependencies: Vec::new(),
            author: None,
            description: None,
            thumbnail_url: None,
            file_name: None,
            size: None,
            published_at: None,
        }
    }

    fn into_package(self, added_at: u64) -> Package {
        Package {
            id: self.identity.stable_id(),
            identity: self.identity,
            name: self.name,
            version: self.version,
            loader: self.loader,
            game_version: self.game_version,
            dependencies: self.dependencies,
            author: self.author,
            description: self.description,
            thumbnail_url: self.thumbnail_url,
            file_name: self.file_name,
            size: self.size,
            published_at: self.published_at,
            added_at,
        }
    }
}

/// Non-identity metadata refresh. Identity fields are untouchable.
#[derive(Clone, Debug, Default)]
pub struct MetadataPatch {
    pub name: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
}

/// Creates every entry whose identity is not yet known, returning the
/// library's package for each input in order. Existing entries are never
/// overwritten, and all creations land in a single store write.
pub fn upsert_batch(ctx: &PackContext, entries: Vec<LibraryEntry>) -> Result<Vec<Package>, PackError> {
    let mut library = ctx.load_library()?;
    let mut out = Vec::with_capacity(entries.len());
    let mut created = 0usize;

    for entry in entries {
        let id = entry.identity.stable_id();

        if let Some(existing) = library.packages.get(&id) {
            out.push(existing.clone());
            continue;
        }

        let package = entry.into_package(get_unix_timestamp());
        library.packages.insert(id, package.clone());
        out.push(package);
        created += 1;
    }

    if created > 0 {
        ctx.save_library(&library)?;
        debug!("library gained {created} packages");
    }

    Ok(out)
}

pub fn refresh_metadata(
    ctx: &PackContext,
    package_id: &str,
    patch: MetadataPatch,
) -> Result<Package, PackError> {
    let mut library = ctx.load_library()?;

    let package = library
        .packages
        .get_mut(package_id)
        .ok_or_else(|| PackError::PackageNotFound(package_id.to_string()))?;

    if let Some(name) = patch.name {
        package.name = name;
    }
    if let Some(author) = patch.author {
        package.author = Some(author);
    }
    if let Some(description) = patch.description {
        package.description = Some(description);
    }
    if let Some(thumbnail_url) = patch.thumbnail_url {
        package.thumbnail_url = Some(thumbnail_url);
    }

    let updated = package.clone();
    ctx.save_library(&library)?;
    Ok(updated)
}

/// Deletes a library entry and prunes its id from every modpack that
/// references it. Each affected pack loses the id from `mods`, `disabled`
/// and `locked` in one document write. Returns the affected pack ids.
pub fn delete_package(ctx: &PackContext, package_id: &str) -> Result<Vec<String>, PackError> {
    let mut library = ctx.load_library()?;

    if library.packages.remove(package_id).is_none() {
        return Err(PackError::PackageNotFound(package_id.to_string()));
    }

    ctx.save_library(&library)?;

    let mut affected = Vec::new();
    for mut pack in ctx.list_packs()? {
        let in_mods = pack.mods.remove(package_id);
        let in_disabled = pack.disabled.remove(package_id);
        let in_locked = pack.locked.remove(package_id);

        if in_mods || in_disabled || in_locked {
            ctx.save_pack(&pack)?;
            affected.push(pack.id);
        }
    }

    info!("deleted package {package_id}, pruned from {} packs", affected.len());
    Ok(affected)
}
