use crate::core::library::LibraryDoc;
use crate::core::registry::PackContext;
use crate::models::config_change::ConfigChange;
use crate::models::error::PackError;
use crate::models::pack::{Loader, Modpack, RemoteSource};
use crate::utils::time::get_unix_timestamp;
use camino::Utf8PathBuf;
use std::collections::BTreeSet;
use tracing::{debug, info};

#[derive(Clone, Debug)]
pub struct PackCreation {
    pub name: String,
    pub loader: Loader,
    pub game_version: String,
    pub overlay_dir: Option<Utf8PathBuf>,
    /// Explicit id for imports; freshly minted when absent.
    pub id: Option<String>,
}

pub fn create_pack(ctx: &PackContext, requirement: PackCreation) -> Result<Modpack, PackError> {
    let id = requirement
        .id
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    if ctx.pack_exists(&id) {
        return Err(PackError::DuplicatePack(id));
    }

    let pack = Modpack {
        id,
        name: requirement.name,
        loader: requirement.loader,
        game_version: requirement.game_version,
        version: String::new(),
        mods: BTreeSet::new(),
        disabled: BTreeSet::new(),
        locked: BTreeSet::new(),
        remote: None,
        incompatible: Vec::new(),
        overlay_dir: requirement.overlay_dir,
    };

    ctx.save_pack(&pack)?;
    info!("created modpack {} ({})", pack.name, pack.id);
    Ok(pack)
}

/// Adds library packages to the pack's included set. Every id must resolve.
pub fn add_packages(
    ctx: &PackContext,
    pack: &mut Modpack,
    package_ids: &[String],
    library: &LibraryDoc,
) -> Result<(), PackError> {
    for id in package_ids {
        if library.get(id).is_none() {
            return Err(PackError::PackageNotFound(id.clone()));
        }
    }

    for id in package_ids {
        pack.mods.insert(id.clone());
    }

    ctx.save_pack(pack)
}

/// Removes ids from the included set. The disabled and locked subsets lose
/// the same ids in the same document write, keeping the subset invariant.
pub fn remove_packages(
    ctx: &PackContext,
    pack: &mut Modpack,
    package_ids: &[String],
) -> Result<(), PackError> {
    for id in package_ids {
        pack.mods.remove(id);
        pack.disabled.remove(id);
        pack.locked.remove(id);
    }

    ctx.save_pack(pack)
}

pub fn set_enabled(
    ctx: &PackContext,
    pack: &mut Modpack,
    package_id: &str,
    enabled: bool,
) -> Result<(), PackError> {
    if !pack.mods.contains(package_id) {
        return Err(PackError::PackageNotFound(package_id.to_string()));
    }

    if enabled {
        pack.disabled.remove(package_id);
    } else {
        pack.disabled.insert(package_id.to_string());
    }

    ctx.save_pack(pack)
}

pub fn set_locked(
    ctx: &PackContext,
    pack: &mut Modpack,
    package_id: &str,
    locked: bool,
) -> Result<(), PackError> {
    if !pack.mods.contains(package_id) {
        return Err(PackError::PackageNotFound(package_id.to_string()));
    }

    if locked {
        pack.locked.insert(package_id.to_string());
    } else {
        pack.locked.remove(package_id);
    }

    ctx.save_pack(pack)
}

pub fn set_loader(ctx: &PackContext, pack: &mut Modpack, loader: Loader) -> Result<(), PackError> {
    pack.loader = loader;
    ctx.save_pack(pack)
}

pub fn set_game_version(
    ctx: &PackContext,
    pack: &mut Modpack,
    game_version: impl Into<String>,
) -> Result<(), PackError> {
    pack.game_version = game_version.into();
    ctx.save_pack(pack)
}

pub fn attach_remote(
    ctx: &PackContext,
    pack: &mut Modpack,
    url: impl Into<String>,
) -> Result<(), PackError> {
    pack.remote = Some(RemoteSource {
        url: url.into(),
        last_checked: Some(get_unix_timestamp()),
    });
    ctx.save_pack(pack)
}

/// Appends a key-change record handed over by the external configuration
/// editor. The core never parses configuration syntax itself.
pub fn record_config_change(
    ctx: &PackContext,
    pack_id: &str,
    change: ConfigChange,
) -> Result<(), PackError> {
    let mut journal = ctx.load_journal(pack_id)?;
    debug!("recording config change {} for {pack_id}", change.id);
    journal.changes.push(change);
    ctx.save_journal(&journal)
}

pub fn delete_pack(ctx: &PackContext, pack_id: &str) -> Result<(), PackError> {
    ctx.delete_pack(pack_id)?;
    info!("deleted modpack {pack_id}");
    Ok(())
}
