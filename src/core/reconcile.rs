use crate::core::library::{self, LibraryDoc, LibraryEntry};
use crate::core::registry::PackContext;
use crate::core::versioning;
use crate::models::error::PackError;
use crate::models::manifest::{ManifestDocument, ManifestEntry, SharedManifest};
use crate::models::pack::Modpack;
use crate::models::package::PackageRef;
use crate::models::progress::{ProgressEvent, ProgressObserver};
use crate::models::version::{Version, VersionHistory};
use crate::utils::time::get_unix_timestamp;
use camino::Utf8PathBuf;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use tracing::{info, warn};

/// External collaborator that retrieves a published manifest. The engine
/// never issues network calls itself, and it treats any failure here as
/// "no update available".
pub trait ManifestSource {
    fn fetch(&self, url: &str, timeout: Duration) -> Result<ManifestDocument, PackError>;
}

#[derive(Clone, Debug)]
pub struct UpdatedEntry {
    pub project_key: String,
    pub name: String,
    pub previous_version: String,
    pub new_version: String,
    pub previous_file: String,
    pub new_file: String,
}

/// What would change locally if the remote manifest were applied.
#[derive(Clone, Debug, Default)]
pub struct ReconcileReport {
    pub added: Vec<ManifestEntry>,
    pub removed: Vec<PackageRef>,
    pub updated: Vec<UpdatedEntry>,
    /// Project keys whose disabled/locked status differs, per direction.
    pub enabled: Vec<String>,
    pub disabled: Vec<String>,
    pub locked: Vec<String>,
    pub unlocked: Vec<String>,
    pub loader_changed: bool,
    pub game_version_changed: bool,
    pub history_offered: bool,
}

impl ReconcileReport {
    pub fn has_update(&self) -> bool {
        !self.added.is_empty()
            || !self.removed.is_empty()
            || !self.updated.is_empty()
            || !self.enabled.is_empty()
            || !self.disabled.is_empty()
            || !self.locked.is_empty()
            || !self.unlocked.is_empty()
            || self.loader_changed
            || self.game_version_changed
            || self.history_offered
    }
}

fn project_keys(
    ids: &BTreeSet<String>,
    library: &LibraryDoc,
) -> BTreeSet<String> {
    ids.iter()
        .filter_map(|id| library.get(id).map(|p| p.identity.project_key()))
        .collect()
}

/// Classifies every remote entry against local state. Matching runs on
/// project identity, not internal id, so a local update-in-progress still
/// matches its remote counterpart; exact file match means unchanged, same
/// project with a different file means update, an unseen project means add,
/// and local-only projects mean remove.
pub fn check(pack: &Modpack, library: &LibraryDoc, manifest: &SharedManifest) -> ReconcileReport {
    let mut report = ReconcileReport::default();

    let mut local: BTreeMap<String, PackageRef> = BTreeMap::new();
    for id in &pack.mods {
        match library.get(id) {
            Some(package) => {
                local.insert(package.identity.project_key(), package.to_ref());
            }
            None => warn!("{id} is included in {} but unknown to the library", pack.id),
        }
    }

    let mut remote_keys = BTreeSet::new();
    for entry in &manifest.mods {
        let key = entry.project_key();
        remote_keys.insert(key.clone());

        match local.get(&key) {
            Some(stored) if stored.identity.file_id == entry.file_id => {}
            Some(stored) => report.updated.push(UpdatedEntry {
                project_key: key,
                name: entry.name.clone(),
                previous_version: stored.version.clone(),
                new_version: entry.version.clone(),
                previous_file: stored.identity.file_id.clone(),
                new_file: entry.file_id.clone(),
            }),
            None => report.added.push(entry.clone()),
        }
    }

    for (key, stored) in &local {
        if !remote_keys.contains(key) {
            report.removed.push(stored.clone());
        }
    }

    // Toggle comparisons run on project keys; internal ids change across
    // updates and would misreport every toggled package.
    let local_disabled = project_keys(&pack.disabled, library);
    let remote_disabled: BTreeSet<String> = manifest.disabled.iter().cloned().collect();
    report.disabled = remote_disabled
        .difference(&local_disabled)
        .filter(|k| remote_keys.contains(*k))
        .cloned()
        .collect();
    report.enabled = local_disabled
        .difference(&remote_disabled)
        .filter(|k| remote_keys.contains(*k))
        .cloned()
        .collect();

    let local_locked = project_keys(&pack.locked, library);
    let remote_locked: BTreeSet<String> = manifest.locked.iter().cloned().collect();
    report.locked = remote_locked
        .difference(&local_locked)
        .filter(|k| remote_keys.contains(*k))
        .cloned()
        .collect();
    report.unlocked = local_locked
        .difference(&remote_locked)
        .filter(|k| remote_keys.contains(*k))
        .cloned()
        .collect();

    report.loader_changed = manifest.loader != pack.loader;
    report.game_version_changed =
        !manifest.game_version.is_empty() && manifest.game_version != pack.game_version;
    report.history_offered = manifest.history.as_ref().is_some_and(|h| !h.is_empty());

    report
}

/// Fetches the pack's remote manifest and reports what an apply would do.
/// Fetch or shape failures are logged and read as a clean report (fail
/// closed); a real update is parked on the context until applied.
pub fn fetch_and_check(
    ctx: &PackContext,
    source: &dyn ManifestSource,
    pack: &mut Modpack,
    library: &LibraryDoc,
) -> Result<ReconcileReport, PackError> {
    let Some(remote) = pack.remote.clone() else {
        warn!("{} has no remote source attached", pack.id);
        return Ok(ReconcileReport::default());
    };

    let timeout = Duration::from_secs(ctx.config.fetch_timeout_secs);
    let report = match source
        .fetch(&remote.url, timeout)
        .and_then(|doc| doc.normalize())
    {
        Ok(manifest) => check(pack, library, &manifest),
        Err(e) => {
            warn!("remote check for {} failed, treating as no update: {e}", pack.id);
            ReconcileReport::default()
        }
    };

    if let Some(remote) = pack.remote.as_mut() {
        remote.last_checked = Some(get_unix_timestamp());
    }
    ctx.save_pack(pack)?;

    if report.has_update() {
        ctx.park_pending_update(pack.id.clone(), report.clone());
    }

    Ok(report)
}

#[derive(Debug)]
pub struct ApplyReport {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    /// Per-entry failures; the batch never aborts on one bad entry.
    pub failed: Vec<(String, String)>,
    pub version: Option<Version>,
}

/// Applies a remote manifest to the local aggregate with the same
/// add/update/reuse semantics as a commit diff, executed as one batch:
/// exact identities are reused from the library, genuinely new projects are
/// created, and an updated project replaces its old package instead of
/// duplicating it. Disabled/locked status carries over by project key.
pub fn apply(
    ctx: &PackContext,
    pack: &mut Modpack,
    manifest: &SharedManifest,
    observer: &dyn ProgressObserver,
) -> Result<ApplyReport, PackError> {
    let library = ctx.load_library()?;
    let report = check(pack, &library, manifest);

    let total = manifest.mods.len();
    let mut entries = Vec::new();
    let mut failed = Vec::new();

    for (i, entry) in manifest.mods.iter().enumerate() {
        if entry.project_id.trim().is_empty() || entry.file_id.trim().is_empty() {
            failed.push((entry.name.clone(), "incomplete package identity".to_string()));
        } else {
            entries.push(LibraryEntry::new(
                entry.identity(),
                entry.name.clone(),
                entry.version.clone(),
            ));
        }

        observer.on_progress(ProgressEvent {
            completed: i + 1,
            total,
            current: entry.name.clone(),
        });
    }

    // One library write for the whole batch.
    let packages = library::upsert_batch(ctx, entries)?;

    pack.mods = packages.iter().map(|p| p.id.clone()).collect();

    let by_project: BTreeMap<String, String> = packages
        .iter()
        .map(|p| (p.identity.project_key(), p.id.clone()))
        .collect();
    let disabled_keys: BTreeSet<String> = manifest.disabled.iter().cloned().collect();
    let locked_keys: BTreeSet<String> = manifest.locked.iter().cloned().collect();
    pack.disabled = by_project
        .iter()
        .filter(|(key, _)| disabled_keys.contains(*key))
        .map(|(_, id)| id.clone())
        .collect();
    pack.locked = by_project
        .iter()
        .filter(|(key, _)| locked_keys.contains(*key))
        .map(|(_, id)| id.clone())
        .collect();

    if report.loader_changed {
        pack.loader = manifest.loader.clone();
    }
    if report.game_version_changed {
        pack.game_version = manifest.game_version.clone();
    }
    if let Some(remote) = pack.remote.as_mut() {
        remote.last_checked = Some(get_unix_timestamp());
    }
    ctx.save_pack(pack)?;

    // Fresh import: adopt the published history wholesale. Otherwise local
    // history stays the source of truth.
    if ctx.load_history(&pack.id)?.is_none_or(|h| h.versions.is_empty()) {
        if let Some(versions) = manifest.history.clone().filter(|h| !h.is_empty()) {
            let current = versions.last().map(|v| v.id.clone());
            ctx.save_history(&VersionHistory {
                modpack_id: pack.id.clone(),
                current,
                versions,
            })?;
        }
    }

    let library = ctx.load_library()?;
    let outcome = versioning::commit(ctx, pack, &library, "Apply remote update", None, false)?;
    let version = outcome.created().then(|| outcome.version().clone());

    ctx.take_pending_update(&pack.id);

    info!(
        "applied remote manifest to {}: +{} ~{} -{} ({} failed)",
        pack.id,
        report.added.len(),
        report.updated.len(),
        report.removed.len(),
        failed.len()
    );

    Ok(ApplyReport {
        // Entries with broken identities classify as additions; count only
        // the ones that actually landed.
        added: report.added.len().saturating_sub(failed.len()),
        updated: report.updated.len(),
        removed: report.removed.len(),
        failed,
        version,
    })
}

/// Creates a new modpack from a published manifest. Entries with broken
/// identities land in the pack's incompatible list instead of failing the
/// import; an embedded history is adopted wholesale.
pub fn import_manifest(
    ctx: &PackContext,
    manifest: &SharedManifest,
    overlay_dir: Option<Utf8PathBuf>,
) -> Result<Modpack, PackError> {
    if ctx.pack_exists(&manifest.id) {
        return Err(PackError::DuplicatePack(manifest.id.clone()));
    }

    let mut entries = Vec::new();
    let mut incompatible = Vec::new();

    for entry in &manifest.mods {
        if entry.project_id.trim().is_empty() || entry.file_id.trim().is_empty() {
            incompatible.push(PackageRef {
                id: entry.identity().stable_id(),
                identity: entry.identity(),
                name: entry.name.clone(),
                version: entry.version.clone(),
            });
            continue;
        }

        entries.push(LibraryEntry::new(
            entry.identity(),
            entry.name.clone(),
            entry.version.clone(),
        ));
    }

    let packages = library::upsert_batch(ctx, entries)?;

    let by_project: BTreeMap<String, String> = packages
        .iter()
        .map(|p| (p.identity.project_key(), p.id.clone()))
        .collect();
    let disabled_keys: BTreeSet<String> = manifest.disabled.iter().cloned().collect();
    let locked_keys: BTreeSet<String> = manifest.locked.iter().cloned().collect();

    let mut pack = Modpack {
        id: manifest.id.clone(),
        name: manifest.name.clone(),
        loader: manifest.loader.clone(),
        game_version: manifest.game_version.clone(),
        version: String::new(),
        mods: packages.iter().map(|p| p.id.clone()).collect(),
        disabled: by_project
            .iter()
            .filter(|(key, _)| disabled_keys.contains(*key))
            .map(|(_, id)| id.clone())
            .collect(),
        locked: by_project
            .iter()
            .filter(|(key, _)| locked_keys.contains(*key))
            .map(|(_, id)| id.clone())
            .collect(),
        remote: None,
        incompatible,
        overlay_dir,
    };
    ctx.save_pack(&pack)?;

    match manifest.history.clone().filter(|h| !h.is_empty()) {
        Some(versions) => {
            pack.version = versions.last().map(|v| v.tag.clone()).unwrap_or_default();
            let current = versions.last().map(|v| v.id.clone());
            ctx.save_history(&VersionHistory {
                modpack_id: pack.id.clone(),
                current,
                versions,
            })?;
            ctx.save_pack(&pack)?;
        }
        None => {
            let library = ctx.load_library()?;
            versioning::initialize(ctx, &mut pack, &library)?;
        }
    }

    info!("imported modpack {} ({} packages)", pack.name, pack.mods.len());
    Ok(pack)
}
