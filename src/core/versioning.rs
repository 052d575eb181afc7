use crate::core::changeset::{diff_disabled_set, diff_loader, diff_locked_set, diff_package_sets};
use crate::core::library::LibraryDoc;
use crate::core::registry::PackContext;
use crate::core::snapshot;
use crate::models::error::PackError;
use crate::models::pack::Modpack;
use crate::models::package::{DependencyKind, PackageRef};
use crate::models::version::{Change, PackState, Version, VersionHistory};
use crate::utils::time::get_unix_timestamp;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

pub enum CommitOutcome {
    Created(Version),
    Unchanged(Version),
}

impl CommitOutcome {
    pub fn version(&self) -> &Version {
        match self {
            Self::Created(v) | Self::Unchanged(v) => v,
        }
    }

    pub fn created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// A package the library can no longer resolve, with the stored identity
/// snapshot for display when one exists.
#[derive(Clone, Debug)]
pub struct MissingPackage {
    pub package_id: String,
    pub reference: Option<PackageRef>,
}

#[derive(Clone, Debug)]
pub struct DependencyIssue {
    pub package_id: String,
    pub package_name: String,
    pub requires_project: String,
}

#[derive(Clone, Debug)]
pub struct RollbackValidation {
    pub available: Vec<PackageRef>,
    pub missing: Vec<MissingPackage>,
    pub broken_dependencies: Vec<DependencyIssue>,
}

/// Rollback succeeded; `missing` lists packages that no longer resolve.
#[derive(Clone, Debug)]
pub struct RollbackReport {
    pub version: Version,
    pub missing: Vec<MissingPackage>,
}

fn refs_to_map(refs: &[PackageRef]) -> BTreeMap<String, PackageRef> {
    refs.iter().map(|r| (r.id.clone(), r.clone())).collect()
}

/// Identity snapshots for the given ids: live library data first, stored
/// refs as fallback for ids the library has since lost.
fn ref_map_for_pack(
    ids: &BTreeSet<String>,
    library: &LibraryDoc,
    fallbacks: &[&[PackageRef]],
) -> BTreeMap<String, PackageRef> {
    let mut map = BTreeMap::new();

    for id in ids {
        if let Some(package) = library.get(id) {
            map.insert(id.clone(), package.to_ref());
            continue;
        }

        if let Some(found) = fallbacks.iter().flat_map(|f| f.iter()).find(|r| &r.id == id) {
            map.insert(id.clone(), found.clone());
        }
    }

    map
}

fn state_changes(
    old_state: &PackState,
    old_info: &BTreeMap<String, PackageRef>,
    new_state: &PackState,
    new_info: &BTreeMap<String, PackageRef>,
) -> Vec<Change> {
    let mut changes = diff_package_sets(&old_state.mods, &new_state.mods, old_info, new_info);

    // Toggle records can name a package from either side of the diff.
    let mut names = old_info.clone();
    names.extend(new_info.iter().map(|(k, v)| (k.clone(), v.clone())));

    changes.extend(diff_disabled_set(
        &old_state.disabled,
        &new_state.disabled,
        &names,
    ));
    changes.extend(diff_locked_set(&old_state.locked, &new_state.locked, &names));
    changes.extend(diff_loader(
        &old_state.loader,
        &old_state.game_version,
        &new_state.loader,
        &new_state.game_version,
    ));

    changes
}

fn bump_tag(tag: &str) -> String {
    match semver::Version::parse(tag) {
        Ok(v) => semver::Version::new(v.major, v.minor, v.patch + 1).to_string(),
        Err(_) => {
            warn!("previous tag '{tag}' is not semver, restarting at 0.1.0");
            "0.1.0".into()
        }
    }
}

/// Seeds `v1` as a full snapshot of the current state. Calling again once a
/// history exists is a no-op that returns the latest version.
pub fn initialize(
    ctx: &PackContext,
    pack: &mut Modpack,
    library: &LibraryDoc,
) -> Result<Version, PackError> {
    if let Some(history) = ctx.load_history(&pack.id)? {
        if let Some(current) = history.current_version() {
            return Ok(current.clone());
        }
    }

    let mut history = VersionHistory::new(&pack.id);
    let new_info = ref_map_for_pack(&pack.mods, library, &[]);
    let id = history.next_id();
    let config_snapshot = snapshot::create_snapshot(ctx, pack, &id)?;
    let tag = if pack.version.is_empty() {
        "1.0.0".to_string()
    } else {
        pack.version.clone()
    };

    let version = Version {
        id: id.clone(),
        tag: tag.clone(),
        message: "Initial import".into(),
        created_at: get_unix_timestamp(),
        parent: None,
        state: PackState::capture(pack),
        changes: vec![Change::Note {
            text: "Initial import".into(),
        }],
        package_refs: new_info.into_values().collect(),
        config_snapshot,
        config_changes: Vec::new(),
    };

    history.versions.push(version.clone());
    history.current = Some(id.clone());
    ctx.save_history(&history)?;

    pack.version = tag;
    ctx.save_pack(pack)?;

    info!("initialized version history for {} at {id}", pack.id);
    Ok(version)
}

/// Diffs the aggregate against the current version and appends a new one
/// when anything changed. A clean tree is a no-op unless `force` is set; a
/// forced commit with nothing to report records a marker note instead.
pub fn commit(
    ctx: &PackContext,
    pack: &mut Modpack,
    library: &LibraryDoc,
    message: &str,
    tag: Option<String>,
    force: bool,
) -> Result<CommitOutcome, PackError> {
    commit_inner(ctx, pack, library, message, tag, force, &[])
}

fn commit_inner(
    ctx: &PackContext,
    pack: &mut Modpack,
    library: &LibraryDoc,
    message: &str,
    tag: Option<String>,
    force: bool,
    extra_refs: &[PackageRef],
) -> Result<CommitOutcome, PackError> {
    let Some(mut history) = ctx.load_history(&pack.id)?.filter(|h| h.current.is_some()) else {
        // First commit seeds the history exactly as initialize would.
        return initialize(ctx, pack, library).map(CommitOutcome::Created);
    };

    let current = history
        .current_version()
        .cloned()
        .ok_or_else(|| PackError::VersionNotFound(format!("current version of {}", pack.id)))?;

    let old_info = refs_to_map(&current.package_refs);
    let new_info = ref_map_for_pack(&pack.mods, library, &[&current.package_refs, extra_refs]);
    let new_state = PackState::capture(pack);
    let mut changes = state_changes(&current.state, &old_info, &new_state, &new_info);

    let journal = ctx.load_journal(&pack.id)?;
    let pending = journal.uncommitted();
    let overlay_dirty = snapshot::overlay_dirty(ctx, pack, current.config_snapshot.as_deref())?;
    let config_changed = overlay_dirty || !pending.is_empty();

    if changes.is_empty() && !config_changed && !force {
        debug!("commit is a no-op for {}", pack.id);
        return Ok(CommitOutcome::Unchanged(current));
    }

    if changes.is_empty() {
        let text = if config_changed {
            "Configuration files changed".to_string()
        } else {
            message.to_string()
        };
        changes.push(Change::Note { text });
    }

    let id = history.next_id();
    let tag = tag.unwrap_or_else(|| bump_tag(&current.tag));
    let config_snapshot = snapshot::create_snapshot(ctx, pack, &id)?;

    let version = Version {
        id: id.clone(),
        tag: tag.clone(),
        message: message.to_string(),
        created_at: get_unix_timestamp(),
        parent: Some(current.id.clone()),
        state: new_state,
        changes,
        package_refs: new_info.into_values().collect(),
        config_snapshot,
        config_changes: pending.clone(),
    };

    history.versions.push(version.clone());
    history.current = Some(id.clone());
    ctx.save_history(&history)?;

    if !pending.is_empty() {
        let mut journal = journal;
        let ids: Vec<String> = pending.iter().map(|c| c.id.clone()).collect();
        journal.mark_committed(&ids);
        ctx.save_journal(&journal)?;
    }

    // Separate document write. The history above is the source of truth if
    // this one never lands; current_tag() re-derives the mirror.
    pack.version = tag;
    ctx.save_pack(pack)?;

    info!("committed {id} ({}) for {}", version.tag, pack.id);
    Ok(CommitOutcome::Created(version))
}

/// Copies the target version's state back onto the aggregate and finishes
/// with a forced commit describing the rollback. History never rewinds;
/// undo is always a new forward version.
pub fn rollback(
    ctx: &PackContext,
    pack: &mut Modpack,
    library: &LibraryDoc,
    target_id: &str,
    keep: Option<&BTreeSet<String>>,
) -> Result<RollbackReport, PackError> {
    let history = ctx
        .load_history(&pack.id)?
        .ok_or_else(|| PackError::VersionNotFound(target_id.to_string()))?;
    let target = history
        .get(target_id)
        .cloned()
        .ok_or_else(|| PackError::VersionNotFound(target_id.to_string()))?;

    let validation = validate_rollback(&history, library, target_id)?;

    let mut state = target.state.clone();
    if let Some(keep) = keep {
        // The caller could not re-resolve everything; the subsets must not
        // reference anything outside what survives.
        state.mods.retain(|id| keep.contains(id));
        state.disabled.retain(|id| keep.contains(id));
        state.locked.retain(|id| keep.contains(id));
    }

    state.apply_to(pack);
    ctx.save_pack(pack)?;

    if let Some(snapshot_id) = &target.config_snapshot {
        snapshot::restore_snapshot(ctx, pack, snapshot_id)?;
    }

    let message = format!("Rollback to {}", target.id);
    let outcome = commit_inner(ctx, pack, library, &message, None, true, &target.package_refs)?;

    info!("rolled back {} to {}", pack.id, target.id);
    Ok(RollbackReport {
        version: outcome.version().clone(),
        missing: validation.missing,
    })
}

/// Re-applies the latest version onto the aggregate and drops uncommitted
/// configuration records. The one operation that does not grow history.
pub fn revert(ctx: &PackContext, pack: &mut Modpack) -> Result<(), PackError> {
    let no_versions = || PackError::VersionNotFound(format!("no versions for {}", pack.id));
    let history = ctx.load_history(&pack.id)?.ok_or_else(no_versions)?;
    let current = history.current_version().cloned().ok_or_else(no_versions)?;

    current.state.apply_to(pack);
    pack.version = current.tag.clone();
    ctx.save_pack(pack)?;

    if let Some(snapshot_id) = &current.config_snapshot {
        snapshot::restore_snapshot(ctx, pack, snapshot_id)?;
    }

    let mut journal = ctx.load_journal(&pack.id)?;
    if journal.has_uncommitted() {
        journal.discard_uncommitted();
        ctx.save_journal(&journal)?;
    }

    info!("reverted {} to {}", pack.id, current.id);
    Ok(())
}

/// Change list between any two versions, in either order; they need not be
/// adjacent.
pub fn compare(
    history: &VersionHistory,
    library: &LibraryDoc,
    version_a: &str,
    version_b: &str,
) -> Result<Vec<Change>, PackError> {
    let a = history
        .get(version_a)
        .ok_or_else(|| PackError::VersionNotFound(version_a.to_string()))?;
    let b = history
        .get(version_b)
        .ok_or_else(|| PackError::VersionNotFound(version_b.to_string()))?;

    let old_info = refs_to_map(&a.package_refs);
    let mut new_info = refs_to_map(&b.package_refs);
    // The library has fresher display data for anything it still resolves.
    for (id, stored) in new_info.iter_mut() {
        if let Some(package) = library.get(id) {
            *stored = package.to_ref();
        }
    }

    Ok(state_changes(&a.state, &old_info, &b.state, &new_info))
}

/// Reports which packages of the target snapshot still resolve, which are
/// gone, and which required-dependency edges would dangle after the
/// rollback. Checked against the restored set, not the current one.
pub fn validate_rollback(
    history: &VersionHistory,
    library: &LibraryDoc,
    target_id: &str,
) -> Result<RollbackValidation, PackError> {
    let target = history
        .get(target_id)
        .ok_or_else(|| PackError::VersionNotFound(target_id.to_string()))?;

    let mut available = Vec::new();
    let mut available_packages = Vec::new();
    let mut missing = Vec::new();

    for id in &target.state.mods {
        if let Some(package) = library.get(id) {
            available.push(package.to_ref());
            available_packages.push(package);
        } else {
            missing.push(MissingPackage {
                package_id: id.clone(),
                reference: target.package_refs.iter().find(|r| &r.id == id).cloned(),
            });
        }
    }

    let restored_projects: BTreeSet<String> = available
        .iter()
        .map(|r| r.identity.project_id.clone())
        .chain(
            missing
                .iter()
                .filter_map(|m| m.reference.as_ref().map(|r| r.identity.project_id.clone())),
        )
        .collect();

    let mut broken_dependencies = Vec::new();
    for package in available_packages {
        for dep in &package.dependencies {
            if dep.kind != DependencyKind::Required {
                continue;
            }
            if !restored_projects.contains(&dep.project_id) {
                broken_dependencies.push(DependencyIssue {
                    package_id: package.id.clone(),
                    package_name: package.name.clone(),
                    requires_project: dep.project_id.clone(),
                });
            }
        }
    }

    Ok(RollbackValidation {
        available,
        missing,
        broken_dependencies,
    })
}

/// True when the working state differs from the latest version: a package
/// or subset or loader diff, a dirty overlay, or uncommitted configuration
/// records.
pub fn has_uncommitted_changes(
    ctx: &PackContext,
    pack: &Modpack,
    library: &LibraryDoc,
) -> Result<bool, PackError> {
    let Some(history) = ctx.load_history(&pack.id)? else {
        return Ok(true);
    };
    let Some(current) = history.current_version() else {
        return Ok(true);
    };

    let old_info = refs_to_map(&current.package_refs);
    let new_info = ref_map_for_pack(&pack.mods, library, &[&current.package_refs]);

    if !state_changes(&current.state, &old_info, &PackState::capture(pack), &new_info).is_empty() {
        return Ok(true);
    }

    if snapshot::overlay_dirty(ctx, pack, current.config_snapshot.as_deref())? {
        return Ok(true);
    }

    Ok(ctx.load_journal(&pack.id)?.has_uncommitted())
}

/// The authoritative tag, re-derived from history. Use when the aggregate's
/// mirror might be stale after an interrupted commit.
pub fn current_tag(history: &VersionHistory) -> Option<String> {
    history.current_version().map(|v| v.tag.clone())
}
