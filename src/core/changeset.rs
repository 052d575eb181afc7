use crate::models::pack::Loader;
use crate::models::package::PackageRef;
use crate::models::version::Change;
use std::collections::{BTreeMap, BTreeSet};

/// Pure change-set calculation between two package-id sets. `old_info` and
/// `new_info` carry the identity snapshots for each side (the caller builds
/// them from stored refs or the live library).
///
/// Package identity changes whenever the referenced file changes, so a
/// naive set difference would misreport every update as a removal plus an
/// addition. An id only present on the new side whose project identity
/// matches an id only present on the old side is therefore classified as a
/// single update; update classification always wins over add/remove for
/// one project.
pub fn diff_package_sets(
    old_ids: &BTreeSet<String>,
    new_ids: &BTreeSet<String>,
    old_info: &BTreeMap<String, PackageRef>,
    new_info: &BTreeMap<String, PackageRef>,
) -> Vec<Change> {
    let mut changes = Vec::new();

    let removed: BTreeSet<String> = old_ids.difference(new_ids).cloned().collect();
    let added: BTreeSet<String> = new_ids.difference(old_ids).cloned().collect();

    let mut removed_by_project: BTreeMap<String, String> = BTreeMap::new();
    for id in &removed {
        if let Some(old_ref) = old_info.get(id) {
            removed_by_project.insert(old_ref.project_key(), id.clone());
        }
    }

    let mut matched_removed: BTreeSet<String> = BTreeSet::new();

    for id in &added {
        let new_ref = new_info.get(id);
        let update = new_ref.and_then(|nr| {
            removed_by_project
                .get(&nr.project_key())
                .map(|old_id| (nr, old_id.clone()))
        });

        match update {
            Some((new_ref, old_id)) => {
                let old_ref = old_info.get(&old_id);
                changes.push(Change::Update {
                    package_id: id.clone(),
                    name: new_ref.name.clone(),
                    previous_version: old_ref.map(|r| r.version.clone()).unwrap_or_default(),
                    new_version: new_ref.version.clone(),
                    previous_file: old_ref
                        .map(|r| r.identity.file_id.clone())
                        .unwrap_or_default(),
                    new_file: new_ref.identity.file_id.clone(),
                });
                matched_removed.insert(old_id);
            }
            None => {
                changes.push(Change::Add {
                    package_id: id.clone(),
                    name: new_ref.map(|r| r.name.clone()).unwrap_or_else(|| id.clone()),
                    version: new_ref.map(|r| r.version.clone()).unwrap_or_default(),
                });
            }
        }
    }

    for id in &removed {
        if matched_removed.contains(id) {
            continue;
        }

        let old_ref = old_info.get(id);
        changes.push(Change::Remove {
            package_id: id.clone(),
            name: old_ref.map(|r| r.name.clone()).unwrap_or_else(|| id.clone()),
            version: old_ref.map(|r| r.version.clone()).unwrap_or_default(),
        });
    }

    // Second pass: an id present on both sides can still point at a new
    // file when an internal id was reused in place.
    for id in old_ids.intersection(new_ids) {
        let (Some(old_ref), Some(new_ref)) = (old_info.get(id), new_info.get(id)) else {
            continue;
        };

        if old_ref.identity.file_id != new_ref.identity.file_id {
            changes.push(Change::Update {
                package_id: id.clone(),
                name: new_ref.name.clone(),
                previous_version: old_ref.version.clone(),
                new_version: new_ref.version.clone(),
                previous_file: old_ref.identity.file_id.clone(),
                new_file: new_ref.identity.file_id.clone(),
            });
        }
    }

    changes
}

fn display_name(id: &str, info: &BTreeMap<String, PackageRef>) -> String {
    info.get(id).map(|r| r.name.clone()).unwrap_or_else(|| id.to_string())
}

/// Membership changes of the disabled subset.
pub fn diff_disabled_set(
    old: &BTreeSet<String>,
    new: &BTreeSet<String>,
    info: &BTreeMap<String, PackageRef>,
) -> Vec<Change> {
    let mut changes = Vec::new();

    for id in new.difference(old) {
        changes.push(Change::Disable {
            package_id: id.clone(),
            name: display_name(id, info),
        });
    }
    for id in old.difference(new) {
        changes.push(Change::Enable {
            package_id: id.clone(),
            name: display_name(id, info),
        });
    }

    changes
}

/// Membership changes of the locked subset.
pub fn diff_locked_set(
    old: &BTreeSet<String>,
    new: &BTreeSet<String>,
    info: &BTreeMap<String, PackageRef>,
) -> Vec<Change> {
    let mut changes = Vec::new();

    for id in new.difference(old) {
        changes.push(Change::Lock {
            package_id: id.clone(),
            name: display_name(id, info),
        });
    }
    for id in old.difference(new) {
        changes.push(Change::Unlock {
            package_id: id.clone(),
            name: display_name(id, info),
        });
    }

    changes
}

fn loader_label(loader: &Loader, game_version: &str) -> String {
    if game_version.is_empty() {
        loader.to_string()
    } else {
        format!("{loader} ({game_version})")
    }
}

/// At most one record covering the loader/runtime identity.
pub fn diff_loader(
    old_loader: &Loader,
    old_game_version: &str,
    new_loader: &Loader,
    new_game_version: &str,
) -> Option<Change> {
    if old_loader == new_loader && old_game_version == new_game_version {
        return None;
    }

    Some(Change::LoaderChange {
        previous: loader_label(old_loader, old_game_version),
        new: loader_label(new_loader, new_game_version),
    })
}
