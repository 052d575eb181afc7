mod common;

use common::{add_library_package, create_test_pack, setup_ctx, test_loader};
use pack_keeper_lib::core::reconcile::{self, ManifestSource};
use pack_keeper_lib::core::{pack, versioning};
use pack_keeper_lib::models::error::PackError;
use pack_keeper_lib::models::manifest::{
    ManifestDocument, ManifestEntry, SharedManifest, MANIFEST_FORMAT,
};
use pack_keeper_lib::models::pack::{Loader, LoaderKind};
use pack_keeper_lib::models::package::PackageSource;
use pack_keeper_lib::models::progress::NoProgress;
use pack_keeper_lib::models::version::{PackState, Version};
use std::time::Duration;

fn entry(project: &str, file: &str, name: &str, version: &str) -> ManifestEntry {
    ManifestEntry {
        source: PackageSource::Modrinth,
        project_id: project.to_string(),
        file_id: file.to_string(),
        name: name.to_string(),
        version: version.to_string(),
    }
}

fn base_manifest(id: &str, mods: Vec<ManifestEntry>) -> SharedManifest {
    SharedManifest {
        format: MANIFEST_FORMAT,
        id: id.to_string(),
        name: "Remote Pack".into(),
        loader: test_loader(),
        game_version: "1.20.4".into(),
        mods,
        disabled: Vec::new(),
        locked: Vec::new(),
        history: None,
    }
}

#[test]
fn test_check_classifies_added_removed_updated() {
    let (_tmp, ctx) = setup_ctx();

    let a1 = add_library_package(&ctx, "proj-a", "file-1", "Alpha", "1.0");
    let b1 = add_library_package(&ctx, "proj-b", "file-1", "Beta", "1.0");
    let library = ctx.load_library().unwrap();

    let mut local = create_test_pack(&ctx, "Local");
    pack::add_packages(&ctx, &mut local, &[a1.id.clone(), b1.id.clone()], &library).unwrap();

    let manifest = base_manifest(
        "remote-1",
        vec![
            entry("proj-a", "file-2", "Alpha", "2.0"),
            entry("proj-c", "file-1", "Gamma", "1.0"),
        ],
    );

    let report = reconcile::check(&local, &library, &manifest);

    assert!(report.has_update());
    assert_eq!(report.added.len(), 1);
    assert_eq!(report.added[0].name, "Gamma");
    assert_eq!(report.removed.len(), 1);
    assert_eq!(report.removed[0].name, "Beta");
    assert_eq!(report.updated.len(), 1);
    assert_eq!(report.updated[0].previous_version, "1.0");
    assert_eq!(report.updated[0].new_version, "2.0");
}

#[test]
fn test_check_exact_match_is_clean() {
    let (_tmp, ctx) = setup_ctx();

    let a1 = add_library_package(&ctx, "proj-a", "file-1", "Alpha", "1.0");
    let library = ctx.load_library().unwrap();

    let mut local = create_test_pack(&ctx, "Local");
    pack::add_packages(&ctx, &mut local, &[a1.id.clone()], &library).unwrap();

    let manifest = base_manifest("remote-1", vec![entry("proj-a", "file-1", "Alpha", "1.0")]);
    let report = reconcile::check(&local, &library, &manifest);

    assert!(!report.has_update(), "unexpected update: {report:?}");
}

#[test]
fn test_toggles_compare_by_project_key_not_internal_id() {
    let (_tmp, ctx) = setup_ctx();

    let a1 = add_library_package(&ctx, "proj-a", "file-1", "Alpha", "1.0");
    let library = ctx.load_library().unwrap();

    let mut local = create_test_pack(&ctx, "Local");
    pack::add_packages(&ctx, &mut local, &[a1.id.clone()], &library).unwrap();
    pack::set_enabled(&ctx, &mut local, &a1.id, false).unwrap();

    // Remote ships a NEWER file of the same project, not disabled remotely.
    // Matching by internal id would miss the toggle entirely.
    let manifest = base_manifest("remote-1", vec![entry("proj-a", "file-2", "Alpha", "2.0")]);
    let report = reconcile::check(&local, &library, &manifest);

    assert_eq!(report.enabled, vec!["modrinth:proj-a".to_string()]);

    // And the reverse direction: remote disables what is enabled locally
    let mut manifest = base_manifest("remote-2", vec![entry("proj-a", "file-2", "Alpha", "2.0")]);
    manifest.disabled = vec!["modrinth:proj-a".into()];
    pack::set_enabled(&ctx, &mut local, &a1.id, true).unwrap();
    let report = reconcile::check(&local, &library, &manifest);

    assert_eq!(report.disabled, vec!["modrinth:proj-a".to_string()]);
}

#[test]
fn test_loader_and_game_version_flags() {
    let (_tmp, ctx) = setup_ctx();
    let library = ctx.load_library().unwrap();
    let local = create_test_pack(&ctx, "Local");

    let mut manifest = base_manifest("remote-1", Vec::new());
    manifest.loader = Loader {
        kind: LoaderKind::Forge,
        version: "47.2.0".into(),
    };
    manifest.game_version = "1.21.0".into();

    let report = reconcile::check(&local, &library, &manifest);
    assert!(report.loader_changed);
    assert!(report.game_version_changed);
}

#[test]
fn test_apply_replaces_updates_and_carries_status() {
    let (_tmp, ctx) = setup_ctx();

    let a1 = add_library_package(&ctx, "proj-a", "file-1", "Alpha", "1.0");
    let b1 = add_library_package(&ctx, "proj-b", "file-1", "Beta", "1.0");
    // Gamma already exists under the exact remote identity: reuse, no new entry
    let c1 = add_library_package(&ctx, "proj-c", "file-1", "Gamma", "1.0");
    let library = ctx.load_library().unwrap();

    let mut local = create_test_pack(&ctx, "Local");
    pack::add_packages(&ctx, &mut local, &[a1.id.clone(), b1.id.clone()], &library).unwrap();
    versioning::commit(&ctx, &mut local, &library, "first", None, false).unwrap();

    let mut manifest = base_manifest(
        "remote-1",
        vec![
            entry("proj-a", "file-2", "Alpha", "2.0"),
            entry("proj-c", "file-1", "Gamma", "1.0"),
        ],
    );
    manifest.disabled = vec!["modrinth:proj-a".into()];

    let before = ctx.load_library().unwrap().packages.len();
    let report = reconcile::apply(&ctx, &mut local, &manifest, &NoProgress).unwrap();

    assert_eq!(report.added, 1);
    assert_eq!(report.updated, 1);
    assert_eq!(report.removed, 1);
    assert!(report.failed.is_empty());
    assert!(report.version.is_some(), "apply commits the new state");

    // Alpha replaced (not duplicated), Beta gone, Gamma reused
    let reloaded = ctx.load_pack(&local.id).unwrap();
    assert_eq!(reloaded.mods.len(), 2);
    assert!(!reloaded.mods.contains(&a1.id));
    assert!(!reloaded.mods.contains(&b1.id));
    assert!(reloaded.mods.contains(&c1.id));

    // Disabled status carried to the NEW internal id of proj-a
    let library = ctx.load_library().unwrap();
    let a2 = library
        .resolve(&pack_keeper_lib::models::package::PackageIdentity::new(
            PackageSource::Modrinth,
            "proj-a",
            "file-2",
        ))
        .expect("updated package in library");
    assert!(reloaded.disabled.contains(&a2.id));
    assert!(reloaded.disabled.is_subset(&reloaded.mods));

    // Exactly one new library entry (Alpha's new file)
    assert_eq!(library.packages.len(), before + 1);
}

#[test]
fn test_apply_collects_per_entry_failures() {
    let (_tmp, ctx) = setup_ctx();
    let mut local = create_test_pack(&ctx, "Local");

    let manifest = base_manifest(
        "remote-1",
        vec![
            entry("proj-a", "file-1", "Alpha", "1.0"),
            entry("", "", "Broken", "0.0"),
        ],
    );

    let report = reconcile::apply(&ctx, &mut local, &manifest, &NoProgress).unwrap();

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "Broken");
    let reloaded = ctx.load_pack(&local.id).unwrap();
    assert_eq!(reloaded.mods.len(), 1, "the batch continues past bad entries");
}

#[test]
fn test_import_manifest_creates_pack_and_conflicts_on_reimport() {
    let (_tmp, ctx) = setup_ctx();

    let mut manifest = base_manifest(
        "shared-pack",
        vec![
            entry("proj-a", "file-1", "Alpha", "1.0"),
            entry("", "file-x", "Broken", "0.0"),
        ],
    );
    manifest.disabled = vec!["modrinth:proj-a".into()];

    let pack = reconcile::import_manifest(&ctx, &manifest, None).unwrap();

    assert_eq!(pack.id, "shared-pack");
    assert_eq!(pack.mods.len(), 1);
    assert_eq!(pack.disabled.len(), 1);
    assert_eq!(pack.incompatible.len(), 1);
    assert_eq!(pack.incompatible[0].name, "Broken");

    // Import initializes history
    let history = ctx.load_history(&pack.id).unwrap().unwrap();
    assert_eq!(history.versions.len(), 1);

    let again = reconcile::import_manifest(&ctx, &manifest, None);
    assert!(matches!(again, Err(PackError::DuplicatePack(_))));
}

#[test]
fn test_import_manifest_adopts_embedded_history() {
    let (_tmp, ctx) = setup_ctx();

    let mut manifest = base_manifest("with-history", Vec::new());
    manifest.history = Some(vec![Version {
        id: "v1".into(),
        tag: "3.1.4".into(),
        message: "published".into(),
        created_at: 1,
        parent: None,
        state: PackState {
            mods: Default::default(),
            disabled: Default::default(),
            locked: Default::default(),
            loader: test_loader(),
            game_version: "1.20.4".into(),
        },
        changes: Vec::new(),
        package_refs: Vec::new(),
        config_snapshot: None,
        config_changes: Vec::new(),
    }]);

    let pack = reconcile::import_manifest(&ctx, &manifest, None).unwrap();

    assert_eq!(pack.version, "3.1.4");
    let history = ctx.load_history(&pack.id).unwrap().unwrap();
    assert_eq!(history.current.as_deref(), Some("v1"));
    assert_eq!(history.versions.len(), 1);
}

struct FailingSource;

impl ManifestSource for FailingSource {
    fn fetch(&self, _url: &str, _timeout: Duration) -> Result<ManifestDocument, PackError> {
        Err(PackError::IOError("connection refused".into()))
    }
}

struct FixedSource(SharedManifest);

impl ManifestSource for FixedSource {
    fn fetch(&self, _url: &str, _timeout: Duration) -> Result<ManifestDocument, PackError> {
        Ok(ManifestDocument::Modern(self.0.clone()))
    }
}

#[test]
fn test_fetch_failure_reads_as_no_update() {
    let (_tmp, ctx) = setup_ctx();
    let library = ctx.load_library().unwrap();

    let mut local = create_test_pack(&ctx, "Local");
    pack::attach_remote(&ctx, &mut local, "https://example.invalid/pack.json").unwrap();

    let report = reconcile::fetch_and_check(&ctx, &FailingSource, &mut local, &library).unwrap();

    assert!(!report.has_update(), "failures fail closed");
    assert!(local.remote.as_ref().unwrap().last_checked.is_some());
    assert!(ctx.take_pending_update(&local.id).is_none());
}

#[test]
fn test_fetch_with_update_parks_pending_report() {
    let (_tmp, ctx) = setup_ctx();
    let library = ctx.load_library().unwrap();

    let mut local = create_test_pack(&ctx, "Local");
    pack::attach_remote(&ctx, &mut local, "https://example.invalid/pack.json").unwrap();

    let manifest = base_manifest("remote-1", vec![entry("proj-a", "file-1", "Alpha", "1.0")]);
    let report =
        reconcile::fetch_and_check(&ctx, &FixedSource(manifest), &mut local, &library).unwrap();

    assert!(report.has_update());
    assert!(ctx.take_pending_update(&local.id).is_some());
    assert!(ctx.take_pending_update(&local.id).is_none(), "taken once");
}

#[test]
fn test_pack_without_remote_reports_clean() {
    let (_tmp, ctx) = setup_ctx();
    let library = ctx.load_library().unwrap();
    let mut local = create_test_pack(&ctx, "Local");

    let report = reconcile::fetch_and_check(&ctx, &FailingSource, &mut local, &library).unwrap();
    assert!(!report.has_update());
}
