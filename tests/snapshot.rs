mod common;

use camino::Utf8PathBuf;
use common::{create_pack_with_overlay, setup_ctx};
use pack_keeper_lib::core::{pack, snapshot, versioning};
use pack_keeper_lib::models::version::Change;

fn overlay_root(tmp: &tempfile::TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(tmp.path().to_path_buf())
        .unwrap()
        .join("overlay")
}

#[test]
fn test_initialize_captures_overlay_snapshot() {
    let (tmp, ctx) = setup_ctx();
    let overlay = overlay_root(&tmp);
    std::fs::create_dir_all(overlay.join("config")).unwrap();
    std::fs::write(overlay.join("config/settings.toml"), "render = 8").unwrap();

    let mut pack = create_pack_with_overlay(&ctx, "Pack", overlay);
    let library = ctx.load_library().unwrap();
    let v1 = versioning::initialize(&ctx, &mut pack, &library).unwrap();

    let snapshot_id = v1.config_snapshot.expect("overlay snapshot expected");
    let meta = snapshot::read_meta(&ctx, &pack.id, &snapshot_id)
        .unwrap()
        .expect("snapshot metadata expected");
    assert_eq!(meta.version_id, "v1");

    assert!(!snapshot::overlay_dirty(&ctx, &pack, Some(&snapshot_id)).unwrap());
    assert_eq!(snapshot::list_snapshots(&ctx, &pack.id).unwrap().len(), 1);
}

#[test]
fn test_overlay_edit_is_dirty_and_commit_recaptures() {
    let (tmp, ctx) = setup_ctx();
    let overlay = overlay_root(&tmp);
    std::fs::create_dir_all(&overlay).unwrap();
    std::fs::write(overlay.join("settings.toml"), "render = 8").unwrap();

    let mut pack = create_pack_with_overlay(&ctx, "Pack", overlay.clone());
    let library = ctx.load_library().unwrap();
    versioning::initialize(&ctx, &mut pack, &library).unwrap();

    // Different length so the stat fingerprint must change
    std::fs::write(overlay.join("settings.toml"), "render = 16 # bumped").unwrap();

    assert!(versioning::has_uncommitted_changes(&ctx, &pack, &library).unwrap());

    let outcome = versioning::commit(&ctx, &mut pack, &library, "config", None, false).unwrap();
    assert!(outcome.created());
    assert!(matches!(
        &outcome.version().changes[0],
        Change::Note { text } if text == "Configuration files changed"
    ));

    assert!(!versioning::has_uncommitted_changes(&ctx, &pack, &library).unwrap());
    assert_eq!(snapshot::list_snapshots(&ctx, &pack.id).unwrap().len(), 2);
}

#[test]
fn test_rollback_restores_overlay_wholesale() {
    let (tmp, ctx) = setup_ctx();
    let overlay = overlay_root(&tmp);
    std::fs::create_dir_all(&overlay).unwrap();
    std::fs::write(overlay.join("settings.toml"), "render = 8").unwrap();

    let mut pack = create_pack_with_overlay(&ctx, "Pack", overlay.clone());
    let library = ctx.load_library().unwrap();
    versioning::initialize(&ctx, &mut pack, &library).unwrap();

    std::fs::write(overlay.join("settings.toml"), "render = 16 # bumped").unwrap();
    std::fs::write(overlay.join("extra.toml"), "added = true").unwrap();
    versioning::commit(&ctx, &mut pack, &library, "edited", None, false).unwrap();

    versioning::rollback(&ctx, &mut pack, &library, "v1", None).unwrap();

    let restored = std::fs::read_to_string(overlay.join("settings.toml")).unwrap();
    assert_eq!(restored, "render = 8");
    assert!(
        !overlay.join("extra.toml").exists(),
        "restore replaces the overlay, never patches it"
    );
}

#[test]
fn test_revert_restores_latest_snapshot_and_reads_clean() {
    let (tmp, ctx) = setup_ctx();
    let overlay = overlay_root(&tmp);
    std::fs::create_dir_all(&overlay).unwrap();
    std::fs::write(overlay.join("settings.toml"), "render = 8").unwrap();

    let mut pack = create_pack_with_overlay(&ctx, "Pack", overlay.clone());
    let library = ctx.load_library().unwrap();
    versioning::initialize(&ctx, &mut pack, &library).unwrap();

    std::fs::write(overlay.join("settings.toml"), "render = 32 # scratch edit").unwrap();
    assert!(versioning::has_uncommitted_changes(&ctx, &pack, &library).unwrap());

    versioning::revert(&ctx, &mut pack).unwrap();

    let restored = std::fs::read_to_string(overlay.join("settings.toml")).unwrap();
    assert_eq!(restored, "render = 8");
    // The restored overlay must not read as dirty even though copying
    // reassigned every mtime
    assert!(!versioning::has_uncommitted_changes(&ctx, &pack, &library).unwrap());
    assert_eq!(ctx.load_history(&pack.id).unwrap().unwrap().versions.len(), 1);
}

#[test]
fn test_fingerprint_ignores_excluded_subtree() {
    let (tmp, ctx) = setup_ctx();
    let dir = overlay_root(&tmp);
    std::fs::create_dir_all(dir.join("sub")).unwrap();
    std::fs::write(dir.join("a.toml"), "a = 1").unwrap();

    let excluded = dir.join("sub");
    let before = snapshot::fingerprint(&ctx, &dir, Some(&excluded)).unwrap();

    std::fs::write(excluded.join("noise.txt"), "anything at all").unwrap();
    let after = snapshot::fingerprint(&ctx, &dir, Some(&excluded)).unwrap();

    assert_eq!(before, after);

    std::fs::write(dir.join("b.toml"), "b = 2").unwrap();
    let changed = snapshot::fingerprint(&ctx, &dir, Some(&excluded)).unwrap();
    assert_ne!(before, changed);
}

#[test]
fn test_missing_overlay_without_snapshot_is_clean() {
    let (_tmp, ctx) = setup_ctx();
    let pack = common::create_test_pack(&ctx, "Pack");

    assert!(!snapshot::overlay_dirty(&ctx, &pack, None).unwrap());
}

#[test]
fn test_delete_pack_cascades_snapshots() {
    let (tmp, ctx) = setup_ctx();
    let overlay = overlay_root(&tmp);
    std::fs::create_dir_all(&overlay).unwrap();
    std::fs::write(overlay.join("settings.toml"), "render = 8").unwrap();

    let mut modpack = create_pack_with_overlay(&ctx, "Pack", overlay);
    let library = ctx.load_library().unwrap();
    versioning::initialize(&ctx, &mut modpack, &library).unwrap();

    let root = ctx.snapshot_root(&modpack.id);
    assert!(root.exists());

    pack::delete_pack(&ctx, &modpack.id).unwrap();
    assert!(!root.exists());
    assert!(ctx.load_pack(&modpack.id).is_err());
    assert!(ctx.load_history(&modpack.id).unwrap().is_none());
}
