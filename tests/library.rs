mod common;

use common::{add_library_package, create_test_pack, identity, setup_ctx};
use pack_keeper_lib::core::library::{self, LibraryEntry, MetadataPatch};
use pack_keeper_lib::core::pack;
use pack_keeper_lib::models::error::PackError;

#[test]
fn test_identity_is_idempotent() {
    let (_tmp, ctx) = setup_ctx();

    let first = add_library_package(&ctx, "sodium", "file-1", "Sodium", "0.5.8");
    let second = add_library_package(&ctx, "sodium", "file-1", "Sodium", "0.5.8");

    assert_eq!(first.id, second.id);

    let library = ctx.load_library().unwrap();
    assert_eq!(library.packages.len(), 1, "no duplicate entry for one tuple");
}

#[test]
fn test_upsert_never_overwrites_existing_entry() {
    let (_tmp, ctx) = setup_ctx();

    add_library_package(&ctx, "sodium", "file-1", "Sodium", "0.5.8");
    // Same identity, different display metadata: the original entry wins
    let returned = add_library_package(&ctx, "sodium", "file-1", "Renamed", "9.9.9");

    assert_eq!(returned.name, "Sodium");
    assert_eq!(returned.version, "0.5.8");
}

#[test]
fn test_upsert_batch_mixes_new_and_existing() {
    let (_tmp, ctx) = setup_ctx();

    let existing = add_library_package(&ctx, "sodium", "file-1", "Sodium", "0.5.8");

    let batch = vec![
        LibraryEntry::new(identity("sodium", "file-1"), "Sodium", "0.5.8"),
        LibraryEntry::new(identity("lithium", "file-2"), "Lithium", "0.12.1"),
    ];
    let packages = library::upsert_batch(&ctx, batch).unwrap();

    assert_eq!(packages.len(), 2);
    assert_eq!(packages[0].id, existing.id);
    assert_eq!(ctx.load_library().unwrap().packages.len(), 2);
}

#[test]
fn test_resolve_by_identity() {
    let (_tmp, ctx) = setup_ctx();

    let package = add_library_package(&ctx, "sodium", "file-1", "Sodium", "0.5.8");
    let library = ctx.load_library().unwrap();

    assert_eq!(
        library.resolve(&identity("sodium", "file-1")).map(|p| p.id.clone()),
        Some(package.id)
    );
    assert!(library.resolve(&identity("sodium", "file-2")).is_none());
}

#[test]
fn test_refresh_metadata_keeps_identity() {
    let (_tmp, ctx) = setup_ctx();

    let package = add_library_package(&ctx, "sodium", "file-1", "Sodium", "0.5.8");

    let updated = library::refresh_metadata(
        &ctx,
        &package.id,
        MetadataPatch {
            author: Some("jellysquid".into()),
            ..Default::default()
        },
    )
    .unwrap();

    assert_eq!(updated.id, package.id);
    assert_eq!(updated.identity, package.identity);
    assert_eq!(updated.author.as_deref(), Some("jellysquid"));
}

#[test]
fn test_delete_package_prunes_every_pack() {
    let (_tmp, ctx) = setup_ctx();

    let package = add_library_package(&ctx, "sodium", "file-1", "Sodium", "0.5.8");
    let other = add_library_package(&ctx, "lithium", "file-2", "Lithium", "0.12.1");

    let library = ctx.load_library().unwrap();
    let mut pack_a = create_test_pack(&ctx, "Pack A");
    pack::add_packages(
        &ctx,
        &mut pack_a,
        &[package.id.clone(), other.id.clone()],
        &library,
    )
    .unwrap();
    pack::set_enabled(&ctx, &mut pack_a, &package.id, false).unwrap();
    pack::set_locked(&ctx, &mut pack_a, &package.id, true).unwrap();

    let mut pack_b = create_test_pack(&ctx, "Pack B");
    pack::add_packages(&ctx, &mut pack_b, &[package.id.clone()], &library).unwrap();

    let affected = library::delete_package(&ctx, &package.id).unwrap();
    assert_eq!(affected.len(), 2);

    for pack_id in [&pack_a.id, &pack_b.id] {
        let reloaded = ctx.load_pack(pack_id).unwrap();
        assert!(!reloaded.mods.contains(&package.id));
        // Subset invariant survives the cascade
        assert!(reloaded.disabled.is_subset(&reloaded.mods));
        assert!(reloaded.locked.is_subset(&reloaded.mods));
    }

    let reloaded_a = ctx.load_pack(&pack_a.id).unwrap();
    assert!(reloaded_a.mods.contains(&other.id), "other packages untouched");
}

#[test]
fn test_delete_unknown_package() {
    let (_tmp, ctx) = setup_ctx();

    let result = library::delete_package(&ctx, "missing");
    assert!(matches!(result, Err(PackError::PackageNotFound(_))));
}

#[test]
fn test_remove_packages_keeps_subset_invariant() {
    let (_tmp, ctx) = setup_ctx();

    let package = add_library_package(&ctx, "sodium", "file-1", "Sodium", "0.5.8");
    let library = ctx.load_library().unwrap();

    let mut pack = create_test_pack(&ctx, "Pack");
    pack::add_packages(&ctx, &mut pack, &[package.id.clone()], &library).unwrap();
    pack::set_enabled(&ctx, &mut pack, &package.id, false).unwrap();
    pack::set_locked(&ctx, &mut pack, &package.id, true).unwrap();

    pack::remove_packages(&ctx, &mut pack, &[package.id.clone()]).unwrap();

    let reloaded = ctx.load_pack(&pack.id).unwrap();
    assert!(reloaded.mods.is_empty());
    assert!(reloaded.disabled.is_empty());
    assert!(reloaded.locked.is_empty());
}

#[test]
fn test_toggle_unknown_package_is_an_error() {
    let (_tmp, ctx) = setup_ctx();
    let mut pack = create_test_pack(&ctx, "Pack");

    let result = pack::set_enabled(&ctx, &mut pack, "missing", false);
    assert!(matches!(result, Err(PackError::PackageNotFound(_))));
}

#[test]
fn test_duplicate_pack_id_conflicts() {
    let (_tmp, ctx) = setup_ctx();

    let pack = create_test_pack(&ctx, "Pack");
    let result = pack::create_pack(
        &ctx,
        pack_keeper_lib::core::pack::PackCreation {
            name: "Other".into(),
            loader: common::test_loader(),
            game_version: "1.20.4".into(),
            overlay_dir: None,
            id: Some(pack.id.clone()),
        },
    );

    assert!(matches!(result, Err(PackError::DuplicatePack(_))));
}
