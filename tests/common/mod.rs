#![allow(dead_code)]

use camino::Utf8PathBuf;
use pack_keeper_lib::config::global::GlobalConfig;
use pack_keeper_lib::core::library::{self, LibraryEntry};
use pack_keeper_lib::core::pack::{self, PackCreation};
use pack_keeper_lib::core::registry::PackContext;
use pack_keeper_lib::models::pack::{Loader, LoaderKind, Modpack};
use pack_keeper_lib::models::package::{Package, PackageIdentity, PackageSource};
use tempfile::TempDir;

/// Temp-dir backed context so every test gets an isolated store.
pub fn setup_ctx() -> (TempDir, PackContext) {
    let _ = pack_keeper_lib::utils::log::init_logging(None);

    let tmp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap();

    let ctx = PackContext::open(root.join("store"), GlobalConfig::default())
        .expect("Failed to open context");

    (tmp, ctx)
}

pub fn identity(project: &str, file: &str) -> PackageIdentity {
    PackageIdentity::new(PackageSource::Modrinth, project, file)
}

/// Shorthand for landing one package in the shared library.
pub fn add_library_package(
    ctx: &PackContext,
    project: &str,
    file: &str,
    name: &str,
    version: &str,
) -> Package {
    let entry = LibraryEntry::new(identity(project, file), name, version);
    library::upsert_batch(ctx, vec![entry])
        .expect("Failed to upsert package")
        .remove(0)
}

pub fn test_loader() -> Loader {
    Loader {
        kind: LoaderKind::Fabric,
        version: "0.15.0".into(),
    }
}

pub fn create_test_pack(ctx: &PackContext, name: &str) -> Modpack {
    pack::create_pack(
        ctx,
        PackCreation {
            name: name.to_string(),
            loader: test_loader(),
            game_version: "1.20.4".into(),
            overlay_dir: None,
            id: None,
        },
    )
    .expect("Failed to create pack")
}

pub fn create_pack_with_overlay(ctx: &PackContext, name: &str, overlay: Utf8PathBuf) -> Modpack {
    std::fs::create_dir_all(&overlay).unwrap();
    pack::create_pack(
        ctx,
        PackCreation {
            name: name.to_string(),
            loader: test_loader(),
            game_version: "1.20.4".into(),
            overlay_dir: Some(overlay),
            id: None,
        },
    )
    .expect("Failed to create pack")
}
