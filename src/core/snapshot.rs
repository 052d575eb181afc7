use crate::core::registry::PackContext;
use crate::models::error::PackError;
use crate::models::pack::Modpack;
use crate::utils::file::FileUtils;
use crate::utils::id::digest_id;
use crate::utils::time::get_unix_timestamp;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Per-snapshot metadata. The fingerprint is recorded at capture time
/// because copying does not preserve modification times, so it cannot be
/// recomputed from the stored copy later.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SnapshotMeta {
    pub id: String,
    pub version_id: String,
    pub created_at: u64,
    pub fingerprint: String,
}

fn snapshot_dir(ctx: &PackContext, pack_id: &str, snapshot_id: &str) -> Utf8PathBuf {
    ctx.snapshot_root(pack_id).join(snapshot_id)
}

fn files_dir(ctx: &PackContext, pack_id: &str, snapshot_id: &str) -> Utf8PathBuf {
    snapshot_dir(ctx, pack_id, snapshot_id).join("files")
}

fn meta_path(ctx: &PackContext, pack_id: &str, snapshot_id: &str) -> Utf8PathBuf {
    snapshot_dir(ctx, pack_id, snapshot_id).join("meta.json")
}

fn write_meta(ctx: &PackContext, pack_id: &str, meta: &SnapshotMeta) -> Result<(), PackError> {
    let raw = serde_json::to_string_pretty(meta)?;
    std::fs::write(meta_path(ctx, pack_id, &meta.id), raw)?;
    Ok(())
}

pub fn read_meta(
    ctx: &PackContext,
    pack_id: &str,
    snapshot_id: &str,
) -> Result<Option<SnapshotMeta>, PackError> {
    let path = meta_path(ctx, pack_id, snapshot_id);

    if !path.exists() {
        return Ok(None);
    }

    let raw = std::fs::read_to_string(&path)?;
    Ok(Some(serde_json::from_str(&raw)?))
}

/// Directory fingerprint: sorted `(relative path, size, mtime)` triples,
/// hashed. A touch-without-edit reads as dirty; an edit restored with a
/// preserved mtime and size reads as clean. Accepted trade-off for not
/// hashing contents on every check; `verify_snapshot_contents` switches to
/// content digests per file.
pub fn fingerprint(
    ctx: &PackContext,
    dir: &Utf8Path,
    exclude: Option<&Utf8Path>,
) -> Result<String, PackError> {
    let entries = FileUtils::stat_entries(dir, exclude)?;
    let mut buf = String::new();

    for (path, size, mtime) in entries {
        if ctx.config.verify_snapshot_contents {
            let digest = digest_id(&std::fs::read(dir.join(&path))?);
            buf.push_str(&format!("{path}|{size}|{digest}\n"));
        } else {
            buf.push_str(&format!("{path}|{size}|{mtime}\n"));
        }
    }

    Ok(digest_id(buf.as_bytes()))
}

/// Captures a full copy of the pack's overlay directory for `version_id`.
/// Returns `None` when the pack has no overlay to snapshot. The snapshot
/// tree excludes itself in case the overlay contains it.
pub fn create_snapshot(
    ctx: &PackContext,
    pack: &Modpack,
    version_id: &str,
) -> Result<Option<String>, PackError> {
    let Some(overlay) = &pack.overlay_dir else {
        return Ok(None);
    };
    if !overlay.exists() {
        return Ok(None);
    }

    let snapshot_root = ctx.snapshot_root(&pack.id);
    let snapshot_id = format!("{version_id}-{}", get_unix_timestamp());
    let files = files_dir(ctx, &pack.id, &snapshot_id);

    std::fs::create_dir_all(&files)?;
    FileUtils::copy_recursive(overlay, &files, Some(&snapshot_root))?;

    let meta = SnapshotMeta {
        id: snapshot_id.clone(),
        version_id: version_id.to_string(),
        created_at: get_unix_timestamp(),
        fingerprint: fingerprint(ctx, overlay, Some(&snapshot_root))?,
    };
    write_meta(ctx, &pack.id, &meta)?;

    debug!("captured config snapshot {snapshot_id} for {}", pack.id);
    Ok(Some(snapshot_id))
}

/// Wholesale restore of a snapshot onto the overlay directory. The overlay
/// is cleared (minus any nested snapshot tree) and the stored copy is put
/// back; partial patching never happens. The stored fingerprint is
/// refreshed afterwards because the restored files carry new mtimes while
/// their content matches the snapshot by construction.
pub fn restore_snapshot(
    ctx: &PackContext,
    pack: &Modpack,
    snapshot_id: &str,
) -> Result<(), PackError> {
    let Some(overlay) = &pack.overlay_dir else {
        return Ok(());
    };

    let files = files_dir(ctx, &pack.id, snapshot_id);
    if !files.exists() {
        return Err(PackError::IOError(format!(
            "config snapshot {snapshot_id} is missing its files"
        )));
    }

    let snapshot_root = ctx.snapshot_root(&pack.id);
    std::fs::create_dir_all(overlay)?;
    FileUtils::clear_dir(overlay, Some(&snapshot_root))?;
    FileUtils::copy_recursive(&files, overlay, None)?;

    match read_meta(ctx, &pack.id, snapshot_id)? {
        Some(mut meta) => {
            meta.fingerprint = fingerprint(ctx, overlay, Some(&snapshot_root))?;
            write_meta(ctx, &pack.id, &meta)?;
        }
        None => warn!("config snapshot {snapshot_id} has no metadata"),
    }

    debug!("restored config snapshot {snapshot_id} for {}", pack.id);
    Ok(())
}

/// Whether the overlay differs from the given snapshot. With no snapshot to
/// compare against, any overlay content counts as dirty.
pub fn overlay_dirty(
    ctx: &PackContext,
    pack: &Modpack,
    snapshot_id: Option<&str>,
) -> Result<bool, PackError> {
    let Some(overlay) = &pack.overlay_dir else {
        return Ok(false);
    };

    let snapshot_root = ctx.snapshot_root(&pack.id);

    match snapshot_id {
        None => {
            if !overlay.exists() {
                return Ok(false);
            }
            Ok(!FileUtils::stat_entries(overlay, Some(&snapshot_root))?.is_empty())
        }
        Some(id) => {
            if !overlay.exists() {
                return Ok(true);
            }
            let Some(meta) = read_meta(ctx, &pack.id, id)? else {
                return Ok(true);
            };
            Ok(fingerprint(ctx, overlay, Some(&snapshot_root))? != meta.fingerprint)
        }
    }
}

/// All snapshots of a pack, newest first.
pub fn list_snapshots(ctx: &PackContext, pack_id: &str) -> Result<Vec<SnapshotMeta>, PackError> {
    let root = ctx.snapshot_root(pack_id);

    if !root.exists() {
        return Ok(Vec::new());
    }

    let mut snapshots = Vec::new();
    for entry in std::fs::read_dir(&root)? {
        let entry = entry?;
        let Some(id) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };

        if let Some(meta) = read_meta(ctx, pack_id, &id)? {
            snapshots.push(meta);
        }
    }

    snapshots.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(snapshots)
}
