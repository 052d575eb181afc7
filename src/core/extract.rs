use crate::models::error::PackError;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs::{self, File};
use std::io;

/// Extracts the overrides folder of a modpack archive into the overlay
/// directory, returning the extracted paths relative to the overlay root.
/// Everything outside the named overrides folder is ignored; the overlay
/// tree itself stays opaque to the rest of the engine.
pub fn extract_overrides(
    archive_path: &Utf8Path,
    overrides_dir: &str,
    overlay_root: &Utf8Path,
) -> Result<Vec<Utf8PathBuf>, PackError> {
    let file = File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut extracted = Vec::new();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;

        // Zip Slip guard: enclosed_name() rejects anything that would land
        // outside the target directory.
        let Some(safe_path) = entry.enclosed_name() else {
            continue;
        };

        let Ok(rel) = safe_path.strip_prefix(overrides_dir) else {
            continue;
        };
        if rel.as_os_str().is_empty() {
            continue;
        }

        let rel = Utf8PathBuf::from_path_buf(rel.to_path_buf())
            .map_err(|p| PackError::ParseError(format!("Invalid UTF-8 path: {:?}", p)))?;
        let output_path = overlay_root.join(&rel);

        if entry.is_dir() {
            fs::create_dir_all(&output_path)?;
        } else {
            if let Some(parent) = output_path.parent() {
                if !parent.exists() {
                    fs::create_dir_all(parent)?;
                }
            }

            let mut outfile = File::create(&output_path)?;
            io::copy(&mut entry, &mut outfile)?;
            extracted.push(rel);
        }

        // Preserve permissions for anything executable inside the pack
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                let _ = fs::set_permissions(&output_path, fs::Permissions::from_mode(mode));
            }
        }
    }

    Ok(extracted)
}
