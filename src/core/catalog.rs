use crate::core::library::{self, LibraryEntry};
use crate::core::registry::PackContext;
use crate::models::error::PackError;
use crate::models::pack::LoaderKind;
use crate::models::package::{DependencyRef, Package, PackageIdentity, PackageSource};
use crate::models::progress::{ProgressEvent, ProgressObserver};
use tracing::{info, warn};

#[derive(Clone, Debug)]
pub struct ProjectMetadata {
    pub project_id: String,
    pub name: String,
    pub author: Option<String>,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
}

#[derive(Clone, Debug)]
pub struct FileMetadata {
    pub project_id: String,
    pub file_id: String,
    pub name: String,
    pub version: String,
    pub file_name: Option<String>,
    pub size: Option<u64>,
    pub published_at: Option<u64>,
    pub loader: Option<LoaderKind>,
    pub game_version: Option<String>,
    pub dependencies: Vec<DependencyRef>,
}

/// The remote catalog boundary. The core never issues network calls; every
/// lookup goes through an implementation of this trait.
pub trait CatalogClient {
    fn resolve_project(
        &self,
        source: PackageSource,
        project_id: &str,
    ) -> Result<ProjectMetadata, PackError>;

    fn resolve_file(
        &self,
        source: PackageSource,
        project_id: &str,
        file_id: &str,
    ) -> Result<FileMetadata, PackError>;

    /// Batch lookup over `(project_id, file_id)` pairs.
    fn resolve_files_by_ids(
        &self,
        source: PackageSource,
        ids: &[(String, String)],
    ) -> Result<Vec<FileMetadata>, PackError>;

    /// The most suitable published file for a runtime/loader combination.
    fn best_file_for(
        &self,
        source: PackageSource,
        project_id: &str,
        game_version: &str,
        loader: LoaderKind,
    ) -> Result<Option<FileMetadata>, PackError>;
}

/// Outcome of a batch import: counts plus named lists, never an abort on
/// the first bad item.
#[derive(Debug)]
pub struct BatchReport {
    pub imported: Vec<Package>,
    pub failed: Vec<(String, String)>,
}

fn file_to_entry(source: PackageSource, file: FileMetadata) -> LibraryEntry {
    let mut entry = LibraryEntry::new(
        PackageIdentity::new(source, file.project_id, file.file_id),
        file.name,
        file.version,
    );
    entry.loader = file.loader;
    entry.game_version = file.game_version;
    entry.dependencies = file.dependencies;
    entry.file_name = file.file_name;
    entry.size = file.size;
    entry.published_at = file.published_at;
    entry
}

/// Resolves `(project_id, file_id)` pairs through the catalog in bounded
/// chunks and lands every success in one library write. Failures are
/// collected per item; the observer sees progress after each chunk and can
/// cancel between chunks.
pub fn import_project_files(
    ctx: &PackContext,
    catalog: &dyn CatalogClient,
    source: PackageSource,
    refs: &[(String, String)],
    observer: &dyn ProgressObserver,
) -> Result<BatchReport, PackError> {
    let total = refs.len();
    let chunk_size = ctx.config.resolve_batch_size.max(1);

    let mut entries = Vec::new();
    let mut failed = Vec::new();
    let mut completed = 0usize;

    for chunk in refs.chunks(chunk_size) {
        if observer.is_cancelled() {
            warn!("import cancelled after {completed}/{total} resolutions");
            break;
        }

        match catalog.resolve_files_by_ids(source, chunk) {
            Ok(files) => {
                for file in files {
                    entries.push(file_to_entry(source, file));
                }
            }
            Err(batch_err) => {
                // The batch endpoint failed; fall back to per-item lookups
                // so one bad id doesn't sink the whole chunk.
                warn!("batch resolve failed, retrying items individually: {batch_err}");
                for (project_id, file_id) in chunk {
                    if observer.is_cancelled() {
                        break;
                    }
                    match catalog.resolve_file(source, project_id, file_id) {
                        Ok(file) => entries.push(file_to_entry(source, file)),
                        Err(e) => failed.push((format!("{project_id}:{file_id}"), e.to_string())),
                    }
                }
            }
        }

        completed = (completed + chunk.len()).min(total);
        let current = chunk
            .last()
            .map(|(p, f)| format!("{p}:{f}"))
            .unwrap_or_default();
        observer.on_progress(ProgressEvent {
            completed,
            total,
            current,
        });
    }

    let imported = library::upsert_batch(ctx, entries)?;
    info!(
        "imported {} packages from {source} ({} failed)",
        imported.len(),
        failed.len()
    );

    Ok(BatchReport { imported, failed })
}
