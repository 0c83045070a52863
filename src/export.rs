//! Writing the Tableau-ready dataset and its metadata table to disk.

use crate::engine::io::save_csv;
use crate::engine::tableau::ColumnMetadata;
use crate::engine::types::Dataset;
use crate::error::{Result, ResultExt as _, TablewashError};
use std::path::{Path, PathBuf};

/// Files produced by [`export_for_tableau`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    pub data: PathBuf,
    pub metadata: PathBuf,
}

impl ExportPaths {
    pub fn new(out_dir: &Path, stem: &str) -> Self {
        Self {
            data: out_dir.join(format!("{stem}_tableau_ready.csv")),
            metadata: out_dir.join(format!("{stem}_metadata.csv")),
        }
    }
}

/// File name without its extension, used to name every derived output.
///
/// # Errors
///
/// Fails when the path has no file name.
pub fn file_stem(path: &Path) -> Result<String> {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| TablewashError::Other(format!("No file name in {}", path.display())))
}

/// Write `<stem>_tableau_ready.csv` and `<stem>_metadata.csv` into `out_dir`,
/// creating the directory if needed.
///
/// # Errors
///
/// Fails when the directory cannot be created or either file cannot be written.
pub fn export_for_tableau(
    df: &Dataset,
    metadata: &[ColumnMetadata],
    out_dir: &Path,
    stem: &str,
) -> Result<ExportPaths> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory {}", out_dir.display()))?;

    let paths = ExportPaths::new(out_dir, stem);
    save_csv(df, &paths.data)?;
    write_metadata(metadata, &paths.metadata)?;
    Ok(paths)
}

/// One CSV row per column, headed by the serialized field names.
///
/// # Errors
///
/// Fails when the file cannot be created or written.
pub fn write_metadata(metadata: &[ColumnMetadata], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for row in metadata {
        writer.serialize(row)?;
    }
    writer.flush()?;
    tracing::info!("Wrote metadata for {} columns to {}", metadata.len(), path.display());
    Ok(())
}
