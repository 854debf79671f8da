//! Directory scanner for discovering ARFF input files

use crate::error::Result;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extension of ARFF files, compared case-insensitively
pub const ARFF_EXTENSION: &str = "arff";

/// True if the path has an `.arff` extension
pub fn is_arff_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(ARFF_EXTENSION))
}

/// List the `.arff` files directly inside `dir`, sorted by file name.
///
/// Subdirectories are not descended into. Paths listed in `exclude` are
/// skipped, so a previous merge output in the same folder is not re-merged.
pub fn discover_arff_files<P: AsRef<Path>>(dir: P, exclude: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir.as_ref())
        .follow_links(true)
        .min_depth(1)
        .max_depth(1)
    {
        let entry = entry?;
        let path = entry.path();

        if entry.file_type().is_file() && is_arff_file(path) && !exclude.iter().any(|e| e == path) {
            files.push(path.to_path_buf());
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    Ok(files)
}
