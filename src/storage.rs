mod archive;
mod layer;
/// Markdown serialization for documents.
pub mod markdown;

pub use archive::{Archive, ArchiveGroups, GroupKey};
pub use layer::{Layer, LayerError, Layers};
pub use markdown::{LoadError, MarkdownDocument};

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::domain::EXTENSION;

/// Lists the document files directly inside `directory`, sorted by filename.
///
/// Subdirectories are not descended into.
pub(crate) fn document_paths(directory: &Path) -> std::io::Result<Vec<PathBuf>> {
    WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) if entry.file_type().is_file() => Some(Ok(entry.into_path())),
            Ok(_) => None,
            Err(e) => Some(Err(e.into())),
        })
        .filter(|path| {
            path.as_ref().map_or(true, |path| {
                path.extension().and_then(|ext| ext.to_str()) == Some(EXTENSION)
            })
        })
        .collect()
}

/// The file name component of a path, as UTF-8.
///
/// Returns an empty string for paths with no final component, such as `/`.
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
