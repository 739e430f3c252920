use std::path::{Path, PathBuf};

/// Derives the image file name for a product title
///
/// Spaces and path separators become '_' so that every title maps to a single
/// file directly under the assets directory. The mapping is deterministic:
/// re-downloading an image for the same title overwrites the same file.
pub fn asset_file_name(title: &str, extension: &str) -> String {
    let stem: String = title
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            other => other,
        })
        .collect();
    format!("{}.{}", stem, extension)
}

/// Full path of the image file for a product title
pub fn asset_path(directory: &Path, title: &str, extension: &str) -> PathBuf {
    directory.join(asset_file_name(title, extension))
}
