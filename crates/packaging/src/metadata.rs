//! Plugin `metadata.txt` and the versioned archive name.

use crate::error::{PackagingError, Result};
use std::fs;
use std::path::Path;

pub const METADATA_FILE: &str = "metadata.txt";

/// Value of the first line starting with `version=`.
///
/// Only the text up to the next `=` is kept, and an empty value counts as
/// missing.
pub fn parse_version(metadata: &str) -> Option<String> {
    metadata
        .lines()
        .find(|line| line.starts_with("version="))
        .and_then(|line| line.split('=').nth(1))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Version declared in `plugin_dir/metadata.txt`.
pub fn read_version(plugin_dir: &Path) -> Result<String> {
    let path = plugin_dir.join(METADATA_FILE);
    let text = fs::read_to_string(&path)?;
    parse_version(&text).ok_or(PackagingError::MissingVersion { path })
}

/// `{plugin_name}-{version}.zip`
pub fn archive_name(plugin_name: &str, version: &str) -> String {
    format!("{}-{}.zip", plugin_name, version)
}
