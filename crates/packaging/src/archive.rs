//! Versioned plugin archive for the QGIS plugin repository.

use crate::config::PackagingConfig;
use crate::error::Result;
use crate::metadata::{archive_name, read_version};
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Directories never shipped, wherever they are
const EXCLUDED_DIRS: &[&str] = &[".git", "__pycache__", "test"];
/// Development files never shipped
const EXCLUDED_FILES: &[&str] = &["requirements-testing.txt", "pylintrc", "Makefile"];

/// Whether a file or directory name is left out of the archive.
pub fn is_excluded(name: &str, is_dir: bool) -> bool {
    if is_dir {
        EXCLUDED_DIRS.contains(&name)
    } else {
        EXCLUDED_FILES.contains(&name)
            || name.ends_with(".pyc")
            || (name.starts_with("test_") && name.ends_with(".py"))
    }
}

/// Files of `plugin_dir` to ship, relative to it and sorted.
///
/// Symbolic links are followed. Files in `skip` (the archive being
/// written) are never listed.
pub fn collect_files(plugin_dir: &Path, skip: &[&Path]) -> Result<Vec<PathBuf>> {
    let skip: Vec<PathBuf> = skip.iter().filter_map(|p| p.canonicalize().ok()).collect();
    let mut files = Vec::new();
    walk(plugin_dir, Path::new(""), &skip, &mut files)?;
    files.sort();
    Ok(files)
}

fn walk(dir: &Path, relative: &Path, skip: &[PathBuf], files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let path = entry.path();
        let is_dir = fs::metadata(&path)?.is_dir();

        if is_excluded(&name, is_dir) {
            debug!("excluded from archive: {}", relative.join(&name).display());
            continue;
        }
        if is_dir {
            walk(&path, &relative.join(&name), skip, files)?;
        } else if skip.is_empty() || !path.canonicalize().is_ok_and(|p| skip.contains(&p)) {
            files.push(relative.join(&name));
        }
    }
    Ok(())
}

/// Zip `plugin_dir` into `out_dir/{plugin_name}-{version}.zip`.
///
/// Files are stored under a top-level folder named after the plugin. The
/// archive is written next to its final name and only replaces an existing
/// archive once complete; nothing is left behind on failure.
pub fn build_archive(config: &PackagingConfig, plugin_dir: &Path, out_dir: &Path) -> Result<PathBuf> {
    let version = read_version(plugin_dir)?;
    let archive_path = out_dir.join(archive_name(&config.plugin_name, &version));
    let partial_path = archive_path.with_extension("zip.part");
    fs::create_dir_all(out_dir)?;

    let written = write_archive(config, plugin_dir, &partial_path, &archive_path);
    let nbr_files = match written {
        Ok(n) => n,
        Err(e) => {
            if let Err(rm) = fs::remove_file(&partial_path) {
                warn!("could not remove {}: {}", partial_path.display(), rm);
            }
            return Err(e);
        }
    };
    fs::rename(&partial_path, &archive_path)?;

    info!(
        "created {} ({} files, version {})",
        archive_path.display(),
        nbr_files,
        version
    );
    Ok(archive_path)
}

fn write_archive(
    config: &PackagingConfig,
    plugin_dir: &Path,
    partial_path: &Path,
    archive_path: &Path,
) -> Result<usize> {
    let writer = BufWriter::new(File::create(partial_path)?);
    // Both archive files may sit inside the plugin directory
    let files = collect_files(plugin_dir, &[partial_path, archive_path])?;

    let mut zip = ZipWriter::new(writer);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for relative in &files {
        let name = zip_entry_name(&config.plugin_name, relative);
        zip.start_file(name, options)?;
        let mut source = File::open(plugin_dir.join(relative))?;
        io::copy(&mut source, &mut zip)?;
    }
    zip.finish()?;
    Ok(files.len())
}

/// `plugin/sub/file.py`, with forward slashes on every platform
fn zip_entry_name(plugin_name: &str, relative: &Path) -> String {
    let mut name = plugin_name.to_string();
    for component in relative.components() {
        name.push('/');
        name.push_str(&component.as_os_str().to_string_lossy());
    }
    name
}
