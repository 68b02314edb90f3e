//! Install the working copy into the local QGIS profile as a link.

use crate::config::PackagingConfig;
use crate::error::{PackagingError, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

/// Where the plugin lands: `home/qgisdir/plugin_name`
pub fn deploy_path(config: &PackagingConfig, home: &Path) -> PathBuf {
    home.join(&config.qgisdir).join(&config.plugin_name)
}

/// Link `plugin_dir` into the QGIS plugins directory under `home`.
///
/// Missing parent directories are created. An existing link to the same
/// working copy is left as is; any other existing entry is a conflict.
pub fn deploy(config: &PackagingConfig, plugin_dir: &Path, home: &Path) -> Result<PathBuf> {
    let source = plugin_dir.canonicalize()?;
    let target = deploy_path(config, home);

    match fs::symlink_metadata(&target) {
        Ok(meta) if meta.file_type().is_symlink() => {
            let existing = fs::read_link(&target)?;
            let existing = existing.canonicalize().unwrap_or(existing);
            if existing == source {
                info!("{} already linked to {}", target.display(), source.display());
                return Ok(target);
            }
            return Err(PackagingError::DeployConflict { path: target });
        }
        Ok(_) => return Err(PackagingError::DeployConflict { path: target }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    symlink_dir(&source, &target)?;
    info!("linked {} -> {}", target.display(), source.display());
    Ok(target)
}

#[cfg(unix)]
fn symlink_dir(source: &Path, target: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(source, target)
}

#[cfg(windows)]
fn symlink_dir(source: &Path, target: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(source, target)
}
