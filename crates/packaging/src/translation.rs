//! Qt translation files under `i18n/`.

use crate::config::PackagingConfig;
use crate::error::Result;
use crate::runner::{CommandRunner, ToolCommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const I18N_DIR: &str = "i18n";

/// `i18n/{locale}.ts`, relative to the plugin directory
pub fn ts_file(locale: &str) -> String {
    format!("{}/{}.ts", I18N_DIR, locale)
}

/// Top-level `.py` files of the plugin, sorted
pub fn python_sources(plugin_dir: &Path) -> Result<Vec<String>> {
    let mut sources = Vec::new();
    for entry in fs::read_dir(plugin_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(".py") {
            sources.push(name);
        }
    }
    sources.sort();
    Ok(sources)
}

/// Extract translatable strings into `i18n/{locale}.ts`, one run per locale.
pub fn update_translations(
    config: &PackagingConfig,
    plugin_dir: &Path,
    runner: &dyn CommandRunner,
) -> Result<usize> {
    if config.locales.is_empty() {
        info!("no locales configured, nothing to update");
        return Ok(0);
    }

    let sources = python_sources(plugin_dir)?;
    fs::create_dir_all(plugin_dir.join(I18N_DIR))?;
    for locale in &config.locales {
        let cmd = ToolCommand::new(&config.pylupdate)
            .arg("-noobsolete")
            .args(sources.iter().cloned())
            .arg("-ts")
            .arg(ts_file(locale))
            .current_dir(plugin_dir);
        runner.run(&cmd)?.into_result(&config.pylupdate)?;
        info!("updated {}", ts_file(locale));
    }
    Ok(config.locales.len())
}

/// Compile `i18n/{locale}.ts` into `.qm` files.
pub fn compile_translations(
    config: &PackagingConfig,
    plugin_dir: &Path,
    runner: &dyn CommandRunner,
) -> Result<usize> {
    if config.locales.is_empty() {
        info!("no locales configured, nothing to compile");
        return Ok(0);
    }

    for locale in &config.locales {
        let cmd = ToolCommand::new(&config.lrelease)
            .arg(ts_file(locale))
            .current_dir(plugin_dir);
        runner.run(&cmd)?.into_result(&config.lrelease)?;
        debug!("compiled {}", ts_file(locale));
    }
    info!("compiled {} translation(s)", config.locales.len());
    Ok(config.locales.len())
}

/// Delete every compiled `i18n/*.qm`; returns how many were removed.
pub fn clean_translations(plugin_dir: &Path) -> Result<usize> {
    let dir = plugin_dir.join(I18N_DIR);
    if !dir.is_dir() {
        info!("no {} directory, nothing to clean", I18N_DIR);
        return Ok(0);
    }

    let compiled: Vec<PathBuf> = fs::read_dir(&dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "qm"))
        .collect();
    for path in &compiled {
        fs::remove_file(path)?;
        debug!("removed {}", path.display());
    }
    info!("removed {} compiled translation(s)", compiled.len());
    Ok(compiled.len())
}
