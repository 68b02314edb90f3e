//! Packaging configuration.
//!
//! Values come, in increasing priority, from the built-in defaults, an
//! optional `geosim.toml` (or an explicit file), and `GEOSIM_`-prefixed
//! environment variables (`GEOSIM_LOCALES`, `GEOSIM_LRELEASE`,
//! `GEOSIM_QGISDIR`, `GEOSIM_PLUGIN_NAME`, `GEOSIM_PEP8EXCLUDE`, ...).
//! List values may be written as TOML arrays or as space- or
//! comma-separated strings.

use crate::error::Result;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Name of the optional configuration file, without extension
pub const CONFIG_FILE_STEM: &str = "geosim";
/// Prefix of the configuration environment variables
pub const ENV_PREFIX: &str = "GEOSIM";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackagingConfig {
    /// Plugin directory name inside the archive and the QGIS profile
    #[serde(default = "default_plugin_name")]
    pub plugin_name: String,
    /// Locale codes to translate; empty disables the translation targets
    #[serde(default, deserialize_with = "string_list")]
    pub locales: Vec<String>,
    /// Translation compiler
    #[serde(default = "default_lrelease")]
    pub lrelease: String,
    /// Translation string extractor
    #[serde(default = "default_pylupdate")]
    pub pylupdate: String,
    /// QGIS plugins directory, relative to `$HOME`
    #[serde(default = "default_qgisdir")]
    pub qgisdir: String,
    /// Top-level files skipped by the style checker
    #[serde(default = "default_pep8exclude", deserialize_with = "string_list")]
    pub pep8exclude: Vec<String>,
    /// Files or packages given to the linter
    #[serde(default = "default_pylint_targets", deserialize_with = "string_list")]
    pub pylint_targets: Vec<String>,
    #[serde(default = "default_pylint")]
    pub pylint: String,
    #[serde(default = "default_pycodestyle")]
    pub pycodestyle: String,
    /// Discovery test runner
    #[serde(default = "default_test_runner")]
    pub test_runner: String,
    /// Package measured for coverage
    #[serde(default = "default_test_package")]
    pub test_package: String,
}

impl Default for PackagingConfig {
    fn default() -> Self {
        Self {
            plugin_name: default_plugin_name(),
            locales: Vec::new(),
            lrelease: default_lrelease(),
            pylupdate: default_pylupdate(),
            qgisdir: default_qgisdir(),
            pep8exclude: default_pep8exclude(),
            pylint_targets: default_pylint_targets(),
            pylint: default_pylint(),
            pycodestyle: default_pycodestyle(),
            test_runner: default_test_runner(),
            test_package: default_test_package(),
        }
    }
}

impl PackagingConfig {
    /// Load the configuration.
    ///
    /// `file` replaces the optional `geosim.toml` of the current directory
    /// and must exist.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::load_with_env(file, None)
    }

    /// Same as [`load`](Self::load), reading the variables from `env`
    /// instead of the process environment when given.
    pub fn load_with_env(file: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self> {
        let file_source = match file {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(CONFIG_FILE_STEM).required(false),
        };

        let config = config::Config::builder()
            .add_source(file_source)
            .add_source(config::Environment::with_prefix(ENV_PREFIX).source(env))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

fn default_plugin_name() -> String {
    "geo_sim_processing".to_string()
}

fn default_lrelease() -> String {
    "lrelease".to_string()
}

fn default_pylupdate() -> String {
    "pylupdate5".to_string()
}

fn default_qgisdir() -> String {
    ".local/share/QGIS/QGIS3/profiles/default/python/plugins".to_string()
}

fn default_pep8exclude() -> Vec<String> {
    vec!["resources.py".to_string(), "resources_rc.py".to_string()]
}

fn default_pylint_targets() -> Vec<String> {
    vec![
        "reduce_bend_algorithm.py".to_string(),
        "chordal_axis_algorithm.py".to_string(),
    ]
}

fn default_pylint() -> String {
    "pylint".to_string()
}

fn default_pycodestyle() -> String {
    "pycodestyle".to_string()
}

fn default_test_runner() -> String {
    "nosetests".to_string()
}

fn default_test_package() -> String {
    ".".to_string()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrList {
    One(String),
    Many(Vec<String>),
}

/// Split a string on spaces and commas; pass arrays through.
pub(crate) fn split_list(value: &str) -> Vec<String> {
    value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn string_list<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<String>, D::Error> {
    Ok(match StringOrList::deserialize(deserializer)? {
        StringOrList::One(s) => split_list(&s),
        StringOrList::Many(v) => v,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn env(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_defaults() {
        let cfg = PackagingConfig::load_with_env(None, env(&[])).unwrap();
        assert_eq!(cfg, PackagingConfig::default());
        assert_eq!(cfg.plugin_name, "geo_sim_processing");
        assert!(cfg.locales.is_empty());
    }

    #[test]
    fn test_environment_overrides() {
        let cfg = PackagingConfig::load_with_env(
            None,
            env(&[
                ("GEOSIM_LOCALES", "fr de,es"),
                ("GEOSIM_LRELEASE", "/usr/lib/qt5/bin/lrelease"),
                ("GEOSIM_PLUGIN_NAME", "my_plugin"),
                ("GEOSIM_PEP8EXCLUDE", "ui.py"),
            ]),
        )
        .unwrap();
        assert_eq!(cfg.locales, vec!["fr", "de", "es"]);
        assert_eq!(cfg.lrelease, "/usr/lib/qt5/bin/lrelease");
        assert_eq!(cfg.plugin_name, "my_plugin");
        assert_eq!(cfg.pep8exclude, vec!["ui.py"]);
        assert_eq!(cfg.qgisdir, default_qgisdir());
    }

    #[test]
    fn test_file_then_environment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("packaging.toml");
        fs::write(
            &path,
            "locales = [\"fr\", \"it\"]\nqgisdir = \"qgis/plugins\"\nplugin_name = \"from_file\"\n",
        )
        .unwrap();

        let cfg = PackagingConfig::load_with_env(Some(&path), env(&[("GEOSIM_PLUGIN_NAME", "from_env")]))
            .unwrap();
        assert_eq!(cfg.locales, vec!["fr", "it"]);
        assert_eq!(cfg.qgisdir, "qgis/plugins");
        assert_eq!(cfg.plugin_name, "from_env");
    }

    #[test]
    fn test_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        assert!(PackagingConfig::load_with_env(Some(&path), env(&[])).is_err());
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(" a, b  c,,d "), vec!["a", "b", "c", "d"]);
        assert!(split_list("").is_empty());
    }
}
