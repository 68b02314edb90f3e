//! Named build targets of the plugin.

use crate::archive::build_archive;
use crate::config::PackagingConfig;
use crate::deploy::deploy;
use crate::error::{PackagingError, Result};
use crate::runner::{CommandRunner, ToolCommand};
use crate::translation::{clean_translations, compile_translations, python_sources, update_translations};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

/// Codes ignored by the style checker
pub const PYCODESTYLE_IGNORE: &str = "E203,E121,E122,E123,E124,E125,E126,E127,E128";
/// Optional linter configuration at the plugin root
pub const PYLINTRC: &str = "pylintrc";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Test,
    Deploy,
    TransUp,
    TransCompile,
    TransClean,
    Pylint,
    Pycodestyle,
    Zip,
}

impl Target {
    pub const ALL: [Target; 8] = [
        Target::Test,
        Target::Deploy,
        Target::TransUp,
        Target::TransCompile,
        Target::TransClean,
        Target::Pylint,
        Target::Pycodestyle,
        Target::Zip,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Target::Test => "test",
            Target::Deploy => "deploy",
            Target::TransUp => "transup",
            Target::TransCompile => "transcompile",
            Target::TransClean => "transclean",
            Target::Pylint => "pylint",
            Target::Pycodestyle => "pycodestyle",
            Target::Zip => "zip",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Target {
    type Err = PackagingError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_ascii_lowercase();
        Target::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or(PackagingError::UnknownTarget(s))
    }
}

/// Everything a target may need
#[derive(Debug, Clone)]
pub struct TargetContext {
    pub config: PackagingConfig,
    pub plugin_dir: PathBuf,
    /// Where the archive is written
    pub out_dir: PathBuf,
    /// Home directory for deployment
    pub home: Option<PathBuf>,
    /// Passed to the test runner
    pub pythonpath: Option<String>,
}

impl TargetContext {
    /// Context for `plugin_dir`, with `HOME` and `PYTHONPATH` taken from the
    /// process environment and the archive written next to the sources.
    pub fn new(config: PackagingConfig, plugin_dir: impl Into<PathBuf>) -> Self {
        let plugin_dir = plugin_dir.into();
        Self {
            config,
            out_dir: plugin_dir.clone(),
            plugin_dir,
            home: std::env::var_os("HOME").map(PathBuf::from),
            pythonpath: std::env::var("PYTHONPATH").ok(),
        }
    }
}

/// What a target did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetOutcome {
    /// External tools ran; `passed` is false when a tolerated step failed
    Checked { passed: bool },
    Deployed(PathBuf),
    Archived(PathBuf),
    /// Translation files updated, compiled or removed
    Translations(usize),
}

pub fn run_target(target: Target, ctx: &TargetContext, runner: &dyn CommandRunner) -> Result<TargetOutcome> {
    info!("running target '{}' in {}", target, ctx.plugin_dir.display());
    let cfg = &ctx.config;
    match target {
        Target::Test => tolerated(runner, &test_command(ctx)),
        Target::Deploy => {
            let home = ctx.home.as_deref().ok_or(PackagingError::MissingHome)?;
            deploy(cfg, &ctx.plugin_dir, home).map(TargetOutcome::Deployed)
        }
        Target::TransUp => update_translations(cfg, &ctx.plugin_dir, runner).map(TargetOutcome::Translations),
        Target::TransCompile => {
            compile_translations(cfg, &ctx.plugin_dir, runner).map(TargetOutcome::Translations)
        }
        Target::TransClean => clean_translations(&ctx.plugin_dir).map(TargetOutcome::Translations),
        Target::Pylint => tolerated(runner, &pylint_command(cfg, &ctx.plugin_dir)),
        Target::Pycodestyle => tolerated(runner, &pycodestyle_command(cfg, &ctx.plugin_dir)?),
        Target::Zip => build_archive(cfg, &ctx.plugin_dir, &ctx.out_dir).map(TargetOutcome::Archived),
    }
}

/// Run a check whose non-zero exit is reported but not returned.
fn tolerated(runner: &dyn CommandRunner, cmd: &ToolCommand) -> Result<TargetOutcome> {
    let status = runner.run(cmd)?;
    if !status.success {
        warn!("{} reported problems (exit code {:?})", cmd.program, status.code);
    }
    Ok(TargetOutcome::Checked {
        passed: status.success,
    })
}

pub fn test_command(ctx: &TargetContext) -> ToolCommand {
    let cfg = &ctx.config;
    let mut cmd = ToolCommand::new(&cfg.test_runner)
        .args(["-v", "--with-id", "--with-coverage"])
        .arg(format!("--cover-package={}", cfg.test_package))
        .env("QGIS_DEBUG", "0")
        .env("QGIS_LOG_FILE", "/dev/null")
        .current_dir(&ctx.plugin_dir);
    if let Some(pythonpath) = &ctx.pythonpath {
        cmd = cmd.env("PYTHONPATH", pythonpath);
    }
    cmd
}

pub fn pylint_command(cfg: &PackagingConfig, plugin_dir: &Path) -> ToolCommand {
    let mut cmd = ToolCommand::new(&cfg.pylint).arg("--reports=n");
    if plugin_dir.join(PYLINTRC).is_file() {
        cmd = cmd.arg(format!("--rcfile={}", PYLINTRC));
    }
    cmd.args(cfg.pylint_targets.iter().cloned())
        .current_dir(plugin_dir)
}

pub fn pycodestyle_command(cfg: &PackagingConfig, plugin_dir: &Path) -> Result<ToolCommand> {
    let files: Vec<String> = python_sources(plugin_dir)?
        .into_iter()
        .filter(|f| !cfg.pep8exclude.contains(f))
        .collect();
    Ok(ToolCommand::new(&cfg.pycodestyle)
        .arg("--repeat")
        .arg(format!("--ignore={}", PYCODESTYLE_IGNORE))
        .arg(format!("--exclude={}", cfg.pep8exclude.join(",")))
        .args(files)
        .current_dir(plugin_dir))
}
