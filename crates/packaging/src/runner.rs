//! External program execution.
//!
//! Targets describe the programs they need as [`ToolCommand`]s and hand
//! them to a [`CommandRunner`], so they can be recorded instead of run.

use crate::error::{PackagingError, Result};
use std::fmt;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Command;
use std::sync::Mutex;
use tracing::debug;

/// One invocation of an external program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Variables set on top of the inherited environment
    pub envs: Vec<(String, String)>,
    pub current_dir: Option<PathBuf>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            current_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (k, v) in &self.envs {
            write!(f, "{}={} ", k, v)?;
        }
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// How a program ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolStatus {
    pub success: bool,
    /// `None` when killed by a signal
    pub code: Option<i32>,
}

impl ToolStatus {
    pub fn into_result(self, program: &str) -> Result<()> {
        if self.success {
            Ok(())
        } else {
            Err(PackagingError::ToolFailed {
                program: program.to_string(),
                code: self.code,
            })
        }
    }
}

pub trait CommandRunner {
    fn run(&self, command: &ToolCommand) -> Result<ToolStatus>;
}

/// Runs programs for real, with inherited stdin/stdout/stderr
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, command: &ToolCommand) -> Result<ToolStatus> {
        debug!("running: {}", command);
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args);
        cmd.envs(command.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        if let Some(dir) = &command.current_dir {
            cmd.current_dir(dir);
        }

        let status = cmd.status().map_err(|e| match e.kind() {
            ErrorKind::NotFound => PackagingError::ToolNotFound {
                program: command.program.clone(),
            },
            _ => PackagingError::Io(e),
        })?;

        Ok(ToolStatus {
            success: status.success(),
            code: status.code(),
        })
    }
}

/// Records commands without running them; every command ends with
/// `exit_code`.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    commands: Mutex<Vec<ToolCommand>>,
    exit_code: i32,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runner whose commands all fail with `code`
    pub fn failing(code: i32) -> Self {
        Self {
            commands: Mutex::new(Vec::new()),
            exit_code: code,
        }
    }

    pub fn commands(&self) -> Vec<ToolCommand> {
        self.commands
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, command: &ToolCommand) -> Result<ToolStatus> {
        if let Ok(mut commands) = self.commands.lock() {
            commands.push(command.clone());
        }
        Ok(ToolStatus {
            success: self.exit_code == 0,
            code: Some(self.exit_code),
        })
    }
}
