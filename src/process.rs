//! Child process execution against an explicit environment.
//!
//! The search path handed to children lives in [`ExecEnv`] rather than in the
//! real process environment, so a fresh manager install only affects the
//! commands this crate spawns afterwards.

use crate::error::BootstrapError;
use async_trait::async_trait;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecEnv {
    path: OsString,
    home: Option<PathBuf>,
}

impl ExecEnv {
    pub fn new(path: impl Into<OsString>, home: Option<PathBuf>) -> Self {
        Self {
            path: path.into(),
            home,
        }
    }

    pub fn from_process() -> Self {
        Self::new(
            std::env::var_os("PATH").unwrap_or_default(),
            dirs::home_dir(),
        )
    }

    pub fn path(&self) -> &OsStr {
        &self.path
    }

    pub fn home(&self) -> Option<&Path> {
        self.home.as_deref()
    }

    /// `<home>/.<manager>/bin`, where the manager links the tools it installs.
    pub fn manager_bin_dir(&self, manager: &str) -> Result<PathBuf, BootstrapError> {
        let home = self.home().ok_or(BootstrapError::HomeDirUnknown)?;
        Ok(home.join(format!(".{}", manager)).join("bin"))
    }

    pub fn append_path(&mut self, dir: &Path) -> Result<(), BootstrapError> {
        let mut entries: Vec<PathBuf> = std::env::split_paths(&self.path).collect();
        if entries.iter().any(|entry| entry == dir) {
            tracing::debug!("{} is already on PATH", dir.display());
            return Ok(());
        }
        entries.push(dir.to_path_buf());

        self.path = std::env::join_paths(entries).map_err(|e| BootstrapError::SearchPath {
            dir: dir.to_path_buf(),
            reason: e.to_string(),
        })?;
        tracing::debug!("Appended {} to PATH", dir.display());
        Ok(())
    }
}

/// One child process to spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: None,
        }
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Locate `program` on the env's search path.
    fn resolve(&self, program: &str, env: &ExecEnv) -> Option<PathBuf>;

    /// Spawn and wait. `Err` means the process could not be started at all.
    async fn run(&self, invocation: &Invocation, env: &ExecEnv) -> io::Result<ProcessOutput>;
}

/// Spawns real processes with `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcessRunner;

#[async_trait]
impl ProcessRunner for SystemProcessRunner {
    fn resolve(&self, program: &str, env: &ExecEnv) -> Option<PathBuf> {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        which::which_in(program, Some(env.path()), cwd).ok()
    }

    async fn run(&self, invocation: &Invocation, env: &ExecEnv) -> io::Result<ProcessOutput> {
        // Look the program up on the env's PATH ourselves; the OS lookup
        // would otherwise use this process's own PATH on some platforms.
        let program = match invocation.program.to_str() {
            Some(name) if invocation.program.components().count() == 1 => self
                .resolve(name, env)
                .unwrap_or_else(|| invocation.program.clone()),
            _ => invocation.program.clone(),
        };

        tracing::debug!("Executing: {:?} {:?}", program, invocation.args);

        let mut cmd = Command::new(&program);
        cmd.args(&invocation.args)
            .env("PATH", env.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &invocation.cwd {
            cmd.current_dir(cwd);
        }

        let output = cmd.output().await?;
        let result = ProcessOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };
        tracing::trace!("{} exited with {:?}", invocation, result.code);
        Ok(result)
    }
}
