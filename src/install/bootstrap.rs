//! Bootstrap state machine
//!
//! Takes a project directory from "manager maybe missing" to "managed tool
//! available", one explicit state at a time:
//!
//! ```text
//! Start ─┬─> ManagerAbsent ─> ManagerInstalling ─┐
//!        └───────────────────────────────────────┴─> ManagerInstalled
//!   ─> ToolTrusted ─> ConfigReady ─> ToolEnsured
//! ```
//!
//! Every failure ends the run. The only condition handled locally is a config
//! that exists while the tool's version probe fails, which is repaired with an
//! explicit `add`.

use crate::config::{MANAGER_NAME, MANAGER_REPO};
use crate::download::{fetch_manager_binary, temp_binary_path, ArchiveExtractor, ZipExtractor};
use crate::error::BootstrapError;
use crate::install::github::{build_latest_release_url, GitHubReleaseClient, ReleaseClient};
use crate::platform::{find_asset_for_platform, HostPlatform, PlatformKey};
use crate::process::{ExecEnv, Invocation, ProcessOutput, ProcessRunner, SystemProcessRunner};
use crate::tool_id::ToolSpec;
use crate::types::InstalledBinary;
use std::path::PathBuf;
use std::sync::Arc;

/// What to provision, and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapPlan {
    pub manager: String,
    pub release_url: String,
    pub tool: ToolSpec,
    pub target_dir: PathBuf,
    pub temp_dir: PathBuf,
    pub host: HostPlatform,
}

impl BootstrapPlan {
    pub fn new(tool: ToolSpec, target_dir: impl Into<PathBuf>) -> Self {
        Self {
            manager: MANAGER_NAME.to_string(),
            release_url: build_latest_release_url(MANAGER_REPO),
            tool,
            target_dir: target_dir.into(),
            temp_dir: std::env::temp_dir(),
            host: HostPlatform::current(),
        }
    }

    /// `<target>/<manager>.toml`
    pub fn config_file(&self) -> PathBuf {
        self.target_dir.join(format!("{}.toml", self.manager))
    }
}

/// External capabilities the state machine drives.
#[derive(Clone)]
pub struct Collaborators {
    pub releases: Arc<dyn ReleaseClient>,
    pub extractor: Arc<dyn ArchiveExtractor>,
    pub runner: Arc<dyn ProcessRunner>,
}

impl Collaborators {
    pub fn system(show_progress: bool) -> Result<Self, BootstrapError> {
        Ok(Self {
            releases: Arc::new(GitHubReleaseClient::new(show_progress)?),
            extractor: Arc::new(ZipExtractor),
            runner: Arc::new(SystemProcessRunner),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOrigin {
    Existing,
    Created,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapState {
    Start,
    ManagerAbsent,
    ManagerInstalling { binary: InstalledBinary },
    ManagerInstalled,
    ToolTrusted,
    ConfigReady { origin: ConfigOrigin },
    ToolEnsured,
}

impl BootstrapState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BootstrapState::ToolEnsured)
    }

    pub fn name(&self) -> &'static str {
        match self {
            BootstrapState::Start => "Start",
            BootstrapState::ManagerAbsent => "ManagerAbsent",
            BootstrapState::ManagerInstalling { .. } => "ManagerInstalling",
            BootstrapState::ManagerInstalled => "ManagerInstalled",
            BootstrapState::ToolTrusted => "ToolTrusted",
            BootstrapState::ConfigReady { .. } => "ConfigReady",
            BootstrapState::ToolEnsured => "ToolEnsured",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionOutcome {
    pub manager_installed: bool,
    pub config_created: bool,
    pub tool_added: bool,
    /// Environment the caller should hand to anything that needs the tool.
    pub env: ExecEnv,
}

pub struct Bootstrapper {
    plan: BootstrapPlan,
    collaborators: Collaborators,
    env: ExecEnv,
    manager_installed: bool,
    config_created: bool,
    tool_added: bool,
}

impl Bootstrapper {
    pub fn new(plan: BootstrapPlan, collaborators: Collaborators, env: ExecEnv) -> Self {
        Self {
            plan,
            collaborators,
            env,
            manager_installed: false,
            config_created: false,
            tool_added: false,
        }
    }

    pub async fn run(mut self) -> Result<ProvisionOutcome, BootstrapError> {
        tracing::info!(
            "Ensuring {} via {} in {}",
            self.plan.tool,
            self.plan.manager,
            self.plan.target_dir.display()
        );

        let mut state = BootstrapState::Start;
        while !state.is_terminal() {
            state = self.advance(state).await?;
        }

        Ok(ProvisionOutcome {
            manager_installed: self.manager_installed,
            config_created: self.config_created,
            tool_added: self.tool_added,
            env: self.env,
        })
    }

    /// Run the single step leaving `state`.
    pub async fn advance(&mut self, state: BootstrapState) -> Result<BootstrapState, BootstrapError> {
        let from = state.name();
        let next = match state {
            BootstrapState::Start => self.check_presence(),
            BootstrapState::ManagerAbsent => self.acquire_manager().await?,
            BootstrapState::ManagerInstalling { binary } => self.self_install(&binary).await?,
            BootstrapState::ManagerInstalled => self.trust().await?,
            BootstrapState::ToolTrusted => self.prepare_config().await?,
            BootstrapState::ConfigReady { origin } => self.ensure_tool(origin).await?,
            BootstrapState::ToolEnsured => BootstrapState::ToolEnsured,
        };
        tracing::debug!("{} -> {}", from, next.name());
        Ok(next)
    }

    fn check_presence(&self) -> BootstrapState {
        match self
            .collaborators
            .runner
            .resolve(&self.plan.manager, &self.env)
        {
            Some(path) => {
                tracing::info!("Found {} at {}", self.plan.manager, path.display());
                BootstrapState::ManagerInstalled
            }
            None => {
                tracing::info!("{} is not on PATH", self.plan.manager);
                BootstrapState::ManagerAbsent
            }
        }
    }

    async fn acquire_manager(&self) -> Result<BootstrapState, BootstrapError> {
        let key = PlatformKey::resolve(&self.plan.host)?;

        let release = self
            .collaborators
            .releases
            .latest_release(&self.plan.release_url)
            .await?;

        let asset = find_asset_for_platform(&release.assets, &key).ok_or_else(|| {
            BootstrapError::NoCompatibleAsset {
                release: format!("{} {}", self.plan.manager, release.display_name()),
                platform: key.platform.as_str().to_string(),
                arch: key.arch.as_str().to_string(),
            }
        })?;

        let dest = temp_binary_path(&self.plan.temp_dir, &self.plan.manager);
        let binary = fetch_manager_binary(
            self.collaborators.releases.as_ref(),
            self.collaborators.extractor.as_ref(),
            asset,
            &dest,
        )
        .await?;

        Ok(BootstrapState::ManagerInstalling { binary })
    }

    async fn self_install(
        &mut self,
        binary: &InstalledBinary,
    ) -> Result<BootstrapState, BootstrapError> {
        tracing::info!(
            "Installing {} from {} ({} bytes)...",
            self.plan.manager,
            binary.path.display(),
            binary.bytes
        );
        self.run_checked(Invocation::new(&binary.path, ["self-install"]))
            .await?;

        let bin_dir = self.env.manager_bin_dir(&self.plan.manager)?;
        self.env.append_path(&bin_dir)?;
        self.manager_installed = true;

        Ok(BootstrapState::ManagerInstalled)
    }

    async fn trust(&self) -> Result<BootstrapState, BootstrapError> {
        let repo = self.plan.tool.full_repo();
        self.run_checked(self.manager(["trust", repo.as_str()]))
            .await?;
        Ok(BootstrapState::ToolTrusted)
    }

    async fn prepare_config(&mut self) -> Result<BootstrapState, BootstrapError> {
        let config_file = self.plan.config_file();

        if tokio::fs::try_exists(&config_file).await? {
            tracing::debug!("Found {}", config_file.display());
            self.run_checked(self.manager(["install", "--skip-untrusted"]))
                .await?;
            Ok(BootstrapState::ConfigReady {
                origin: ConfigOrigin::Existing,
            })
        } else {
            tracing::info!("No {} yet, running init", config_file.display());
            self.run_checked(self.manager(["init"])).await?;
            self.config_created = true;
            Ok(BootstrapState::ConfigReady {
                origin: ConfigOrigin::Created,
            })
        }
    }

    async fn ensure_tool(&mut self, origin: ConfigOrigin) -> Result<BootstrapState, BootstrapError> {
        if origin == ConfigOrigin::Existing && self.tool_responds().await {
            return Ok(BootstrapState::ToolEnsured);
        }

        let repo = self.plan.tool.full_repo();
        self.run_checked(self.manager(["add", repo.as_str()]))
            .await?;
        self.tool_added = true;
        Ok(BootstrapState::ToolEnsured)
    }

    async fn tool_responds(&self) -> bool {
        let probe =
            Invocation::new(self.plan.tool.binary_name(), ["--version"]).in_dir(&self.plan.target_dir);

        match self.collaborators.runner.run(&probe, &self.env).await {
            Ok(output) if output.success() => {
                tracing::info!("{} is available: {}", self.plan.tool, output.stdout.trim());
                true
            }
            Ok(output) => {
                tracing::warn!(
                    "`{}` exited with {:?}; adding {} explicitly",
                    probe,
                    output.code,
                    self.plan.tool
                );
                false
            }
            Err(e) => {
                tracing::warn!("`{}` could not run ({}); adding {} explicitly", probe, e, self.plan.tool);
                false
            }
        }
    }

    fn manager<const N: usize>(&self, args: [&str; N]) -> Invocation {
        Invocation::new(&self.plan.manager, args).in_dir(&self.plan.target_dir)
    }

    async fn run_checked(&self, invocation: Invocation) -> Result<ProcessOutput, BootstrapError> {
        tracing::info!("Running `{}`", invocation);

        let output = self
            .collaborators
            .runner
            .run(&invocation, &self.env)
            .await
            .map_err(|e| BootstrapError::ChildProcessFailed {
                command: invocation.to_string(),
                code: None,
                stderr: e.to_string(),
            })?;

        if !output.success() {
            return Err(BootstrapError::ChildProcessFailed {
                command: invocation.to_string(),
                code: output.code,
                stderr: output.stderr,
            });
        }
        Ok(output)
    }
}
