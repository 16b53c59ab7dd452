mod cli;
mod config;
mod download;
mod error;
mod install;
mod platform;
mod process;
mod tool_id;
mod types;


use anyhow::{anyhow, Context, Result};
use clap::Parser;
use cli::{Cli, Commands, ConfigAction};
use config::{
    get_setting, load_settings, load_stored_settings, save_settings, set_setting, unset_setting,
    MANAGER_NAME, MANAGER_REPO, SETTING_KEYS,
};
use install::{
    build_latest_release_url, BootstrapPlan, Bootstrapper, Collaborators, GitHubReleaseClient,
    ReleaseClient,
};
use platform::{find_asset_for_platform, AssetName, HostPlatform, PlatformKey};
use install::bootstrap::ProvisionOutcome;
use process::ExecEnv;
use std::env;
use std::path::{Path, PathBuf};
use tool_id::ToolSpec;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    setup_logging(&cli)?;

    let settings = load_settings()?;

    match cli.command {
        Commands::Version => {
            println!("toolstrap v{}", env!("CARGO_PKG_VERSION"));
        }

        Commands::Platform => {
            let host = HostPlatform::current();
            let key = PlatformKey::resolve(&host)?;
            println!("{}", key);
        }

        Commands::Locate => {
            let key = PlatformKey::resolve(&HostPlatform::current())?;
            let client = GitHubReleaseClient::new(false)?;
            let release = client
                .latest_release(&build_latest_release_url(MANAGER_REPO))
                .await?;

            match find_asset_for_platform(&release.assets, &key) {
                Some(asset) => {
                    match AssetName::parse(&asset.name) {
                        Some(parts) => println!(
                            "{} {} for {}-{}: {}",
                            parts.tool, parts.version, parts.platform, parts.arch, asset.name
                        ),
                        None => println!("{} ({})", asset.name, release.display_name()),
                    }
                    println!("{}", asset.browser_download_url);
                }
                None => {
                    tracing::error!(
                        "{} {} has no asset for {}",
                        MANAGER_NAME,
                        release.display_name(),
                        key
                    );
                    std::process::exit(1);
                }
            }
        }

        Commands::Ensure { dir, tool, bin } => {
            let target = resolve_target_dir(dir)?;
            let tool_spec = ToolSpec::parse(tool.as_deref().unwrap_or(&settings.tool))
                .map_err(|e| anyhow!("Invalid tool identifier: {}", e))?
                .with_binary(bin.or_else(|| settings.tool_bin.clone()));

            let plan = BootstrapPlan::new(tool_spec.clone(), &target);
            let collaborators = Collaborators::system(settings.show_progress && !cli.quiet)?;
            let bootstrapper = Bootstrapper::new(plan, collaborators, ExecEnv::from_process());

            match bootstrapper.run().await {
                Ok(outcome) => {
                    tracing::debug!("PATH for child processes: {:?}", outcome.env.path());
                    println!(
                        "{} {}",
                        console::style("✔").green(),
                        ensure_summary(&outcome, &tool_spec, &target)
                    );
                }
                Err(e) => {
                    if let Some(status) = e.http_status() {
                        tracing::debug!("Last HTTP status: {}", status);
                    }
                    tracing::error!("Failed to provision {}: {}", tool_spec, e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Config { action } => run_config_action(action)?,
    }

    Ok(())
}

fn setup_logging(cli: &Cli) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if cli.quiet {
        "error"
    } else if cli.verbose == 0 {
        "warn"
    } else if cli.verbose == 1 {
        "info"
    } else {
        "debug"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    Ok(())
}

/// One-line confirmation for a run that reached `ToolEnsured`.
fn ensure_summary(outcome: &ProvisionOutcome, tool: &ToolSpec, target: &Path) -> String {
    if outcome.manager_installed {
        return format!(
            "Installed {} and made {} available in {}",
            MANAGER_NAME,
            tool,
            target.display()
        );
    }

    let mut detail = Vec::new();
    if outcome.config_created {
        detail.push(format!("created {}.toml", MANAGER_NAME));
    }
    if outcome.tool_added {
        detail.push("added the tool".to_string());
    }

    if detail.is_empty() {
        format!("{} is ready in {}", tool, target.display())
    } else {
        format!("{} is ready in {} ({})", tool, target.display(), detail.join(", "))
    }
}

fn resolve_target_dir(dir: Option<PathBuf>) -> Result<PathBuf> {
    let dir = match dir {
        Some(dir) => dir,
        None => env::current_dir().context("Could not determine the current directory")?,
    };

    if !dir.is_dir() {
        return Err(anyhow!(
            "Project directory {} does not exist or is not a directory",
            dir.display()
        ));
    }

    dir.canonicalize()
        .with_context(|| format!("Could not resolve {}", dir.display()))
}

fn run_config_action(action: ConfigAction) -> Result<()> {
    // Edits go against the stored file so env overrides are never persisted
    let mut stored = load_stored_settings()?;

    match action {
        ConfigAction::Get { key } => {
            let effective = load_settings()?;
            if let Some(key) = key {
                match get_setting(&effective, &key) {
                    Some(value) => println!("{}", value),
                    None => return Err(anyhow!("Setting '{}' not found", key)),
                }
            } else {
                println!("--- Toolstrap Settings ---");
                for key in SETTING_KEYS {
                    println!("  {}: {}", key, get_setting(&effective, key).unwrap_or_default());
                }
            }
        }
        ConfigAction::Set { args } => {
            let (key, value) = match args.as_slice() {
                [pair] => pair
                    .split_once('=')
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .ok_or_else(|| anyhow!("Invalid format. Use 'key=value' or 'key value'."))?,
                [key, rest @ ..] => (key.clone(), rest.join(" ")),
                [] => return Err(anyhow!("Missing key and value")),
            };
            set_setting(&mut stored, &key, &value)?;
            save_settings(&stored)?;
            tracing::info!("Setting '{}' updated to '{}'", key, value);
        }
        ConfigAction::Unset { key } => {
            unset_setting(&mut stored, &key)?;
            save_settings(&stored)?;
            tracing::info!("Setting '{}' unset", key);
        }
        ConfigAction::Show { format } => {
            let effective = load_settings()?;
            match format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&effective)?),
                "yaml" => print!("{}", serde_yaml::to_string(&effective)?),
                other => {
                    return Err(anyhow!(
                        "Unknown format '{}'. Use 'json' or 'yaml'.",
                        other
                    ))
                }
            }
        }
    }

    Ok(())
}
