use clap::{Parser, Subcommand};
use std::path::PathBuf;

fn get_version() -> &'static str {
    const BASE_VERSION: &str = env!("CARGO_PKG_VERSION");

    // If there's a git tag at HEAD, use just the tag (release build)
    if let Some(tag) = option_env!("TOOLSTRAP_GIT_TAG") {
        return tag;
    }

    let commit = option_env!("TOOLSTRAP_GIT_COMMIT").unwrap_or("unknown");

    // Leaked once at startup to satisfy clap's 'static requirement
    let version = format!("v{}-{}", BASE_VERSION, commit);
    Box::leak(version.into_boxed_str())
}

#[derive(Parser)]
#[command(name = "toolstrap")]
#[command(about = "Bootstraps the aftman toolchain manager and a managed tool into a project")]
#[command(version = get_version(), propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (use multiple times for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Reduce output to errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Install aftman if needed and make the managed tool available in a project
    #[command(
        after_help = "Examples:\n  toolstrap ensure\n  toolstrap ensure ./my-game --tool rojo-rbx/rojo\n  toolstrap -v ensure . --tool JohnnyMorganz/StyLua --bin stylua"
    )]
    Ensure {
        /// Project directory (defaults to the current directory)
        dir: Option<PathBuf>,
        /// Managed tool as 'owner/repo' (overrides the configured tool)
        #[arg(long)]
        tool: Option<String>,
        /// Executable name of the managed tool, if it differs from the repo name
        #[arg(long)]
        bin: Option<String>,
    },

    /// Print the release platform key for this host
    Platform,

    /// Show the aftman release asset that would be installed on this host
    Locate,

    /// Manage toolstrap's configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show the current version
    Version,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a configuration setting
    Get {
        /// Key to get (if omitted, shows all settings)
        key: Option<String>,
    },
    /// Set a configuration setting
    Set {
        /// Key and value (e.g., 'tool=rojo-rbx/rojo' or 'tool rojo-rbx/rojo')
        #[arg(trailing_var_arg = true, required = true)]
        args: Vec<String>,
    },
    /// Reset a configuration setting to its default
    Unset {
        /// Key to unset (e.g., 'tool-bin')
        key: String,
    },
    /// Show full configuration
    Show {
        /// Output format (json, yaml)
        #[arg(long, default_value = "json")]
        format: String,
    },
}
