use crate::types::*;
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

pub const CONFIG_DIR_NAME: &str = ".toolstrap";
pub const CONFIG_FILE_NAME: &str = "config.json";

/// The toolchain manager this crate provisions, and its only release feed.
pub const MANAGER_NAME: &str = "aftman";
pub const MANAGER_REPO: &str = "LPGhatguy/aftman";

pub const SETTING_KEYS: [&str; 3] = ["tool", "tool_bin", "show_progress"];

pub fn get_user_config_dir() -> Result<PathBuf> {
    let path = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
        .join(CONFIG_DIR_NAME);
    fs::create_dir_all(&path)?;
    Ok(path)
}

pub fn get_config_file_path() -> Result<PathBuf> {
    let path = match std::env::var_os("TOOLSTRAP_CONFIG") {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => get_user_config_dir()?.join(CONFIG_FILE_NAME),
    };
    tracing::debug!("Config file path: {}", path.display());
    Ok(path)
}

/// Settings as stored on disk, without environment overrides.
pub fn load_stored_settings() -> Result<ToolstrapSettings> {
    let config_path = get_config_file_path()?;

    if !config_path.exists() {
        return Ok(ToolstrapSettings::default());
    }

    let content = fs::read_to_string(&config_path)
        .with_context(|| format!("Could not read config file at {}", config_path.display()))?;

    serde_json::from_str(&content).with_context(|| "Could not parse config file as JSON")
}

pub fn load_settings() -> Result<ToolstrapSettings> {
    let mut settings = load_stored_settings()?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

fn apply_env_overrides(settings: &mut ToolstrapSettings) {
    if let Ok(tool) = std::env::var("TOOLSTRAP_TOOL") {
        if !tool.is_empty() {
            settings.tool = tool;
        }
    }

    if let Ok(tool_bin) = std::env::var("TOOLSTRAP_TOOL_BIN") {
        settings.tool_bin = Some(tool_bin).filter(|b| !b.is_empty());
    }

    if let Ok(show_progress) = std::env::var("TOOLSTRAP_SHOW_PROGRESS") {
        settings.show_progress = parse_bool(&show_progress);
    }
}

pub fn save_settings(settings: &ToolstrapSettings) -> Result<()> {
    let config_path = get_config_file_path()?;
    let config_dir = config_path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("Invalid config path"))?;

    fs::create_dir_all(config_dir)?;

    let content = serde_json::to_string_pretty(settings)?;
    fs::write(&config_path, content)
        .with_context(|| format!("Could not write config file at {}", config_path.display()))?;

    Ok(())
}

pub fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

pub fn normalize_key(key: &str) -> String {
    key.replace('-', "_")
        .chars()
        .map(|c| {
            if c.is_ascii_uppercase() {
                format!("_{}", c.to_lowercase())
            } else {
                c.to_string()
            }
        })
        .collect::<String>()
        .to_lowercase()
}

pub fn get_setting(settings: &ToolstrapSettings, key: &str) -> Option<String> {
    match normalize_key(key).as_str() {
        "tool" => Some(settings.tool.clone()),
        "tool_bin" => Some(settings.tool_bin.clone().unwrap_or_default()),
        "show_progress" => Some(settings.show_progress.to_string()),
        _ => None,
    }
}

/// Apply `key=value` to `settings`, validating the value for its key.
pub fn set_setting(settings: &mut ToolstrapSettings, key: &str, value: &str) -> Result<()> {
    let key = normalize_key(key);
    match key.as_str() {
        "tool" => {
            crate::tool_id::ToolSpec::parse(value).map_err(|e| anyhow::anyhow!(e))?;
            settings.tool = value.trim().to_string();
        }
        "tool_bin" => settings.tool_bin = Some(value.trim().to_string()).filter(|b| !b.is_empty()),
        "show_progress" => settings.show_progress = parse_bool(value),
        _ => anyhow::bail!(
            "'{}' is not a valid configuration setting. Valid settings: {}",
            key,
            SETTING_KEYS.join(", ")
        ),
    }
    Ok(())
}

pub fn unset_setting(settings: &mut ToolstrapSettings, key: &str) -> Result<()> {
    let key = normalize_key(key);
    let defaults = ToolstrapSettings::default();
    match key.as_str() {
        "tool" => settings.tool = defaults.tool,
        "tool_bin" => settings.tool_bin = defaults.tool_bin,
        "show_progress" => settings.show_progress = defaults.show_progress,
        _ => anyhow::bail!(
            "'{}' is not a valid configuration setting. Valid settings: {}",
            key,
            SETTING_KEYS.join(", ")
        ),
    }
    Ok(())
}
