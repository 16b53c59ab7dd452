use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolstrapSettings {
    #[serde(default = "default_tool")]
    pub tool: String,
    #[serde(default)]
    pub tool_bin: Option<String>,
    #[serde(default = "default_show_progress")]
    pub show_progress: bool,
}

fn default_tool() -> String {
    "rojo-rbx/rojo".to_string()
}
fn default_show_progress() -> bool {
    true
}

impl Default for ToolstrapSettings {
    fn default() -> Self {
        Self {
            tool: default_tool(),
            tool_bin: None,
            show_progress: default_show_progress(),
        }
    }
}

/// Snapshot of one published release. Fetched per run, never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReleaseMetadata {
    #[serde(default)]
    pub name: Option<String>,
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

impl ReleaseMetadata {
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.tag_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Asset {
    pub name: String,
    pub browser_download_url: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub size: u64,
}

/// The extracted manager executable, before it installs itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledBinary {
    pub path: PathBuf,
    pub bytes: u64,
}
