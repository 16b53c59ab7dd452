use std::fmt;

/// The managed tool, as the manager knows it: a GitHub `owner/repo` plus the
/// executable name it installs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSpec {
    pub owner: String,
    pub repo: String,
    pub binary: Option<String>,
}

impl ToolSpec {
    /// Parse a tool identifier:
    /// - "owner/repo" (executable named after the repo)
    pub fn parse(tool_id: &str) -> Result<Self, String> {
        let tool_id = tool_id.trim();
        if tool_id.is_empty() {
            return Err("Tool identifier cannot be empty".to_string());
        }

        if tool_id.starts_with('-') {
            return Err(format!(
                "Invalid tool identifier '{}'. It looks like a CLI flag.",
                tool_id
            ));
        }

        if tool_id.contains('@') {
            return Err(format!(
                "Invalid tool identifier '{}'. Versions are chosen by the manager, use 'owner/repo'.",
                tool_id
            ));
        }

        let parts: Vec<&str> = tool_id.split('/').collect();
        match parts.as_slice() {
            [owner, repo] if !owner.is_empty() && !repo.is_empty() => Ok(ToolSpec {
                owner: owner.to_string(),
                repo: repo.to_string(),
                binary: None,
            }),
            _ => Err(format!(
                "Invalid repository format: '{}'. Expected 'owner/repo'.",
                tool_id
            )),
        }
    }

    pub fn with_binary(mut self, binary: Option<String>) -> Self {
        self.binary = binary.filter(|b| !b.trim().is_empty());
        self
    }

    /// Get: full repository string (owner/repo)
    pub fn full_repo(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    /// Get: executable name used for the version probe
    pub fn binary_name(&self) -> String {
        self.binary
            .clone()
            .unwrap_or_else(|| self.repo.to_lowercase())
    }
}

impl fmt::Display for ToolSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_repo())
    }
}
