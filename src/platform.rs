use crate::error::BootstrapError;
use crate::types::Asset;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Raw OS and CPU identifiers as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPlatform {
    pub os: String,
    pub arch: String,
}

impl HostPlatform {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    pub fn current() -> Self {
        Self::new(std::env::consts::OS, std::env::consts::ARCH)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformToken {
    MacOs,
    Linux,
    Windows,
}

impl PlatformToken {
    pub fn as_str(self) -> &'static str {
        match self {
            PlatformToken::MacOs => "macos",
            PlatformToken::Linux => "linux",
            PlatformToken::Windows => "windows",
        }
    }

    fn from_os(os: &str) -> Option<Self> {
        match os {
            "macos" | "darwin" => Some(PlatformToken::MacOs),
            "linux" => Some(PlatformToken::Linux),
            "windows" | "win32" => Some(PlatformToken::Windows),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchToken {
    Aarch64,
    X86_64,
}

impl ArchToken {
    pub fn as_str(self) -> &'static str {
        match self {
            ArchToken::Aarch64 => "aarch64",
            ArchToken::X86_64 => "x86_64",
        }
    }

    fn from_arch(arch: &str) -> Option<Self> {
        match arch {
            "aarch64" | "arm64" => Some(ArchToken::Aarch64),
            "x86_64" | "x64" | "amd64" => Some(ArchToken::X86_64),
            _ => None,
        }
    }
}

/// Host platform expressed in the release naming vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformKey {
    pub platform: PlatformToken,
    pub arch: ArchToken,
}

impl PlatformKey {
    pub fn resolve(host: &HostPlatform) -> Result<Self, BootstrapError> {
        let platform = PlatformToken::from_os(&host.os);
        let arch = ArchToken::from_arch(&host.arch);

        match (platform, arch) {
            (Some(platform), Some(arch)) => {
                tracing::debug!(
                    "Resolved host {}/{} to {}-{}",
                    host.os,
                    host.arch,
                    platform.as_str(),
                    arch.as_str()
                );
                Ok(Self { platform, arch })
            }
            _ => Err(BootstrapError::UnknownPlatform {
                os: host.os.clone(),
                arch: host.arch.clone(),
            }),
        }
    }

    /// Name suffix an asset must end with to match this key.
    pub fn asset_suffix(&self) -> String {
        format!("-{}-{}.zip", self.platform.as_str(), self.arch.as_str())
    }
}

impl fmt::Display for PlatformKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.platform.as_str(), self.arch.as_str())
    }
}

/// Parts of an asset name following `<tool>-<version>-<platform>-<arch>.zip`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetName {
    pub tool: String,
    pub version: String,
    pub platform: String,
    pub arch: String,
}

impl AssetName {
    pub fn parse(name: &str) -> Option<Self> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let re = PATTERN.get_or_init(|| {
            Regex::new(r"^(?P<tool>.+)-(?P<version>v?\d[^-]*)-(?P<platform>[a-z0-9]+)-(?P<arch>[a-z0-9_]+)\.zip$")
                .expect("asset name pattern is valid")
        });

        let caps = re.captures(name)?;
        Some(Self {
            tool: caps["tool"].to_string(),
            version: caps["version"].to_string(),
            platform: caps["platform"].to_string(),
            arch: caps["arch"].to_string(),
        })
    }
}

/// First asset, in listed order, built for `key`. Unrelated assets are skipped.
pub fn find_asset_for_platform<'a>(assets: &'a [Asset], key: &PlatformKey) -> Option<&'a Asset> {
    let suffix = key.asset_suffix();
    tracing::trace!("Looking for assets ending in '{}'", suffix);

    let found = assets.iter().find(|asset| asset.name.ends_with(&suffix));

    match found {
        Some(asset) => match AssetName::parse(&asset.name) {
            Some(parts) => tracing::info!(
                "Found {} {} for {}: '{}'",
                parts.tool,
                parts.version,
                key,
                asset.name
            ),
            None => tracing::info!("Found asset for {}: '{}'", key, asset.name),
        },
        None => tracing::debug!("No asset among {} matches {}", assets.len(), key),
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(name: &str) -> Asset {
        Asset {
            name: name.to_string(),
            browser_download_url: format!("https://example.invalid/{}", name),
            content_type: Some("application/zip".to_string()),
            size: 1024,
        }
    }

    fn key(os: &str, arch: &str) -> PlatformKey {
        PlatformKey::resolve(&HostPlatform::new(os, arch)).unwrap()
    }

    #[test]
    fn test_resolve_supported_pairs() {
        let cases = [
            ("macos", "aarch64", "macos", "aarch64"),
            ("darwin", "arm64", "macos", "aarch64"),
            ("macos", "x86_64", "macos", "x86_64"),
            ("linux", "x86_64", "linux", "x86_64"),
            ("linux", "aarch64", "linux", "aarch64"),
            ("windows", "x86_64", "windows", "x86_64"),
            ("win32", "x64", "windows", "x86_64"),
            ("windows", "aarch64", "windows", "aarch64"),
        ];

        for (os, arch, platform, arch_token) in cases {
            let key = key(os, arch);
            assert_eq!(key.platform.as_str(), platform, "os {}", os);
            assert_eq!(key.arch.as_str(), arch_token, "arch {}", arch);
        }
    }

    #[test]
    fn test_resolve_unknown_platform_keeps_raw_values() {
        for (os, arch) in [("freebsd", "x86_64"), ("linux", "riscv64"), ("", "")] {
            match PlatformKey::resolve(&HostPlatform::new(os, arch)) {
                Err(BootstrapError::UnknownPlatform { os: o, arch: a }) => {
                    assert_eq!(o, os);
                    assert_eq!(a, arch);
                }
                other => panic!("expected UnknownPlatform, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_find_asset_first_match() {
        let assets = vec![
            asset("tool-v1.0.0-windows-x86_64.zip"),
            asset("tool-v1.0.0-linux-x86_64.zip"),
            asset("tool-v1.0.0-macos-aarch64.zip"),
        ];

        let found = find_asset_for_platform(&assets, &key("linux", "x86_64")).unwrap();
        assert_eq!(found.name, "tool-v1.0.0-linux-x86_64.zip");

        assert!(find_asset_for_platform(&assets, &key("windows", "aarch64")).is_none());
    }

    #[test]
    fn test_find_asset_skips_unrelated_names() {
        let assets = vec![
            asset("tool-v1.0.0-source.tar.gz"),
            asset("tool-v1.0.0-linux-x86_64.zip.sha256"),
            asset("tool-v1.0.0-linux-x86_64.zip"),
            asset("tool-v1.0.1-linux-x86_64.zip"),
        ];

        let found = find_asset_for_platform(&assets, &key("linux", "x86_64")).unwrap();
        assert_eq!(found.name, "tool-v1.0.0-linux-x86_64.zip");
        assert!(find_asset_for_platform(&[], &key("linux", "x86_64")).is_none());
    }

    #[test]
    fn test_asset_name_parse() {
        let parts = AssetName::parse("aftman-0.2.7-macos-aarch64.zip").unwrap();
        assert_eq!(parts.tool, "aftman");
        assert_eq!(parts.version, "0.2.7");
        assert_eq!(parts.platform, "macos");
        assert_eq!(parts.arch, "aarch64");

        let parts = AssetName::parse("some-tool-v1.0.0-windows-x86_64.zip").unwrap();
        assert_eq!(parts.tool, "some-tool");
        assert_eq!(parts.version, "v1.0.0");

        assert!(AssetName::parse("tool-v1.0.0-source.tar.gz").is_none());
    }

    #[test]
    fn test_platform_key_display() {
        assert_eq!(key("darwin", "arm64").to_string(), "macos-aarch64");
        assert_eq!(key("linux", "amd64").asset_suffix(), "-linux-x86_64.zip");
    }
}
