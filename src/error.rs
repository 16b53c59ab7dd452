use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Every way a provisioning run can fail.
///
/// Nothing here is retried; the caller gets one of these and decides how to
/// present it.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Unknown platform: os '{os}', arch '{arch}' has no prebuilt release")]
    UnknownPlatform { os: String, arch: String },

    #[error("Failed to fetch release metadata from {url}: {detail}")]
    ReleaseFetchFailed {
        url: String,
        status: Option<u16>,
        detail: String,
    },

    #[error("No release asset of {release} matches {platform}-{arch}")]
    NoCompatibleAsset {
        release: String,
        platform: String,
        arch: String,
    },

    #[error("Failed to download {url}: {detail}")]
    AssetDownloadFailed {
        url: String,
        status: Option<u16>,
        detail: String,
    },

    #[error("Archive extracted to {} was empty", path.display())]
    EmptyExtraction { path: PathBuf },

    #[error("`{command}` failed ({}){}", exit_label(*code), stderr_suffix(stderr))]
    ChildProcessFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Archive could not be read: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Cannot add {} to PATH: {reason}", dir.display())]
    SearchPath { dir: PathBuf, reason: String },

    #[error("Could not determine the home directory")]
    HomeDirUnknown,

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Marks an io error raised by the HTTP body stream, so a dropped connection
/// is not mistaken for a corrupt archive.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl TransportError {
    pub fn into_io(self) -> io::Error {
        io::Error::new(io::ErrorKind::Other, self)
    }
}

impl BootstrapError {
    /// HTTP status attached to a fetch or download failure, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            BootstrapError::ReleaseFetchFailed { status, .. }
            | BootstrapError::AssetDownloadFailed { status, .. } => *status,
            _ => None,
        }
    }
}

fn exit_label(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code".to_string(),
    }
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {}", trimmed)
    }
}
