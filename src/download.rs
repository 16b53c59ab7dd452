use crate::error::{BootstrapError, TransportError};
use crate::install::github::ReleaseClient;
use crate::types::{Asset, InstalledBinary};
use async_trait::async_trait;
use std::fs;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tokio::io::AsyncRead;
use tokio_util::io::SyncIoBridge;

/// Body of a downloaded archive, read as it arrives.
pub type ArchiveStream = Box<dyn AsyncRead + Send + Unpin>;

#[async_trait]
pub trait ArchiveExtractor: Send + Sync {
    /// Write the single entry of `archive` to `dest`, returning the byte count.
    async fn extract_single(&self, archive: ArchiveStream, dest: &Path)
        -> Result<u64, BootstrapError>;
}

/// Decodes the first local entry of a zip archive without buffering the
/// whole download.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipExtractor;

#[async_trait]
impl ArchiveExtractor for ZipExtractor {
    async fn extract_single(
        &self,
        archive: ArchiveStream,
        dest: &Path,
    ) -> Result<u64, BootstrapError> {
        let dest = dest.to_path_buf();
        tokio::task::spawn_blocking(move || extract_first_entry(archive, &dest))
            .await
            .map_err(|e| BootstrapError::Io(io::Error::new(io::ErrorKind::Other, e)))?
    }
}

fn extract_first_entry(archive: ArchiveStream, dest: &Path) -> Result<u64, BootstrapError> {
    let mut reader = BufReader::new(SyncIoBridge::new(archive));
    let mut outfile = fs::File::create(dest)?;

    // A body that ends before the first header carries no entry at all
    let written = if reader.fill_buf()?.is_empty() {
        0
    } else {
        match zip::read::read_zipfile_from_stream(&mut reader)? {
            Some(mut entry) => {
                tracing::debug!(
                    "Extracting '{}' ({} bytes) to {}",
                    entry.name(),
                    entry.size(),
                    dest.display()
                );
                io::copy(&mut entry, &mut outfile)?
            }
            None => 0,
        }
    };

    outfile.flush()?;
    outfile.sync_all()?;
    drop(outfile);

    Ok(written)
}

/// Detail of a transport failure that surfaced through the archive reader.
fn interrupted_transfer(err: &BootstrapError) -> Option<String> {
    let io_err = match err {
        BootstrapError::Archive(zip::result::ZipError::Io(e)) | BootstrapError::Io(e) => e,
        _ => return None,
    };
    io_err
        .get_ref()?
        .downcast_ref::<TransportError>()
        .map(|t| t.to_string())
}

/// Location the manager binary is extracted to before it installs itself.
pub fn temp_binary_path(temp_dir: &Path, manager: &str) -> PathBuf {
    temp_dir.join(format!("{}{}", manager, std::env::consts::EXE_SUFFIX))
}

/// Download `asset` and extract its executable to `dest`.
pub async fn fetch_manager_binary(
    releases: &dyn ReleaseClient,
    extractor: &dyn ArchiveExtractor,
    asset: &Asset,
    dest: &Path,
) -> Result<InstalledBinary, BootstrapError> {
    tracing::info!("Downloading {}...", asset.name);

    let stream = releases.open_download(&asset.browser_download_url).await?;
    let bytes = extractor
        .extract_single(stream, dest)
        .await
        .map_err(|e| match interrupted_transfer(&e) {
            Some(detail) => BootstrapError::AssetDownloadFailed {
                url: asset.browser_download_url.clone(),
                status: None,
                detail,
            },
            None => e,
        })?;

    if bytes == 0 {
        return Err(BootstrapError::EmptyExtraction {
            path: dest.to_path_buf(),
        });
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(dest, fs::Permissions::from_mode(0o755)).await?;
    }

    tracing::info!(
        "Successfully extracted {} ({} bytes) to {}",
        asset.name,
        bytes,
        dest.display()
    );

    Ok(InstalledBinary {
        path: dest.to_path_buf(),
        bytes,
    })
}
