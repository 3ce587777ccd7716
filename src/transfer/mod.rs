//! Image transfer: makes a catalog item reachable by the reverse-search oracle.
//!
//! When upload mode is on, the worker downloads the catalog file, optionally
//! recompresses it to WebP, and rehosts it through an [`ImageTransfer`]
//! backend. The shipped backend is [`ChibisafeTransfer`].

mod chibisafe;
mod error;
mod transcode;

pub use chibisafe::ChibisafeTransfer;
pub use error::TransferError;
pub use transcode::{WEBP_EXTENSION, recompress_off_runtime, recompress_to_webp, rehosted_file_name};

use async_trait::async_trait;
use tracing::info;

/// Trait implemented by rehosting backends.
#[async_trait]
pub trait ImageTransfer: Send + Sync {
    /// Downloads the raw bytes at `url`.
    async fn download(&self, url: &str) -> Result<Vec<u8>, TransferError>;

    /// Recompresses bytes to WebP without alpha. Runs on the blocking pool.
    async fn transcode(&self, bytes: Vec<u8>) -> Result<Vec<u8>, TransferError> {
        recompress_off_runtime(bytes).await
    }

    /// Uploads bytes under `file_name` and returns their public URL.
    async fn rehost(&self, bytes: Vec<u8>, file_name: &str) -> Result<String, TransferError>;
}

/// Downloads `source_url`, optionally recompresses it, and rehosts the result.
///
/// # Errors
///
/// Returns the first [`TransferError`] from any of the three stages.
#[tracing::instrument(skip(transfer, source_url))]
pub async fn publish_copy(
    transfer: &dyn ImageTransfer,
    source_url: &str,
    hash: &str,
    ext: &str,
    compress: bool,
) -> Result<String, TransferError> {
    let original = transfer.download(source_url).await?;
    let original_len = original.len();

    let bytes = if compress {
        let recompressed = transfer.transcode(original).await?;
        info!(before = original_len, after = recompressed.len(), "Recompressed image");
        recompressed
    } else {
        original
    };

    let file_name = rehosted_file_name(hash, ext, compress);
    let public_url = transfer.rehost(bytes, &file_name).await?;
    info!(url = %public_url, "Rehosted image");
    Ok(public_url)
}
