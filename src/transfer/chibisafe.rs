//! Chibisafe rehosting backend.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::debug;

use crate::http_client::build_http_client;

use super::{ImageTransfer, TransferError};

const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: Option<String>,
}

/// Uploads files to a Chibisafe instance.
pub struct ChibisafeTransfer {
    client: Client,
    upload_url: String,
    api_key: String,
}

impl ChibisafeTransfer {
    /// Creates a backend posting to `upload_url` (e.g. `https://host/api/upload`).
    ///
    /// # Errors
    ///
    /// Returns [`TransferError`] if HTTP client construction fails.
    pub fn new(
        upload_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, TransferError> {
        let client = build_http_client("chibisafe", None)?;
        Ok(Self {
            client,
            upload_url: upload_url.into(),
            api_key: api_key.into(),
        })
    }
}

impl std::fmt::Debug for ChibisafeTransfer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChibisafeTransfer")
            .field("upload_url", &self.upload_url)
            .finish_non_exhaustive()
    }
}

fn mime_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "webp" => "image/webp",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl ImageTransfer for ChibisafeTransfer {
    #[tracing::instrument(skip(self), fields(transfer = "chibisafe"))]
    async fn download(&self, url: &str) -> Result<Vec<u8>, TransferError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| TransferError::Request {
                stage: "download",
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::http_status("download", url, status.as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|source| TransferError::Request {
                stage: "download",
                url: url.to_string(),
                source,
            })?;
        debug!(bytes = bytes.len(), "Downloaded image");
        Ok(bytes.to_vec())
    }

    #[tracing::instrument(skip(self, bytes), fields(transfer = "chibisafe", size = bytes.len()))]
    async fn rehost(&self, bytes: Vec<u8>, file_name: &str) -> Result<String, TransferError> {
        let upload_error = |source| TransferError::Request {
            stage: "upload",
            url: self.upload_url.clone(),
            source,
        };

        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime_for(file_name))
            .map_err(upload_error)?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(&self.upload_url)
            .header(API_KEY_HEADER, &self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(upload_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::http_status(
                "upload",
                &self.upload_url,
                status.as_u16(),
            ));
        }

        let body = response
            .json::<UploadResponse>()
            .await
            .map_err(|e| TransferError::malformed(e.to_string()))?;

        body.url
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| TransferError::malformed("upload response has no url"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_for_known_extensions() {
        assert_eq!(mime_for("abc.webp"), "image/webp");
        assert_eq!(mime_for("abc.JPG"), "image/jpeg");
        assert_eq!(mime_for("abc"), "application/octet-stream");
    }

    #[test]
    fn test_debug_hides_api_key() {
        let transfer = ChibisafeTransfer::new("https://up.example/api/upload", "secret").unwrap();
        assert!(!format!("{transfer:?}").contains("secret"));
    }
}
