//! File uploads to the project's storage bucket through its S3-compatible API.

use std::time::Duration;

use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::info;

use crate::config::StorageConfig;
use crate::errors::AppError;

/// Download links handed back after an upload stay valid this long.
const DOWNLOAD_URL_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Clone)]
pub struct FileStorage {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl FileStorage {
    pub async fn connect(config: &StorageConfig) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "compass-static",
        );

        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new("auto"))
            .credentials_provider(credentials)
            .endpoint_url(&config.endpoint)
            .load()
            .await;

        // GCS interoperability and most S3 clones expect path-style addressing.
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();

        Self {
            client: aws_sdk_s3::Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
        }
    }

    /// Stores `body` at `path` and returns a time-limited download URL.
    pub async fn upload(
        &self,
        path: &str,
        body: Bytes,
        content_type: Option<&str>,
    ) -> Result<String, AppError> {
        let size = body.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .body(ByteStream::from(body))
            .set_content_type(content_type.map(str::to_string))
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("upload of {path} failed: {e}")))?;

        info!("Uploaded {size} bytes to {}/{}", self.bucket, path);

        let presigning = PresigningConfig::expires_in(DOWNLOAD_URL_TTL)
            .map_err(|e| AppError::Storage(format!("presigning config: {e}")))?;
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .presigned(presigning)
            .await
            .map_err(|e| AppError::Storage(format!("presigning {path} failed: {e}")))?;

        Ok(presigned.uri().to_string())
    }
}

/// Object key for a user's upload. Only the final component of the client's
/// file name is kept, and anything outside a safe character set becomes `_`.
pub fn upload_path(uid: &str, file_name: &str) -> Option<String> {
    let base = file_name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        return None;
    }
    Some(format!("uploads/{uid}/{cleaned}"))
}
