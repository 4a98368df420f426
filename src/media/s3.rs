//! AWS S3 media storage.
//!
//! Objects are written under `{media_prefix}/{name}` with a public-read ACL
//! so pages can link to them directly.

use super::{MediaError, MediaStorage, Result, candidate_names, validate_name};
use crate::config::StorageConfig;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use tracing::info;

pub struct S3Storage {
    client: Client,
    bucket: String,
    prefix: String,
    base_url: String,
}

impl S3Storage {
    pub fn new(
        client: Client,
        bucket: impl Into<String>,
        prefix: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            prefix: prefix.into().trim_matches('/').to_string(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Client from the default AWS credential chain, region from config
    /// when set.
    pub async fn from_config(config: &StorageConfig) -> Result<Self> {
        let bucket = config
            .bucket
            .clone()
            .ok_or_else(|| MediaError::Remote("storage.bucket is not set".into()))?;
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        let client = Client::new(&loader.load().await);
        Ok(Self::new(client, bucket, &config.media_prefix, config.media_url()))
    }

    fn key(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.prefix, name)
        }
    }
}

#[async_trait]
impl MediaStorage for S3Storage {
    async fn save(&self, name: &str, bytes: &[u8], content_type: &str) -> Result<String> {
        validate_name(name)?;
        for candidate in candidate_names(name, bytes) {
            if self.exists(&candidate).await? {
                continue;
            }
            let key = self.key(&candidate);
            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(&key)
                .body(ByteStream::from(bytes.to_vec()))
                .content_type(content_type)
                .acl(ObjectCannedAcl::PublicRead)
                .send()
                .await
                .map_err(|e| MediaError::Remote(e.to_string()))?;
            info!("Wrote {} bytes to s3://{}/{}", bytes.len(), self.bucket, key);
            return Ok(candidate);
        }
        Err(MediaError::Exhausted(name.to_string()))
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        let result = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(self.key(name))
            .send()
            .await;
        match result {
            Ok(_) => Ok(true),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_not_found() {
                    Ok(false)
                } else {
                    Err(MediaError::Remote(service_err.to_string()))
                }
            }
        }
    }

    async fn delete(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        let key = self.key(name);
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| MediaError::Remote(e.to_string()))?;
        info!("Deleted s3://{}/{}", self.bucket, key);
        Ok(())
    }

    fn url(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_client() -> Client {
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new("us-east-1"))
            .build();
        Client::from_conf(config)
    }

    #[test]
    fn key_includes_prefix() {
        let storage = S3Storage::new(offline_client(), "bucket", "/media/", "https://cdn");
        assert_eq!(storage.key("images/a.jpg"), "media/images/a.jpg");
    }

    #[test]
    fn key_without_prefix() {
        let storage = S3Storage::new(offline_client(), "bucket", "", "https://cdn");
        assert_eq!(storage.key("a.jpg"), "a.jpg");
    }

    #[test]
    fn url_uses_public_base() {
        let storage = S3Storage::new(
            offline_client(),
            "bucket",
            "media",
            "https://bucket.s3.amazonaws.com/media/",
        );
        assert_eq!(
            storage.url("images/a.jpg"),
            "https://bucket.s3.amazonaws.com/media/images/a.jpg"
        );
    }
}
