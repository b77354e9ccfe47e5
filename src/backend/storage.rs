//! S3-compatible object storage provider

use async_trait::async_trait;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use url::Url;

use crate::backend::error::ProviderError;
use crate::backend::types::StoredObject;
use crate::backend::{StorageProvider, RESOURCE_EXISTS};

/// Page size for listing requests
const LIST_PAGE_SIZE: i32 = 1000;

/// Connection settings for an S3-compatible endpoint
#[derive(Debug, Clone, Default)]
pub struct S3ClientConfig {
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
    pub region: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

/// Object storage over the provider's S3 protocol endpoint, scoped to one bucket
pub struct S3Storage {
    client: Client,
    bucket: String,
    public_base: Url,
}

impl S3Storage {
    /// Create a storage provider for `bucket`.
    ///
    /// `public_base` is the project URL that public object addresses are
    /// derived from.
    pub async fn with_config(
        config: S3ClientConfig,
        bucket: impl Into<String>,
        public_base: Url,
    ) -> Result<Self, ProviderError> {
        if public_base.cannot_be_a_base() {
            return Err(ProviderError::new(format!(
                "Invalid public base URL: {}",
                public_base
            )));
        }

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());

        if let Some(region) = config.region {
            loader = loader.region(Region::new(region));
        }
        if let Some(endpoint) = config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        if let (Some(access_key_id), Some(secret_access_key)) =
            (config.access_key_id, config.secret_access_key)
        {
            loader = loader.credentials_provider(Credentials::new(
                access_key_id,
                secret_access_key,
                None,
                None,
                "media-gallery",
            ));
        }

        let sdk_config = loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.force_path_style)
            .build();

        Ok(Self {
            client: Client::from_conf(s3_config),
            bucket: bucket.into(),
            public_base,
        })
    }

    /// Name of the bucket this provider is scoped to
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Create the bucket (used when provisioning a fresh endpoint)
    async fn exists(&self, name: &str) -> Result<bool, ProviderError> {
        match self.client.head_object().bucket(&self.bucket).key(name).send().await {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(|e| e.is_not_found()) => Ok(false),
            Err(e) => Err(sdk_error(e)),
        }
    }

    pub async fn create_bucket(&self) -> Result<(), ProviderError> {
        self.client
            .create_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(sdk_error)?;

        tracing::info!("Created bucket {}", self.bucket);
        Ok(())
    }
}

#[async_trait]
impl StorageProvider for S3Storage {
    async fn list(&self) -> Result<Vec<StoredObject>, ProviderError> {
        let mut objects = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let response = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .delimiter("/")
                .max_keys(LIST_PAGE_SIZE)
                .set_continuation_token(continuation_token.take())
                .send()
                .await
                .map_err(sdk_error)?;

            // Common prefixes are folders, not objects
            for obj in response.contents() {
                let Some(key) = obj.key() else { continue };
                objects.push(StoredObject {
                    name: key.to_string(),
                    created_at: obj.last_modified().map(|d| {
                        chrono::DateTime::from_timestamp(d.secs(), d.subsec_nanos())
                            .unwrap_or_default()
                    }),
                    size: obj.size().unwrap_or(0).max(0) as u64,
                });
            }

            match response.next_continuation_token() {
                Some(token) if response.is_truncated().unwrap_or(false) => {
                    continuation_token = Some(token.to_string());
                }
                _ => break,
            }
        }

        tracing::debug!("Listed {} objects in {}", objects.len(), self.bucket);
        Ok(objects)
    }

    fn public_url(&self, name: &str) -> String {
        public_object_url(&self.public_base, &self.bucket, name)
    }

    async fn upload(&self, name: &str, data: Bytes, content_type: &str) -> Result<(), ProviderError> {
        // Endpoints without conditional writes still get the existence check
        if self.exists(name).await? {
            return Err(ProviderError::new(RESOURCE_EXISTS));
        }

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(name)
            .content_type(content_type)
            .if_none_match("*")
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| {
                let status = e.raw_response().map(|r| r.status().as_u16());
                if matches!(status, Some(409 | 412)) {
                    ProviderError::new(RESOURCE_EXISTS)
                } else {
                    sdk_error(e)
                }
            })?;

        Ok(())
    }

    async fn remove(&self, names: &[String]) -> Result<(), ProviderError> {
        for name in names {
            self.client
                .delete_object()
                .bucket(&self.bucket)
                .key(name)
                .send()
                .await
                .map_err(sdk_error)?;
        }

        Ok(())
    }

    async fn download(&self, name: &str) -> Result<Bytes, ProviderError> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(name)
            .send()
            .await
            .map_err(sdk_error)?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| ProviderError::new(e.to_string()))?;
        Ok(data.into_bytes())
    }
}

/// Public address of an object: `<base>/storage/v1/object/public/<bucket>/<name>`
pub fn public_object_url(base: &Url, bucket: &str, name: &str) -> String {
    let mut url = base.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments
            .pop_if_empty()
            .extend(["storage", "v1", "object", "public", bucket, name]);
    }
    url.to_string()
}

fn sdk_error<E: std::error::Error>(err: E) -> ProviderError {
    ProviderError::new(DisplayErrorContext(err).to_string())
}
