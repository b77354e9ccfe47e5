//! Provider connection settings
//!
//! Read from the environment:
//! - `MEDIA_GALLERY_URL` - project URL (unset means offline mode)
//! - `MEDIA_GALLERY_ANON_KEY` - public API key for the auth endpoint
//! - `MEDIA_GALLERY_S3_ACCESS_KEY_ID` / `MEDIA_GALLERY_S3_SECRET_ACCESS_KEY`
//! - `MEDIA_GALLERY_S3_REGION` - defaults to `us-east-1`
//! - `MEDIA_GALLERY_S3_ENDPOINT` - defaults to `<url>/storage/v1/s3`
//! - `MEDIA_GALLERY_BUCKET` - defaults to `media`

use anyhow::{Context, Result};
use url::Url;

use crate::backend::storage::S3ClientConfig;

/// Storage namespace shared by all users
pub const DEFAULT_BUCKET: &str = "media";

/// Region reported to the S3 endpoint when none is configured
pub const DEFAULT_REGION: &str = "us-east-1";

const ENV_URL: &str = "MEDIA_GALLERY_URL";
const ENV_ANON_KEY: &str = "MEDIA_GALLERY_ANON_KEY";
const ENV_ACCESS_KEY_ID: &str = "MEDIA_GALLERY_S3_ACCESS_KEY_ID";
const ENV_SECRET_ACCESS_KEY: &str = "MEDIA_GALLERY_S3_SECRET_ACCESS_KEY";
const ENV_REGION: &str = "MEDIA_GALLERY_S3_REGION";
const ENV_ENDPOINT: &str = "MEDIA_GALLERY_S3_ENDPOINT";
const ENV_BUCKET: &str = "MEDIA_GALLERY_BUCKET";

/// Connection settings for the hosted backend
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub project_url: Url,
    pub anon_key: String,
    pub bucket: String,
    pub s3: S3ClientConfig,
}

impl ProviderConfig {
    /// Load from the process environment. `Ok(None)` when no project URL is set.
    pub fn from_env() -> Result<Option<Self>> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Option<Self>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let Some(raw_url) = get(ENV_URL) else {
            return Ok(None);
        };
        let project_url = Url::parse(raw_url.trim())
            .with_context(|| format!("Invalid {}: {}", ENV_URL, raw_url))?;

        let anon_key = get(ENV_ANON_KEY).with_context(|| format!("{} is not set", ENV_ANON_KEY))?;

        let endpoint_url = match get(ENV_ENDPOINT) {
            Some(endpoint) => endpoint,
            None => default_s3_endpoint(&project_url),
        };

        let s3 = S3ClientConfig {
            endpoint_url: Some(endpoint_url),
            force_path_style: true,
            region: Some(get(ENV_REGION).unwrap_or_else(|| DEFAULT_REGION.to_string())),
            access_key_id: get(ENV_ACCESS_KEY_ID),
            secret_access_key: get(ENV_SECRET_ACCESS_KEY),
        };

        Ok(Some(Self {
            project_url,
            anon_key,
            bucket: get(ENV_BUCKET).unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
            s3,
        }))
    }
}

fn default_s3_endpoint(project_url: &Url) -> String {
    format!("{}/storage/v1/s3", project_url.as_str().trim_end_matches('/'))
}
