//! Configuration module
//!
//! This module provides the storage connection record, the image provider
//! options and the environment-driven application configuration.

use std::env;
use std::fmt;

use crate::constants::{DEFAULT_IMAGE_URL_PREFIX, DEFAULT_REGION, DEFAULT_S3_HOST};

/// Connection settings for the backing object store.
///
/// Built once at startup and read-only afterwards. The secret key is redacted
/// from the `Debug` output.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct StorageConfiguration {
    host: Option<String>,
    access_key_id: Option<String>,
    secret_access_key: Option<String>,
    bucket: String,
    region: Option<String>,
    force_path_style: Option<bool>,
}

impl StorageConfiguration {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            ..Self::default()
        }
    }

    /// Custom endpoint for S3-compatible providers (MinIO, DigitalOcean Spaces, etc.)
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into()).filter(|h: &String| !h.trim().is_empty());
        self
    }

    pub fn with_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.access_key_id = Some(access_key_id.into()).filter(|k: &String| !k.is_empty());
        self.secret_access_key = Some(secret_access_key.into()).filter(|k: &String| !k.is_empty());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into()).filter(|r: &String| !r.trim().is_empty());
        self
    }

    pub fn with_force_path_style(mut self, force_path_style: bool) -> Self {
        self.force_path_style = Some(force_path_style);
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn access_key_id(&self) -> Option<&str> {
        self.access_key_id.as_deref()
    }

    pub fn secret_access_key(&self) -> Option<&str> {
        self.secret_access_key.as_deref()
    }

    pub fn region(&self) -> &str {
        self.region.as_deref().unwrap_or(DEFAULT_REGION)
    }

    /// Path-style addressing is required by most S3-compatible providers, so it
    /// is on by default whenever a custom host is configured.
    pub fn force_path_style(&self) -> bool {
        self.force_path_style.unwrap_or(self.host.is_some())
    }

    /// Whether static keys were supplied; otherwise the ambient credential chain is used.
    pub fn has_static_credentials(&self) -> bool {
        self.access_key_id.is_some() && self.secret_access_key.is_some()
    }

    /// Endpoint URL handed to the client, with `https://` prepended when no scheme is given.
    pub fn service_url(&self) -> String {
        let host = self.host.as_deref().unwrap_or(DEFAULT_S3_HOST);
        if host.starts_with("http") {
            host.to_string()
        } else {
            format!("https://{}", host)
        }
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.bucket.trim().is_empty() {
            return Err(anyhow::anyhow!("S3 bucket name is required"));
        }
        if self.access_key_id.is_some() != self.secret_access_key.is_some() {
            return Err(anyhow::anyhow!(
                "AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY must be set together"
            ));
        }
        Ok(())
    }

    /// Load the storage settings from environment variables.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bucket = lookup("S3_BUCKET").ok_or_else(|| anyhow::anyhow!("S3_BUCKET must be set"))?;

        let mut config = StorageConfiguration::new(bucket);
        if let Some(host) = lookup("S3_HOST").or_else(|| lookup("S3_ENDPOINT")) {
            config = config.with_host(host);
        }
        // Kept even when only one is set, so validate() rejects a half pair.
        config.access_key_id = lookup("AWS_ACCESS_KEY_ID").filter(|k| !k.is_empty());
        config.secret_access_key = lookup("AWS_SECRET_ACCESS_KEY").filter(|k| !k.is_empty());
        if let Some(region) = lookup("S3_REGION").or_else(|| lookup("AWS_REGION")) {
            config = config.with_region(region);
        }
        if let Some(raw) = lookup("S3_FORCE_PATH_STYLE") {
            let force = raw.trim().to_lowercase().parse().map_err(|_| {
                anyhow::anyhow!("S3_FORCE_PATH_STYLE must be true or false, got {}", raw)
            })?;
            config = config.with_force_path_style(force);
        }

        config.validate()?;
        Ok(config)
    }
}

impl fmt::Debug for StorageConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfiguration")
            .field("host", &self.host)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("force_path_style", &self.force_path_style)
            .finish()
    }
}

/// Options for the storage-backed image provider.
#[derive(Clone, Debug)]
pub struct ImageProviderOptions {
    pub storage: StorageConfiguration,
    /// Application-relative prefix such as `~/images`.
    pub url_prefix: String,
}

impl ImageProviderOptions {
    pub fn new(storage: StorageConfiguration, url_prefix: impl Into<String>) -> Self {
        Self {
            storage,
            url_prefix: url_prefix.into(),
        }
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub environment: String,
    pub storage: StorageConfiguration,
    pub image_url_prefix: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let storage = StorageConfiguration::from_lookup(&lookup)?;
        let image_url_prefix =
            lookup("IMAGE_URL_PREFIX").unwrap_or_else(|| DEFAULT_IMAGE_URL_PREFIX.to_string());

        Ok(AppConfig {
            environment,
            storage,
            image_url_prefix,
        })
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn image_provider_options(&self) -> ImageProviderOptions {
        ImageProviderOptions::new(self.storage.clone(), self.image_url_prefix.clone())
    }
}
