//! AWS SDK client and its factory.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::{ByteStream, DateTime as AwsDateTime};
use aws_sdk_s3::Client;
use chrono::{DateTime, FixedOffset};
use std::time::Duration;
use stowage_core::StorageConfiguration;
use tokio::sync::OnceCell;

use crate::client::{
    ClientFactory, GetObjectOutput, ObjectHeaders, ObjectStoreClient, ProviderError,
    PutObjectRequest,
};
use crate::traits::StorageResult;

/// Builds [`AwsS3Client`]s from a [`StorageConfiguration`].
///
/// Static keys are used when configured. Otherwise the default AWS credential
/// chain (environment, profile, instance metadata) is loaded once and reused.
#[derive(Default)]
pub struct S3ClientFactory {
    ambient: OnceCell<SdkConfig>,
}

impl S3ClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    async fn ambient_config(&self) -> &SdkConfig {
        self.ambient
            .get_or_init(|| aws_config::defaults(BehaviorVersion::latest()).load())
            .await
    }
}

#[async_trait]
impl ClientFactory for S3ClientFactory {
    async fn create(
        &self,
        config: &StorageConfiguration,
    ) -> StorageResult<Box<dyn ObjectStoreClient>> {
        let mut builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region().to_string()))
            .retry_config(RetryConfig::standard())
            .force_path_style(config.force_path_style());

        // Without a custom host the SDK resolves the regional endpoint itself.
        if config.host().is_some() {
            builder = builder.endpoint_url(config.service_url());
        }

        match (config.access_key_id(), config.secret_access_key()) {
            (Some(access_key_id), Some(secret_access_key)) => {
                builder = builder.credentials_provider(Credentials::new(
                    access_key_id,
                    secret_access_key,
                    None,
                    None,
                    "stowage",
                ));
            }
            _ => {
                if let Some(provider) = self.ambient_config().await.credentials_provider() {
                    builder = builder.credentials_provider(provider);
                }
            }
        }

        Ok(Box::new(AwsS3Client::new(Client::from_conf(builder.build()))))
    }
}

/// [`ObjectStoreClient`] over `aws_sdk_s3::Client`.
#[derive(Clone, Debug)]
pub struct AwsS3Client {
    client: Client,
}

impl AwsS3Client {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn provider_error<E>(err: SdkError<E, HttpResponse>) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    ProviderError {
        status: err.raw_response().map(|r| r.status().as_u16()),
        code: err.code().map(String::from),
        message: DisplayErrorContext(&err).to_string(),
    }
}

fn to_chrono(time: Option<&AwsDateTime>) -> Option<DateTime<FixedOffset>> {
    time.and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos()))
        .map(|t| t.fixed_offset())
}

fn to_length(length: Option<i64>) -> Option<u64> {
    length.and_then(|l| u64::try_from(l).ok())
}

#[async_trait]
impl ObjectStoreClient for AwsS3Client {
    async fn put_object(&self, request: PutObjectRequest) -> Result<(), ProviderError> {
        let length = i64::try_from(request.body.len()).ok();
        self.client
            .put_object()
            .bucket(request.bucket)
            .key(request.key)
            .content_type(request.content_type)
            .set_cache_control(request.cache_control)
            .set_content_disposition(request.content_disposition)
            .set_content_encoding(request.content_encoding)
            .set_content_length(length)
            .body(ByteStream::from(request.body))
            .send()
            .await
            .map_err(provider_error)?;
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<GetObjectOutput, ProviderError> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(provider_error)?;

        let headers = ObjectHeaders {
            content_type: output.content_type().map(String::from),
            content_length: to_length(output.content_length()),
            cache_control: output.cache_control().map(String::from),
            content_disposition: output.content_disposition().map(String::from),
            content_encoding: output.content_encoding().map(String::from),
            last_modified: to_chrono(output.last_modified()),
        };

        Ok(GetObjectOutput {
            headers,
            body: Box::pin(output.body.into_async_read()),
        })
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), ProviderError> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(provider_error)?;
        Ok(())
    }

    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectHeaders, ProviderError> {
        let output = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(provider_error)?;

        Ok(ObjectHeaders {
            content_type: output.content_type().map(String::from),
            content_length: to_length(output.content_length()),
            cache_control: output.cache_control().map(String::from),
            content_disposition: output.content_disposition().map(String::from),
            content_encoding: output.content_encoding().map(String::from),
            last_modified: to_chrono(output.last_modified()),
        })
    }

    async fn presign_get_object(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, ProviderError> {
        let presigning_config = PresigningConfig::expires_in(expires_in)
            .map_err(|e| ProviderError::new(e.to_string()))?;

        let presigned_request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning_config)
            .await
            .map_err(provider_error)?;

        Ok(presigned_request.uri().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_chrono_preserves_instant() {
        let aws = AwsDateTime::from_secs_and_nanos(1_700_000_000, 500);
        let converted = to_chrono(Some(&aws)).unwrap();
        assert_eq!(converted.timestamp(), 1_700_000_000);
        assert_eq!(converted.timestamp_subsec_nanos(), 500);
        assert!(to_chrono(None).is_none());
    }

    #[test]
    fn test_to_length_rejects_negative() {
        assert_eq!(to_length(Some(12)), Some(12));
        assert_eq!(to_length(Some(-1)), None);
        assert_eq!(to_length(None), None);
    }

    #[tokio::test]
    async fn test_presigned_url_is_signed_locally() {
        let factory = S3ClientFactory::new();
        let config = StorageConfiguration::new("media")
            .with_host("localhost:9000")
            .with_credentials("AKIDEXAMPLE", "secret");

        let client = factory.create(&config).await.unwrap();
        let url = client
            .presign_get_object("media", "photos/cat.png", Duration::from_secs(300))
            .await
            .unwrap();

        assert!(url.starts_with("https://localhost:9000/media/photos/cat.png?"));
        assert!(url.contains("X-Amz-Signature="));
        assert!(url.contains("X-Amz-Expires=300"));
    }
}
