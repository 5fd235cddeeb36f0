use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use tracing::debug;

use crate::config::Config;
use crate::services::publish_service::{BlobStore, StoreError};

/// Error codes S3 returns for bad or insufficient credentials
const AUTH_ERROR_CODES: [&str; 4] = [
    "AccessDenied",
    "InvalidAccessKeyId",
    "SignatureDoesNotMatch",
    "ExpiredToken",
];

/// S3-backed blob store using explicit credentials from the run config
pub struct S3BlobStore {
    client: S3Client,
}

impl S3BlobStore {
    pub fn new(config: &Config) -> Self {
        let credentials = Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            None,
            None,
            "stockchart-env",
        );

        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .build();

        Self {
            client: S3Client::from_conf(s3_config),
        }
    }
}

fn classify<E>(err: SdkError<E>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let code = err.as_service_error().and_then(|e| e.code()).map(str::to_string);
    let message = DisplayErrorContext(&err).to_string();

    match (&err, code.as_deref()) {
        (_, Some(code)) if AUTH_ERROR_CODES.contains(&code) => StoreError::Unauthorized(message),
        (SdkError::DispatchFailure(_), _) | (SdkError::TimeoutError(_), _) => {
            StoreError::Network(message)
        }
        _ => StoreError::Rejected(message),
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(
        &self,
        container: &str,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StoreError> {
        debug!(bucket = %container, key = %name, size = bytes.len(), "PutObject");

        self.client
            .put_object()
            .bucket(container)
            .key(name)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(classify)?;

        Ok(())
    }
}
