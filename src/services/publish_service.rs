use async_trait::async_trait;
use thiserror::Error;

use crate::models::{ChartImage, PublishedArtifact};

pub const PNG_CONTENT_TYPE: &str = "image/png";

/// Store-side failure for a single upload
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Rejected by store: {0}")]
    Rejected(String),
}

/// Named binary object storage. `put` overwrites any existing object.
#[async_trait]
pub trait BlobStore {
    async fn put(
        &self,
        container: &str,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Failed to upload {name} to {container}: {source}")]
pub struct PublishError {
    pub container: String,
    pub name: String,
    #[source]
    pub source: StoreError,
}

/// Upload `image` as `name` into `container`.
///
/// The image is consumed; its buffer is released whether or not the upload
/// succeeds. No retry and no existence check.
pub async fn publish_chart<S>(
    store: &S,
    container: &str,
    image: ChartImage,
    name: &str,
) -> Result<PublishedArtifact, PublishError>
where
    S: BlobStore + ?Sized,
{
    let size = image.len();

    store
        .put(container, name, image.into_bytes(), PNG_CONTENT_TYPE)
        .await
        .map_err(|source| PublishError {
            container: container.to_string(),
            name: name.to_string(),
            source,
        })?;

    Ok(PublishedArtifact {
        container: container.to_string(),
        name: name.to_string(),
        size,
    })
}
