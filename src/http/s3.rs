use crate::http::storage::{PutObjectOutput, Storage};
use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use tokio::io::AsyncReadExt;
use tracing::debug;

/// S3-compatible blob storage. Uploaded originals are immutable, so
/// objects are written with an immutable cache-control header.
pub struct Client {
  s3_client: aws_sdk_s3::Client,
  bucket: String,
}

impl Client {
  pub fn new(s3_client: aws_sdk_s3::Client, bucket: &str) -> Self {
    Self {
      s3_client,
      bucket: bucket.to_owned(),
    }
  }
}

#[async_trait]
impl Storage for Client {
  async fn download_object(&self, key: &str) -> Result<Vec<u8>> {
    let trimmed = key.trim_start_matches('/');

    debug!(
      "downloading object: {} from bucket: {}",
      trimmed, self.bucket
    );

    let object = self
      .s3_client
      .get_object()
      .bucket(self.bucket.as_str())
      .key(trimmed)
      .send()
      .await?;

    let mut data = Vec::with_capacity(object.content_length.unwrap_or(0) as usize);
    object.body.into_async_read().read_to_end(&mut data).await?;

    Ok(data)
  }

  async fn upload_object(&self, data: Vec<u8>, key: &str, mime: &str) -> Result<PutObjectOutput> {
    let size = data.len() as u64;
    let body = ByteStream::from(data);

    self
      .s3_client
      .put_object()
      .bucket(self.bucket.as_str())
      .key(key)
      .body(body)
      .cache_control("public, max-age=31536000, immutable".to_owned())
      .content_type(mime)
      .send()
      .await
      .context("failed to upload object")?;

    Ok(PutObjectOutput {
      key: key.to_owned(),
      size,
    })
  }
}
