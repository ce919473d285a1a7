use anyhow::Result;
use async_trait::async_trait;

pub struct PutObjectOutput {
  pub key: String,
  pub size: u64,
}

/// Durable byte storage keyed by generated filename. Implementations must
/// tolerate concurrent reads and writes; keys are unique by construction
/// so writers never contend on the same object.
#[async_trait]
pub trait Storage: Send + Sync {
  /// Any error is treated as not-found at the HTTP boundary.
  async fn download_object(&self, key: &str) -> Result<Vec<u8>>;

  async fn upload_object(&self, data: Vec<u8>, key: &str, mime: &str) -> Result<PutObjectOutput>;
}
