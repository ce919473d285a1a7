use std::path::{Path, PathBuf};

use crate::http::storage::{PutObjectOutput, Storage};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;

/// Filesystem-backed storage rooted at a single directory.
pub struct Client {
  root: PathBuf,
}

impl Client {
  pub fn new(root: PathBuf) -> Self {
    Self { root }
  }

  /// Keys are generated filenames, never paths. Rejecting separators and
  /// parent references keeps a crafted id from escaping the root.
  fn resolve(&self, key: &str) -> Result<PathBuf> {
    let name = Path::new(key);
    let single_component = name.components().count() == 1
      && !key.contains(['/', '\\'])
      && key != "."
      && key != "..";
    if !single_component {
      bail!("invalid storage key: {}", key);
    }

    Ok(self.root.join(name))
  }
}

#[async_trait]
impl Storage for Client {
  async fn download_object(&self, key: &str) -> Result<Vec<u8>> {
    let path = self.resolve(key)?;
    tokio::fs::read(&path)
      .await
      .with_context(|| format!("failed to read object: {}", key))
  }

  async fn upload_object(&self, data: Vec<u8>, key: &str, _mime: &str) -> Result<PutObjectOutput> {
    let path = self.resolve(key)?;
    let size = data.len() as u64;

    tokio::fs::create_dir_all(&self.root)
      .await
      .with_context(|| format!("failed to create storage root: {}", self.root.display()))?;

    tokio::fs::write(&path, &data)
      .await
      .with_context(|| format!("failed to write object: {}", key))?;

    Ok(PutObjectOutput {
      key: key.to_owned(),
      size,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn round_trips_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let client = Client::new(dir.path().to_path_buf());

    let out = client
      .upload_object(vec![1, 2, 3], "a.jpg", "image/jpeg")
      .await
      .unwrap();
    assert_eq!(out.size, 3);

    let data = client.download_object("a.jpg").await.unwrap();
    assert_eq!(data, vec![1, 2, 3]);
  }

  #[tokio::test]
  async fn missing_key_errors() {
    let dir = tempfile::tempdir().unwrap();
    let client = Client::new(dir.path().to_path_buf());
    assert!(client.download_object("nope.jpg").await.is_err());
  }

  #[tokio::test]
  async fn rejects_traversal_keys() {
    let dir = tempfile::tempdir().unwrap();
    let client = Client::new(dir.path().to_path_buf());
    assert!(client.download_object("../etc/passwd").await.is_err());
    assert!(client.download_object("a/b.jpg").await.is_err());
    assert!(client
      .upload_object(vec![0], "..", "image/jpeg")
      .await
      .is_err());
  }
}
