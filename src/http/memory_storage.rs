use std::collections::HashMap;

use crate::http::storage::{PutObjectOutput, Storage};
use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;

struct StoredObject {
  data: Vec<u8>,
  #[allow(dead_code)]
  mime: String,
}

/// In-memory object store. Objects live for the lifetime of the process;
/// there is no eviction, matching the "never deleted" lifecycle of
/// uploaded originals.
#[derive(Default)]
pub struct Client {
  objects: RwLock<HashMap<String, StoredObject>>,
}

impl Client {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl Storage for Client {
  async fn download_object(&self, key: &str) -> Result<Vec<u8>> {
    let objects = self.objects.read().await;
    match objects.get(key) {
      Some(object) => Ok(object.data.clone()),
      None => bail!("object not found: {}", key),
    }
  }

  async fn upload_object(&self, data: Vec<u8>, key: &str, mime: &str) -> Result<PutObjectOutput> {
    let size = data.len() as u64;
    let mut objects = self.objects.write().await;
    objects.insert(
      key.to_owned(),
      StoredObject {
        data,
        mime: mime.to_owned(),
      },
    );

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
    let client = Client::new();
    client
      .upload_object(vec![9, 9], "k.png", "image/png")
      .await
      .unwrap();
    assert_eq!(client.download_object("k.png").await.unwrap(), vec![9, 9]);
  }

  #[tokio::test]
  async fn missing_key_errors() {
    let client = Client::new();
    assert!(client.download_object("absent").await.is_err());
  }

  #[tokio::test]
  async fn distinct_keys_do_not_collide() {
    let client = Client::new();
    client
      .upload_object(vec![1], "a", "image/jpeg")
      .await
      .unwrap();
    client
      .upload_object(vec![2], "b", "image/jpeg")
      .await
      .unwrap();
    assert_eq!(client.download_object("a").await.unwrap(), vec![1]);
    assert_eq!(client.download_object("b").await.unwrap(), vec![2]);
  }
}
