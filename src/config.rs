use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
  Memory,
  Local,
  S3,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct Config {
  pub app: AppConfig,
  pub storage: StorageConfig,
}

#[derive(Deserialize)]
#[serde(default)]
pub struct AppConfig {
  pub listen: String,
  pub metrics_listen: String,
  pub public_dir: String,
  pub max_body_size_mb: usize,
  pub enable_openapi: Option<bool>,
}

#[derive(Deserialize)]
#[serde(default)]
pub struct StorageConfig {
  pub storage_type: StorageType,
  pub s3: Option<StorageConfigS3>,
  pub local: Option<StorageConfigLocal>,
}

#[derive(Deserialize)]
pub struct StorageConfigS3 {
  pub endpoint: String,
  pub bucket: String,
  pub access_key_id: String,
  pub secret_access_key: String,
  pub region: String,
  pub force_path_style: bool,
}

#[derive(Deserialize)]
pub struct StorageConfigLocal {
  pub path: String,
}

impl Default for AppConfig {
  fn default() -> Self {
    AppConfig {
      listen: "0.0.0.0:3000".to_owned(),
      metrics_listen: "0.0.0.0:3001".to_owned(),
      public_dir: "public".to_owned(),
      max_body_size_mb: 25,
      enable_openapi: None,
    }
  }
}

impl Default for StorageConfig {
  fn default() -> Self {
    StorageConfig {
      storage_type: StorageType::Memory,
      s3: None,
      local: None,
    }
  }
}

/// Loads `config.toml` if present, otherwise boots on defaults (memory
/// storage, port 3000). A `PORT` environment variable overrides the port
/// of the configured listen address.
pub fn parse(config_path: &str) -> Result<Config> {
  let mut cfg: Config = if Path::new(config_path).exists() {
    let toml_str = fs::read_to_string(config_path)
      .with_context(|| format!("failed to read config file: {}", config_path))?;
    toml::from_str(&toml_str).context("failed to deserialize config")?
  } else {
    Config::default()
  };

  if let Ok(port) = std::env::var("PORT") {
    let port: u16 = port.parse().context("PORT is not a valid port number")?;
    let host = cfg
      .app
      .listen
      .rsplit_once(':')
      .map(|(host, _)| host)
      .unwrap_or("0.0.0.0")
      .to_owned();
    cfg.app.listen = format!("{}:{}", host, port);
  }

  Ok(cfg)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_listen_on_3000_with_memory_storage() {
    let cfg = Config::default();
    assert_eq!(cfg.app.listen, "0.0.0.0:3000");
    assert_eq!(cfg.storage.storage_type, StorageType::Memory);
  }

  #[test]
  fn parses_local_storage_config() {
    let cfg: Config = toml::from_str(
      r#"
        [app]
        listen = "127.0.0.1:8080"

        [storage]
        storage_type = "Local"

        [storage.local]
        path = "/tmp/images"
      "#,
    )
    .unwrap();

    assert_eq!(cfg.app.listen, "127.0.0.1:8080");
    assert_eq!(cfg.storage.storage_type, StorageType::Local);
    assert_eq!(cfg.storage.local.unwrap().path, "/tmp/images");
  }
}
