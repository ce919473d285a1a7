use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::{Multipart, State};
use axum::Json;
use rand::Rng;
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

use crate::http::error::AppError;
use crate::http::AppState;

#[derive(Serialize, ToSchema)]
pub struct UploadResponse {
  /// Opaque storage key; pass it back as `:id` when rendering.
  pub id: String,
}

/// Accepts one multipart `image` field, persists the raw bytes under a
/// freshly generated key, and returns the key.
#[utoipa::path(
  post,
  path = "/upload",
  responses(
    (status = 200, description = "Stored; body carries the new id", body = UploadResponse),
    (status = 400, description = "No file uploaded"),
    (status = 500, description = "Upload failed"),
  )
)]
pub async fn upload(
  State(state): State<AppState>,
  mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
  let mut file = None;

  while let Some(field) = multipart.next_field().await.map_err(|_| AppError::NoFile)? {
    if field.name() == Some("image") {
      let filename = field.file_name().map(str::to_owned);
      let mime = field.content_type().map(str::to_owned);
      let bytes = field.bytes().await.map_err(|e| {
        error!("failed to read upload body: {}", e);
        AppError::UploadFailed
      })?;
      file = Some((bytes, filename, mime));
      break;
    }
  }

  let Some((bytes, filename, mime)) = file else {
    return Err(AppError::NoFile);
  };

  let key = generate_key(filename.as_deref());
  // The declared content type is passed through unvalidated; nothing
  // downstream trusts it beyond the storage metadata.
  let mime = mime.unwrap_or_else(|| "image/jpeg".to_owned());

  state
    .storage_client
    .upload_object(bytes.to_vec(), &key, &mime)
    .await
    .map_err(|e| {
      error!("failed to store upload {}: {:#}", key, e);
      AppError::UploadFailed
    })?;

  Ok(Json(UploadResponse { id: key }))
}

/// `<unix-millis>-<random6>.<ext>`. Collision-resistant by construction,
/// not guaranteed unique. Extension comes from the declared filename and
/// falls back to `jpg`.
fn generate_key(original_name: Option<&str>) -> String {
  let timestamp = SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_millis())
    .unwrap_or(0);

  let ext = original_name
    .and_then(|n| Path::new(n).extension())
    .and_then(|e| e.to_str())
    .map(|e| e.to_ascii_lowercase())
    .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
    .unwrap_or_else(|| "jpg".to_owned());

  format!("{}-{}.{}", timestamp, random_suffix(), ext)
}

fn random_suffix() -> String {
  const CHARSET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
  let mut rng = rand::thread_rng();
  (0..6)
    .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn key_keeps_declared_extension() {
    let key = generate_key(Some("holiday.PNG"));
    assert!(key.ends_with(".png"), "got {}", key);
  }

  #[test]
  fn key_falls_back_to_jpg() {
    assert!(generate_key(None).ends_with(".jpg"));
    assert!(generate_key(Some("no-extension")).ends_with(".jpg"));
    assert!(generate_key(Some("trailing-dot.")).ends_with(".jpg"));
  }

  #[test]
  fn key_shape_is_timestamp_random_ext() {
    let key = generate_key(Some("a.webp"));
    let (stem, ext) = key.rsplit_once('.').unwrap();
    assert_eq!(ext, "webp");
    let (ts, suffix) = stem.split_once('-').unwrap();
    assert!(ts.chars().all(|c| c.is_ascii_digit()));
    assert_eq!(suffix.len(), 6);
    assert!(suffix.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
  }

  #[test]
  fn keys_are_distinct_for_identical_input() {
    let a = generate_key(Some("same.jpg"));
    let b = generate_key(Some("same.jpg"));
    assert_ne!(a, b);
  }
}
