use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use serde::Deserialize;
use tracing::error;

use crate::http::error::AppError;
use crate::http::AppState;
use crate::pipeline::{self, RenderSpec};
use crate::strategy::{OutputFormat, Strategy};

pub const DEFAULT_WIDTH: u32 = 400;
pub const DEFAULT_HEIGHT: u32 = 300;

/// Raw query strings; invalid values silently fall back to defaults
/// instead of rejecting the request.
#[derive(Deserialize)]
pub struct RenderQuery {
  w: Option<String>,
  h: Option<String>,
  format: Option<String>,
}

/// Fetches the stored original and re-renders it into the requested box.
#[utoipa::path(
  get,
  path = "/image/{id}/{strategy}",
  params(
    ("id" = String, Path, description = "Storage key returned by /upload"),
    ("strategy" = String, Path, description = "Fit, optionally hyphenated with an anchor, e.g. cover-entropy"),
    ("w" = Option<u32>, Query, description = "Target width, default 400"),
    ("h" = Option<u32>, Query, description = "Target height, default 300"),
    ("format" = Option<String>, Query, description = "jpeg | png | webp, default jpeg"),
  ),
  responses(
    (status = 200, description = "Encoded image bytes in the requested format"),
    (status = 404, description = "Not found"),
    (status = 500, description = "Processing failed"),
  )
)]
pub async fn render(
  Path((id, strategy)): Path<(String, String)>,
  Query(query): Query<RenderQuery>,
  State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
  let strategy = Strategy::parse(&strategy);
  let spec = RenderSpec {
    width: positive_or(query.w.as_deref(), DEFAULT_WIDTH),
    height: positive_or(query.h.as_deref(), DEFAULT_HEIGHT),
    fit: strategy.fit,
    anchor: strategy.anchor,
    format: OutputFormat::parse(query.format.as_deref().unwrap_or("")),
  };

  let data = state
    .storage_client
    .download_object(&id)
    .await
    .map_err(|_| AppError::NotFound)?;

  // Decode/resize/encode is CPU-bound; run it on the rayon pool and
  // bridge the result back with a oneshot channel.
  let (send, recv) = tokio::sync::oneshot::channel();
  rayon::spawn(move || {
    let _ = send.send(pipeline::render(&data, &spec));
  });

  let encoded = recv
    .await
    .map_err(|e| {
      error!("render worker dropped before replying: {}", e);
      AppError::Processing
    })?
    .map_err(|e| {
      error!("failed to render {}: {:#}", id, e);
      AppError::Processing
    })?;

  let headers = [(header::CONTENT_TYPE, spec.format.content_type())];
  Ok((headers, encoded))
}

fn positive_or(value: Option<&str>, fallback: u32) -> u32 {
  value
    .and_then(|v| v.trim().parse::<u32>().ok())
    .filter(|&n| n > 0)
    .unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn positive_values_pass_through() {
    assert_eq!(positive_or(Some("800"), DEFAULT_WIDTH), 800);
    assert_eq!(positive_or(Some(" 12 "), DEFAULT_WIDTH), 12);
  }

  #[test]
  fn invalid_values_fall_back() {
    assert_eq!(positive_or(Some("0"), DEFAULT_WIDTH), 400);
    assert_eq!(positive_or(Some("-5"), DEFAULT_WIDTH), 400);
    assert_eq!(positive_or(Some("abc"), DEFAULT_WIDTH), 400);
    assert_eq!(positive_or(Some(""), DEFAULT_HEIGHT), 300);
    assert_eq!(positive_or(None, DEFAULT_HEIGHT), 300);
  }
}
