use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde_json::json;
use thiserror::Error;

/// Handler-boundary errors. Clients only ever see the generic message;
/// the detail behind a failure is logged where it happens.
#[derive(Error, Debug)]
pub enum AppError {
  #[error("no file uploaded")]
  NoFile,
  #[error("upload failed")]
  UploadFailed,
  #[error("not found")]
  NotFound,
  #[error("processing failed")]
  Processing,
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    match self {
      AppError::NoFile => (
        StatusCode::BAD_REQUEST,
        Json(json!({"error": "No file uploaded"})),
      )
        .into_response(),
      AppError::UploadFailed => (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": "Upload failed"})),
      )
        .into_response(),
      AppError::NotFound => (StatusCode::NOT_FOUND, "Not found").into_response(),
      AppError::Processing => {
        (StatusCode::INTERNAL_SERVER_ERROR, "Processing failed").into_response()
      }
    }
  }
}
