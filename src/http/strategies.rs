use axum::Json;

use crate::strategy::{self, StrategyInfo};

/// Static catalog for client discovery. Generated from the same
/// vocabulary the render handler parses, so the two cannot drift.
#[utoipa::path(
  get,
  path = "/strategies",
  responses(
    (status = 200, description = "Supported strategy keys and labels", body = [StrategyInfo]),
  )
)]
pub async fn strategies() -> Json<&'static [StrategyInfo]> {
  Json(strategy::catalog())
}
