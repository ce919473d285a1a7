use std::path::{Component, Path, PathBuf};

use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};

use crate::http::AppState;

/// Router fallback serving the browser UI from the configured public
/// directory. `/` maps to `index.html`, and extensionless paths are
/// retried with `.html` appended.
pub async fn serve(State(state): State<AppState>, uri: Uri) -> Response {
  let Some(relative) = sanitize(uri.path()) else {
    return (StatusCode::NOT_FOUND, "Not found").into_response();
  };

  let base = Path::new(state.public_dir.as_ref()).join(relative);
  for candidate in candidates(&base) {
    if let Ok(data) = tokio::fs::read(&candidate).await {
      let mime = mime_guess::from_path(&candidate).first_or_octet_stream();
      return ([(header::CONTENT_TYPE, mime.to_string())], data).into_response();
    }
  }

  (StatusCode::NOT_FOUND, "Not found").into_response()
}

/// Normalizes the request path to a relative path under the public root.
/// Rejects anything with parent or rooted components.
fn sanitize(path: &str) -> Option<PathBuf> {
  let trimmed = path.trim_start_matches('/');
  if trimmed.is_empty() {
    return Some(PathBuf::from("index.html"));
  }

  let relative = Path::new(trimmed);
  let plain = relative
    .components()
    .all(|c| matches!(c, Component::Normal(_)));
  if !plain {
    return None;
  }

  Some(relative.to_path_buf())
}

fn candidates(base: &Path) -> Vec<PathBuf> {
  if base.extension().is_some() {
    vec![base.to_path_buf()]
  } else {
    vec![base.to_path_buf(), PathBuf::from(format!("{}.html", base.display()))]
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn root_maps_to_index() {
    assert_eq!(sanitize("/"), Some(PathBuf::from("index.html")));
  }

  #[test]
  fn rejects_traversal() {
    assert_eq!(sanitize("/../secret"), None);
    assert_eq!(sanitize("/a/../../b"), None);
  }

  #[test]
  fn extensionless_paths_try_html() {
    let c = candidates(Path::new("public/about"));
    assert_eq!(c.len(), 2);
    assert_eq!(c[1], PathBuf::from("public/about.html"));
  }

  #[test]
  fn paths_with_extension_are_tried_verbatim() {
    let c = candidates(Path::new("public/styles.css"));
    assert_eq!(c, vec![PathBuf::from("public/styles.css")]);
  }
}
