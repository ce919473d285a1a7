//! The fit/anchor vocabulary shared by the render handler and the
//! `/strategies` catalog, so the two can never drift apart.

use serde::Serialize;
use utoipa::ToSchema;

/// How the source image is mapped onto the target box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fit {
  /// Scale to fully cover the box, crop the overhang.
  Cover,
  /// Scale to fit within the box, centered on a box-sized canvas.
  Contain,
  /// Stretch to exactly the box, ignoring aspect ratio.
  Fill,
  /// Scale down to fit within the box, never upscale.
  Inside,
  /// Scale so both dimensions are at least the box, preserving aspect.
  Outside,
}

impl Fit {
  /// Unrecognized input falls back to `Cover`, matching the silent
  /// default policy of the query parameters.
  pub fn parse(s: &str) -> Fit {
    match s.to_ascii_lowercase().as_str() {
      "cover" => Fit::Cover,
      "contain" => Fit::Contain,
      "fill" => Fit::Fill,
      "inside" => Fit::Inside,
      "outside" => Fit::Outside,
      _ => Fit::Cover,
    }
  }
}

/// Where the crop window lands when `Fit::Cover` discards content.
/// Ignored by every other fit mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
  Center,
  North,
  South,
  East,
  West,
  Northeast,
  Northwest,
  Southeast,
  Southwest,
  /// Keep the highest-entropy region.
  Entropy,
  /// Keep the most salient region (edges, saturation, skin tones).
  Attention,
}

impl Anchor {
  /// Unrecognized input falls back to `Center`.
  pub fn parse(s: &str) -> Anchor {
    match s.to_ascii_lowercase().as_str() {
      "center" | "centre" => Anchor::Center,
      "north" => Anchor::North,
      "south" => Anchor::South,
      "east" => Anchor::East,
      "west" => Anchor::West,
      "northeast" => Anchor::Northeast,
      "northwest" => Anchor::Northwest,
      "southeast" => Anchor::Southeast,
      "southwest" => Anchor::Southwest,
      "entropy" => Anchor::Entropy,
      "attention" => Anchor::Attention,
      _ => Anchor::Center,
    }
  }
}

/// A resolved `<fit>[-<anchor>]` strategy path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strategy {
  pub fit: Fit,
  pub anchor: Anchor,
}

impl Strategy {
  pub fn parse(s: &str) -> Strategy {
    let mut parts = s.splitn(2, '-');
    let fit = Fit::parse(parts.next().unwrap_or(""));
    let anchor = Anchor::parse(parts.next().unwrap_or("center"));
    Strategy { fit, anchor }
  }
}

/// Output encoding requested via the `format` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
  Jpeg,
  Png,
  Webp,
}

impl OutputFormat {
  /// Unrecognized input falls back to `Jpeg`.
  pub fn parse(s: &str) -> OutputFormat {
    match s.to_ascii_lowercase().as_str() {
      "png" => OutputFormat::Png,
      "webp" => OutputFormat::Webp,
      _ => OutputFormat::Jpeg,
    }
  }

  pub fn content_type(&self) -> &'static str {
    match self {
      OutputFormat::Jpeg => "image/jpeg",
      OutputFormat::Png => "image/png",
      OutputFormat::Webp => "image/webp",
    }
  }
}

/// One `/strategies` catalog entry.
#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct StrategyInfo {
  /// Path segment accepted by `GET /image/:id/:strategy`.
  pub key: &'static str,
  /// Human-readable label for gallery captions.
  pub label: &'static str,
}

/// The catalog served for client discovery. Every key round-trips through
/// [`Strategy::parse`]; `catalog_keys_resolve` pins that down.
pub fn catalog() -> &'static [StrategyInfo] {
  const CATALOG: &[StrategyInfo] = &[
    StrategyInfo {
      key: "cover",
      label: "Cover (crop to fill)",
    },
    StrategyInfo {
      key: "cover-entropy",
      label: "Cover with Entropy",
    },
    StrategyInfo {
      key: "cover-attention",
      label: "Cover with Attention",
    },
    StrategyInfo {
      key: "contain",
      label: "Contain (fit within)",
    },
    StrategyInfo {
      key: "fill",
      label: "Fill (stretch)",
    },
    StrategyInfo {
      key: "inside",
      label: "Inside (fit within, preserve aspect)",
    },
    StrategyInfo {
      key: "outside",
      label: "Outside (cover, preserve aspect)",
    },
  ];

  CATALOG
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_fit_and_anchor() {
    let s = Strategy::parse("cover-entropy");
    assert_eq!(s.fit, Fit::Cover);
    assert_eq!(s.anchor, Anchor::Entropy);

    let s = Strategy::parse("contain");
    assert_eq!(s.fit, Fit::Contain);
    assert_eq!(s.anchor, Anchor::Center);
  }

  #[test]
  fn unknown_fit_falls_back_to_cover() {
    assert_eq!(Strategy::parse("bogus").fit, Fit::Cover);
    assert_eq!(Strategy::parse("").fit, Fit::Cover);
  }

  #[test]
  fn unknown_anchor_falls_back_to_center() {
    assert_eq!(Strategy::parse("cover-bogus").anchor, Anchor::Center);
    assert_eq!(Strategy::parse("cover-centre").anchor, Anchor::Center);
  }

  #[test]
  fn compass_anchors_parse() {
    assert_eq!(Anchor::parse("northwest"), Anchor::Northwest);
    assert_eq!(Anchor::parse("SOUTH"), Anchor::South);
  }

  #[test]
  fn unknown_format_falls_back_to_jpeg() {
    assert_eq!(OutputFormat::parse("gif"), OutputFormat::Jpeg);
    assert_eq!(OutputFormat::parse("WEBP"), OutputFormat::Webp);
  }

  #[test]
  fn catalog_keys_resolve() {
    // Every catalog key except plain "cover" must parse to something
    // other than the silent-fallback default, otherwise the catalog
    // advertises a strategy the handler does not actually distinguish.
    let default = Strategy::parse("cover");
    for entry in catalog() {
      if entry.key != "cover" {
        assert_ne!(
          Strategy::parse(entry.key),
          default,
          "catalog key {} degrades to the default strategy",
          entry.key
        );
      }
    }
  }
}
