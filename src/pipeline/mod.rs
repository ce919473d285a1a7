//! The decode → orient → resize → encode pipeline behind the render
//! handler. Everything here is synchronous and CPU-bound; the HTTP layer
//! runs it on the rayon pool.

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};
use std::io::Cursor;

use crate::strategy::{Anchor, Fit, OutputFormat};

mod smartcrop;

const RESAMPLE: FilterType = FilterType::Lanczos3;

const JPEG_QUALITY: u8 = 90;
const WEBP_QUALITY: f32 = 90.0;

/// One render's worth of parameters, fully resolved from the request.
#[derive(Debug, Clone, Copy)]
pub struct RenderSpec {
  pub width: u32,
  pub height: u32,
  pub fit: Fit,
  pub anchor: Anchor,
  pub format: OutputFormat,
}

/// Renders stored original bytes into the requested box and format.
pub fn render(data: &[u8], spec: &RenderSpec) -> Result<Vec<u8>> {
  let img = image::load_from_memory(data).context("failed to decode image")?;
  let img = apply_orientation(img, read_orientation(data));
  let img = resize(img, spec);
  encode(&img, spec.format)
}

/// EXIF orientation tag (0x0112), 1 when absent or unreadable.
fn read_orientation(raw: &[u8]) -> u32 {
  let mut cursor = Cursor::new(raw);
  let reader = match exif::Reader::new().read_from_container(&mut cursor) {
    Ok(r) => r,
    Err(_) => return 1,
  };

  reader
    .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
    .and_then(|f| f.value.get_uint(0))
    .unwrap_or(1)
}

/// Rotates/flips per the EXIF orientation value so later size math sees
/// the visually-correct dimensions. Values outside 1..=8 are left as-is.
fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
  match orientation {
    2 => img.fliph(),
    3 => img.rotate180(),
    4 => img.flipv(),
    5 => img.rotate90().fliph(),
    6 => img.rotate90(),
    7 => img.rotate270().fliph(),
    8 => img.rotate270(),
    _ => img,
  }
}

fn resize(img: DynamicImage, spec: &RenderSpec) -> DynamicImage {
  let (sw, sh) = img.dimensions();
  let (w, h) = (spec.width, spec.height);

  match spec.fit {
    Fit::Cover => cover(img, w, h, spec.anchor),
    Fit::Contain => contain(img, w, h),
    Fit::Fill => img.resize_exact(w, h, RESAMPLE),
    Fit::Inside => {
      if sw <= w && sh <= h {
        img
      } else {
        img.resize(w, h, RESAMPLE)
      }
    }
    Fit::Outside => {
      let (cw, ch) = covering_dimensions(sw, sh, w, h);
      img.resize_exact(cw, ch, RESAMPLE)
    }
  }
}

/// Smallest aspect-preserving dimensions that cover the w×h box.
fn covering_dimensions(sw: u32, sh: u32, w: u32, h: u32) -> (u32, u32) {
  let scale = f64::max(w as f64 / sw as f64, h as f64 / sh as f64);
  let cw = ((sw as f64 * scale).round() as u32).max(w);
  let ch = ((sh as f64 * scale).round() as u32).max(h);
  (cw, ch)
}

/// Scale to cover the box, then crop the overhang per the anchor. The
/// covering scale leaves slack on at most one axis, so the crop window
/// slides along a single direction.
fn cover(img: DynamicImage, w: u32, h: u32, anchor: Anchor) -> DynamicImage {
  let (sw, sh) = img.dimensions();
  let (cw, ch) = covering_dimensions(sw, sh, w, h);
  let scaled = img.resize_exact(cw, ch, RESAMPLE);

  let (x, y) = match anchor {
    Anchor::Entropy => smartcrop::best_window(&scaled, w, h, smartcrop::Score::Entropy),
    Anchor::Attention => smartcrop::best_window(&scaled, w, h, smartcrop::Score::Attention),
    _ => gravity_offset(anchor, cw - w, ch - h),
  };

  scaled.crop_imm(x, y, w, h)
}

/// Compass-point placement of a crop window inside the overhang.
fn gravity_offset(anchor: Anchor, over_x: u32, over_y: u32) -> (u32, u32) {
  let (fx, fy) = match anchor {
    Anchor::North => (0.5, 0.0),
    Anchor::South => (0.5, 1.0),
    Anchor::East => (1.0, 0.5),
    Anchor::West => (0.0, 0.5),
    Anchor::Northeast => (1.0, 0.0),
    Anchor::Northwest => (0.0, 0.0),
    Anchor::Southeast => (1.0, 1.0),
    Anchor::Southwest => (0.0, 1.0),
    _ => (0.5, 0.5),
  };

  (
    (over_x as f64 * fx).round() as u32,
    (over_y as f64 * fy).round() as u32,
  )
}

/// Fit within the box, centered on a box-sized canvas. The background is
/// opaque black, matching the resize library's default when no fill is
/// configured.
fn contain(img: DynamicImage, w: u32, h: u32) -> DynamicImage {
  let fitted = img.resize(w, h, RESAMPLE);
  let (fw, fh) = fitted.dimensions();
  if fw == w && fh == h {
    return fitted;
  }

  let mut canvas = RgbaImage::from_pixel(w, h, Rgba([0, 0, 0, 255]));
  let x = (w - fw) / 2;
  let y = (h - fh) / 2;
  image::imageops::overlay(&mut canvas, &fitted, x as i64, y as i64);
  DynamicImage::ImageRgba8(canvas)
}

fn encode(img: &DynamicImage, format: OutputFormat) -> Result<Vec<u8>> {
  match format {
    OutputFormat::Jpeg => {
      let mut buf = Cursor::new(Vec::new());
      let encoder = JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
      // JPEG has no alpha channel
      DynamicImage::ImageRgb8(img.to_rgb8())
        .write_with_encoder(encoder)
        .context("failed to encode jpeg")?;
      Ok(buf.into_inner())
    }
    OutputFormat::Png => {
      let mut buf = Cursor::new(Vec::new());
      let encoder = PngEncoder::new_with_quality(&mut buf, CompressionType::Best, PngFilter::Adaptive);
      img
        .write_with_encoder(encoder)
        .context("failed to encode png")?;
      Ok(buf.into_inner())
    }
    OutputFormat::Webp => {
      let rgba = img.to_rgba8();
      let (w, h) = rgba.dimensions();
      let encoded = webp::Encoder::from_rgba(rgba.as_raw(), w, h).encode(WEBP_QUALITY);
      Ok(encoded.to_vec())
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  fn gradient(w: u32, h: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(image::RgbImage::from_fn(w, h, |x, y| {
      Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    }))
  }

  fn spec(w: u32, h: u32, fit: Fit, anchor: Anchor, format: OutputFormat) -> RenderSpec {
    RenderSpec {
      width: w,
      height: h,
      fit,
      anchor,
      format,
    }
  }

  #[test]
  fn cover_yields_exact_target_dimensions() {
    let out = resize(
      gradient(1000, 500),
      &spec(800, 600, Fit::Cover, Anchor::Center, OutputFormat::Jpeg),
    );
    assert_eq!(out.dimensions(), (800, 600));
  }

  #[test]
  fn cover_with_entropy_yields_exact_target_dimensions() {
    let out = resize(
      gradient(1000, 500),
      &spec(300, 300, Fit::Cover, Anchor::Entropy, OutputFormat::Jpeg),
    );
    assert_eq!(out.dimensions(), (300, 300));
  }

  #[test]
  fn inside_never_upscales() {
    let out = resize(
      gradient(200, 100),
      &spec(800, 600, Fit::Inside, Anchor::Center, OutputFormat::Jpeg),
    );
    assert_eq!(out.dimensions(), (200, 100));
  }

  #[test]
  fn inside_downscales_to_fit() {
    let out = resize(
      gradient(1600, 1200),
      &spec(800, 600, Fit::Inside, Anchor::Center, OutputFormat::Jpeg),
    );
    let (w, h) = out.dimensions();
    assert!(w <= 800 && h <= 600);
  }

  #[test]
  fn fill_stretches_to_exact_box() {
    let out = resize(
      gradient(1000, 500),
      &spec(333, 777, Fit::Fill, Anchor::Center, OutputFormat::Jpeg),
    );
    assert_eq!(out.dimensions(), (333, 777));
  }

  #[test]
  fn contain_pads_to_exact_box() {
    let out = resize(
      gradient(1000, 500),
      &spec(400, 400, Fit::Contain, Anchor::Center, OutputFormat::Jpeg),
    );
    assert_eq!(out.dimensions(), (400, 400));
  }

  #[test]
  fn outside_covers_box_preserving_aspect() {
    let out = resize(
      gradient(1000, 500),
      &spec(400, 400, Fit::Outside, Anchor::Center, OutputFormat::Jpeg),
    );
    let (w, h) = out.dimensions();
    assert!(w >= 400 && h >= 400);
    assert_eq!((w, h), (800, 400));
  }

  #[test]
  fn gravity_offsets_cover_the_compass() {
    assert_eq!(gravity_offset(Anchor::Northwest, 100, 40), (0, 0));
    assert_eq!(gravity_offset(Anchor::Southeast, 100, 40), (100, 40));
    assert_eq!(gravity_offset(Anchor::Center, 100, 40), (50, 20));
    assert_eq!(gravity_offset(Anchor::North, 100, 40), (50, 0));
    assert_eq!(gravity_offset(Anchor::West, 100, 40), (0, 20));
  }

  #[test]
  fn orientation_rotates_dimensions() {
    let img = gradient(300, 100);
    assert_eq!(apply_orientation(img.clone(), 1).dimensions(), (300, 100));
    assert_eq!(apply_orientation(img.clone(), 3).dimensions(), (300, 100));
    assert_eq!(apply_orientation(img.clone(), 6).dimensions(), (100, 300));
    assert_eq!(apply_orientation(img, 8).dimensions(), (100, 300));
  }

  #[test]
  fn encodes_all_output_formats() {
    let img = gradient(64, 48);
    for format in [OutputFormat::Jpeg, OutputFormat::Png, OutputFormat::Webp] {
      let bytes = encode(&img, format).unwrap();
      assert!(!bytes.is_empty());
      let decoded = image::load_from_memory(&bytes).unwrap();
      assert_eq!(decoded.dimensions(), (64, 48));
    }
  }

  #[test]
  fn render_end_to_end_from_png_bytes() {
    let mut buf = Cursor::new(Vec::new());
    gradient(1000, 500)
      .write_to(&mut buf, image::ImageFormat::Png)
      .unwrap();

    let out = render(
      buf.get_ref(),
      &spec(800, 600, Fit::Cover, Anchor::Center, OutputFormat::Png),
    )
    .unwrap();

    let decoded = image::load_from_memory(&out).unwrap();
    assert_eq!(decoded.dimensions(), (800, 600));
  }

  #[test]
  fn render_rejects_garbage_bytes() {
    let err = render(
      b"not an image at all",
      &spec(100, 100, Fit::Cover, Anchor::Center, OutputFormat::Jpeg),
    );
    assert!(err.is_err());
  }
}
