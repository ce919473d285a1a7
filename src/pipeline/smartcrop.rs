//! Crop-window selection for the entropy and attention anchors.
//!
//! The cover fit scales the source so it overhangs the target box on at
//! most one axis. These scorers slide a box-sized window along that axis
//! and pick the offset with the most interesting content. Scoring runs on
//! a copy downscaled to at most [`SCORE_SPAN`] pixels per side, then the
//! winning offset is mapped back to full resolution.

use image::{DynamicImage, GenericImageView, GrayImage, RgbImage};

/// Longest side of the scoring thumbnail.
const SCORE_SPAN: u32 = 256;

/// Candidate window offsets evaluated per axis.
const ENTROPY_STEPS: u32 = 24;

#[derive(Debug, Clone, Copy)]
pub enum Score {
  /// Shannon entropy of the greyscale histogram.
  Entropy,
  /// Edge magnitude blended with saturation and skin-tone likelihood.
  Attention,
}

/// Best top-left offset of a `crop_w`×`crop_h` window inside `img`.
pub fn best_window(img: &DynamicImage, crop_w: u32, crop_h: u32, score: Score) -> (u32, u32) {
  let (w, h) = img.dimensions();
  if w <= crop_w && h <= crop_h {
    return (0, 0);
  }

  let factor = (w.max(h) as f64 / SCORE_SPAN as f64).max(1.0);
  let sw = ((w as f64 / factor).round() as u32).max(1);
  let sh = ((h as f64 / factor).round() as u32).max(1);
  let win_w = (((crop_w as f64 / factor).round() as u32).max(1)).min(sw);
  let win_h = (((crop_h as f64 / factor).round() as u32).max(1)).min(sh);

  let small = img.thumbnail_exact(sw, sh);
  let (sx, sy) = match score {
    Score::Entropy => entropy_window(&small.to_luma8(), win_w, win_h),
    Score::Attention => attention_window(&small.to_rgb8(), win_w, win_h),
  };

  let x = ((sx as f64 * factor).round() as u32).min(w.saturating_sub(crop_w));
  let y = ((sy as f64 * factor).round() as u32).min(h.saturating_sub(crop_h));
  (x, y)
}

/// Evaluates a fixed number of evenly-spaced window offsets along the
/// slack axis and keeps the highest-entropy one.
fn entropy_window(gray: &GrayImage, win_w: u32, win_h: u32) -> (u32, u32) {
  let (w, h) = gray.dimensions();
  let max_x = w - win_w;
  let max_y = h - win_h;

  let steps = ENTROPY_STEPS.min(max_x.max(max_y)).max(1);
  let mut best = (0u32, 0u32);
  let mut best_score = f64::NEG_INFINITY;

  for i in 0..=steps {
    let x = max_x * i / steps;
    let y = max_y * i / steps;
    let score = window_entropy(gray, x, y, win_w, win_h);
    if score > best_score {
      best_score = score;
      best = (x, y);
    }
  }

  best
}

fn window_entropy(gray: &GrayImage, x: u32, y: u32, w: u32, h: u32) -> f64 {
  let mut hist = [0u32; 256];
  for yy in y..y + h {
    for xx in x..x + w {
      hist[gray.get_pixel(xx, yy).0[0] as usize] += 1;
    }
  }

  let total = (w * h) as f64;
  hist
    .iter()
    .filter(|&&count| count > 0)
    .map(|&count| {
      let p = count as f64 / total;
      -p * p.log2()
    })
    .sum()
}

/// Builds a per-pixel salience map once, then finds the window with the
/// highest total salience by prefix-summing along the slack axis. The
/// window spans the full image on the other axis, so line sums are exact.
fn attention_window(rgb: &RgbImage, win_w: u32, win_h: u32) -> (u32, u32) {
  let (w, h) = rgb.dimensions();
  let map = salience_map(rgb);

  if w > win_w {
    let mut columns = vec![0.0f64; w as usize];
    for y in 0..h {
      for x in 0..w {
        columns[x as usize] += map[(y * w + x) as usize];
      }
    }
    (best_offset(&columns, win_w as usize) as u32, 0)
  } else {
    let mut rows = vec![0.0f64; h as usize];
    for y in 0..h {
      for x in 0..w {
        rows[y as usize] += map[(y * w + x) as usize];
      }
    }
    (0, best_offset(&rows, win_h as usize) as u32)
  }
}

/// Offset of the densest `len`-wide run of line sums.
fn best_offset(lines: &[f64], len: usize) -> usize {
  let len = len.min(lines.len());
  let mut sum: f64 = lines[..len].iter().sum();
  let mut best_sum = sum;
  let mut best = 0;

  for start in 1..=lines.len() - len {
    sum += lines[start + len - 1] - lines[start - 1];
    if sum > best_sum {
      best_sum = sum;
      best = start;
    }
  }

  best
}

/// Per-pixel salience: Sobel edge magnitude, plus bonuses for saturated
/// color and skin tones. Weights mirror what saliency-driven croppers
/// conventionally favor.
fn salience_map(rgb: &RgbImage) -> Vec<f64> {
  let (w, h) = rgb.dimensions();
  let luma: Vec<f64> = rgb
    .pixels()
    .map(|p| 0.299 * p.0[0] as f64 + 0.587 * p.0[1] as f64 + 0.114 * p.0[2] as f64)
    .collect();
  let at = |x: u32, y: u32| luma[(y * w + x) as usize];

  let mut map = vec![0.0f64; (w * h) as usize];
  for y in 0..h {
    for x in 0..w {
      let p = rgb.get_pixel(x, y).0;
      let (max_c, min_c) = (
        p[0].max(p[1]).max(p[2]) as f64,
        p[0].min(p[1]).min(p[2]) as f64,
      );
      let saturation = if max_c > 0.0 {
        (max_c - min_c) / max_c
      } else {
        0.0
      };
      let skin = is_skin_tone(p) as u8 as f64;

      let edge = if x > 0 && y > 0 && x < w - 1 && y < h - 1 {
        let gx = at(x + 1, y - 1) + 2.0 * at(x + 1, y) + at(x + 1, y + 1)
          - at(x - 1, y - 1)
          - 2.0 * at(x - 1, y)
          - at(x - 1, y + 1);
        let gy = at(x - 1, y + 1) + 2.0 * at(x, y + 1) + at(x + 1, y + 1)
          - at(x - 1, y - 1)
          - 2.0 * at(x, y - 1)
          - at(x + 1, y - 1);
        // 4*255*sqrt(2) is the largest possible gradient magnitude
        (gx * gx + gy * gy).sqrt() / 1442.5
      } else {
        0.0
      };

      map[(y * w + x) as usize] = edge + 0.1 * saturation + 0.3 * skin;
    }
  }

  map
}

/// Classic RGB skin-tone heuristic.
fn is_skin_tone(p: [u8; 3]) -> bool {
  let (r, g, b) = (p[0] as i32, p[1] as i32, p[2] as i32);
  let max_c = r.max(g).max(b);
  let min_c = r.min(g).min(b);
  r > 95 && g > 40 && b > 20 && max_c - min_c > 15 && r > g && r > b
}
