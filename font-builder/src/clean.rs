//! Removal of stray ink specks from glyph images before tracing.
//!
//! Letters like PHI and PSI are often cropped with fragments of neighbouring
//! strokes. Cleaning thresholds the image, applies a 3×3 binary opening and
//! keeps only the largest 4-connected components.

use std::cmp::Reverse;
use std::collections::VecDeque;
use std::path::Path;

use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FontError, Result};

/// Pixels darker than this count as ink.
pub const INK_THRESHOLD: u8 = 100;

/// Parameters of one cleaning pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DespeckleParams {
    pub threshold: u8,
    pub max_components: usize,

    /// Components must be strictly larger than this many pixels.
    pub min_size: usize,
}

impl DespeckleParams {
    /// PHI keeps more, smaller components so its bowl survives.
    pub fn for_label(label: &str) -> Self {
        if label == "PHI" {
            Self {
                threshold: INK_THRESHOLD,
                max_components: 15,
                min_size: 30,
            }
        } else {
            Self {
                threshold: INK_THRESHOLD,
                max_components: 10,
                min_size: 50,
            }
        }
    }
}

/// What a cleaning pass kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DespeckleStats {
    pub components: usize,
    pub kept: usize,
}

/// Clean a bitmap. Returns `None` when no component survives the opening
/// and the size filter.
pub fn despeckle(bitmap: &GrayImage, params: DespeckleParams) -> Option<(GrayImage, DespeckleStats)> {
    let (width, height) = bitmap.dimensions();
    let (w, h) = (width as usize, height as usize);
    let ink: Vec<bool> = bitmap.pixels().map(|p| p.0[0] < params.threshold).collect();
    let opened = dilate(&erode(&ink, w, h), w, h);

    let components = components(&opened, w, h);
    if components.is_empty() {
        return None;
    }

    let mut by_size: Vec<&Vec<usize>> = components.iter().collect();
    by_size.sort_by_key(|c| Reverse(c.len()));

    let mut cleaned = GrayImage::from_pixel(width, height, Luma([255]));
    let mut kept = 0;
    for pixels in by_size
        .into_iter()
        .take(params.max_components)
        .filter(|c| c.len() > params.min_size)
    {
        for &i in pixels {
            cleaned.put_pixel((i % w) as u32, (i / w) as u32, Luma([0]));
        }
        kept += 1;
    }
    if kept == 0 {
        return None;
    }

    Some((
        cleaned,
        DespeckleStats {
            components: components.len(),
            kept,
        },
    ))
}

/// Clean the image at `src` and write the result to `dst`.
///
/// Returns `None` without writing when no ink component survives.
pub fn clean_file(src: &Path, dst: &Path, label: &str) -> Result<Option<DespeckleStats>> {
    let bitmap = image::open(src)
        .map_err(|source| FontError::Image {
            path: src.to_path_buf(),
            source,
        })?
        .to_luma8();

    let Some((cleaned, stats)) = despeckle(&bitmap, DespeckleParams::for_label(label)) else {
        debug!("No ink survives cleaning {}", src.display());
        return Ok(None);
    };

    cleaned.save(dst).map_err(|source| FontError::Image {
        path: dst.to_path_buf(),
        source,
    })?;
    debug!(
        "Cleaned {label}: kept {} of {} components",
        stats.kept, stats.components
    );
    Ok(Some(stats))
}

/// Offsets of a 3×3 square around (x, y), or `None` where it leaves the image.
fn neighbourhood(x: usize, y: usize, w: usize, h: usize) -> impl Iterator<Item = Option<usize>> {
    (-1i64..=1).flat_map(move |dy| {
        (-1i64..=1).map(move |dx| {
            let nx = x as i64 + dx;
            let ny = y as i64 + dy;
            if nx < 0 || ny < 0 || nx >= w as i64 || ny >= h as i64 {
                None
            } else {
                Some(ny as usize * w + nx as usize)
            }
        })
    })
}

fn erode(mask: &[bool], w: usize, h: usize) -> Vec<bool> {
    (0..w * h)
        .map(|i| neighbourhood(i % w, i / w, w, h).all(|n| n.is_some_and(|j| mask[j])))
        .collect()
}

fn dilate(mask: &[bool], w: usize, h: usize) -> Vec<bool> {
    (0..w * h)
        .map(|i| neighbourhood(i % w, i / w, w, h).any(|n| n.is_some_and(|j| mask[j])))
        .collect()
}

/// 4-connected components, each as a list of pixel indices.
fn components(mask: &[bool], w: usize, h: usize) -> Vec<Vec<usize>> {
    let mut seen = vec![false; mask.len()];
    let mut out = Vec::new();
    let mut queue = VecDeque::new();

    for start in 0..mask.len() {
        if !mask[start] || seen[start] {
            continue;
        }
        seen[start] = true;
        queue.push_back(start);
        let mut pixels = Vec::new();

        while let Some(i) = queue.pop_front() {
            pixels.push(i);
            let (x, y) = (i % w, i / w);
            let mut visit = |j: usize| {
                if mask[j] && !seen[j] {
                    seen[j] = true;
                    queue.push_back(j);
                }
            };
            if x > 0 {
                visit(i - 1);
            }
            if x + 1 < w {
                visit(i + 1);
            }
            if y > 0 {
                visit(i - w);
            }
            if y + 1 < h {
                visit(i + w);
            }
        }
        out.push(pixels);
    }
    out
}
