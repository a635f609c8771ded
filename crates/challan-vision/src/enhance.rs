//! Region enhancement ahead of text recognition
//!
//! Grayscale, tile-based contrast-limited histogram equalization, a 3x3
//! median denoise and a fixed sharpening kernel, in that order.

use image::{DynamicImage, GrayImage, Luma};
use imageproc::filter::{filter3x3, median_filter};

const CLIP_LIMIT: f32 = 2.0;
const TILE_GRID: u32 = 8;

const K_SHARPEN: [f32; 9] = [-1.0, -1.0, -1.0, -1.0, 9.0, -1.0, -1.0, -1.0, -1.0];

/// Enhance a vehicle crop for OCR legibility
pub fn enhance_for_ocr(region: &DynamicImage) -> GrayImage {
    let gray = region.to_luma8();
    let equalized = clahe(&gray, CLIP_LIMIT, TILE_GRID, TILE_GRID);
    let denoised = median_filter(&equalized, 1, 1);
    sharpen(&denoised)
}

pub fn sharpen(image: &GrayImage) -> GrayImage {
    filter3x3(image, &K_SHARPEN)
}

/// Contrast-limited adaptive histogram equalization.
///
/// Each tile gets its own clipped equalization lookup table; pixels are
/// mapped by bilinear interpolation between the four nearest tile centres.
pub fn clahe(image: &GrayImage, clip_limit: f32, grid_x: u32, grid_y: u32) -> GrayImage {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return image.clone();
    }
    let gx = grid_x.clamp(1, w) as usize;
    let gy = grid_y.clamp(1, h) as usize;
    let tile_w = w as f32 / gx as f32;
    let tile_h = h as f32 / gy as f32;

    let mut histograms = vec![[0u32; 256]; gx * gy];
    let mut counts = vec![0u32; gx * gy];
    for (x, y, px) in image.enumerate_pixels() {
        let t = tile_of(y, h, gy) * gx + tile_of(x, w, gx);
        histograms[t][px[0] as usize] += 1;
        counts[t] += 1;
    }

    let luts: Vec<[u8; 256]> = histograms
        .iter_mut()
        .zip(&counts)
        .map(|(hist, &count)| tile_lut(hist, count, clip_limit))
        .collect();

    GrayImage::from_fn(w, h, |x, y| {
        let (tx0, tx1, ax) = neighbours(x, tile_w, gx);
        let (ty0, ty1, ay) = neighbours(y, tile_h, gy);
        let v = image.get_pixel(x, y)[0] as usize;

        let top = luts[ty0 * gx + tx0][v] as f32 * (1.0 - ax) + luts[ty0 * gx + tx1][v] as f32 * ax;
        let bottom =
            luts[ty1 * gx + tx0][v] as f32 * (1.0 - ax) + luts[ty1 * gx + tx1][v] as f32 * ax;
        Luma([(top * (1.0 - ay) + bottom * ay).round().clamp(0.0, 255.0) as u8])
    })
}

fn tile_of(coord: u32, extent: u32, grid: usize) -> usize {
    ((coord as usize * grid) / extent as usize).min(grid - 1)
}

/// Two tiles whose centres bracket `coord`, and the weight of the second
fn neighbours(coord: u32, tile_size: f32, grid: usize) -> (usize, usize, f32) {
    let pos = (coord as f32 + 0.5) / tile_size - 0.5;
    let lo = pos.floor().clamp(0.0, (grid - 1) as f32) as usize;
    let hi = (lo + 1).min(grid - 1);
    let alpha = if hi == lo {
        0.0
    } else {
        (pos - lo as f32).clamp(0.0, 1.0)
    };
    (lo, hi, alpha)
}

fn tile_lut(hist: &mut [u32; 256], count: u32, clip_limit: f32) -> [u8; 256] {
    let mut lut = [0u8; 256];
    if count == 0 {
        return lut;
    }

    let limit = ((clip_limit * count as f32 / 256.0) as u32).max(1);
    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > limit {
            excess += *bin - limit;
            *bin = limit;
        }
    }

    let share = excess / 256;
    let mut residual = excess % 256;
    for bin in hist.iter_mut() {
        *bin += share;
        if residual > 0 {
            *bin += 1;
            residual -= 1;
        }
    }

    let scale = 255.0 / count as f32;
    let mut cdf = 0u32;
    for (i, bin) in hist.iter().enumerate() {
        cdf += *bin;
        lut[i] = (cdf as f32 * scale).round().min(255.0) as u8;
    }
    lut
}
