//! Image quality scoring from sharpness, brightness and contrast

use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use imageproc::filter::filter3x3;
use serde::{Deserialize, Serialize};

const K_LAPLACIAN: [f32; 9] = [0.0, 1.0, 0.0, 1.0, -4.0, 1.0, 0.0, 1.0, 0.0];

/// Laplacian variance at which an image counts as fully sharp
const SHARPNESS_NORM: f64 = 1000.0;

const SHARPNESS_WEIGHT: f64 = 0.5;
const BRIGHTNESS_WEIGHT: f64 = 0.3;
const CONTRAST_WEIGHT: f64 = 0.2;

type GrayF32 = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Sub-scores behind a quality score, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityBreakdown {
    pub sharpness: f64,
    pub brightness: f64,
    pub contrast: f64,
    /// Weighted combination, rounded to two decimals
    pub score: f64,
}

/// Composite quality score in [0, 1]
pub fn score(image: &DynamicImage) -> f64 {
    assess(image).score
}

pub fn assess(image: &DynamicImage) -> QualityBreakdown {
    assess_gray(&image.to_luma8())
}

pub fn assess_gray(gray: &GrayImage) -> QualityBreakdown {
    let n = (gray.width() as usize) * (gray.height() as usize);
    if n == 0 {
        return QualityBreakdown {
            sharpness: 0.0,
            brightness: 0.0,
            contrast: 0.0,
            score: 0.0,
        };
    }

    let laplacian: GrayF32 = filter3x3(gray, &K_LAPLACIAN);
    let (_, lap_var) = mean_variance(laplacian.as_raw().iter().map(|&v| v as f64), n);
    let sharpness = (lap_var / SHARPNESS_NORM).min(1.0);

    let (mean, var) = mean_variance(gray.as_raw().iter().map(|&v| v as f64), n);
    let brightness_level = mean / 255.0;
    let brightness = 1.0 - (brightness_level - 0.5).abs() * 2.0;

    let contrast = (var.sqrt() / 255.0 * 2.0).min(1.0);

    let combined = sharpness * SHARPNESS_WEIGHT
        + brightness * BRIGHTNESS_WEIGHT
        + contrast * CONTRAST_WEIGHT;

    QualityBreakdown {
        sharpness,
        brightness,
        contrast,
        score: ((combined * 100.0).round() / 100.0).clamp(0.0, 1.0),
    }
}

/// Population mean and variance in one pass
fn mean_variance(values: impl Iterator<Item = f64>, n: usize) -> (f64, f64) {
    let (sum, sum_sq) = values.fold((0.0, 0.0), |(s, sq), v| (s + v, sq + v * v));
    let mean = sum / n as f64;
    let var = (sum_sq / n as f64 - mean * mean).max(0.0);
    (mean, var)
}
