//! Colour-mask helmet heuristic over a rider's head region

use challan_types::BoundingBox;
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};

/// Inclusive HSV range in 8-bit convention (H 0-180, S and V 0-255)
#[derive(Debug, Clone, Copy)]
struct HsvRange {
    lower: [u8; 3],
    upper: [u8; 3],
}

impl HsvRange {
    const fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }

    fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|i| self.lower[i] <= hsv[i] && hsv[i] <= self.upper[i])
    }
}

/// Typical helmet colours: black, white, red, blue, yellow
const HELMET_COLOURS: [HsvRange; 5] = [
    HsvRange::new([0, 0, 0], [180, 255, 50]),
    HsvRange::new([0, 0, 200], [180, 30, 255]),
    HsvRange::new([0, 50, 50], [10, 255, 255]),
    HsvRange::new([100, 50, 50], [130, 255, 255]),
    HsvRange::new([25, 50, 50], [35, 255, 255]),
];

/// RGB to HSV with hue halved to fit a byte
pub fn rgb_to_hsv8(Rgb([r, g, b]): Rgb<u8>) -> [u8; 3] {
    let (rf, gf, bf) = (r as f32, g as f32, b as f32);
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let s = if max > 0.0 { delta / max * 255.0 } else { 0.0 };

    let h = if delta == 0.0 {
        0.0
    } else if max == rf {
        60.0 * (gf - bf) / delta
    } else if max == gf {
        120.0 + 60.0 * (bf - rf) / delta
    } else {
        240.0 + 60.0 * (rf - gf) / delta
    };
    let h = if h < 0.0 { h + 360.0 } else { h };

    [
        ((h / 2.0).round() as u32 % 180) as u8,
        s.round() as u8,
        max as u8,
    ]
}

/// Fraction of pixels falling in any helmet colour range. Empty regions
/// have zero coverage.
pub fn helmet_coverage(region: &RgbImage) -> f64 {
    let total = region.pixels().len();
    if total == 0 {
        return 0.0;
    }
    let masked = region
        .pixels()
        .filter(|px| {
            let hsv = rgb_to_hsv8(**px);
            HELMET_COLOURS.iter().any(|range| range.contains(hsv))
        })
        .count();
    masked as f64 / total as f64
}

pub fn helmet_present(region: &RgbImage, coverage_threshold: f64) -> bool {
    helmet_coverage(region) > coverage_threshold
}

/// Top `fraction` of a person box, clipped to the image. May be empty.
pub fn head_region(image: &DynamicImage, person: &BoundingBox, fraction: f64) -> RgbImage {
    let (w, h) = image.dimensions();
    let x1 = (person.x1() as u32).min(w);
    let y1 = (person.y1() as u32).min(h);
    let x2 = (person.x2() as u32).min(w);
    let y2 = (person.y2() as u32).min(h);
    if x2 <= x1 || y2 <= y1 {
        return RgbImage::new(0, 0);
    }
    let head_h = ((y2 - y1) as f64 * fraction) as u32;
    image.crop_imm(x1, y1, x2 - x1, head_h).to_rgb8()
}
