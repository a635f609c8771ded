//! License plate text grammar and extraction from vehicle detections

use crate::capability::TextRecognizer;
use crate::enhance::enhance_for_ocr;
use challan_types::{BoundingBox, Detection, Error, PlateCandidate, Result, TextRegion};
use image::{DynamicImage, GenericImageView};
use log::{debug, warn};
use regex::Regex;
use std::sync::{Arc, OnceLock};

/// Shortest cleaned text considered a plate
pub const MIN_PLATE_LEN: usize = 6;

/// Length at which text is regrouped into the canonical form
const CANONICAL_LEN: usize = 10;

/// Default minimum recognizer confidence for a plate region (exclusive)
pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.5;

/// Accepted plate layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlateGrammar {
    /// `AA00AA0000` with a one or two letter series
    Strict,
    /// Strict prefix with one to four trailing digits
    Partial,
    /// Letters, digits, optional series letters, optional digits.
    ///
    /// The series allows up to three letters so that `DL8CAF1234` is
    /// accepted. This also admits shapes such as `A1BCD1` that a two-letter
    /// series would reject.
    Flexible,
}

impl PlateGrammar {
    const ORDER: [PlateGrammar; 3] = [
        PlateGrammar::Strict,
        PlateGrammar::Partial,
        PlateGrammar::Flexible,
    ];

    fn regex(&self) -> &'static Regex {
        static STRICT: OnceLock<Regex> = OnceLock::new();
        static PARTIAL: OnceLock<Regex> = OnceLock::new();
        static FLEXIBLE: OnceLock<Regex> = OnceLock::new();

        // Patterns are literals; compilation cannot fail.
        match self {
            PlateGrammar::Strict => STRICT.get_or_init(|| {
                Regex::new(r"^[A-Z]{2}[0-9]{2}[A-Z]{1,2}[0-9]{4}$").unwrap()
            }),
            PlateGrammar::Partial => PARTIAL.get_or_init(|| {
                Regex::new(r"^[A-Z]{2}[0-9]{2}[A-Z]{1,2}[0-9]{1,4}$").unwrap()
            }),
            PlateGrammar::Flexible => FLEXIBLE.get_or_init(|| {
                Regex::new(r"^[A-Z]{1,2}[0-9]{1,4}[A-Z]{0,3}[0-9]{0,4}$").unwrap()
            }),
        }
    }

    pub fn matches(&self, cleaned: &str) -> bool {
        self.regex().is_match(cleaned)
    }

    /// First grammar accepting already-cleaned text
    pub fn classify(cleaned: &str) -> Option<PlateGrammar> {
        if cleaned.len() < MIN_PLATE_LEN {
            return None;
        }
        Self::ORDER.into_iter().find(|g| g.matches(cleaned))
    }
}

/// Strip everything but ASCII letters and digits, uppercased
pub fn clean_plate_text(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Regroup long plate text as state(2) district(2) series(2) number(4)
pub fn canonicalize(cleaned: &str) -> String {
    if cleaned.len() < CANONICAL_LEN {
        return cleaned.to_string();
    }
    [&cleaned[0..2], &cleaned[2..4], &cleaned[4..6], &cleaned[6..10]].concat()
}

/// Clean, validate and canonicalize raw recognizer text
pub fn parse_plate_text(raw: &str) -> Option<String> {
    let cleaned = clean_plate_text(raw);
    PlateGrammar::classify(&cleaned).map(|_| canonicalize(&cleaned))
}

/// Reads plate text from vehicle regions via an external recognizer
pub struct LicensePlateExtractor {
    recognizer: Arc<dyn TextRecognizer>,
    min_confidence: f32,
}

impl LicensePlateExtractor {
    pub fn new(recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self {
            recognizer,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }

    pub fn with_min_confidence(mut self, min_confidence: f32) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    /// Plate candidates for all vehicles. A vehicle whose extraction fails
    /// contributes nothing; the rest are unaffected.
    pub fn extract(&self, image: &DynamicImage, vehicles: &[Detection]) -> Vec<PlateCandidate> {
        let mut plates = Vec::new();
        for vehicle in vehicles {
            match self.extract_vehicle(image, vehicle) {
                Ok(found) => plates.extend(found),
                Err(e) => warn!(
                    "Plate extraction skipped for {} at {:?}: {}",
                    vehicle.class_name,
                    vehicle.bbox.to_array(),
                    e
                ),
            }
        }
        plates
    }

    pub fn extract_vehicle(
        &self,
        image: &DynamicImage,
        vehicle: &Detection,
    ) -> Result<Vec<PlateCandidate>> {
        let (crop, offset) = crop_region(image, &vehicle.bbox)?;
        let enhanced = enhance_for_ocr(&crop);
        let regions = self.recognizer.read(&enhanced)?;
        debug!(
            "{} text regions in {} crop {}x{}",
            regions.len(),
            vehicle.class_name,
            crop.width(),
            crop.height()
        );

        Ok(regions
            .iter()
            .filter_map(|region| self.to_candidate(region, offset))
            .collect())
    }

    fn to_candidate(&self, region: &TextRegion, offset: (f64, f64)) -> Option<PlateCandidate> {
        if !(0.0..=1.0).contains(&region.confidence) {
            warn!(
                "Dropping text region {:?}: confidence {} outside [0, 1]",
                region.text, region.confidence
            );
            return None;
        }
        if region.confidence <= self.min_confidence {
            return None;
        }
        let text = parse_plate_text(&region.text)?;
        match BoundingBox::from_quad(&region.quad, offset) {
            Ok(bbox) => Some(PlateCandidate {
                text,
                confidence: region.confidence,
                bbox,
            }),
            Err(e) => {
                warn!("Dropping plate {:?}: {}", text, e);
                None
            }
        }
    }
}

/// Crop to a detection box, truncated to whole pixels and clipped to the
/// image. Returns the crop and its top-left corner in image coordinates.
pub fn crop_region(image: &DynamicImage, bbox: &BoundingBox) -> Result<(DynamicImage, (f64, f64))> {
    let (w, h) = image.dimensions();
    let x1 = (bbox.x1() as u32).min(w);
    let y1 = (bbox.y1() as u32).min(h);
    let x2 = (bbox.x2() as u32).min(w);
    let y2 = (bbox.y2() as u32).min(h);

    if x2 <= x1 || y2 <= y1 {
        return Err(Error::Recognition(format!(
            "empty crop for box {:?} in {}x{} image",
            bbox.to_array(),
            w,
            h
        )));
    }

    Ok((
        image.crop_imm(x1, y1, x2 - x1, y2 - y1),
        (x1 as f64, y1 as f64),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, RgbImage};
    use std::sync::Mutex;

    #[test]
    fn test_grammar_acceptance_table() {
        assert_eq!(parse_plate_text("MH12AB1234").as_deref(), Some("MH12AB1234"));
        assert_eq!(parse_plate_text("AB1"), None);
        assert_eq!(parse_plate_text("DL 8C AF 1234").as_deref(), Some("DL8CAF1234"));
    }

    #[test]
    fn test_grammar_classification() {
        assert_eq!(PlateGrammar::classify("MH12AB1234"), Some(PlateGrammar::Strict));
        assert_eq!(PlateGrammar::classify("MH12A123"), Some(PlateGrammar::Partial));
        assert_eq!(PlateGrammar::classify("K1234AB"), Some(PlateGrammar::Flexible));
        assert_eq!(PlateGrammar::classify("1234AB"), None);
        assert_eq!(PlateGrammar::classify("ABCDEFG"), None);
    }

    #[test]
    fn test_clean_strips_and_uppercases() {
        assert_eq!(clean_plate_text("mh-12 ab.1234"), "MH12AB1234");
        assert_eq!(clean_plate_text("  "), "");
    }

    #[test]
    fn test_canonicalize_long_text() {
        assert_eq!(canonicalize("MH12AB1234"), "MH12AB1234");
        assert_eq!(canonicalize("MH12AB12345"), "MH12AB1234");
        assert_eq!(canonicalize("MH12A123"), "MH12A123");
    }

    struct FixedRecognizer {
        regions: Vec<TextRegion>,
        seen: Mutex<Vec<(u32, u32)>>,
    }

    impl TextRecognizer for FixedRecognizer {
        fn read(&self, region: &GrayImage) -> Result<Vec<TextRegion>> {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(region.dimensions());
            }
            Ok(self.regions.clone())
        }
    }

    fn vehicle(x1: f64, y1: f64, x2: f64, y2: f64) -> Detection {
        Detection::new("car", 0.9, BoundingBox::new(x1, y1, x2, y2).unwrap()).unwrap()
    }

    fn square_region(text: &str, confidence: f32) -> TextRegion {
        TextRegion {
            quad: [(0.0, 0.0), (5.0, 0.0), (5.0, 5.0), (0.0, 5.0)],
            text: text.to_string(),
            confidence,
        }
    }

    #[test]
    fn test_extract_remaps_to_image_coordinates() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(100, 100));
        let recognizer = Arc::new(FixedRecognizer {
            regions: vec![square_region("MH12AB1234", 0.9)],
            seen: Mutex::new(Vec::new()),
        });
        let extractor = LicensePlateExtractor::new(recognizer.clone());

        let plates = extractor.extract(&image, &[vehicle(10.0, 20.0, 60.0, 70.0)]);

        assert_eq!(plates.len(), 1);
        assert_eq!(plates[0].text, "MH12AB1234");
        assert_eq!(plates[0].bbox.to_array(), [10.0, 20.0, 15.0, 25.0]);
        assert_eq!(recognizer.seen.lock().unwrap()[0], (50, 50));
    }

    #[test]
    fn test_extract_filters_confidence_and_grammar() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(100, 100));
        let recognizer = Arc::new(FixedRecognizer {
            regions: vec![
                square_region("MH12AB1234", 0.5),
                square_region("HELLO", 0.99),
                square_region("KA01MJ2020", 0.51),
            ],
            seen: Mutex::new(Vec::new()),
        });
        let extractor = LicensePlateExtractor::new(recognizer);

        let plates = extractor.extract(&image, &[vehicle(0.0, 0.0, 40.0, 40.0)]);

        assert_eq!(plates.len(), 1);
        assert_eq!(plates[0].text, "KA01MJ2020");
    }

    #[test]
    fn test_extract_drops_out_of_range_confidence() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(100, 100));
        let recognizer = Arc::new(FixedRecognizer {
            regions: vec![
                square_region("MH12AB1234", 7.5),
                square_region("MH12AB1234", f32::NAN),
                square_region("KA01MJ2020", 1.0),
            ],
            seen: Mutex::new(Vec::new()),
        });
        let extractor = LicensePlateExtractor::new(recognizer);

        let plates = extractor.extract(&image, &[vehicle(0.0, 0.0, 40.0, 40.0)]);

        assert_eq!(plates.len(), 1);
        assert_eq!(plates[0].text, "KA01MJ2020");
        assert!(plates.iter().all(|p| (0.0..=1.0).contains(&p.confidence)));
    }

    #[test]
    fn test_flexible_series_allows_three_letters() {
        assert_eq!(PlateGrammar::classify("DL8CAF1234"), Some(PlateGrammar::Flexible));
        assert_eq!(PlateGrammar::classify("A1BCD1"), Some(PlateGrammar::Flexible));
        assert_eq!(PlateGrammar::classify("A1BCDE1"), None);
    }

    #[test]
    fn test_extract_skips_vehicle_outside_image() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(50, 50));
        let recognizer = Arc::new(FixedRecognizer {
            regions: vec![square_region("MH12AB1234", 0.9)],
            seen: Mutex::new(Vec::new()),
        });
        let extractor = LicensePlateExtractor::new(recognizer);

        let plates = extractor.extract(
            &image,
            &[vehicle(60.0, 60.0, 90.0, 90.0), vehicle(0.0, 0.0, 20.0, 20.0)],
        );

        assert_eq!(plates.len(), 1);
        assert_eq!(plates[0].bbox.to_array(), [0.0, 0.0, 5.0, 5.0]);
    }

    #[test]
    fn test_recognizer_error_isolated_per_vehicle() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(100, 100));
        let calls = Mutex::new(0u32);
        let recognizer = move |_: &GrayImage| -> Result<Vec<TextRegion>> {
            let mut n = calls.lock().unwrap();
            *n += 1;
            if *n == 1 {
                Err(Error::Recognition("engine crashed".to_string()))
            } else {
                Ok(vec![square_region("MH12AB1234", 0.8)])
            }
        };
        let extractor = LicensePlateExtractor::new(Arc::new(recognizer));

        let plates = extractor.extract(
            &image,
            &[vehicle(0.0, 0.0, 30.0, 30.0), vehicle(40.0, 40.0, 90.0, 90.0)],
        );

        assert_eq!(plates.len(), 1);
        assert_eq!(plates[0].bbox.x1(), 40.0);
    }

    #[test]
    fn test_crop_truncates_fractional_box() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(100, 100));
        let (crop, offset) =
            crop_region(&image, &BoundingBox::new(10.7, 20.2, 30.9, 40.5).unwrap()).unwrap();
        assert_eq!(offset, (10.0, 20.0));
        assert_eq!(crop.dimensions(), (20, 20));
    }
}
