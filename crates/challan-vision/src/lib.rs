//! Vision module - quality scoring and license plate extraction

pub mod capability;
pub mod command;
pub mod enhance;
pub mod plate;
pub mod quality;

// Re-export main types for convenience
pub use capability::{ObjectDetector, TextRecognizer};
pub use command::{extract_json_from_response, CommandDetector, CommandRecognizer};
pub use plate::{clean_plate_text, parse_plate_text, LicensePlateExtractor, PlateGrammar};
pub use quality::QualityBreakdown;
