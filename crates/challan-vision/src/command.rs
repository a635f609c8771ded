//! Capabilities backed by external model commands
//!
//! The configured command line is split with shell rules, the image is
//! handed over through a temporary PNG, and a JSON document is read back
//! from stdout.

use crate::capability::{ObjectDetector, TextRecognizer};
use challan_types::{BoundingBox, Detection, Error, Result, TextRegion};
use image::{DynamicImage, GrayImage, ImageFormat};
use log::{debug, warn};
use serde::Deserialize;
use std::path::Path;
use std::process::Command;

#[derive(Debug, Deserialize)]
struct DetectorOutput {
    #[serde(default)]
    detections: Vec<RawDetection>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawDetection {
    class_name: String,
    confidence: f32,
    bbox: [f64; 4],
}

#[derive(Debug, Deserialize)]
struct RecognizerOutput {
    #[serde(default)]
    regions: Vec<TextRegion>,
    #[serde(default)]
    error: Option<String>,
}

/// Object detector that shells out to a model runner.
///
/// Invoked as `<command> --image <png> --min-conf <threshold>`.
#[derive(Debug, Clone)]
pub struct CommandDetector {
    program: String,
    args: Vec<String>,
}

impl CommandDetector {
    pub fn new(command_line: &str) -> Result<Self> {
        let (program, args) = split_command(command_line)?;
        Ok(Self { program, args })
    }
}

impl ObjectDetector for CommandDetector {
    fn detect(&self, image: &DynamicImage, confidence_threshold: f32) -> Result<Vec<Detection>> {
        let temp = write_temp_png(image)?;
        let stdout = run(
            &self.program,
            &self.args,
            temp.path(),
            &["--min-conf".to_string(), format!("{}", confidence_threshold)],
        )
        .map_err(Error::Detection)?;

        let parsed: DetectorOutput = serde_json::from_str(&extract_json_from_response(&stdout))
            .map_err(|e| Error::Detection(format!("unparsable detector output: {}", e)))?;
        if let Some(err) = parsed.error {
            return Err(Error::Detection(err));
        }

        Ok(parsed
            .detections
            .into_iter()
            .filter_map(|raw| {
                let [x1, y1, x2, y2] = raw.bbox;
                let checked = BoundingBox::new(x1, y1, x2, y2)
                    .and_then(|bbox| Detection::new(raw.class_name.clone(), raw.confidence, bbox));
                match checked {
                    Ok(det) => Some(det),
                    Err(e) => {
                        warn!("Dropping malformed {} detection: {}", raw.class_name, e);
                        None
                    }
                }
            })
            .collect())
    }
}

/// Text recognizer that shells out to an OCR runner.
///
/// Invoked as `<command> --image <png>`.
#[derive(Debug, Clone)]
pub struct CommandRecognizer {
    program: String,
    args: Vec<String>,
}

impl CommandRecognizer {
    pub fn new(command_line: &str) -> Result<Self> {
        let (program, args) = split_command(command_line)?;
        Ok(Self { program, args })
    }
}

impl TextRecognizer for CommandRecognizer {
    fn read(&self, region: &GrayImage) -> Result<Vec<TextRegion>> {
        let temp = write_temp_png(&DynamicImage::ImageLuma8(region.clone()))?;
        let stdout = run(&self.program, &self.args, temp.path(), &[]).map_err(Error::Recognition)?;

        let parsed: RecognizerOutput = serde_json::from_str(&extract_json_from_response(&stdout))
            .map_err(|e| Error::Recognition(format!("unparsable recognizer output: {}", e)))?;
        if let Some(err) = parsed.error {
            return Err(Error::Recognition(err));
        }
        Ok(parsed.regions)
    }
}

fn split_command(command_line: &str) -> Result<(String, Vec<String>)> {
    let mut parts = shell_words::split(command_line)
        .map_err(|e| Error::Capability(format!("invalid command {:?}: {}", command_line, e)))?;
    if parts.is_empty() {
        return Err(Error::Capability("empty command".to_string()));
    }
    let program = parts.remove(0);
    Ok((program, parts))
}

fn write_temp_png(image: &DynamicImage) -> Result<tempfile::NamedTempFile> {
    let temp = tempfile::Builder::new()
        .prefix("challan_")
        .suffix(".png")
        .tempfile()?;
    image.save_with_format(temp.path(), ImageFormat::Png)?;
    Ok(temp)
}

/// Run the command and return stdout; the error string describes the failure
fn run(
    program: &str,
    args: &[String],
    image_path: &Path,
    extra: &[String],
) -> std::result::Result<String, String> {
    let mut cmd = Command::new(program);
    cmd.args(args).arg("--image").arg(image_path).args(extra);
    debug!("Running: {} {:?} --image {:?} {:?}", program, args, image_path, extra);

    let output = cmd
        .output()
        .map_err(|e| format!("failed to execute {}: {}", program, e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("{} exited with {}: {}", program, output.status, stderr.trim()));
    }

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if stdout.trim().is_empty() {
        return Err(format!("{} produced no output", program));
    }
    Ok(stdout)
}

/// Extract JSON from command output (handles markdown code blocks and
/// surrounding log text)
pub fn extract_json_from_response(response: &str) -> String {
    let response = response.trim();

    if response.starts_with("```") {
        if let Some(end) = response.rfind("```") {
            let start = response.find('\n').map(|i| i + 1).unwrap_or(3);
            if start < end {
                return response[start..end].trim().to_string();
            }
        }
    }

    if let Some(start) = response.find('{') {
        if let Some(end) = response.rfind('}') {
            if start < end {
                return response[start..=end].to_string();
            }
        }
    }

    response.to_string()
}
