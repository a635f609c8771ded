//! Output formatting module

use challan_app::AnalysisResponse;
use challan_domain::model::ReviewConfig;
use challan_domain::service::{summarize, ReviewRoute};
use challan_types::{AnalysisResult, OutputFormat, Result};

/// Print an analysis outcome. JSON prints the response envelope.
pub fn output_response(
    output_format: OutputFormat,
    response: &AnalysisResponse,
    review: &ReviewConfig,
) -> Result<()> {
    if output_format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(response)?);
        return Ok(());
    }

    match response.result {
        Some(ref result) => print_result_table(result, response.correlation_id.as_deref(), review),
        None => println!("Analysis failed: {}", response.message),
    }
    Ok(())
}

pub fn output_result(
    output_format: OutputFormat,
    result: &AnalysisResult,
    correlation_id: Option<&str>,
    review: &ReviewConfig,
) -> Result<()> {
    if output_format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        print_result_table(result, correlation_id, review);
    }
    Ok(())
}

fn print_result_table(result: &AnalysisResult, correlation_id: Option<&str>, review: &ReviewConfig) {
    println!("\nAnalysis Result");
    println!("===============");
    if let Some(id) = correlation_id {
        println!("Correlation id:  {}", id);
    }
    println!("Quality score:   {:.2}", result.quality_score);
    println!("Processing time: {:.2}s", result.processing_time.as_secs_f64());
    println!("Timestamp:       {}", result.timestamp.to_rfc3339());
    println!(
        "Detections:      {} vehicle(s), {} person(s), {} sign(s)",
        result.vehicles.len(),
        result.persons.len(),
        result.signs.len()
    );

    println!("\n--- Plates ---");
    if result.plates.is_empty() {
        println!("(none read)");
    }
    for plate in &result.plates {
        let [x1, y1, x2, y2] = plate.bbox.to_array();
        println!(
            "{:<12} {:>5.1}%  at ({:.0}, {:.0})-({:.0}, {:.0})",
            plate.text,
            plate.confidence * 100.0,
            x1,
            y1,
            x2,
            y2
        );
    }

    println!("\n--- Violations ---");
    if result.violations.is_empty() {
        println!("(none)");
    }
    for kind in &result.violations {
        println!("{:<20} {}", kind.label(), kind.code().unwrap_or("-"));
    }

    let summary = summarize(result, review);
    println!("\n--- Review ---");
    println!(
        "Route:           {}",
        match summary.route {
            ReviewRoute::Automatic => "automatic",
            ReviewRoute::Manual => "manual",
        }
    );
    if let Some(ref number) = summary.vehicle_number {
        println!("Vehicle number:  {}", number);
    }
    if let Some(ref vehicle_type) = summary.vehicle_type {
        println!("Vehicle type:    {}", vehicle_type);
    }
    if let Some(confidence) = summary.confidence {
        println!("Plate confidence: {:.0}%", confidence * 100.0);
    }
}
