//! Command handlers

use crate::cli::{Cli, Commands};
use crate::output::{output_response, output_result};
use challan_app::config::Config;
use challan_app::repository::open_result_cache;
use challan_app::scanner::scan_directory;
use challan_app::{analyze_batch, AnalysisResponse, AnalysisService};
use challan_domain::repository::{cache_key, ResultCache};
use challan_infra::FileResultCache;
use challan_types::{CacheError, Error, OutputFormat, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use std::path::PathBuf;
use uuid::Uuid;

/// Execute CLI command
pub fn execute(cli: Cli) -> Result<()> {
    // Load config (file, then environment)
    let mut config = Config::load()?;

    // Override from CLI args
    if let Some(confidence) = cli.confidence {
        config.confidence_threshold = confidence;
    }
    if cli.detector_cmd.is_some() {
        config.detector_command = cli.detector_cmd.clone();
    }
    if cli.recognizer_cmd.is_some() {
        config.recognizer_command = cli.recognizer_cmd.clone();
    }
    config.validate()?;

    let output_format = cli.format.unwrap_or(config.output_format);

    match &cli.command {
        Commands::Analyze {
            image,
            id,
            no_cache,
        } => {
            // Cache disabled if: --no-cache OR config.cache_enabled=false
            config.cache_enabled = config.cache_enabled && !no_cache;
            cmd_analyze(&config, image.clone(), id.clone(), output_format)
        }

        Commands::Result { id } => cmd_result(&config, id, output_format),

        Commands::Batch {
            folder,
            output,
            no_cache,
            jobs,
        } => {
            // Use CLI jobs if specified, otherwise default 4. 0 = auto CPU count.
            let job_count = match jobs {
                Some(0) => num_cpus::get(),
                Some(n) => *n,
                None => 4,
            };
            config.cache_enabled = config.cache_enabled && !no_cache;
            cmd_batch(&config, folder.clone(), output.clone(), job_count, output_format)
        }

        Commands::Config {
            show,
            set_confidence,
            set_detector_cmd,
            set_recognizer_cmd,
            set_cache,
            set_cache_ttl,
            set_output,
            set_plate_min_conf,
            set_review_min_quality,
            reset,
        } => cmd_config(
            *show,
            ConfigChanges {
                confidence: *set_confidence,
                detector_cmd: set_detector_cmd.clone(),
                recognizer_cmd: set_recognizer_cmd.clone(),
                cache: *set_cache,
                cache_ttl: *set_cache_ttl,
                output: *set_output,
                plate_min_conf: *set_plate_min_conf,
                review_min_quality: *set_review_min_quality,
            },
            *reset,
        ),

        Commands::Cache { clear, stats } => cmd_cache(&config, *clear, *stats),
    }
}

fn cmd_analyze(
    config: &Config,
    image: PathBuf,
    id: Option<String>,
    output_format: OutputFormat,
) -> Result<()> {
    let service = AnalysisService::from_config(config)?;

    // Only name the result when it will actually be stored
    let correlation_id = match id {
        Some(id) => Some(id),
        None if service.cache().is_some() => Some(Uuid::new_v4().to_string()),
        None => None,
    };

    info!("Analyzing {}", image.display());
    match service.analyze_path(&image, correlation_id.as_deref()) {
        Ok(result) => {
            let response = AnalysisResponse::from_outcome(correlation_id.as_deref(), Ok(result));
            output_response(output_format, &response, &config.review)
        }
        Err(e) => {
            if output_format == OutputFormat::Json {
                let response = AnalysisResponse {
                    success: false,
                    correlation_id,
                    result: None,
                    message: e.to_string(),
                };
                output_response(output_format, &response, &config.review)?;
            }
            Err(e.into())
        }
    }
}

fn cmd_result(config: &Config, id: &str, output_format: OutputFormat) -> Result<()> {
    let cache = open_result_cache(config)?.ok_or_else(|| {
        Error::Cache(CacheError::IoError(
            "Cache is disabled. Enable with: challan config --set-cache true".to_string(),
        ))
    })?;

    match cache.get(&cache_key(id))? {
        Some(result) => output_result(output_format, &result, Some(id), &config.review),
        None => Err(Error::FileNotFound(format!(
            "No result stored for {} (results expire after {}s)",
            id, config.cache_ttl_secs
        ))),
    }
}

fn cmd_batch(
    config: &Config,
    folder: PathBuf,
    output: Option<PathBuf>,
    jobs: usize,
    output_format: OutputFormat,
) -> Result<()> {
    let images = scan_directory(&folder)?;

    if images.is_empty() {
        return Err(Error::FileNotFound(format!(
            "No images found in {}",
            folder.display()
        )));
    }

    let service = AnalysisService::from_config(config)?;
    let use_cache = service.cache().is_some();
    info!(
        "Found {} images to analyze with {} parallel jobs (cache: {})",
        images.len(),
        jobs,
        if use_cache { "on" } else { "off" }
    );

    let pb = ProgressBar::new(images.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let report = analyze_batch(
        &service,
        &images,
        jobs,
        |_| use_cache.then(|| Uuid::new_v4().to_string()),
        |path| {
            pb.set_message(
                path.file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("")
                    .to_string(),
            );
            pb.inc(1);
        },
    );
    pb.finish_with_message("Complete");

    if let Some(output_path) = output {
        let content = serde_json::to_string_pretty(&report)?;
        std::fs::write(&output_path, content)?;
        println!("Results saved to: {}", output_path.display());
    } else if output_format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let violations: usize = report
        .entries
        .iter()
        .filter_map(|e| e.result.as_ref())
        .map(|r| r.violations.len())
        .sum();

    println!("\nBatch Analysis Complete");
    println!("=======================");
    println!("Total:      {}", report.total_processed);
    println!("Successful: {}", report.successful);
    println!("Failed:     {}", report.failed);
    println!("Violations: {}", violations);
    println!(
        "Duration:   {:.1}s",
        (report.completed_at - report.started_at).num_milliseconds() as f64 / 1000.0
    );

    for entry in report.entries.iter().filter(|e| e.error.is_some()) {
        println!(
            "  failed: {} ({})",
            entry.image_path.display(),
            entry.error.as_deref().unwrap_or("")
        );
    }

    Ok(())
}

/// Values requested by `config --set-*`
struct ConfigChanges {
    confidence: Option<f32>,
    detector_cmd: Option<String>,
    recognizer_cmd: Option<String>,
    cache: Option<bool>,
    cache_ttl: Option<u64>,
    output: Option<OutputFormat>,
    plate_min_conf: Option<f32>,
    review_min_quality: Option<f64>,
}

impl ConfigChanges {
    /// Apply to `config`, returning whether anything changed
    fn apply(self, config: &mut Config) -> bool {
        let mut modified = false;

        if let Some(confidence) = self.confidence {
            config.confidence_threshold = confidence;
            modified = true;
        }
        if let Some(cmd) = self.detector_cmd {
            config.detector_command = Some(cmd);
            modified = true;
        }
        if let Some(cmd) = self.recognizer_cmd {
            config.recognizer_command = Some(cmd);
            modified = true;
        }
        if let Some(enabled) = self.cache {
            config.cache_enabled = enabled;
            modified = true;
        }
        if let Some(ttl) = self.cache_ttl {
            config.cache_ttl_secs = ttl;
            modified = true;
        }
        if let Some(format) = self.output {
            config.output_format = format;
            modified = true;
        }
        if let Some(min_conf) = self.plate_min_conf {
            config.plates.min_confidence = min_conf;
            modified = true;
        }
        if let Some(min_quality) = self.review_min_quality {
            config.review.min_quality = min_quality;
            modified = true;
        }

        modified
    }
}

fn cmd_config(show: bool, changes: ConfigChanges, reset: bool) -> Result<()> {
    if reset {
        let config = Config::default();
        config.save()?;
        println!("Configuration reset to defaults");
        println!("\n{}", config);
        return Ok(());
    }

    // Edit the stored file only; environment overrides are not persisted
    let path = Config::config_path()?;
    let mut config = Config::load_from(&path)?;

    let modified = changes.apply(&mut config);
    if modified {
        config.save_to(&path)?;
        println!("Configuration updated");
    }

    if show || !modified {
        println!("\n{}", config);
    }

    Ok(())
}

fn cmd_cache(config: &Config, clear: bool, stats: bool) -> Result<()> {
    if !config.cache_enabled {
        return Err(Error::Cache(CacheError::IoError(
            "Cache is disabled. Enable with: challan config --set-cache true".to_string(),
        )));
    }

    let cache = FileResultCache::new(config.cache_dir()?)?;

    if clear {
        let count = cache.clear()?;
        println!("Cleared {} cached results", count);
    }

    if stats || !clear {
        let stats = cache.stats()?;
        let size_kb = stats.bytes as f64 / 1024.0;
        println!("Cache Statistics");
        println!("================");
        println!("Entries:    {}", stats.entries);
        println!("Expired:    {}", stats.expired);
        println!("Total size: {:.2} KB", size_kb);
        println!("Location:   {}", cache.cache_dir().display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_changes() -> ConfigChanges {
        ConfigChanges {
            confidence: None,
            detector_cmd: None,
            recognizer_cmd: None,
            cache: None,
            cache_ttl: None,
            output: None,
            plate_min_conf: None,
            review_min_quality: None,
        }
    }

    #[test]
    fn test_config_changes_apply() {
        let mut config = Config::default();
        assert!(!no_changes().apply(&mut config));

        let changes = ConfigChanges {
            confidence: Some(0.6),
            detector_cmd: Some("python3 detect.py".to_string()),
            cache_ttl: Some(600),
            ..no_changes()
        };
        assert!(changes.apply(&mut config));
        assert_eq!(config.confidence_threshold, 0.6);
        assert_eq!(config.detector_command.as_deref(), Some("python3 detect.py"));
        assert_eq!(config.cache_ttl_secs, 600);
    }
}
