//! CLI definition using clap

use challan_types::OutputFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "challan")]
#[command(version)]
#[command(about = "Traffic violation detection from roadside photographs")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (json, table). Uses config value if not specified.
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Verbose output (info-level logs; RUST_LOG takes precedence)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Object detector confidence threshold (0.0-1.0)
    #[arg(long, global = true)]
    pub confidence: Option<f32>,

    /// Object detector command line
    #[arg(long, global = true)]
    pub detector_cmd: Option<String>,

    /// Text recognizer command line
    #[arg(long, global = true)]
    pub recognizer_cmd: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a single image
    Analyze {
        /// Path to image file
        image: PathBuf,

        /// Correlation id to store the result under (generated if omitted)
        #[arg(long)]
        id: Option<String>,

        /// Do not store the result (overrides config)
        #[arg(long)]
        no_cache: bool,
    },

    /// Show a stored result by correlation id
    Result {
        /// Correlation id given to (or printed by) `analyze`
        id: String,
    },

    /// Analyze every image in a folder
    Batch {
        /// Folder containing images
        folder: PathBuf,

        /// Output JSON file for results
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Do not store results (overrides config)
        #[arg(long)]
        no_cache: bool,

        /// Number of parallel workers. 0 = CPU count. Default 4.
        #[arg(long, short = 'j')]
        jobs: Option<usize>,
    },

    /// Show or modify configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Set detector confidence threshold
        #[arg(long)]
        set_confidence: Option<f32>,

        /// Set object detector command line
        #[arg(long)]
        set_detector_cmd: Option<String>,

        /// Set text recognizer command line
        #[arg(long)]
        set_recognizer_cmd: Option<String>,

        /// Enable or disable result caching
        #[arg(long)]
        set_cache: Option<bool>,

        /// Set result cache TTL in seconds
        #[arg(long)]
        set_cache_ttl: Option<u64>,

        /// Set default output format
        #[arg(long)]
        set_output: Option<OutputFormat>,

        /// Set minimum plate recognition confidence
        #[arg(long)]
        set_plate_min_conf: Option<f32>,

        /// Set minimum quality for automatic review
        #[arg(long)]
        set_review_min_quality: Option<f64>,

        /// Reset to default configuration
        #[arg(long)]
        reset: bool,
    },

    /// Manage the result cache
    Cache {
        /// Clear all cached results
        #[arg(long)]
        clear: bool,

        /// Show cache statistics
        #[arg(long)]
        stats: bool,
    },
}
