//! periscan: offline C2 traffic triage.
//!
//! Loads a per-remote-IP traffic stats file produced by the upstream
//! capture agent, flags endpoints that beacon on a stable period, labels
//! each endpoint's traffic pattern, and enriches the results with
//! locally resolved threat-intel and geolocation data.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────┐    ┌───────────────────────────────┐    ┌────────────┐
//! │ Loader  │───>│ EndpointAnalyzer              │───>│  Export    │
//! │ (JSON)  │    │ intervals -> periodicity      │    │ text/json  │
//! └─────────┘    │           -> pattern rules    │    └────────────┘
//!                └──────────────┬────────────────┘
//!                     attach    │
//!            ┌──────────────────┴───────────────┐
//!            │ ThreatIntelLookup / GeoLookup    │
//!            │ (local indicator set, MaxMind)   │
//!            └──────────────────────────────────┘
//! ```
//!
//! The analysis core is a pure function per endpoint; collaborator
//! lookups are resolved afterwards and attached by key.

mod analyzer;
mod config;
mod error;
mod export;
mod geo;
mod intel;
mod interval;
mod loader;
mod model;
mod pattern;
mod periodicity;
mod timestamp;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use crate::analyzer::{analyze_all, attach_geo, attach_intel, EndpointAnalyzer};
use crate::config::Config;
use crate::export::{export_report, OutputFormat};
use crate::geo::{CachedGeo, GeoDisabled, GeoLookup, MaxmindGeo};
use crate::intel::{
    gather_attachment, CachedIntel, IntelDisabled, LocalIntel, ThreatIntelLookup,
};

/// periscan: C2 beacon detection over captured per-endpoint traffic stats.
#[derive(Parser, Debug)]
#[command(name = "periscan")]
#[command(version = "0.1.0")]
#[command(about = "Detect C2 beaconing and classify traffic patterns from capture stats files")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze a capture stats file.
    Analyze {
        /// Path to the JSON stats file written by the capture agent.
        #[arg(short, long)]
        file: PathBuf,

        /// Path to a TOML config file.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Tolerance fraction for the periodicity tests (0-1, smaller is
        /// stricter).
        #[arg(short, long)]
        tolerance: Option<f64>,

        /// Output format: text, json, jsonl.
        #[arg(short, long)]
        output: Option<String>,

        /// Write the report to a file instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,

        /// Path to a local indicator file for threat-intel matching.
        #[arg(long)]
        ioc_file: Option<PathBuf>,

        /// Path to a GeoLite2-Country.mmdb database.
        #[arg(long)]
        geo_country_db: Option<PathBuf>,

        /// Path to a GeoLite2-ASN.mmdb database.
        #[arg(long)]
        geo_asn_db: Option<PathBuf>,

        /// Enable verbose logging.
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print a default configuration file.
    GenerateConfig,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            file,
            config,
            tolerance,
            output,
            out,
            ioc_file,
            geo_country_db,
            geo_asn_db,
            verbose,
        } => {
            let mut cfg = Config::load_or_default(config.as_deref());

            // CLI flags override file settings.
            if let Some(tolerance) = tolerance {
                cfg.analysis.tolerance = tolerance;
            }
            if let Some(format) = output {
                cfg.output.format = format
                    .parse()
                    .map_err(|e: String| anyhow::anyhow!(e))?;
            }
            if let Some(out) = out {
                cfg.output.file = Some(out.display().to_string());
            }
            if let Some(path) = ioc_file {
                cfg.intel.enabled = true;
                cfg.intel.indicator_file = Some(path.display().to_string());
            }
            if let Some(path) = geo_country_db {
                cfg.geo.enabled = true;
                cfg.geo.country_db = Some(path.display().to_string());
            }
            if let Some(path) = geo_asn_db {
                cfg.geo.enabled = true;
                cfg.geo.asn_db = Some(path.display().to_string());
            }
            cfg.output.verbose |= verbose;

            cfg.validate()?;
            init_logging(cfg.output.verbose)?;

            run_analysis(&file, &cfg)
        }

        Commands::GenerateConfig => {
            print!("{}", Config::generate_default());
            Ok(())
        }
    }
}

fn init_logging(verbose: bool) -> Result<()> {
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

fn run_analysis(file: &Path, cfg: &Config) -> Result<()> {
    let data = loader::load_stats(file)?;

    let endpoint_analyzer = EndpointAnalyzer::new(cfg.analysis.tolerance);
    let (mut results, summary) = analyze_all(&endpoint_analyzer, &data);

    let intel = build_intel(cfg)?;
    let geo = build_geo(cfg);

    // Geolocation resolves in one batch; intel goes key by key since it
    // also covers each endpoint's SNI and DNS names.
    let ips: Vec<String> = results.iter().map(|r| r.ip.clone()).collect();
    let mut geo_reports = if geo.is_enabled() {
        geo.check_batch(&ips)
    } else {
        Default::default()
    };

    for result in &mut results {
        if let Some(report) = geo_reports.remove(&result.ip) {
            attach_geo(result, report);
        }
        let attachment =
            gather_attachment(intel.as_ref(), &result.ip, &result.sni_names, &result.dns_names);
        attach_intel(result, attachment);
    }

    let report = export_report(&results, &summary, cfg.output.format);
    match &cfg.output.file {
        Some(path) => {
            std::fs::write(path, &report)
                .with_context(|| format!("Failed to write report to {}", path))?;
            info!("Report written to {}", path);
        }
        None => {
            if cfg.output.format == OutputFormat::Text {
                print!("{}", report);
            } else {
                println!("{}", report);
            }
        }
    }

    Ok(())
}

fn build_intel(cfg: &Config) -> Result<Box<dyn ThreatIntelLookup>> {
    if !cfg.intel.enabled {
        return Ok(Box::new(IntelDisabled));
    }
    match &cfg.intel.indicator_file {
        Some(path) => {
            let local = LocalIntel::load(Path::new(path))?;
            Ok(Box::new(CachedIntel::new(local, cfg.intel.cache_capacity)))
        }
        None => {
            warn!("Threat-intel enabled but no indicator file configured, skipping");
            Ok(Box::new(IntelDisabled))
        }
    }
}

fn build_geo(cfg: &Config) -> Box<dyn GeoLookup> {
    if !cfg.geo.enabled {
        return Box::new(GeoDisabled);
    }
    let maxmind = MaxmindGeo::new(&cfg.geo);
    if !maxmind.is_available() {
        warn!("Geo enrichment enabled but no database could be loaded");
        return Box::new(GeoDisabled);
    }
    Box::new(CachedGeo::new(maxmind, cfg.geo.cache_capacity))
}
