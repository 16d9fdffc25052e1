//! DriveScope Simulator CLI
//!
//! Plays deterministic synthetic drives through the dashboard pipeline.

use clap::Parser;
use drivescope_core::{BrakingThresholds, ThresholdPreset};
use drivescope_sim::{DriveRunner, JsonFileSettingsStore, RunReport, SimConfig};
use std::path::PathBuf;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// DriveScope deterministic drive simulator
#[derive(Parser, Debug)]
#[command(name = "drivescope-sim")]
#[command(about = "Run deterministic simulated drives through the DriveScope pipeline", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Number of consecutive seeds to run
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Simulated drive duration in seconds (at most one day)
    #[arg(short, long, default_value = "60")]
    duration: f64,

    /// Threshold preset (operational, product)
    #[arg(short, long, default_value = "operational")]
    preset: ThresholdPreset,

    /// Override the speed threshold (m/s)
    #[arg(long)]
    speed_threshold: Option<f64>,

    /// Override the brake threshold (m/s², negative)
    #[arg(long, allow_hyphen_values = true)]
    brake_threshold: Option<f64>,

    /// JSON settings file to load stored thresholds from
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Export recorded frames to a JSON file
    #[arg(long)]
    export: Option<PathBuf>,

    /// Record one frame every N updates when exporting
    #[arg(long, default_value = "10")]
    export_interval: u64,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,
}

/// Preset, then stored settings, then explicit flags.
fn resolve_thresholds(args: &Args) -> Result<BrakingThresholds, String> {
    let mut thresholds = args.preset.thresholds();

    if let Some(path) = &args.settings {
        let store = JsonFileSettingsStore::new(path);
        match BrakingThresholds::load_from(&store) {
            Ok(Some(stored)) => {
                info!(path = %path.display(), "loaded stored thresholds");
                thresholds = stored;
            }
            Ok(None) => warn!(path = %path.display(), "no stored thresholds, using preset"),
            Err(e) => return Err(e.to_string()),
        }
    }

    if let Some(speed) = args.speed_threshold {
        thresholds.speed_threshold_mps = speed;
    }
    if let Some(brake) = args.brake_threshold {
        thresholds.brake_threshold_mps2 = brake;
    }
    thresholds.validate().map_err(|e| e.to_string())?;
    Ok(thresholds)
}

fn print_report(report: &RunReport) {
    let stats = &report.stats;
    info!(
        "✓ seed={} | {:.1}s | {} ticks | {} braking episodes | {} alerts ({} suppressed) | {} dropped",
        report.seed,
        report.final_time_secs,
        report.total_ticks,
        stats.braking_episodes,
        stats.alerts_fired,
        stats.alerts_suppressed,
        stats.dropped,
    );
    let snap = &report.final_snapshot;
    info!(
        "  final: {:.1} km/h {} ({:.0}°) | {} {} | accel {}",
        snap.speed_kmh,
        snap.cardinal,
        snap.bearing_deg,
        snap.latitude_dms,
        snap.longitude_dms,
        snap.acceleration_level.description(),
    );
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    if !args.json {
        info!("DriveScope Simulator v0.1.0");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let thresholds = match resolve_thresholds(&args) {
        Ok(thresholds) => thresholds,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let base_config = SimConfig {
        duration_secs: args.duration,
        ..Default::default()
    };
    if let Err(e) = base_config.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    if args.export.is_some() && args.seeds > 1 {
        eprintln!("Error: --export only supports a single seed");
        std::process::exit(1);
    }

    // Determine base seed
    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42)
    } else {
        args.seed
    };

    if !args.json {
        info!(
            "preset={} | speed > {} m/s | forward accel < {} m/s²",
            args.preset, thresholds.speed_threshold_mps, thresholds.brake_threshold_mps2
        );
    }

    let mut reports = Vec::new();
    let mut failed = 0;
    for offset in 0..args.seeds.max(1) {
        let config = SimConfig {
            seed: base_seed.wrapping_add(offset as u64),
            ..base_config.clone()
        };
        let mut runner = DriveRunner::new(config).with_thresholds(thresholds);
        if let Some(path) = &args.export {
            runner = runner.with_export(path, args.export_interval);
        }

        match runner.run_blocking() {
            Ok(report) => {
                if !args.json {
                    print_report(&report);
                }
                reports.push(report);
            }
            Err(e) => {
                error!("✗ seed={} failed: {}", base_seed.wrapping_add(offset as u64), e);
                failed += 1;
            }
        }
    }

    if args.json {
        match serde_json::to_string_pretty(&reports) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        if let Some(path) = &args.export {
            info!("Exported frames to {}", path.display());
        }
    }

    // Exit with proper code for CI
    if failed > 0 {
        std::process::exit(1);
    }
}
