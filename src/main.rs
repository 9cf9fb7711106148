use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{error, info};

mod batch;
mod distance;
mod elevation;
mod error;
mod glyph_backend;
mod pack_load;
mod report;
mod summary;
mod track_parser;

use batch::{discover_gpx_files, BatchConfig, BatchCoordinator};
use pack_load::{calc_daily_load, plot_daily_load, save_daily_load, PackInputs};

#[derive(Debug, Parser)]
#[command(name = "hike-tracker", version, about = "Distance and elevation stats for a folder of GPX hikes")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Summarize every GPX file in a directory into a CSV table
    Tracks(TracksArgs),
    /// Compute daily pack weight for a trip
    Pack(PackArgs),
}

#[derive(Debug, Args)]
struct TracksArgs {
    /// Directory holding the GPX files
    gpx_dir: PathBuf,

    /// Output CSV file
    #[arg(short, long, default_value = "HikeData.csv")]
    output: PathBuf,

    /// Also write the summaries as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Number of worker threads (defaults to the CPU count)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Process files one at a time
    #[arg(long, conflicts_with = "jobs")]
    sequential: bool,
}

#[derive(Debug, Args)]
struct PackArgs {
    /// Name of the hike, used for the output file names
    #[arg(long)]
    name: String,

    /// Pack base weight (lbs)
    #[arg(long)]
    base_weight: f64,

    /// Body weight (lbs)
    #[arg(long)]
    body_weight: f64,

    /// Trip duration (days)
    #[arg(long)]
    days: f64,

    /// Daily food requirement (lbs)
    #[arg(long)]
    daily_food: f64,

    /// Where to write <name>.csv and <name>.json
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    match cli.command {
        Command::Tracks(args) => run_tracks(args),
        Command::Pack(args) => run_pack(args),
    }
}

fn run_tracks(args: TracksArgs) -> Result<()> {
    let config = if args.sequential {
        BatchConfig::sequential()
    } else {
        args.jobs.map(BatchConfig::with_workers).unwrap_or_default()
    };

    let gpx_files = discover_gpx_files(&args.gpx_dir)?;

    let coordinator = BatchCoordinator::new(config).context("Failed to start worker pool")?;
    info!("Found {} CPU(s) on system, using {} worker(s)", num_cpus::get(), coordinator.workers());

    let batch_report = coordinator.run(&gpx_files);
    drop(coordinator);

    // Rendering failures are reported but the computed summaries still get printed.
    let mut write_failed = false;
    if let Err(e) = report::save_summaries_csv(&batch_report, &args.output) {
        error!("Error writing data to {}: {}", args.output.display(), e);
        write_failed = true;
    }
    if let Some(json_path) = &args.json {
        if let Err(e) = report::save_summaries_json(&batch_report, json_path) {
            error!("Error writing data to {}: {}", json_path.display(), e);
            write_failed = true;
        }
    }

    report::print_processing_summary(&batch_report);

    if write_failed {
        anyhow::bail!("one or more output files could not be written");
    }
    Ok(())
}

fn run_pack(args: PackArgs) -> Result<()> {
    let inputs = PackInputs {
        base_weight: args.base_weight,
        body_weight: args.body_weight,
        trip_duration: args.days,
        daily_food: args.daily_food,
    };

    let table = calc_daily_load(&inputs)?;
    let (csv_path, json_path) = save_daily_load(&table, &args.name, &args.out_dir)
        .with_context(|| format!("Failed to save pack load for {}", args.name))?;
    let png_path = plot_daily_load(&table, &args.name, &args.out_dir)
        .with_context(|| format!("Failed to plot pack load for {}", args.name))?;

    println!("\n🎒 {} - PACK WEIGHT STATISTICS", args.name);
    println!("================================");
    for day in &table {
        println!(
            "Day {:>2}: {:>6.2} lbs ({:.2}% of body weight)",
            day.day_num, day.total_pack_weight, day.pct_body_weight
        );
    }
    println!(
        "📁 Saved {}, {} and {}",
        csv_path.display(),
        json_path.display(),
        png_path.display()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_tracks_defaults() {
        let cli = Cli::try_parse_from(["hike-tracker", "tracks", "/tmp/gpx"]).unwrap();
        match cli.command {
            Command::Tracks(args) => {
                assert_eq!(args.output, PathBuf::from("HikeData.csv"));
                assert!(args.jobs.is_none());
                assert!(!args.sequential);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_sequential_conflicts_with_jobs() {
        assert!(Cli::try_parse_from(["hike-tracker", "tracks", "x", "--sequential", "-j", "4"]).is_err());
    }
}
