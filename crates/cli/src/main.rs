//! grassmap CLI - grassland identification from multispectral imagery

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use grassmap_algorithms::statistics::band_statistics;
use grassmap_algorithms::vector::MIN_AREA_M2;
use grassmap_core::io::read_bands;
use grassmap_core::{BandStack, NumericLocale};
use grassmap_pipeline::{run, PipelineConfig, PipelineReport};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "grassmap")]
#[command(author, version, about = "Grassland identification from multispectral rasters", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the grassland pipeline on an 8-band raster
    Run {
        /// Input multispectral raster (bands 3, 4, 7 and 8 are used)
        input: PathBuf,
        /// Output directory, created when missing
        output_dir: PathBuf,
        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Project session document the polygons are added to
        /// (default: $GRASSMAP_PROJECT)
        #[arg(short, long)]
        project: Option<PathBuf>,
        /// Fail instead of replacing existing outputs
        #[arg(long)]
        no_overwrite: bool,
        /// Decimal separator of raster property text: dot, comma
        #[arg(long)]
        locale: Option<NumericLocale>,
        /// Do not add the result to the active map
        #[arg(long)]
        skip_map: bool,
        /// Directory holding the extension checkout lock
        #[arg(long)]
        license_dir: Option<PathBuf>,
    },
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set up logging")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_stack(path: &Path) -> Result<BandStack<f64>> {
    let pb = spinner("Reading raster...");
    let stack = read_bands(path).with_context(|| format!("Failed to read {}", path.display()));
    pb.finish_and_clear();
    let stack = stack?;
    info!(
        "Input: {} x {}, {} band(s)",
        stack.cols(),
        stack.rows(),
        stack.band_count()
    );
    Ok(stack)
}

fn build_config(
    config: Option<PathBuf>,
    project: Option<PathBuf>,
    no_overwrite: bool,
    locale: Option<NumericLocale>,
    skip_map: bool,
    license_dir: Option<PathBuf>,
) -> Result<PipelineConfig> {
    let mut cfg = match config {
        Some(path) => PipelineConfig::from_file(&path).context("Failed to load configuration")?,
        None => PipelineConfig::default(),
    };
    if project.is_some() {
        cfg.project = project;
    }
    if no_overwrite {
        cfg.overwrite = false;
    }
    if let Some(locale) = locale {
        cfg.numeric_locale = locale;
    }
    if skip_map {
        cfg.publish_to_map = false;
    }
    if let Some(dir) = license_dir {
        cfg.license_dir = dir;
    }
    Ok(cfg)
}

fn print_summary(report: &PipelineReport, elapsed: std::time::Duration) {
    let stats = &report.ndre_statistics;
    println!("Rasters saved:");
    for path in report.outputs.rasters() {
        println!("  {}", path.display());
    }
    println!(
        "Polygons saved to: {}",
        report.outputs.grassland_polygons.display()
    );
    println!(
        "  {} traced, {} under {} m² deleted, {} kept",
        report.polygons_traced,
        report.polygons_removed,
        MIN_AREA_M2,
        report.polygons_kept()
    );
    println!("NDRE: {}", stats);
    println!(
        "Cells: {} water, {} forest, {} grassland",
        report.water_cells, report.forest_cells, report.grassland_cells
    );
    if let Some(layer) = &report.published {
        println!("Layer added to map: {}", layer.name);
    }
    println!("  Processing time: {:.2?}", elapsed);
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Run {
            input,
            output_dir,
            config,
            project,
            no_overwrite,
            locale,
            skip_map,
            license_dir,
        } => {
            let config = build_config(config, project, no_overwrite, locale, skip_map, license_dir)?;
            let start = Instant::now();
            let report = run(&input, &output_dir, &config).context("Grassland pipeline failed")?;
            print_summary(&report, start.elapsed());
        }

        Commands::Info { input } => {
            let stack = read_stack(&input)?;
            let bounds = stack.bounds();
            let locale = NumericLocale::from_env();

            println!("File: {}", input.display());
            println!(
                "Dimensions: {} x {} ({} bands)",
                stack.cols(),
                stack.rows(),
                stack.band_count()
            );
            println!("Cell size: {}", stack.cell_size());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            if let Some(crs) = stack.crs() {
                println!("CRS: {}", crs);
            }
            if let Some(nodata) = stack.nodata() {
                println!("NoData: {}", nodata);
            }
            println!("\nStatistics:");
            for index in 1..=stack.band_count() {
                let band = stack.band(index)?;
                match band_statistics(&band, locale) {
                    Ok(stats) => println!("  Band {}: {}", index, stats),
                    Err(_) => println!("  Band {}: no valid cells", index),
                }
            }
        }
    }

    Ok(())
}
