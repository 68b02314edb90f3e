//! geo-sim CLI - line and polygon generalization, plugin build tooling

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use geo::{coord, BoundingRect, Rect};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use geosim_algorithms::feedback::Feedback;
use geosim_algorithms::vector::{
    area, length, normalize_features, perimeter, reduce_bend, vertex_count, ReduceBendParams,
    ReduceBendResults,
};
use geosim_core::io::{read_geojson, write_geojson};
use geosim_core::{FeatureCollection, GeometryKind};
use geosim_packaging::{
    run_target, CommandRunner, PackagingConfig, RecordingRunner, SystemRunner, Target,
    TargetContext, TargetOutcome,
};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "geosim")]
#[command(author, version, about = "Cartographic line and polygon generalization", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generalize a line or polygon layer with Reduce Bend
    ReduceBend {
        /// Input GeoJSON file
        input: PathBuf,
        /// Output GeoJSON file
        output: PathBuf,
        /// Diameter of the minimum adjusted area bend to keep (layer units)
        #[arg(short, long)]
        diameter: f64,
        /// Replace long straight bases by a smooth line
        #[arg(long)]
        smooth: bool,
        /// Keep polygons under the minimum adjusted area
        #[arg(long)]
        keep_polygons: bool,
        /// Keep holes under the minimum adjusted area
        #[arg(long)]
        keep_holes: bool,
        /// Check the internal spatial index at the end of the run
        #[arg(long)]
        validate_structure: bool,
        /// Print one summary line per pass
        #[arg(long)]
        verbose_stats: bool,
    },
    /// Show information about a GeoJSON file
    Info {
        /// Input GeoJSON file
        input: PathBuf,
    },
    /// Run a QGIS plugin build target
    Plugin {
        /// test, deploy, transup, transcompile, transclean, pylint, pycodestyle or zip
        target: String,
        /// Plugin source directory
        #[arg(short, long, default_value = ".")]
        plugin_dir: PathBuf,
        /// Configuration file (default: ./geosim.toml when present)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Where the archive is written (default: the plugin directory)
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
        /// Print the external commands instead of running them
        #[arg(long)]
        dry_run: bool,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set the log subscriber")
}

fn spinner(msg: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    Ok(pb)
}

/// Shows algorithm progress on a bar; messages are printed above it
struct BarFeedback {
    pb: ProgressBar,
}

impl BarFeedback {
    fn new(msg: &str) -> Result<Self> {
        let pb = ProgressBar::new(100);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{msg} [{bar:40.cyan/blue}] {pos:>3}%")?
                .progress_chars("=> "),
        );
        pb.set_message(msg.to_string());
        Ok(Self { pb })
    }
}

impl Feedback for BarFeedback {
    fn set_progress(&self, percent: u32) {
        self.pb.set_position(u64::from(percent.min(100)));
    }

    fn push_info(&self, message: &str) {
        self.pb.suspend(|| info!("{}", message));
    }
}

fn read_layer(path: &Path) -> Result<FeatureCollection> {
    let pb = spinner("Reading GeoJSON...")?;
    let layer = read_geojson(path).with_context(|| format!("Failed to read {}", path.display()))?;
    pb.finish_and_clear();
    info!("Input: {} features", layer.len());
    Ok(layer)
}

fn write_layer(layer: &FeatureCollection, path: &Path) -> Result<()> {
    let pb = spinner("Writing output...")?;
    write_geojson(layer, path).with_context(|| format!("Failed to write {}", path.display()))?;
    pb.finish_and_clear();
    Ok(())
}

/// Totals over the geometries of a layer
#[derive(Debug, Default)]
struct LayerSummary {
    /// Geometry kinds with their feature count
    kinds: BTreeMap<String, usize>,
    vertices: usize,
    length: f64,
    area: f64,
    perimeter: f64,
    extent: Option<Rect<f64>>,
}

impl LayerSummary {
    fn of(layer: &FeatureCollection) -> Self {
        let mut summary = LayerSummary::default();
        for feature in layer.iter() {
            let name = feature
                .kind()
                .map(|k| k.to_string())
                .unwrap_or_else(|| "None".to_string());
            *summary.kinds.entry(name).or_insert(0) += 1;

            let Some(geometry) = feature.geometry.as_ref() else {
                continue;
            };
            summary.vertices += vertex_count(geometry);
            summary.length += length(geometry);
            summary.area += area(geometry);
            summary.perimeter += perimeter(geometry);
            if let Some(r) = geometry.bounding_rect() {
                summary.extent = Some(match summary.extent {
                    Some(e) => Rect::new(
                        coord! { x: e.min().x.min(r.min().x), y: e.min().y.min(r.min().y) },
                        coord! { x: e.max().x.max(r.max().x), y: e.max().y.max(r.max().y) },
                    ),
                    None => r,
                });
            }
        }
        summary
    }
}

/// The single kind of a normalized layer, if it is one Reduce Bend accepts
fn check_layer_kind(layer: &FeatureCollection) -> Result<GeometryKind> {
    let mut kinds = layer.iter().filter_map(|f| f.kind());
    let Some(first) = kinds.next() else {
        anyhow::bail!("Input layer has no geometry");
    };
    if !matches!(first, GeometryKind::LineString | GeometryKind::Polygon) {
        anyhow::bail!("Reduce Bend needs a LineString or Polygon layer, got {}", first);
    }
    if let Some(other) = kinds.find(|k| *k != first) {
        anyhow::bail!("Mixed geometry layer: {} and {}", first, other);
    }
    Ok(first)
}

/// Normalize a layer, check its kind and run Reduce Bend on the single parts.
///
/// Feature counts in the results are those of the single-part layer.
fn generalize_layer(
    layer: &FeatureCollection,
    params: &ReduceBendParams,
    feedback: &dyn Feedback,
) -> Result<ReduceBendResults> {
    let (features, _) = normalize_features(layer);
    let kind = check_layer_kind(&features)?;
    info!("{} single-part {} features", features.len(), kind);
    reduce_bend(&features, params, feedback).context("Failed to reduce bends")
}

fn print_results(results: &ReduceBendResults, verbose_stats: bool) {
    println!("  Features in: {}", results.in_nbr_features);
    println!("  Features out: {}", results.out_nbr_features);
    println!("  Passes: {}", results.nbr_pass);
    println!("  Bends detected: {}", results.nbr_bend_detected);
    println!("  Bends reduced: {}", results.nbr_bend_reduced);
    println!("  Polygons deleted: {}", results.nbr_pol_del);
    println!("  Holes deleted: {}", results.nbr_hole_del);
    println!("  Lines smoothed: {}", results.nbr_line_smooth);
    match results.is_structure_valid {
        Some(true) => println!("  Structure: valid"),
        Some(false) => println!("  Structure: CORRUPTED"),
        None => {}
    }
    if verbose_stats {
        println!("\nPasses:");
        for line in &results.lines_log_info {
            println!("  {}", line);
        }
    }
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        // ── Reduce Bend ──────────────────────────────────────────────
        Commands::ReduceBend {
            input,
            output,
            diameter,
            smooth,
            keep_polygons,
            keep_holes,
            validate_structure,
            verbose_stats,
        } => {
            let layer = read_layer(&input)?;

            let params = ReduceBendParams {
                diameter_tol: diameter,
                smooth_line: smooth,
                exclude_polygon: !keep_polygons,
                exclude_hole: !keep_holes,
                validate_structure,
            };

            let feedback = BarFeedback::new("Reduce Bend")?;
            let start = Instant::now();
            let results = generalize_layer(&layer, &params, &feedback)?;
            feedback.pb.finish_and_clear();
            let elapsed = start.elapsed();

            write_layer(&results.features_out, &output)?;
            println!("Reduce Bend saved to: {}", output.display());
            println!("  Processing time: {:.2?}", elapsed);
            println!("  Layer features: {}", layer.len());
            let before = LayerSummary::of(&layer);
            let after = LayerSummary::of(&results.features_out);
            println!("  Vertices: {} -> {}", before.vertices, after.vertices);
            println!("  Length: {:.4} -> {:.4}", before.length, after.length);
            println!("  Area: {:.4} -> {:.4}", before.area, after.area);
            print_results(&results, verbose_stats);
        }

        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { input } => {
            let layer = read_layer(&input)?;
            let summary = LayerSummary::of(&layer);

            println!("File: {}", input.display());
            println!("Features: {}", layer.len());
            println!("Geometry kinds:");
            for (kind, count) in &summary.kinds {
                println!("  {}: {}", kind, count);
            }
            println!("Vertices: {}", summary.vertices);
            println!("Length: {:.4}", summary.length);
            println!("Area: {:.4}", summary.area);
            println!("Perimeter: {:.4}", summary.perimeter);
            if let Some(r) = summary.extent {
                println!(
                    "Extent: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                    r.min().x,
                    r.min().y,
                    r.max().x,
                    r.max().y
                );
            }
        }

        // ── Plugin ───────────────────────────────────────────────────
        Commands::Plugin {
            target,
            plugin_dir,
            config,
            out_dir,
            dry_run,
        } => {
            let target: Target = target.parse()?;
            let config = PackagingConfig::load(config.as_deref()).context("Failed to load configuration")?;
            let mut ctx = TargetContext::new(config, plugin_dir);
            if let Some(dir) = out_dir {
                ctx.out_dir = dir;
            }

            let recorder = RecordingRunner::new();
            let runner: &dyn CommandRunner = if dry_run { &recorder } else { &SystemRunner };
            let start = Instant::now();
            let outcome = run_target(target, &ctx, runner)
                .with_context(|| format!("Target '{}' failed", target))?;

            for cmd in recorder.commands() {
                println!("{}", cmd);
            }
            match outcome {
                TargetOutcome::Checked { passed: true } => println!("{}: passed", target),
                TargetOutcome::Checked { passed: false } => {
                    println!("{}: problems reported (ignored)", target)
                }
                TargetOutcome::Deployed(path) => println!("Plugin linked at: {}", path.display()),
                TargetOutcome::Archived(path) => println!("Archive saved to: {}", path.display()),
                TargetOutcome::Translations(n) => println!("{}: {} translation file(s)", target, n),
            }
            println!("  Processing time: {:.2?}", start.elapsed());
        }
    }

    Ok(())
}
