//! Senior Well-Being Report - CSV Analysis & Chart Generator
//!
//! One-shot batch run: load the survey CSV, clean it, aggregate, render
//! charts and write the benchmarks report.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use wellbeing_report::charts::{ChartConfig, ChartRenderer, Palette, Rendered};
use wellbeing_report::config::{load_config, AnalysisConfig};
use wellbeing_report::data;
use wellbeing_report::report::{self, BenchmarkSet};
use wellbeing_report::stats;

#[derive(Parser)]
#[command(
    name = "wellbeing-report",
    version,
    about = "Senior Well-Being CSV Analysis & Chart Report Generator"
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline on a survey CSV
    Analyze {
        /// Path to the survey CSV file
        input: PathBuf,

        /// Directory for generated charts and reports
        #[arg(short, long, default_value = "./reports")]
        output_dir: PathBuf,

        /// JSON analysis configuration (GenWell defaults when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Compare a benchmarks file against a stored baseline
    Compare {
        /// Benchmarks file from the current run
        current: PathBuf,

        /// Baseline benchmarks file to compare against
        baseline: PathBuf,

        /// Where to write the comparison report
        #[arg(short, long, default_value = "comparison_report.txt")]
        output: PathBuf,
    },
}

fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Commands::Analyze {
            input,
            output_dir,
            config,
        } => run_analyze(&input, &output_dir, config.as_deref()),
        Commands::Compare {
            current,
            baseline,
            output,
        } => run_compare(&current, &baseline, &output),
    }
}

fn run_analyze(input: &Path, output_dir: &Path, config_path: Option<&Path>) -> Result<()> {
    let config = match config_path {
        Some(path) => load_config(path)
            .with_context(|| format!("invalid analysis config: {}", path.display()))?,
        None => AnalysisConfig::default(),
    };

    info!("loading dataset from {}", input.display());
    let df = data::load_csv(input)?;
    data::validate_schema(&df, &config.columns)?;
    info!("dataset loaded: {} rows, {} columns", df.height(), df.width());

    let (cleaned, clean_report) = data::clean(&df, &config)?;
    info!(
        "cleaning kept {} of {} rows ({} missing, {} outside age window, {} outside score bounds, {} outside bins)",
        clean_report.rows_out,
        clean_report.rows_in,
        clean_report.dropped_missing,
        clean_report.dropped_age,
        clean_report.dropped_score,
        clean_report.dropped_unbinned,
    );

    fs::create_dir_all(output_dir)
        .with_context(|| format!("cannot create output directory {}", output_dir.display()))?;

    let specs: Vec<stats::GroupSpec> = config.charts.iter().map(|c| c.group_spec()).collect();
    let aggregates = stats::aggregate_all(&cleaned, &specs)?;

    let mut charts_written = 0usize;
    for (job, aggregate) in config.charts.iter().zip(&aggregates) {
        let path = output_dir.join(format!("{}.png", job.name));
        match ChartRenderer::render(aggregate, job.kind, &job.chart_config(), &path)? {
            Rendered::Written(path) => {
                charts_written += 1;
                info!("chart written: {}", path.display());
            }
            Rendered::Skipped => {}
        }
    }

    if config.correlation_columns.len() >= 2 {
        let matrix = stats::correlation_matrix(&cleaned, &config.correlation_columns)?;
        let heatmap_cfg = ChartConfig {
            title: "Correlation: Loneliness, Physical and Mental Health".to_string(),
            x_label: String::new(),
            y_label: String::new(),
            palette: Palette::Default,
            width: 900,
            height: 700,
        };
        let path = output_dir.join("correlation_heatmap.png");
        if let Rendered::Written(path) = ChartRenderer::render_heatmap(&matrix, &heatmap_cfg, &path)?
        {
            charts_written += 1;
            info!("chart written: {}", path.display());
        }
        for (a, b, r, p) in matrix.significant_pairs() {
            info!("significant correlation: {a} vs {b}: r = {r:.2} (p = {p:.4})");
        }
    }

    let benchmarks = BenchmarkSet::from_frame(&cleaned, &config.benchmark_columns())?;
    let benchmarks_path = output_dir.join("benchmarks.txt");
    benchmarks.write_to(&benchmarks_path)?;
    info!("benchmarks written: {}", benchmarks_path.display());

    print_summary(&clean_report, &benchmarks, charts_written);
    Ok(())
}

fn print_summary(
    clean_report: &wellbeing_report::data::CleanReport,
    benchmarks: &BenchmarkSet,
    charts_written: usize,
) {
    println!();
    println!(
        "Analyzed {} of {} respondents ({} dropped); {} charts written.",
        clean_report.rows_out,
        clean_report.rows_in,
        clean_report.dropped(),
        charts_written
    );
    if benchmarks.is_empty() {
        println!("No summary statistics: the cleaned dataset is empty.");
        return;
    }
    println!();
    println!("Summary statistics:");
    for entry in &benchmarks.entries {
        println!(
            "  {:<55} mean {:>8.2}   median {:>8.2}",
            entry.metric, entry.mean, entry.median
        );
    }
}

fn run_compare(current: &Path, baseline: &Path, output: &Path) -> Result<()> {
    let current_set = BenchmarkSet::parse_file(current)
        .with_context(|| format!("cannot read benchmarks from {}", current.display()))?;
    let baseline_set = BenchmarkSet::parse_file(baseline)
        .with_context(|| format!("cannot read benchmarks from {}", baseline.display()))?;

    let results = report::compare(&current_set, &baseline_set);
    if results.is_empty() {
        warn!("no overlapping metrics between the two benchmark files");
        return Ok(());
    }

    println!("{}", report::format_comparison_table(&results));
    report::write_comparison_report(&results, output)?;
    info!("comparison report written: {}", output.display());
    Ok(())
}
