//! Benchmark Report Module
//! Writes per-variable mean/median benchmarks to a text file, parses them
//! back, and compares a current run against a stored baseline with trend
//! and assessment classifications.

use crate::stats::compute_descriptive_stats;
use polars::prelude::*;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("report I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("polars error: {0}")]
    Polars(#[from] PolarsError),
}

/// Mean and median of one variable.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkEntry {
    pub metric: String,
    pub mean: f64,
    pub median: f64,
}

/// Ordered benchmark values for a dataset.
#[derive(Debug, Clone, Default)]
pub struct BenchmarkSet {
    pub entries: Vec<BenchmarkEntry>,
}

impl BenchmarkSet {
    /// Compute benchmarks for the given numeric columns of a cleaned frame.
    /// Columns with no usable values are left out.
    pub fn from_frame(df: &DataFrame, columns: &[String]) -> Result<Self, ReportError> {
        let mut entries = Vec::new();
        for name in columns {
            let col = df.column(name)?;
            let f64_col = match col.cast(&DataType::Float64) {
                Ok(c) => c,
                Err(_) => {
                    warn!("benchmark column '{name}' is not numeric, skipping");
                    continue;
                }
            };
            let ca = f64_col.f64()?;
            let values: Vec<f64> = ca.into_iter().flatten().filter(|v| !v.is_nan()).collect();
            if values.is_empty() {
                continue;
            }
            let stats = compute_descriptive_stats(&values);
            entries.push(BenchmarkEntry {
                metric: name.clone(),
                mean: stats.mean,
                median: stats.median,
            });
        }
        Ok(Self { entries })
    }

    pub fn get(&self, metric: &str) -> Option<&BenchmarkEntry> {
        self.entries.iter().find(|e| e.metric == metric)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the benchmarks in the plain text report format.
    pub fn write_to(&self, path: &Path) -> Result<(), ReportError> {
        let mut file = File::create(path)?;
        writeln!(file, "Benchmarks for the dataset:")?;
        writeln!(file)?;
        for entry in &self.entries {
            writeln!(file, "{}:", entry.metric)?;
            writeln!(file, "  Mean: {:.2}", entry.mean)?;
            writeln!(file, "  Median: {:.2}", entry.median)?;
            writeln!(file)?;
        }
        Ok(())
    }

    /// Parse a benchmarks file written by [`BenchmarkSet::write_to`].
    /// Unparseable value lines are skipped with a warning.
    pub fn parse_file(path: &Path) -> Result<Self, ReportError> {
        let file = File::open(path)?;
        let mut entries: Vec<BenchmarkEntry> = Vec::new();

        for line in BufReader::new(file).lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with("Benchmarks for") || line.starts_with('=') {
                continue;
            }

            if let Some(metric) = line.strip_suffix(':') {
                if !metric.starts_with("Mean") && !metric.starts_with("Median") {
                    entries.push(BenchmarkEntry {
                        metric: metric.to_string(),
                        mean: f64::NAN,
                        median: f64::NAN,
                    });
                    continue;
                }
            }

            let Some(entry) = entries.last_mut() else {
                continue;
            };
            if let Some(rest) = line.strip_prefix("Mean:") {
                match parse_value(rest) {
                    Some(v) => entry.mean = v,
                    None => warn!("could not parse value in line: {line}"),
                }
            } else if let Some(rest) = line.strip_prefix("Median:") {
                match parse_value(rest) {
                    Some(v) => entry.median = v,
                    None => warn!("could not parse value in line: {line}"),
                }
            }
        }

        Ok(Self { entries })
    }
}

/// First whitespace-separated token as a number, ignoring trailing units.
fn parse_value(rest: &str) -> Option<f64> {
    rest.split_whitespace().next()?.parse().ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatKind {
    Mean,
    Median,
}

impl fmt::Display for StatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatKind::Mean => write!(f, "Mean"),
            StatKind::Median => write!(f, "Median"),
        }
    }
}

/// Direction of the difference; within 5 percent counts as stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Stable,
    Higher,
    Lower,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Stable => write!(f, "Stable"),
            Trend::Higher => write!(f, "Higher"),
            Trend::Lower => write!(f, "Lower"),
        }
    }
}

/// Size of the difference: within 10 percent is normal, within 20 moderate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assessment {
    NormalRange,
    Moderate,
    Significant,
}

impl fmt::Display for Assessment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Assessment::NormalRange => write!(f, "Normal Range"),
            Assessment::Moderate => write!(f, "Moderate"),
            Assessment::Significant => write!(f, "Significant"),
        }
    }
}

/// One metric/statistic compared against the baseline.
#[derive(Debug, Clone)]
pub struct Comparison {
    pub metric: String,
    pub stat: StatKind,
    pub current: f64,
    pub baseline: f64,
    pub abs_diff: f64,
    pub pct_diff: f64,
    pub trend: Trend,
    pub assessment: Assessment,
}

fn classify(pct_diff: f64) -> (Trend, Assessment) {
    let magnitude = pct_diff.abs();
    let trend = if magnitude <= 5.0 {
        Trend::Stable
    } else if pct_diff > 0.0 {
        Trend::Higher
    } else {
        Trend::Lower
    };
    let assessment = if magnitude <= 10.0 {
        Assessment::NormalRange
    } else if magnitude <= 20.0 {
        Assessment::Moderate
    } else {
        Assessment::Significant
    };
    (trend, assessment)
}

/// Compare every metric present in both sets, mean and median separately.
pub fn compare(current: &BenchmarkSet, baseline: &BenchmarkSet) -> Vec<Comparison> {
    let mut results = Vec::new();
    for entry in &current.entries {
        let Some(base) = baseline.get(&entry.metric) else {
            continue;
        };
        let pairs = [
            (StatKind::Mean, entry.mean, base.mean),
            (StatKind::Median, entry.median, base.median),
        ];
        for (stat, current_value, baseline_value) in pairs {
            if current_value.is_nan() || baseline_value.is_nan() {
                continue;
            }
            let abs_diff = current_value - baseline_value;
            let pct_diff = if baseline_value != 0.0 {
                abs_diff / baseline_value * 100.0
            } else if abs_diff == 0.0 {
                0.0
            } else {
                f64::INFINITY.copysign(abs_diff)
            };
            let (trend, assessment) = classify(pct_diff);
            results.push(Comparison {
                metric: entry.metric.clone(),
                stat,
                current: current_value,
                baseline: baseline_value,
                abs_diff,
                pct_diff,
                trend,
                assessment,
            });
        }
    }
    results
}

/// Write the detailed comparison report.
pub fn write_comparison_report(results: &[Comparison], path: &Path) -> Result<(), ReportError> {
    let mut file = File::create(path)?;
    writeln!(file, "Senior Well-Being Analysis - Comparison Report")?;
    writeln!(file, "{}", "=".repeat(50))?;

    let mut current_metric: Option<&str> = None;
    for result in results {
        if current_metric != Some(result.metric.as_str()) {
            current_metric = Some(result.metric.as_str());
            writeln!(file)?;
            writeln!(file, "{}", result.metric)?;
            writeln!(file, "{}", "-".repeat(result.metric.len()))?;
        }
        writeln!(file)?;
        writeln!(file, "{} Analysis:", result.stat)?;
        writeln!(file, "  Current Value:       {:.2}", result.current)?;
        writeln!(file, "  Baseline:            {:.2}", result.baseline)?;
        writeln!(file, "  Absolute Difference: {:+.2}", result.abs_diff)?;
        writeln!(file, "  Percentage Change:   {:+.1}%", result.pct_diff)?;
        writeln!(file, "  Trend:               {}", result.trend)?;
        writeln!(file, "  Assessment:          {}", result.assessment)?;
    }
    Ok(())
}

/// Console table of the comparison results.
pub fn format_comparison_table(results: &[Comparison]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<55} {:<8} {:>10} {:>10} {:>10}  {:<8} {}\n",
        "Metric", "Type", "Current", "Baseline", "% Diff", "Trend", "Assessment"
    ));
    out.push_str(&"-".repeat(112));
    out.push('\n');
    for r in results {
        out.push_str(&format!(
            "{:<55} {:<8} {:>10.2} {:>10.2} {:>+9.1}%  {:<8} {}\n",
            r.metric,
            r.stat.to_string(),
            r.current,
            r.baseline,
            r.pct_diff,
            r.trend.to_string(),
            r.assessment
        ));
    }
    out
}
