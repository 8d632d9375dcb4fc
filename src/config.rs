//! Analysis Configuration Module
//! Column names, value bounds, label maps, bins and chart jobs are all
//! runtime configuration; defaults target the GenWell 2024 Cross-Sectional
//! dataset.

use crate::charts::{ChartConfig, ChartKind, Palette};
use crate::stats::GroupSpec;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("bin spec for column '{0}' needs exactly one more edge than labels")]
    BadBins(String),
    #[error("bin edges for column '{0}' must be strictly increasing")]
    UnsortedBins(String),
    #[error("{0} range is inverted")]
    InvertedRange(&'static str),
    #[error("chart '{chart}' references unknown column '{column}'")]
    UnknownChartColumn { chart: String, column: String },
    #[error("'{0}' is not in the configured column list")]
    UnknownColumn(String),
}

/// Maps a numeric column onto labelled value ranges.
///
/// The first bin is closed on both ends, the rest are half-open
/// `(lower, upper]`, matching the survey codebook's hour bands.
#[derive(Debug, Clone, Deserialize)]
pub struct BinSpec {
    pub column: String,
    /// Name of the derived label column added by the cleaner.
    pub label_column: String,
    pub edges: Vec<f64>,
    pub labels: Vec<String>,
}

impl BinSpec {
    /// Label for a value, or `None` when it falls outside every bin.
    pub fn label_for(&self, value: f64) -> Option<&str> {
        if self.edges.len() < 2 || value < self.edges[0] {
            return None;
        }
        if value <= self.edges[1] {
            return self.labels.first().map(String::as_str);
        }
        for i in 1..self.edges.len() - 1 {
            if value > self.edges[i] && value <= self.edges[i + 1] {
                return self.labels.get(i).map(String::as_str);
            }
        }
        None
    }
}

/// One chart to render from the cleaned dataset.
#[derive(Debug, Clone, Deserialize)]
pub struct ChartJob {
    /// File stem of the generated PNG.
    pub name: String,
    pub kind: ChartKind,
    pub group_column: String,
    pub value_column: String,
    /// Explicit category order for the x-axis; categories not listed here
    /// are appended in sorted order.
    #[serde(default)]
    pub order: Option<Vec<String>>,
    pub title: String,
    #[serde(default)]
    pub x_label: String,
    #[serde(default)]
    pub y_label: String,
    #[serde(default)]
    pub palette: Palette,
}

impl ChartJob {
    pub fn group_spec(&self) -> GroupSpec {
        GroupSpec {
            group_column: self.group_column.clone(),
            value_column: self.value_column.clone(),
            order: self.order.clone(),
        }
    }

    pub fn chart_config(&self) -> ChartConfig {
        ChartConfig {
            title: self.title.clone(),
            x_label: self.x_label.clone(),
            y_label: self.y_label.clone(),
            palette: self.palette,
            width: 900,
            height: 600,
        }
    }
}

/// Full analysis configuration, deserialized from a JSON file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Columns retained from the raw file; everything else is discarded.
    pub columns: Vec<String>,
    /// Respondent identifier, carried through but never aggregated.
    pub id_column: Option<String>,
    pub age_column: String,
    pub score_column: String,
    /// Inclusive age window for a record to participate.
    pub age_range: (f64, f64),
    /// Inclusive bounds of the summarized score scale.
    pub score_range: (f64, f64),
    /// Dataset code for "no answer"; treated as missing.
    pub missing_sentinel: String,
    /// Survey label -> numeric code, per categorical column.
    pub label_maps: HashMap<String, HashMap<String, f64>>,
    pub bins: Vec<BinSpec>,
    /// Columns for the pairwise correlation heatmap (empty disables it).
    pub correlation_columns: Vec<String>,
    pub charts: Vec<ChartJob>,
}

impl AnalysisConfig {
    /// Numeric columns that feed the benchmarks report.
    pub fn benchmark_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| Some(*c) != self.id_column.as_ref())
            .cloned()
            .collect()
    }

    /// Columns that must be present and numeric for a row to be kept.
    pub fn critical_columns(&self) -> Vec<String> {
        self.benchmark_columns()
    }

    /// Every column name the cleaned frame will contain.
    fn cleaned_columns(&self) -> HashSet<String> {
        let mut names: HashSet<String> = self.columns.iter().cloned().collect();
        for col in self.label_maps.keys() {
            names.insert(format!("{col}_label"));
        }
        for bin in &self.bins {
            names.insert(bin.label_column.clone());
        }
        names
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.age_range.0 > self.age_range.1 {
            return Err(ConfigError::InvertedRange("age"));
        }
        if self.score_range.0 > self.score_range.1 {
            return Err(ConfigError::InvertedRange("score"));
        }
        for required in [&self.age_column, &self.score_column] {
            if !self.columns.contains(required) {
                return Err(ConfigError::UnknownColumn(required.clone()));
            }
        }
        for bin in &self.bins {
            if bin.edges.len() != bin.labels.len() + 1 {
                return Err(ConfigError::BadBins(bin.column.clone()));
            }
            if bin.edges.windows(2).any(|w| w[0] >= w[1]) {
                return Err(ConfigError::UnsortedBins(bin.column.clone()));
            }
            if !self.columns.contains(&bin.column) {
                return Err(ConfigError::UnknownColumn(bin.column.clone()));
            }
        }
        for col in &self.correlation_columns {
            if !self.columns.contains(col) {
                return Err(ConfigError::UnknownColumn(col.clone()));
            }
        }
        let cleaned = self.cleaned_columns();
        for chart in &self.charts {
            for col in [&chart.group_column, &chart.value_column] {
                if !cleaned.contains(col) {
                    return Err(ConfigError::UnknownChartColumn {
                        chart: chart.name.clone(),
                        column: col.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Load and validate a configuration from a JSON file.
pub fn load_config(path: &Path) -> Result<AnalysisConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: AnalysisConfig = serde_json::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

const AGE: &str = "DEMO_age";
const SCORE: &str = "LONELY_dejong_emotional_social_loneliness_scale_TOTAL";
const TIME_ALONE: &str = "CONNECTION_social_time_alone";
const FACE_TO_FACE: &str = "CONNECTION_activities_face_to_face_convorsation_p3m";
const PHYSICAL: &str = "WELLNESS_self_rated_physical_health";
const MENTAL: &str = "WELLNESS_self_rated_mental_health";
const VOLUNTEERED: &str = "CONNECTION_activities_volunteered_p3m";

fn likert_map() -> HashMap<String, f64> {
    HashMap::from([
        ("Poor".to_string(), 1.0),
        ("Fair".to_string(), 2.0),
        ("Good".to_string(), 3.0),
        ("Very good".to_string(), 4.0),
        ("Excellent".to_string(), 5.0),
    ])
}

fn frequency_map() -> HashMap<String, f64> {
    HashMap::from([
        ("Not in the past three months".to_string(), 0.0),
        ("Less than monthly".to_string(), 1.0),
        ("Monthly".to_string(), 2.0),
        ("A few times a month".to_string(), 3.0),
        ("Weekly".to_string(), 4.0),
        ("A few times a week".to_string(), 5.0),
        ("Daily or almost daily".to_string(), 6.0),
    ])
}

fn frequency_order() -> Vec<String> {
    vec![
        "Not in the past three months".to_string(),
        "Less than monthly".to_string(),
        "Monthly".to_string(),
        "A few times a month".to_string(),
        "Weekly".to_string(),
        "A few times a week".to_string(),
        "Daily or almost daily".to_string(),
    ]
}

fn hour_band_labels() -> Vec<String> {
    ["0-20", "21-40", "41-80", "81-120", "121-168"]
        .map(String::from)
        .to_vec()
}

fn decade_labels() -> Vec<String> {
    ["60s", "70s", "80s", "90s", "100s", "110s"]
        .map(String::from)
        .to_vec()
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            columns: vec![
                "PARTICIPANT_ID".to_string(),
                AGE.to_string(),
                SCORE.to_string(),
                TIME_ALONE.to_string(),
                FACE_TO_FACE.to_string(),
                PHYSICAL.to_string(),
                MENTAL.to_string(),
                VOLUNTEERED.to_string(),
            ],
            id_column: Some("PARTICIPANT_ID".to_string()),
            age_column: AGE.to_string(),
            score_column: SCORE.to_string(),
            age_range: (65.0, 120.0),
            score_range: (0.0, 6.0),
            missing_sentinel: "9999".to_string(),
            label_maps: HashMap::from([
                (PHYSICAL.to_string(), likert_map()),
                (MENTAL.to_string(), likert_map()),
                (FACE_TO_FACE.to_string(), frequency_map()),
                (VOLUNTEERED.to_string(), frequency_map()),
            ]),
            bins: vec![
                BinSpec {
                    column: TIME_ALONE.to_string(),
                    label_column: format!("{TIME_ALONE}_band"),
                    edges: vec![0.0, 20.0, 40.0, 80.0, 120.0, 168.0],
                    labels: hour_band_labels(),
                },
                BinSpec {
                    column: AGE.to_string(),
                    label_column: format!("{AGE}_decade"),
                    edges: vec![60.0, 70.0, 80.0, 90.0, 100.0, 110.0, 120.0],
                    labels: decade_labels(),
                },
            ],
            correlation_columns: vec![
                SCORE.to_string(),
                PHYSICAL.to_string(),
                MENTAL.to_string(),
            ],
            charts: vec![
                ChartJob {
                    name: "loneliness_by_time_alone".to_string(),
                    kind: ChartKind::Bar,
                    group_column: format!("{TIME_ALONE}_band"),
                    value_column: SCORE.to_string(),
                    order: Some(hour_band_labels()),
                    title: "Loneliness Score vs. Time Spent Alone".to_string(),
                    x_label: "Time Spent Alone (Hours per Week)".to_string(),
                    y_label: "Average Loneliness Score".to_string(),
                    palette: Palette::Blues,
                },
                ChartJob {
                    name: "loneliness_by_face_to_face".to_string(),
                    kind: ChartKind::Bar,
                    group_column: format!("{FACE_TO_FACE}_label"),
                    value_column: SCORE.to_string(),
                    order: Some(frequency_order()),
                    title: "Loneliness Score vs. Face-to-Face Conversations".to_string(),
                    x_label: "Frequency of Face-to-Face Conversations".to_string(),
                    y_label: "Average Loneliness Score".to_string(),
                    palette: Palette::Blues,
                },
                ChartJob {
                    name: "loneliness_by_volunteering".to_string(),
                    kind: ChartKind::Bar,
                    group_column: format!("{VOLUNTEERED}_label"),
                    value_column: SCORE.to_string(),
                    order: Some(frequency_order()),
                    title: "Average Loneliness Score by Volunteering Frequency".to_string(),
                    x_label: "Volunteering Frequency (Last 3 Months)".to_string(),
                    y_label: "Average Loneliness Score".to_string(),
                    palette: Palette::Default,
                },
                ChartJob {
                    name: "loneliness_by_age".to_string(),
                    kind: ChartKind::Line,
                    group_column: format!("{AGE}_decade"),
                    value_column: SCORE.to_string(),
                    order: Some(decade_labels()),
                    title: "Average Loneliness Score by Age Group".to_string(),
                    x_label: "Age Group".to_string(),
                    y_label: "Average Loneliness Score".to_string(),
                    palette: Palette::Default,
                },
                ChartJob {
                    name: "loneliness_distribution".to_string(),
                    kind: ChartKind::Hist,
                    group_column: SCORE.to_string(),
                    value_column: SCORE.to_string(),
                    order: None,
                    title: "Distribution of Loneliness Scores".to_string(),
                    x_label: "Loneliness Score".to_string(),
                    y_label: "Respondents".to_string(),
                    palette: Palette::Warm,
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        AnalysisConfig::default().validate().unwrap();
    }

    #[test]
    fn bin_label_ranges() {
        let bin = BinSpec {
            column: "hours".to_string(),
            label_column: "hours_band".to_string(),
            edges: vec![0.0, 20.0, 40.0],
            labels: vec!["0-20".to_string(), "21-40".to_string()],
        };
        assert_eq!(bin.label_for(0.0), Some("0-20"));
        assert_eq!(bin.label_for(20.0), Some("0-20"));
        assert_eq!(bin.label_for(20.5), Some("21-40"));
        assert_eq!(bin.label_for(40.0), Some("21-40"));
        assert_eq!(bin.label_for(40.1), None);
        assert_eq!(bin.label_for(-1.0), None);
    }

    #[test]
    fn validate_rejects_bad_bins() {
        let mut config = AnalysisConfig::default();
        config.bins[0].labels.pop();
        assert!(matches!(config.validate(), Err(ConfigError::BadBins(_))));
    }

    #[test]
    fn validate_rejects_unknown_chart_column() {
        let mut config = AnalysisConfig::default();
        config.charts[0].group_column = "NOPE".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownChartColumn { .. })
        ));
    }
}
