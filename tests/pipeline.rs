//! End-to-end pipeline tests: load -> clean -> aggregate -> report.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use wellbeing_report::charts::{ChartConfig, ChartKind, ChartRenderer, Palette, Rendered};
use wellbeing_report::config::{AnalysisConfig, BinSpec};
use wellbeing_report::data;
use wellbeing_report::report::BenchmarkSet;
use wellbeing_report::stats;

fn write_csv(dir: &Path, content: &str) -> std::path::PathBuf {
    let path = dir.join("input.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

fn decade_config() -> AnalysisConfig {
    AnalysisConfig {
        columns: vec!["age".to_string(), "loneliness".to_string()],
        id_column: None,
        age_column: "age".to_string(),
        score_column: "loneliness".to_string(),
        age_range: (65.0, 120.0),
        score_range: (0.0, 6.0),
        missing_sentinel: "9999".to_string(),
        label_maps: HashMap::new(),
        bins: vec![BinSpec {
            column: "age".to_string(),
            label_column: "age_decade".to_string(),
            edges: vec![60.0, 70.0, 80.0, 90.0],
            labels: vec!["60s".to_string(), "70s".to_string(), "80s".to_string()],
        }],
        correlation_columns: vec![],
        charts: vec![],
    }
}

#[test]
fn age_invariant_and_decade_grouping() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_csv(dir.path(), "age,loneliness\n70,4\n68,2\n150,3\n");

    let df = data::load_csv(&input).unwrap();
    let config = decade_config();
    data::validate_schema(&df, &config.columns).unwrap();

    let (cleaned, report) = data::clean(&df, &config).unwrap();
    assert_eq!(cleaned.height(), 2);
    assert_eq!(report.dropped_age, 1);

    let agg = stats::aggregate(
        &cleaned,
        &stats::GroupSpec {
            group_column: "age_decade".to_string(),
            value_column: "loneliness".to_string(),
            order: None,
        },
    )
    .unwrap();

    assert_eq!(agg.groups.len(), 1);
    let sixties = agg.get("60s").unwrap();
    assert_eq!(sixties.count, 2);
    assert!((sixties.mean - 3.0).abs() < 1e-12);
}

#[test]
fn cleaner_only_removes_rows() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_csv(
        dir.path(),
        "age,loneliness\n70,4\n68,2\n9999,3\n80,abc\n67,5\n",
    );
    let df = data::load_csv(&input).unwrap();
    let (cleaned, report) = data::clean(&df, &decade_config()).unwrap();
    assert!(cleaned.height() <= df.height());
    assert_eq!(report.rows_in, df.height());
    assert_eq!(report.rows_out, cleaned.height());
    assert_eq!(report.rows_out + report.dropped(), report.rows_in);
}

#[test]
fn group_counts_cover_the_cleaned_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_csv(
        dir.path(),
        "age,loneliness\n70,4\n68,2\n75,5\n82,1\n66,0\n71,3\n",
    );
    let df = data::load_csv(&input).unwrap();
    let (cleaned, _) = data::clean(&df, &decade_config()).unwrap();

    let agg = stats::aggregate(
        &cleaned,
        &stats::GroupSpec {
            group_column: "age_decade".to_string(),
            value_column: "loneliness".to_string(),
            order: None,
        },
    )
    .unwrap();
    assert_eq!(agg.total_count(), cleaned.height());
}

#[test]
fn pipeline_is_deterministic_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_csv(
        dir.path(),
        "age,loneliness\n70,4\n68,2\n75,5\n82,1\n66,0\n71,3\n",
    );
    let config = decade_config();
    let spec = stats::GroupSpec {
        group_column: "age_decade".to_string(),
        value_column: "loneliness".to_string(),
        order: None,
    };

    let run = || -> Vec<(String, usize, f64, f64)> {
        let df = data::load_csv(&input).unwrap();
        let (cleaned, _) = data::clean(&df, &config).unwrap();
        stats::aggregate(&cleaned, &spec)
            .unwrap()
            .groups
            .iter()
            .map(|g| (g.key.clone(), g.stats.count, g.stats.mean, g.stats.median))
            .collect()
    };

    assert_eq!(run(), run());
}

#[test]
fn header_only_input_yields_empty_run_without_charts() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_csv(dir.path(), "age,loneliness\n");
    let df = data::load_csv(&input).unwrap();
    let config = decade_config();
    data::validate_schema(&df, &config.columns).unwrap();

    let (cleaned, report) = data::clean(&df, &config).unwrap();
    assert_eq!(cleaned.height(), 0);
    assert_eq!(report.rows_out, 0);

    let agg = stats::aggregate(
        &cleaned,
        &stats::GroupSpec {
            group_column: "age_decade".to_string(),
            value_column: "loneliness".to_string(),
            order: None,
        },
    )
    .unwrap();
    assert!(agg.is_empty());

    let chart_path = dir.path().join("chart.png");
    let cfg = ChartConfig {
        title: "empty".to_string(),
        x_label: String::new(),
        y_label: String::new(),
        palette: Palette::Default,
        width: 400,
        height: 300,
    };
    for kind in [ChartKind::Bar, ChartKind::Line, ChartKind::Hist] {
        let outcome = ChartRenderer::render(&agg, kind, &cfg, &chart_path).unwrap();
        assert_eq!(outcome, Rendered::Skipped);
    }
    assert!(!chart_path.exists());

    let benchmarks = BenchmarkSet::from_frame(&cleaned, &config.benchmark_columns()).unwrap();
    assert!(benchmarks.is_empty());
}

#[test]
fn missing_input_file_fails_before_any_output() {
    let err = data::load_csv(Path::new("/definitely/not/here.csv")).unwrap_err();
    assert!(matches!(err, data::LoadError::FileNotFound(_)));
}

#[test]
fn absent_required_column_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_csv(dir.path(), "age,loneliness\n70,4\n");
    let df = data::load_csv(&input).unwrap();
    let mut config = decade_config();
    config.columns.push("region".to_string());
    let err = data::validate_schema(&df, &config.columns).unwrap_err();
    assert!(matches!(err, data::LoadError::MissingColumn(c) if c == "region"));
}

#[test]
fn benchmarks_round_trip_through_the_report_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_csv(dir.path(), "age,loneliness\n70,4\n68,2\n75,3\n");
    let df = data::load_csv(&input).unwrap();
    let config = decade_config();
    let (cleaned, _) = data::clean(&df, &config).unwrap();

    let benchmarks = BenchmarkSet::from_frame(&cleaned, &config.benchmark_columns()).unwrap();
    let path = dir.path().join("benchmarks.txt");
    benchmarks.write_to(&path).unwrap();

    let parsed = BenchmarkSet::parse_file(&path).unwrap();
    assert_eq!(parsed.entries.len(), benchmarks.entries.len());
    let loneliness = parsed.get("loneliness").unwrap();
    assert!((loneliness.mean - 3.0).abs() < 1e-9);
}

#[test]
fn labelled_survey_answers_flow_through_to_aggregates() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_csv(
        dir.path(),
        "age,loneliness,volunteering\n\
         70,4,Weekly\n\
         68,2,Monthly\n\
         75,6,Weekly\n\
         80,1,9999\n",
    );

    let mut config = decade_config();
    config.columns.push("volunteering".to_string());
    config.label_maps.insert(
        "volunteering".to_string(),
        HashMap::from([
            ("Monthly".to_string(), 2.0),
            ("Weekly".to_string(), 4.0),
        ]),
    );

    let df = data::load_csv(&input).unwrap();
    let (cleaned, report) = data::clean(&df, &config).unwrap();
    assert_eq!(report.dropped_missing, 1);
    assert_eq!(cleaned.height(), 3);

    let agg = stats::aggregate(
        &cleaned,
        &stats::GroupSpec {
            group_column: "volunteering_label".to_string(),
            value_column: "loneliness".to_string(),
            order: Some(vec!["Monthly".to_string(), "Weekly".to_string()]),
        },
    )
    .unwrap();

    let keys: Vec<&str> = agg.groups.iter().map(|g| g.key.as_str()).collect();
    assert_eq!(keys, vec!["Monthly", "Weekly"]);
    let weekly = agg.get("Weekly").unwrap();
    assert_eq!(weekly.count, 2);
    assert!((weekly.mean - 5.0).abs() < 1e-12);
}
