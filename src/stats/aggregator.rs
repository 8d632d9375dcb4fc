//! Aggregator Module
//! Grouped summary statistics and the pairwise correlation matrix, computed
//! from the cleaned frame. Group order is deterministic: the configured
//! category order first, remaining keys sorted.

use crate::stats::calculator::{
    compute_descriptive_stats, correlation_p_value, pearson, GroupStats, SIGNIFICANCE_THRESHOLD,
};
use polars::prelude::*;
use rayon::prelude::*;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AggregateError {
    #[error("polars error: {0}")]
    Polars(#[from] PolarsError),
    #[error("column '{0}' is not numeric")]
    NotNumeric(String),
}

/// Which column to group by and which to summarize.
#[derive(Debug, Clone)]
pub struct GroupSpec {
    pub group_column: String,
    pub value_column: String,
    /// Explicit key order; keys not listed are appended in sorted order.
    pub order: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct GroupSummary {
    pub key: String,
    pub stats: GroupStats,
}

/// Grouped summary statistics for one grouping specification.
///
/// Groups with zero members are omitted, never reported as zero.
#[derive(Debug, Clone)]
pub struct Aggregate {
    pub group_column: String,
    pub value_column: String,
    pub groups: Vec<GroupSummary>,
}

impl Aggregate {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn total_count(&self) -> usize {
        self.groups.iter().map(|g| g.stats.count).sum()
    }

    pub fn get(&self, key: &str) -> Option<&GroupStats> {
        self.groups.iter().find(|g| g.key == key).map(|g| &g.stats)
    }
}

/// Group key as display text: integral floats lose their trailing ".0" so a
/// score of 4.0 groups and labels as "4".
fn format_group_key(value: &AnyValue) -> String {
    let text = value.to_string().trim_matches('"').trim().to_string();
    match text.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 => format!("{}", v as i64),
        _ => text,
    }
}

/// Numeric-aware sort so "10" comes after "2" for numeric group keys.
fn compare_keys(a: &str, b: &str) -> std::cmp::Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal),
        _ => a.cmp(b),
    }
}

fn ordered_keys(by_group: &HashMap<String, Vec<f64>>, order: Option<&[String]>) -> Vec<String> {
    let mut keys: Vec<String> = Vec::with_capacity(by_group.len());
    if let Some(order) = order {
        for key in order {
            if by_group.contains_key(key) {
                keys.push(key.clone());
            }
        }
    }
    let mut rest: Vec<String> = by_group
        .keys()
        .filter(|k| !keys.contains(k))
        .cloned()
        .collect();
    rest.sort_by(|a, b| compare_keys(a, b));
    keys.extend(rest);
    keys
}

/// Compute an Aggregate for one grouping specification.
pub fn aggregate(df: &DataFrame, spec: &GroupSpec) -> Result<Aggregate, AggregateError> {
    let group_col = df.column(&spec.group_column)?;
    let value_col = df.column(&spec.value_column)?;
    let value_f64 = value_col
        .cast(&DataType::Float64)
        .map_err(|_| AggregateError::NotNumeric(spec.value_column.clone()))?;
    let value_ca = value_f64
        .f64()
        .map_err(|_| AggregateError::NotNumeric(spec.value_column.clone()))?;

    let mut by_group: HashMap<String, Vec<f64>> = HashMap::new();
    for i in 0..df.height() {
        if let (Ok(g), Some(v)) = (group_col.get(i), value_ca.get(i)) {
            if !g.is_null() && !v.is_nan() {
                by_group.entry(format_group_key(&g)).or_default().push(v);
            }
        }
    }

    let groups = ordered_keys(&by_group, spec.order.as_deref())
        .into_iter()
        .map(|key| {
            let stats = compute_descriptive_stats(&by_group[&key]);
            GroupSummary { key, stats }
        })
        .collect();

    Ok(Aggregate {
        group_column: spec.group_column.clone(),
        value_column: spec.value_column.clone(),
        groups,
    })
}

/// Compute all Aggregates in parallel, one per specification.
pub fn aggregate_all(df: &DataFrame, specs: &[GroupSpec]) -> Result<Vec<Aggregate>, AggregateError> {
    specs.par_iter().map(|spec| aggregate(df, spec)).collect()
}

/// Pairwise Pearson correlations with two-tailed p-values.
#[derive(Debug, Clone)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub r: Vec<Vec<f64>>,
    pub p: Vec<Vec<f64>>,
    pub sample_size: usize,
}

impl CorrelationMatrix {
    pub fn is_empty(&self) -> bool {
        self.columns.len() < 2 || self.sample_size == 0
    }

    /// Distinct column pairs whose correlation clears the significance
    /// threshold, as (a, b, r, p).
    pub fn significant_pairs(&self) -> Vec<(String, String, f64, f64)> {
        let mut pairs = Vec::new();
        for i in 0..self.columns.len() {
            for j in i + 1..self.columns.len() {
                let p = self.p[i][j];
                if p.is_finite() && p <= SIGNIFICANCE_THRESHOLD {
                    pairs.push((
                        self.columns[i].clone(),
                        self.columns[j].clone(),
                        self.r[i][j],
                        p,
                    ));
                }
            }
        }
        pairs
    }
}

/// Correlate every pair of the given numeric columns.
///
/// Rows where either side of a pair is missing are excluded from that pair
/// only.
pub fn correlation_matrix(
    df: &DataFrame,
    columns: &[String],
) -> Result<CorrelationMatrix, AggregateError> {
    let mut series: Vec<Vec<Option<f64>>> = Vec::with_capacity(columns.len());
    for name in columns {
        let col = df.column(name)?;
        let f64_col = col
            .cast(&DataType::Float64)
            .map_err(|_| AggregateError::NotNumeric(name.clone()))?;
        let ca = f64_col
            .f64()
            .map_err(|_| AggregateError::NotNumeric(name.clone()))?;
        series.push(ca.into_iter().collect());
    }

    let n = columns.len();
    let mut r = vec![vec![f64::NAN; n]; n];
    let mut p = vec![vec![f64::NAN; n]; n];

    for i in 0..n {
        r[i][i] = 1.0;
        p[i][i] = 0.0;
        for j in i + 1..n {
            let mut x = Vec::new();
            let mut y = Vec::new();
            for (a, b) in series[i].iter().zip(series[j].iter()) {
                if let (Some(a), Some(b)) = (a, b) {
                    if !a.is_nan() && !b.is_nan() {
                        x.push(*a);
                        y.push(*b);
                    }
                }
            }
            let coeff = pearson(&x, &y);
            let p_value = correlation_p_value(coeff, x.len());
            r[i][j] = coeff;
            r[j][i] = coeff;
            p[i][j] = p_value;
            p[j][i] = p_value;
        }
    }

    Ok(CorrelationMatrix {
        columns: columns.to_vec(),
        r,
        p,
        sample_size: df.height(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> DataFrame {
        DataFrame::new(vec![
            Column::new(
                "band".into(),
                vec!["60s", "70s", "60s", "70s", "60s"]
                    .into_iter()
                    .map(String::from)
                    .collect::<Vec<_>>(),
            ),
            Column::new("score".into(), vec![4.0, 2.0, 3.0, 5.0, 2.0]),
        ])
        .unwrap()
    }

    fn spec(order: Option<Vec<String>>) -> GroupSpec {
        GroupSpec {
            group_column: "band".to_string(),
            value_column: "score".to_string(),
            order,
        }
    }

    #[test]
    fn counts_cover_every_row() {
        let df = frame();
        let agg = aggregate(&df, &spec(None)).unwrap();
        assert_eq!(agg.total_count(), df.height());
    }

    #[test]
    fn groups_are_sorted_without_explicit_order() {
        let agg = aggregate(&frame(), &spec(None)).unwrap();
        let keys: Vec<&str> = agg.groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["60s", "70s"]);
    }

    #[test]
    fn explicit_order_wins_and_absent_keys_are_omitted() {
        let order = vec!["70s".to_string(), "60s".to_string(), "80s".to_string()];
        let agg = aggregate(&frame(), &spec(Some(order))).unwrap();
        let keys: Vec<&str> = agg.groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["70s", "60s"]);
    }

    #[test]
    fn group_means_are_sum_over_count() {
        let agg = aggregate(&frame(), &spec(None)).unwrap();
        let sixties = agg.get("60s").unwrap();
        assert_eq!(sixties.count, 3);
        assert!((sixties.mean - 3.0).abs() < 1e-12);
    }

    #[test]
    fn numeric_keys_sort_numerically() {
        let df = DataFrame::new(vec![
            Column::new(
                "score".into(),
                vec![10.0, 2.0, 10.0, 4.0],
            ),
            Column::new("value".into(), vec![1.0, 1.0, 1.0, 1.0]),
        ])
        .unwrap();
        let agg = aggregate(
            &df,
            &GroupSpec {
                group_column: "score".to_string(),
                value_column: "value".to_string(),
                order: None,
            },
        )
        .unwrap();
        let keys: Vec<&str> = agg.groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["2", "4", "10"]);
    }

    #[test]
    fn aggregation_is_deterministic() {
        let df = frame();
        let first = aggregate(&df, &spec(None)).unwrap();
        let second = aggregate(&df, &spec(None)).unwrap();
        let keys = |a: &Aggregate| -> Vec<(String, usize, f64)> {
            a.groups
                .iter()
                .map(|g| (g.key.clone(), g.stats.count, g.stats.mean))
                .collect()
        };
        assert_eq!(keys(&first), keys(&second));
    }

    #[test]
    fn empty_frame_yields_empty_aggregate() {
        let df = DataFrame::new(vec![
            Column::new("band".into(), Vec::<String>::new()),
            Column::new("score".into(), Vec::<f64>::new()),
        ])
        .unwrap();
        let agg = aggregate(&df, &spec(None)).unwrap();
        assert!(agg.is_empty());
    }

    #[test]
    fn correlation_matrix_is_symmetric_with_unit_diagonal() {
        let df = DataFrame::new(vec![
            Column::new("a".into(), vec![1.0, 2.0, 3.0, 4.0, 5.0]),
            Column::new("b".into(), vec![2.0, 4.0, 6.0, 8.0, 10.0]),
            Column::new("c".into(), vec![5.0, 3.0, 4.0, 1.0, 2.0]),
        ])
        .unwrap();
        let columns: Vec<String> = ["a", "b", "c"].map(String::from).to_vec();
        let matrix = correlation_matrix(&df, &columns).unwrap();
        assert_eq!(matrix.r[0][0], 1.0);
        assert_eq!(matrix.r[0][1], matrix.r[1][0]);
        assert!((matrix.r[0][1] - 1.0).abs() < 1e-12);
        assert!(!matrix.is_empty());
        assert!(matrix
            .significant_pairs()
            .iter()
            .any(|(a, b, _, _)| a == "a" && b == "b"));
    }
}
