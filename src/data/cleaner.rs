//! Data Cleaner Module
//! Filters the loaded frame down to rows valid for analysis: survey labels
//! are mapped to numeric codes, the missing-value sentinel and malformed
//! cells become nulls, and any row with a missing critical field is dropped.
//! No imputation; the input frame is never mutated.

use crate::config::AnalysisConfig;
use polars::prelude::*;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CleanError {
    #[error("polars error: {0}")]
    Polars(#[from] PolarsError),
    #[error("column '{0}' is not configured for analysis")]
    NotConfigured(String),
}

/// Row counts from one cleaning pass, by drop reason.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub rows_in: usize,
    pub rows_out: usize,
    /// Missing, malformed, sentinel-coded or unmappable critical cell.
    pub dropped_missing: usize,
    /// Age outside the configured window.
    pub dropped_age: usize,
    /// Score outside the configured scale bounds.
    pub dropped_score: usize,
    /// Value outside the domain of a configured bin.
    pub dropped_unbinned: usize,
}

impl CleanReport {
    pub fn dropped(&self) -> usize {
        self.dropped_missing + self.dropped_age + self.dropped_score + self.dropped_unbinned
    }
}

/// One critical column parsed to numeric codes, with the canonical survey
/// label retained for label-mapped columns.
struct ParsedColumn {
    values: Vec<Option<f64>>,
    labels: Option<Vec<Option<String>>>,
}

/// Cell as trimmed text, `None` when null.
fn cell_text(col: &Column, i: usize) -> Option<String> {
    match col.get(i) {
        Ok(v) if !v.is_null() => Some(v.to_string().trim_matches('"').trim().to_string()),
        _ => None,
    }
}

/// Numeric value (and canonical label, for mapped columns) of one cell.
fn parse_cell(
    text: &str,
    map: Option<&HashMap<String, f64>>,
    sentinel: &str,
    sentinel_value: Option<f64>,
) -> Option<(f64, Option<String>)> {
    if text == sentinel {
        return None;
    }
    match map {
        Some(map) => {
            if let Some(&code) = map.get(text) {
                return Some((code, Some(text.to_string())));
            }
            // Tolerate already-coded cells by mapping the code back to its
            // label; anything outside the codebook counts as missing.
            let code: f64 = text.parse().ok()?;
            if sentinel_value == Some(code) {
                return None;
            }
            map.iter()
                .find(|(_, &c)| c == code)
                .map(|(label, _)| (code, Some(label.clone())))
        }
        None => {
            let value: f64 = text.parse().ok().filter(|v: &f64| v.is_finite())?;
            if sentinel_value == Some(value) {
                return None;
            }
            Some((value, None))
        }
    }
}

fn parse_column(
    col: &Column,
    map: Option<&HashMap<String, f64>>,
    sentinel: &str,
) -> ParsedColumn {
    let sentinel_value: Option<f64> = sentinel.parse().ok();
    let height = col.len();

    let mut values = Vec::with_capacity(height);
    let mut labels = map.map(|_| Vec::with_capacity(height));

    for i in 0..height {
        let parsed = cell_text(col, i)
            .and_then(|text| parse_cell(&text, map, sentinel, sentinel_value));
        match parsed {
            Some((value, label)) => {
                values.push(Some(value));
                if let Some(labels) = labels.as_mut() {
                    labels.push(label);
                }
            }
            None => {
                values.push(None);
                if let Some(labels) = labels.as_mut() {
                    labels.push(None);
                }
            }
        }
    }

    ParsedColumn { values, labels }
}

/// Produce a new, smaller frame containing only valid rows, plus the drop
/// counts. The output carries every configured column as `f64`, a
/// `<column>_label` companion for each label-mapped column, and one label
/// column per bin spec.
pub fn clean(df: &DataFrame, config: &AnalysisConfig) -> Result<(DataFrame, CleanReport), CleanError> {
    let rows_in = df.height();
    let critical = config.critical_columns();

    let mut parsed: Vec<(String, ParsedColumn)> = Vec::with_capacity(critical.len());
    for name in &critical {
        let col = df.column(name)?;
        parsed.push((
            name.clone(),
            parse_column(col, config.label_maps.get(name), &config.missing_sentinel),
        ));
    }
    let index: HashMap<&str, usize> = parsed
        .iter()
        .enumerate()
        .map(|(i, (name, _))| (name.as_str(), i))
        .collect();

    let ids: Option<Vec<Option<String>>> = match &config.id_column {
        Some(name) => {
            let col = df.column(name)?;
            Some((0..rows_in).map(|i| cell_text(col, i)).collect())
        }
        None => None,
    };

    let age_idx = *index
        .get(config.age_column.as_str())
        .ok_or_else(|| CleanError::NotConfigured(config.age_column.clone()))?;
    let score_idx = *index
        .get(config.score_column.as_str())
        .ok_or_else(|| CleanError::NotConfigured(config.score_column.clone()))?;
    for bin in &config.bins {
        if !index.contains_key(bin.column.as_str()) {
            return Err(CleanError::NotConfigured(bin.column.clone()));
        }
    }

    let mut report = CleanReport {
        rows_in,
        ..CleanReport::default()
    };
    let mut keep: Vec<usize> = Vec::new();

    'rows: for i in 0..rows_in {
        let id_missing = ids.as_ref().is_some_and(|ids| ids[i].is_none());
        if id_missing || parsed.iter().any(|(_, pc)| pc.values[i].is_none()) {
            report.dropped_missing += 1;
            continue;
        }

        let age = parsed[age_idx].1.values[i].unwrap_or(f64::NAN);
        if age < config.age_range.0 || age > config.age_range.1 {
            report.dropped_age += 1;
            continue;
        }

        let score = parsed[score_idx].1.values[i].unwrap_or(f64::NAN);
        if score < config.score_range.0 || score > config.score_range.1 {
            report.dropped_score += 1;
            continue;
        }

        for bin in &config.bins {
            let value = parsed[index[bin.column.as_str()]].1.values[i].unwrap_or(f64::NAN);
            if bin.label_for(value).is_none() {
                report.dropped_unbinned += 1;
                continue 'rows;
            }
        }

        keep.push(i);
    }
    report.rows_out = keep.len();

    let mut columns: Vec<Column> = Vec::new();
    for name in &config.columns {
        if Some(name) == config.id_column.as_ref() {
            let ids = ids.as_ref().map(Vec::as_slice).unwrap_or_default();
            let kept: Vec<String> = keep
                .iter()
                .map(|&i| ids[i].clone().unwrap_or_default())
                .collect();
            columns.push(Column::new(name.as_str().into(), kept));
            continue;
        }
        let pc = &parsed[index[name.as_str()]].1;
        let kept: Vec<f64> = keep
            .iter()
            .map(|&i| pc.values[i].unwrap_or(f64::NAN))
            .collect();
        columns.push(Column::new(name.as_str().into(), kept));

        if let Some(labels) = &pc.labels {
            let kept: Vec<String> = keep
                .iter()
                .map(|&i| labels[i].clone().unwrap_or_default())
                .collect();
            columns.push(Column::new(format!("{name}_label").as_str().into(), kept));
        }
    }
    for bin in &config.bins {
        let pc = &parsed[index[bin.column.as_str()]].1;
        let kept: Vec<String> = keep
            .iter()
            .map(|&i| {
                let value = pc.values[i].unwrap_or(f64::NAN);
                bin.label_for(value).unwrap_or_default().to_string()
            })
            .collect();
        columns.push(Column::new(bin.label_column.as_str().into(), kept));
    }

    let cleaned = DataFrame::new(columns)?;
    Ok((cleaned, report))
}
