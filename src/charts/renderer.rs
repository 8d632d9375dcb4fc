//! Static Chart Renderer
//! Renders Aggregates to PNG files with plotters: bar charts with standard
//! deviation whiskers, line charts, count histograms and the correlation
//! heatmap. An empty Aggregate is skipped with a warning, never an error.

use crate::stats::{Aggregate, CorrelationMatrix};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("failed to prepare chart output: {0}")]
    Io(#[from] std::io::Error),
    #[error("chart drawing failed: {0}")]
    Draw(String),
}

fn draw_err<E: std::fmt::Display>(e: E) -> RenderError {
    RenderError::Draw(e.to_string())
}

/// Supported chart shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    /// Group means with standard deviation whiskers.
    Bar,
    /// Group means connected across the category order.
    Line,
    /// Respondent counts per group.
    Hist,
}

/// Named color schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Palette {
    #[default]
    Default,
    Blues,
    Warm,
}

const DEFAULT_PALETTE: [RGBColor; 10] = [
    RGBColor(52, 152, 219),  // Blue
    RGBColor(231, 76, 60),   // Red
    RGBColor(46, 204, 113),  // Green
    RGBColor(155, 89, 182),  // Purple
    RGBColor(243, 156, 18),  // Orange
    RGBColor(26, 188, 156),  // Teal
    RGBColor(233, 30, 99),   // Pink
    RGBColor(0, 188, 212),   // Cyan
    RGBColor(121, 85, 72),   // Brown
    RGBColor(96, 125, 139),  // Blue Grey
];

const BLUES_PALETTE: [RGBColor; 5] = [
    RGBColor(198, 219, 239),
    RGBColor(158, 202, 225),
    RGBColor(107, 174, 214),
    RGBColor(49, 130, 189),
    RGBColor(8, 81, 156),
];

const WARM_PALETTE: [RGBColor; 5] = [
    RGBColor(254, 217, 118),
    RGBColor(254, 178, 76),
    RGBColor(253, 141, 60),
    RGBColor(240, 59, 32),
    RGBColor(189, 0, 38),
];

impl Palette {
    /// Color for the group at `index`.
    pub fn color(&self, index: usize) -> RGBColor {
        match self {
            Palette::Default => DEFAULT_PALETTE[index % DEFAULT_PALETTE.len()],
            Palette::Blues => BLUES_PALETTE[index % BLUES_PALETTE.len()],
            Palette::Warm => WARM_PALETTE[index % WARM_PALETTE.len()],
        }
    }

    /// Single accent color for line series.
    pub fn accent(&self) -> RGBColor {
        match self {
            Palette::Default => DEFAULT_PALETTE[0],
            Palette::Blues => BLUES_PALETTE[3],
            Palette::Warm => WARM_PALETTE[3],
        }
    }
}

/// Rendering configuration for one chart.
#[derive(Debug, Clone)]
pub struct ChartConfig {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub palette: Palette,
    pub width: u32,
    pub height: u32,
}

/// Outcome of a render call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    Written(PathBuf),
    /// Nothing to draw; the run continues.
    Skipped,
}

/// Label text for a segmented category axis.
fn segment_label(labels: &[String], v: &SegmentValue<usize>) -> String {
    let i = match v {
        SegmentValue::Exact(i) | SegmentValue::CenterOf(i) => *i,
        SegmentValue::Last => return String::new(),
    };
    labels.get(i).cloned().unwrap_or_default()
}

/// Renders static chart images from Aggregates.
pub struct ChartRenderer;

impl ChartRenderer {
    /// Render one Aggregate as the requested chart kind.
    pub fn render(
        agg: &Aggregate,
        kind: ChartKind,
        cfg: &ChartConfig,
        path: &Path,
    ) -> Result<Rendered, RenderError> {
        if agg.is_empty() {
            warn!(
                "skipping chart '{}': no data for '{}' grouped by '{}'",
                cfg.title, agg.value_column, agg.group_column
            );
            return Ok(Rendered::Skipped);
        }
        match kind {
            ChartKind::Bar => Self::render_bar(agg, cfg, path),
            ChartKind::Line => Self::render_line(agg, cfg, path),
            ChartKind::Hist => Self::render_hist(agg, cfg, path),
        }
    }

    fn render_bar(agg: &Aggregate, cfg: &ChartConfig, path: &Path) -> Result<Rendered, RenderError> {
        let labels: Vec<String> = agg.groups.iter().map(|g| g.key.clone()).collect();
        let means: Vec<f64> = agg.groups.iter().map(|g| g.stats.mean).collect();
        let stds: Vec<f64> = agg.groups.iter().map(|g| g.stats.std).collect();
        let n = labels.len();

        let top = means
            .iter()
            .zip(&stds)
            .map(|(m, s)| m + if s.is_finite() { *s } else { 0.0 })
            .fold(0.0_f64, f64::max);
        let y_max = (top * 1.15).max(1.0);

        let rotate = labels.iter().any(|l| l.chars().count() > 8);
        let root = BitMapBackend::new(path, (cfg.width, cfg.height)).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(cfg.title.as_str(), ("sans-serif", 26))
            .margin(16)
            .x_label_area_size(if rotate { 170 } else { 45 })
            .y_label_area_size(60)
            .build_cartesian_2d((0..n).into_segmented(), 0.0..y_max)
            .map_err(draw_err)?;

        let label_font = ("sans-serif", 13).into_font();
        let x_label_style = if rotate {
            label_font.clone().transform(FontTransform::Rotate90)
        } else {
            label_font.clone()
        };
        let label_fmt = |v: &SegmentValue<usize>| segment_label(&labels, v);

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_desc(cfg.x_label.as_str())
            .y_desc(cfg.y_label.as_str())
            .x_labels(n)
            .x_label_formatter(&label_fmt)
            .x_label_style(x_label_style)
            .label_style(label_font)
            .draw()
            .map_err(draw_err)?;

        chart
            .draw_series(means.iter().enumerate().map(|(i, &mean)| {
                let mut bar = Rectangle::new(
                    [
                        (SegmentValue::Exact(i), 0.0),
                        (SegmentValue::Exact(i + 1), mean),
                    ],
                    cfg.palette.color(i).mix(0.85).filled(),
                );
                bar.set_margin(0, 0, 8, 8);
                bar
            }))
            .map_err(draw_err)?;

        // Standard deviation whiskers, clamped to the axis floor
        chart
            .draw_series(
                means
                    .iter()
                    .zip(&stds)
                    .enumerate()
                    .filter(|(_, (_, s))| s.is_finite() && **s > 0.0)
                    .map(|(i, (&mean, &std))| {
                        ErrorBar::new_vertical(
                            SegmentValue::CenterOf(i),
                            (mean - std).max(0.0),
                            mean,
                            mean + std,
                            BLACK.filled(),
                            6,
                        )
                    }),
            )
            .map_err(draw_err)?;

        root.present().map_err(draw_err)?;
        Ok(Rendered::Written(path.to_path_buf()))
    }

    fn render_hist(agg: &Aggregate, cfg: &ChartConfig, path: &Path) -> Result<Rendered, RenderError> {
        let labels: Vec<String> = agg.groups.iter().map(|g| g.key.clone()).collect();
        let counts: Vec<f64> = agg.groups.iter().map(|g| g.stats.count as f64).collect();
        let n = labels.len();
        let y_max = (counts.iter().fold(0.0_f64, |a, &b| a.max(b)) * 1.15).max(1.0);

        let rotate = labels.iter().any(|l| l.chars().count() > 8);
        let root = BitMapBackend::new(path, (cfg.width, cfg.height)).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(cfg.title.as_str(), ("sans-serif", 26))
            .margin(16)
            .x_label_area_size(if rotate { 170 } else { 45 })
            .y_label_area_size(60)
            .build_cartesian_2d((0..n).into_segmented(), 0.0..y_max)
            .map_err(draw_err)?;

        let label_font = ("sans-serif", 13).into_font();
        let x_label_style = if rotate {
            label_font.clone().transform(FontTransform::Rotate90)
        } else {
            label_font.clone()
        };
        let label_fmt = |v: &SegmentValue<usize>| segment_label(&labels, v);

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_desc(cfg.x_label.as_str())
            .y_desc(cfg.y_label.as_str())
            .x_labels(n)
            .x_label_formatter(&label_fmt)
            .x_label_style(x_label_style)
            .label_style(label_font)
            .draw()
            .map_err(draw_err)?;

        chart
            .draw_series(counts.iter().enumerate().map(|(i, &count)| {
                let mut bar = Rectangle::new(
                    [
                        (SegmentValue::Exact(i), 0.0),
                        (SegmentValue::Exact(i + 1), count),
                    ],
                    cfg.palette.color(i).mix(0.85).filled(),
                );
                bar.set_margin(0, 0, 8, 8);
                bar
            }))
            .map_err(draw_err)?;

        root.present().map_err(draw_err)?;
        Ok(Rendered::Written(path.to_path_buf()))
    }

    fn render_line(agg: &Aggregate, cfg: &ChartConfig, path: &Path) -> Result<Rendered, RenderError> {
        let labels: Vec<String> = agg.groups.iter().map(|g| g.key.clone()).collect();
        let means: Vec<f64> = agg.groups.iter().map(|g| g.stats.mean).collect();
        let n = labels.len();

        let lo = means.iter().fold(f64::INFINITY, |a, &b| a.min(b));
        let hi = means.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
        let pad = ((hi - lo) * 0.15).max(0.5);

        let rotate = labels.iter().any(|l| l.chars().count() > 8);
        let root = BitMapBackend::new(path, (cfg.width, cfg.height)).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(cfg.title.as_str(), ("sans-serif", 26))
            .margin(16)
            .x_label_area_size(if rotate { 170 } else { 45 })
            .y_label_area_size(60)
            .build_cartesian_2d((0..n).into_segmented(), (lo - pad)..(hi + pad))
            .map_err(draw_err)?;

        let label_font = ("sans-serif", 13).into_font();
        let x_label_style = if rotate {
            label_font.clone().transform(FontTransform::Rotate90)
        } else {
            label_font.clone()
        };
        let label_fmt = |v: &SegmentValue<usize>| segment_label(&labels, v);

        chart
            .configure_mesh()
            .x_desc(cfg.x_label.as_str())
            .y_desc(cfg.y_label.as_str())
            .x_labels(n)
            .x_label_formatter(&label_fmt)
            .x_label_style(x_label_style)
            .label_style(label_font)
            .draw()
            .map_err(draw_err)?;

        let color = cfg.palette.accent();
        chart
            .draw_series(LineSeries::new(
                means
                    .iter()
                    .enumerate()
                    .map(|(i, &mean)| (SegmentValue::CenterOf(i), mean)),
                color.stroke_width(2),
            ))
            .map_err(draw_err)?;

        chart
            .draw_series(
                means.iter().enumerate().map(|(i, &mean)| {
                    Circle::new((SegmentValue::CenterOf(i), mean), 4, color.filled())
                }),
            )
            .map_err(draw_err)?;

        root.present().map_err(draw_err)?;
        Ok(Rendered::Written(path.to_path_buf()))
    }

    /// Render the correlation matrix as an annotated heatmap.
    pub fn render_heatmap(
        matrix: &CorrelationMatrix,
        cfg: &ChartConfig,
        path: &Path,
    ) -> Result<Rendered, RenderError> {
        if matrix.is_empty() {
            warn!("skipping chart '{}': correlation matrix is empty", cfg.title);
            return Ok(Rendered::Skipped);
        }

        let n = matrix.columns.len();
        let labels: Vec<String> = matrix
            .columns
            .iter()
            .map(|c| Self::shorten(c, 30))
            .collect();

        let root = BitMapBackend::new(path, (cfg.width, cfg.height)).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(cfg.title.as_str(), ("sans-serif", 26))
            .margin(16)
            .x_label_area_size(220)
            .y_label_area_size(230)
            .build_cartesian_2d((0..n).into_segmented(), (0..n).into_segmented())
            .map_err(draw_err)?;

        let label_fmt = |v: &SegmentValue<usize>| segment_label(&labels, v);

        chart
            .configure_mesh()
            .disable_mesh()
            .x_labels(n)
            .y_labels(n)
            .x_label_formatter(&label_fmt)
            .y_label_formatter(&label_fmt)
            .x_label_style(
                ("sans-serif", 13)
                    .into_font()
                    .transform(FontTransform::Rotate90),
            )
            .label_style(("sans-serif", 13))
            .draw()
            .map_err(draw_err)?;

        let mut cells = Vec::with_capacity(n * n);
        let mut annotations = Vec::with_capacity(n * n);
        let text_style = TextStyle::from(("sans-serif", 15).into_font())
            .pos(Pos::new(HPos::Center, VPos::Center));
        for i in 0..n {
            for j in 0..n {
                let r = matrix.r[i][j];
                cells.push(Rectangle::new(
                    [
                        (SegmentValue::Exact(i), SegmentValue::Exact(j)),
                        (SegmentValue::Exact(i + 1), SegmentValue::Exact(j + 1)),
                    ],
                    Self::diverging_color(r).filled(),
                ));
                let text = if r.is_nan() {
                    "-".to_string()
                } else {
                    format!("{r:.2}")
                };
                annotations.push(Text::new(
                    text,
                    (SegmentValue::CenterOf(i), SegmentValue::CenterOf(j)),
                    text_style.clone(),
                ));
            }
        }
        chart.draw_series(cells).map_err(draw_err)?;
        chart.draw_series(annotations).map_err(draw_err)?;

        root.present().map_err(draw_err)?;
        Ok(Rendered::Written(path.to_path_buf()))
    }

    /// Blend white toward red for positive r, toward blue for negative.
    fn diverging_color(r: f64) -> RGBColor {
        if r.is_nan() {
            return RGBColor(235, 235, 235);
        }
        let t = r.clamp(-1.0, 1.0);
        let (base, w) = if t >= 0.0 {
            (RGBColor(214, 39, 40), t)
        } else {
            (RGBColor(31, 119, 180), -t)
        };
        let lerp = |to: u8| (255.0 + (to as f64 - 255.0) * w) as u8;
        RGBColor(lerp(base.0), lerp(base.1), lerp(base.2))
    }

    fn shorten(name: &str, max: usize) -> String {
        let count = name.chars().count();
        if count <= max {
            return name.to_string();
        }
        let tail: String = name.chars().skip(count - (max - 2)).collect();
        format!("..{tail}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::Aggregate;

    fn empty_aggregate() -> Aggregate {
        Aggregate {
            group_column: "band".to_string(),
            value_column: "score".to_string(),
            groups: Vec::new(),
        }
    }

    fn cfg() -> ChartConfig {
        ChartConfig {
            title: "t".to_string(),
            x_label: String::new(),
            y_label: String::new(),
            palette: Palette::Default,
            width: 400,
            height: 300,
        }
    }

    #[test]
    fn empty_aggregate_is_skipped_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.png");
        for kind in [ChartKind::Bar, ChartKind::Line, ChartKind::Hist] {
            let outcome = ChartRenderer::render(&empty_aggregate(), kind, &cfg(), &path).unwrap();
            assert_eq!(outcome, Rendered::Skipped);
        }
        assert!(!path.exists());
    }

    #[test]
    fn empty_matrix_is_skipped() {
        let matrix = CorrelationMatrix {
            columns: vec!["a".to_string()],
            r: vec![vec![1.0]],
            p: vec![vec![0.0]],
            sample_size: 0,
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("heatmap.png");
        let outcome = ChartRenderer::render_heatmap(&matrix, &cfg(), &path).unwrap();
        assert_eq!(outcome, Rendered::Skipped);
        assert!(!path.exists());
    }

    #[test]
    fn diverging_color_endpoints() {
        assert_eq!(ChartRenderer::diverging_color(0.0), RGBColor(255, 255, 255));
        assert_eq!(ChartRenderer::diverging_color(1.0), RGBColor(214, 39, 40));
        assert_eq!(ChartRenderer::diverging_color(-1.0), RGBColor(31, 119, 180));
    }

    #[test]
    fn palettes_cycle() {
        assert_eq!(Palette::Default.color(0), Palette::Default.color(10));
        assert_eq!(Palette::Blues.color(1), Palette::Blues.color(6));
    }

    #[test]
    fn long_names_are_shortened_from_the_front() {
        let name = "LONELY_dejong_emotional_social_loneliness_scale_TOTAL";
        let short = ChartRenderer::shorten(name, 30);
        assert_eq!(short.chars().count(), 30);
        assert!(short.starts_with(".."));
        assert!(short.ends_with("TOTAL"));
    }
}
