//! Charts module - static chart rendering

mod renderer;

pub use renderer::{ChartConfig, ChartKind, ChartRenderer, Palette, RenderError, Rendered};
