//! Senior Well-Being Analysis Library
//!
//! A batch pipeline over cross-sectional survey data: load a CSV, clean it
//! down to valid respondents, compute grouped summary statistics, and render
//! static charts plus a benchmarks report. Control flow is strictly linear
//! and runs once per invocation.

pub mod charts;
pub mod config;
pub mod data;
pub mod report;
pub mod stats;
