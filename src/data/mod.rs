//! Data module - CSV loading and cleaning

mod cleaner;
mod loader;

pub use cleaner::{clean, CleanError, CleanReport};
pub use loader::{load_csv, validate_schema, LoadError};
