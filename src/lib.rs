//! Sparkify ETL library - shared modules for the loader binary.

pub mod db;
pub mod error;
pub mod log_data;
pub mod models;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod schema;
pub mod song_data;
pub mod walk;

pub use error::{EtlError, Result};
