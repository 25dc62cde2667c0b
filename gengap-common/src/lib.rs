//! Shared library for the gengap pipeline
//!
//! Provides the common error type, configuration loading, and the
//! SQLite storage layer (schema, models, initialization) used by the
//! pipeline crate.

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
