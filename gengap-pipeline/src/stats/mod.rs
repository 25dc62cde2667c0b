//! Statistical estimation

pub mod bootstrap;

pub use bootstrap::*;
