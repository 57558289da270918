//! Utility functions for sensor display formatting.

pub mod format;

pub use format::{humanize_status, round_to};
