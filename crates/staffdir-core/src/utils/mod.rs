//! Utility functions for display formatting.

pub mod format;

pub use format::{format_optional, format_phone, format_salary, truncate_string};
