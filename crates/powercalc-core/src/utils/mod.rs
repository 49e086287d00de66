//! Utility functions for numeric text parsing and display formatting.

pub mod format;

// Re-export commonly used functions at module level
pub use format::{age_display, format_fixed, parse_number, truncate_string};
