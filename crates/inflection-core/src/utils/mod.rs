//! Utility functions for number, date and string formatting.

pub mod format;

// Re-export commonly used functions at module level
pub use format::{format_count, format_optional_count, format_percent, format_timestamp, truncate_string};
