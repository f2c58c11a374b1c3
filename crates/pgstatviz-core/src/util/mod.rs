//! Utility modules for pgstatviz.

mod time_parser;

pub use time_parser::{TimeParseError, parse_date_range, parse_time, parse_time_at};

/// Replaces path separators so a hostname can be part of a file name.
pub fn file_safe(name: &str) -> String {
    name.replace('/', "-")
}
