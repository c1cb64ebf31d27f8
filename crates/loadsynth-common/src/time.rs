//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Shared primitives and utilities for the synthesis runtime."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use chrono::{NaiveDateTime, ParseResult};

/// Wall-clock layout used by scenario files and exported player CSVs.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a naive timestamp, accepting `2024-07-01 00:00:00` and the ISO `T` separator.
pub fn parse_timestamp(raw: &str) -> ParseResult<NaiveDateTime> {
    let trimmed = raw.trim();
    NaiveDateTime::parse_from_str(trimmed, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S"))
}

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_separators() {
        let a = parse_timestamp("2024-07-01 06:30:00").unwrap();
        let b = parse_timestamp("2024-07-01T06:30:00").unwrap();
        assert_eq!(a, b);
        assert_eq!(format_timestamp(&a), "2024-07-01 06:30:00");
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_timestamp("yesterday").is_err());
    }
}
