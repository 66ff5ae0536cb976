//! Shared helper functions for CLI commands

use tabled::{builder::Builder, settings::Style};

use crate::cli::OutputFormat;

/// Truncate a string to `max_chars` characters, adding "..." if truncated
///
/// Counts characters rather than bytes so Japanese text is never cut inside
/// a code point.
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Parse a size such as `20M`, `512K`, `1G` or a plain byte count
///
/// Suffixes are binary (K = 1024).
pub fn parse_size(s: &str) -> Result<usize, String> {
    let s = s.trim();
    let upper = s.to_ascii_uppercase();
    let trimmed = upper.trim_end_matches("IB").trim_end_matches('B');
    let (digits, multiplier) = match trimmed.chars().last() {
        Some('K') => (&trimmed[..trimmed.len() - 1], 1024),
        Some('M') => (&trimmed[..trimmed.len() - 1], 1024 * 1024),
        Some('G') => (&trimmed[..trimmed.len() - 1], 1024 * 1024 * 1024),
        _ => (trimmed, 1),
    };
    let value: usize = digits
        .trim()
        .parse()
        .map_err(|_| format!("invalid size '{}': expected a number with optional K, M or G suffix", s))?;
    value
        .checked_mul(multiplier)
        .ok_or_else(|| format!("size '{}' is too large", s))
}

/// Human-readable byte count
pub fn format_bytes(bytes: usize) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// Render rows as a markdown table, TSV, or a JSON array of objects
///
/// JSON object keys are the headers in snake_case.
pub fn render_rows(format: OutputFormat, headers: &[&str], rows: &[Vec<String>]) -> String {
    match format {
        OutputFormat::Table => {
            let mut builder = Builder::default();
            builder.push_record(headers.iter().copied());
            for row in rows {
                builder.push_record(row.iter().map(String::as_str));
            }
            builder.build().with(Style::markdown()).to_string()
        }
        OutputFormat::Tsv => rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|field| field.replace(['\t', '\n'], " "))
                    .collect::<Vec<_>>()
                    .join("\t")
            })
            .collect::<Vec<_>>()
            .join("\n"),
        OutputFormat::Json => {
            let keys: Vec<String> = headers
                .iter()
                .map(|h| h.to_lowercase().replace(' ', "_"))
                .collect();
            let items: Vec<serde_json::Value> = rows
                .iter()
                .map(|row| {
                    let object: serde_json::Map<String, serde_json::Value> = keys
                        .iter()
                        .cloned()
                        .zip(row.iter().map(|v| serde_json::Value::String(v.clone())))
                        .collect();
                    serde_json::Value::Object(object)
                })
                .collect();
            serde_json::to_string_pretty(&items).unwrap_or_else(|_| "[]".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("short", 10), "short");
        assert_eq!(truncate_str("this is a long string", 10), "this is...");
        assert_eq!(truncate_str("純米大吟醸原酒", 5), "純米...");
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("1024"), Ok(1024));
        assert_eq!(parse_size("20M"), Ok(20 * 1024 * 1024));
        assert_eq!(parse_size("512k"), Ok(512 * 1024));
        assert_eq!(parse_size("1GiB"), Ok(1024 * 1024 * 1024));
        assert_eq!(parse_size("10MB"), Ok(10 * 1024 * 1024));
        assert!(parse_size("lots").is_err());
        assert!(parse_size("").is_err());
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KiB");
        assert_eq!(format_bytes(20 * 1024 * 1024), "20.0 MiB");
    }

    #[test]
    fn test_render_tsv_and_json() {
        let rows = vec![vec!["a".to_string(), "x\ty".to_string()]];
        assert_eq!(render_rows(OutputFormat::Tsv, &["Code", "Option Value"], &rows), "a\tx y");

        let json = render_rows(OutputFormat::Json, &["Code", "Option Value"], &rows);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["option_value"], "x\ty");
    }

    #[test]
    fn test_render_table() {
        let rows = vec![vec!["a".to_string(), "b".to_string()]];
        let table = render_rows(OutputFormat::Table, &["Code", "Handle"], &rows);
        assert!(table.contains("| Code | Handle |"));
        assert!(table.contains("| a    | b      |"));
    }
}
