//! Plain-text rendering helpers for command output.

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format an RFC 3339 timestamp or `YYYY-MM-DD` date for display
pub fn format_date(date: &str) -> String {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(date) {
        dt.format("%b %d, %Y").to_string()
    } else if let Ok(day) = chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        day.format("%b %d, %Y").to_string()
    } else {
        date.to_string()
    }
}

/// Two decimal places with thousands separators, e.g. 12,345.60
pub fn format_amount(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((&fixed, "00"));
    let mut grouped = String::new();
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, cents)
}

/// Column widths hold the widest cell; cells wider than this are cut.
const MAX_COLUMN_WIDTH: usize = 40;

/// Render rows under a header line, columns padded to the widest cell
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.chars().count()).min(MAX_COLUMN_WIDTH);
            }
        }
    }

    let render_row = |cells: Vec<String>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", truncate_string(cell, *width), width = *width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![render_row(headers.iter().map(|h| h.to_string()).collect())];
    lines.push(widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("  "));
    for row in rows {
        lines.push(render_row(row.clone()));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("hello world", 8), "hello...");
        assert_eq!(truncate_string("hello", 2), "he");
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("2026-01-26"), "Jan 26, 2026");
        assert_eq!(format_date("2025-07-04T10:00:00+00:00"), "Jul 04, 2025");
        assert_eq!(format_date("soon"), "soon");
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0.0), "0.00");
        assert_eq!(format_amount(999.5), "999.50");
        assert_eq!(format_amount(12345.6), "12,345.60");
        assert_eq!(format_amount(-1234567.891), "-1,234,567.89");
    }

    #[test]
    fn test_render_table_pads_columns() {
        let table = render_table(
            &["ID", "Name"],
            &[
                vec!["1".to_string(), "Engineering".to_string()],
                vec!["22".to_string(), "HR".to_string()],
            ],
        );
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "ID  Name");
        assert_eq!(lines[1], "--  -----------");
        assert_eq!(lines[2], "1   Engineering");
        assert_eq!(lines[3], "22  HR");
    }
}
