pub use masterror::{AppError, AppResult};

/// Create file read error
pub fn file_read_error(path: &str, source: std::io::Error) -> AppError {
    AppError::internal(format!("Failed to read file '{}': {}", path, source))
}

/// Create error for an input document that could not be decoded
pub fn malformed_input_error(path: &str, message: impl Into<String>) -> AppError {
    AppError::bad_request(format!("Malformed input '{}': {}", path, message.into()))
}

/// Create schema parse error with optional position info
pub fn schema_parse_error(message: impl Into<String>) -> AppError {
    let msg = message.into();
    AppError::bad_request(format_sql_error("Schema parse error", &msg))
}

/// Create statement parse error with optional position info
pub fn statement_parse_error(message: impl Into<String>) -> AppError {
    let msg = message.into();
    AppError::bad_request(format_sql_error("Statement parse error", &msg))
}

/// Create config error
pub fn config_error(message: impl Into<String>) -> AppError {
    AppError::bad_request(message.into())
}

/// Format SQL error with position highlighting
fn format_sql_error(prefix: &str, message: &str) -> String {
    // sqlparser format: "... at Line: X, Column: Y"
    if let Some(pos) = extract_position(message) {
        format!(
            "{} at line {}, column {}:\n  {}",
            prefix, pos.line, pos.column, message
        )
    } else {
        format!("{}:\n  {}", prefix, message)
    }
}

struct SqlPosition {
    line:   usize,
    column: usize
}

fn extract_position(message: &str) -> Option<SqlPosition> {
    let line_marker = "Line: ";
    let line_start = message.find(line_marker)? + line_marker.len();
    let rest = &message[line_start..];
    let line_end = rest.find(|c: char| !c.is_ascii_digit())?;
    let line = rest[..line_end].parse().ok()?;

    // Both ", Column: 7" and ", Column 7" appear across sqlparser versions
    let after_line = rest[line_end..].strip_prefix(", Column")?;
    let after_line = after_line.trim_start_matches(':').trim_start();
    let col_end = after_line
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(after_line.len());
    let column = after_line[..col_end].parse().ok()?;

    Some(SqlPosition {
        line,
        column
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_position_with_colon() {
        let pos = extract_position("Expected: end of statement, found: x at Line: 3, Column: 25")
            .unwrap();
        assert_eq!(pos.line, 3);
        assert_eq!(pos.column, 25);
    }

    #[test]
    fn test_extract_position_without_colon() {
        let pos = extract_position("Missing semicolon at Line: 5, Column 10").unwrap();
        assert_eq!(pos.line, 5);
        assert_eq!(pos.column, 10);
    }

    #[test]
    fn test_extract_position_absent() {
        assert!(extract_position("Unexpected token").is_none());
    }
}
