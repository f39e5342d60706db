// SPDX-FileCopyrightText: 2025 RAprogramm
// SPDX-License-Identifier: MIT

use crud_lineage::error::{
    config_error, file_read_error, malformed_input_error, schema_parse_error, statement_parse_error
};

#[test]
fn test_file_read_error() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let error = file_read_error("/path/to/mapper.json", io_error);
    let _msg = error.to_string();
}

#[test]
fn test_malformed_input_error() {
    let error = malformed_input_error("dao.yaml", "expected a sequence");
    let _msg = error.to_string();
}

#[test]
fn test_schema_parse_error_with_position() {
    let error = schema_parse_error("Expected ), found: EOF at Line: 5, Column 10");
    let _msg = error.to_string();
}

#[test]
fn test_statement_parse_error() {
    let error = statement_parse_error("Unexpected token");
    let _msg = error.to_string();
}

#[test]
fn test_statement_parse_error_with_position() {
    let error = statement_parse_error("Expected: end of statement, found: x at Line: 3, Column: 25");
    let _msg = error.to_string();
}

#[test]
fn test_config_error() {
    let error = config_error("Unknown SQL dialect 'oracle'");
    let _msg = error.to_string();
}
