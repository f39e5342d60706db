use std::io::Write;

use crud_lineage::{
    config::{Config, DIALECT_ENV, MAX_DEPTH_ENV, WORKERS_ENV},
    preprocessor::SqlSource,
    query::SqlDialect
};
use tempfile::NamedTempFile;

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.resolver.dialect, SqlDialect::PostgreSQL);
    assert_eq!(config.resolver.max_depth, 32);
    assert_eq!(config.resolver.source, SqlSource::MyBatis);
    assert!(config.runtime.workers.is_none());
}

#[test]
fn test_full_config_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[resolver]\ndialect = \"mysql\"\nmax_depth = 8\nsource = \"plain\"\n\n[runtime]\nworkers = 4"
    )
    .unwrap();

    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.resolver.dialect, SqlDialect::MySQL);
    assert_eq!(config.resolver.max_depth, 8);
    assert_eq!(config.resolver.source, SqlSource::Plain);
    assert_eq!(config.runtime.workers, Some(4));
    assert_eq!(config.resolver.resolver_config().max_depth, 8);
}

#[test]
fn test_partial_config_keeps_defaults() {
    let config = Config::from_toml("[runtime]\nworkers = 2\n").unwrap();
    assert_eq!(config.resolver.max_depth, 32);
    assert_eq!(config.runtime.workers, Some(2));
}

#[test]
fn test_invalid_config_is_error() {
    assert!(Config::from_toml("[resolver]\nmax_depth = \"deep\"\n").is_err());
    assert!(Config::from_toml("[resolver]\ndialect = \"oracle\"\n").is_err());
    assert!(Config::from_file(std::path::Path::new("/nonexistent/crud-lineage.toml")).is_err());
}

#[test]
fn test_environment_overrides() {
    let mut config = Config::default();
    config
        .apply_env(|name| match name {
            n if n == DIALECT_ENV => Some("Postgres".to_string()),
            n if n == MAX_DEPTH_ENV => Some(" 6 ".to_string()),
            n if n == WORKERS_ENV => Some("0".to_string()),
            _ => None
        })
        .unwrap();
    assert_eq!(config.resolver.dialect, SqlDialect::PostgreSQL);
    assert_eq!(config.resolver.max_depth, 6);
    assert_eq!(config.runtime.workers, None);
}

#[test]
fn test_unknown_dialect_in_environment() {
    let mut config = Config::default();
    let result = config.apply_env(|name| (name == DIALECT_ENV).then(|| "oracle".to_string()));
    assert!(result.is_err());
}
