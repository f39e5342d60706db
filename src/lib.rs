//! # CRUD Lineage Library
//!
//! Static CRUD lineage for layered applications.
//!
//! - [`query`] - SQL parsing into a closed statement tree
//! - [`catalog`] - Table and column catalog from DDL or JSON
//! - [`resolve`] - Alias resolution, column attribution and scope flattening
//! - [`lineage`] - Logic → DAO → SQL joining
//! - [`diagnostics`] - Ambiguity and input diagnostics
//! - [`preprocessor`] - Mapper template preprocessing
//! - [`usage`] - Table and column usage counts

pub mod app;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod lineage;
pub mod output;
pub mod preprocessor;
pub mod query;
pub mod resolve;
pub mod usage;
