//! Data models for the DB Sandbox MCP Server.
//!
//! This module re-exports all model types used throughout the application.

pub mod catalog;
pub mod query;

// Re-export commonly used types
pub use catalog::{ColumnDescriptor, TableRef};
pub use query::QueryOutcome;
