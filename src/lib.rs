//! DB Sandbox MCP Server Library
//!
//! This library exposes a SQL database (SQLite, PostgreSQL, MySQL) over the
//! Model Context Protocol: catalog tables as resources plus an `executeQuery`
//! tool whose statements run inside always-rolled-back transactions.

pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod models;
pub mod transport;

pub use config::Config;
pub use db::SessionFactory;
pub use error::DbError;
pub use mcp::SandboxService;
