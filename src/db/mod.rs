//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - Per-invocation session management
//! - Rollback-sandboxed query execution
//! - Catalog introspection
//! - Type mappings

pub mod catalog;
pub mod sandbox;
pub mod session;
pub mod types;

pub use catalog::CatalogReader;
pub use sandbox::SandboxExecutor;
pub use session::{DbBackend, DbConn, DbSession, SessionFactory};
