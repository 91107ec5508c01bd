//! Error types for the DB Sandbox MCP Server.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Every fallible operation returns one of these variants so callers match on the
//! category instead of inspecting message text.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Connection error: {message}")]
    Connection {
        message: String,
        suggestion: Option<String>,
    },

    #[error("Invalid resource URI: {uri}")]
    InvalidUri { uri: String },

    #[error("Query error: {message}")]
    Query {
        message: String,
        /// e.g., "42601" for a syntax error
        sql_state: Option<String>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DbError {
    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: Some(suggestion.into()),
        }
    }

    /// Create a connection error without a suggestion.
    pub fn connection_bare(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: None,
        }
    }

    /// Create an invalid resource URI error.
    pub fn invalid_uri(uri: impl Into<String>) -> Self {
        Self::InvalidUri { uri: uri.into() }
    }

    /// Create a query error with optional SQL state.
    pub fn query(message: impl Into<String>, sql_state: Option<String>) -> Self {
        Self::Query {
            message: message.into(),
            sql_state,
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => suggestion.as_deref(),
            _ => None,
        }
    }

    /// Get the SQLSTATE code for this error, if available.
    pub fn sql_state(&self) -> Option<&str> {
        match self {
            Self::Query { sql_state, .. } => sql_state.as_deref(),
            _ => None,
        }
    }
}

/// Convert sqlx errors to DbError.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::connection(
                msg.to_string(),
                "Check the connection string format and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DbError::query(db_err.message(), code)
            }
            sqlx::Error::Io(io_err) => DbError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => DbError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => DbError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                DbError::connection_bare("Connection closed")
            }
            sqlx::Error::RowNotFound => DbError::query("No rows returned", None),
            sqlx::Error::TypeNotFound { type_name } => {
                DbError::query(format!("Type not found: {}", type_name), None)
            }
            sqlx::Error::ColumnNotFound(col) => {
                DbError::query(format!("Column not found: {}", col), None)
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => DbError::internal(format!(
                "Column index {} out of bounds (len: {})",
                index, len
            )),
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DbError::internal(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => DbError::internal("Database worker crashed"),
            _ => DbError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Build suggestion data as JSON value.
fn suggestion_data(suggestion: Option<&str>) -> Option<serde_json::Value> {
    suggestion.map(|s| serde_json::json!({ "suggestion": s }))
}

/// Convert DbError to MCP ErrorData for the transport-level error paths.
/// Includes the suggestion field in the `data` object when available.
impl From<DbError> for rmcp::ErrorData {
    fn from(err: DbError) -> Self {
        match &err {
            DbError::InvalidUri { .. } => rmcp::ErrorData::invalid_params(err.to_string(), None),

            DbError::Config(..) => {
                rmcp::ErrorData::invalid_params(err.to_string(), suggestion_data(err.suggestion()))
            }

            DbError::Connection { suggestion, .. } => rmcp::ErrorData::internal_error(
                err.to_string(),
                suggestion_data(suggestion.as_deref()),
            ),

            DbError::Query { sql_state, .. } => rmcp::ErrorData::internal_error(
                err.to_string(),
                sql_state
                    .as_deref()
                    .map(|code| serde_json::json!({ "sql_state": code })),
            ),

            DbError::Internal(..) => rmcp::ErrorData::internal_error(err.to_string(), None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DbError::connection("Failed to connect", "Check credentials");
        assert!(err.to_string().contains("Connection error"));
    }

    #[test]
    fn test_invalid_uri_display() {
        let err = DbError::invalid_uri("db://bad");
        assert_eq!(err.to_string(), "Invalid resource URI: db://bad");
    }

    #[test]
    fn test_error_suggestion() {
        let err = DbError::connection("Failed to connect", "Check credentials");
        assert_eq!(err.suggestion(), Some("Check credentials"));
        assert_eq!(DbError::internal("boom").suggestion(), None);
    }

    #[test]
    fn test_error_sql_state() {
        let err = DbError::query("Syntax error", Some("42601".to_string()));
        assert_eq!(err.sql_state(), Some("42601"));
        assert_eq!(DbError::query("no code", None).sql_state(), None);
    }

    // Tests for From<DbError> for rmcp::ErrorData

    #[test]
    fn test_invalid_uri_maps_to_invalid_params() {
        let err = DbError::invalid_uri("db://nope");
        let mcp_err: rmcp::ErrorData = err.into();
        // invalid_params uses -32602
        assert_eq!(mcp_err.code.0, -32602);
        assert!(mcp_err.message.contains("Invalid resource URI"));
    }

    #[test]
    fn test_config_maps_to_invalid_params() {
        let err = DbError::config("missing database URL");
        let mcp_err: rmcp::ErrorData = err.into();
        assert_eq!(mcp_err.code.0, -32602);
    }

    #[test]
    fn test_connection_maps_to_internal_error() {
        let err = DbError::connection("failed", "try again");
        let mcp_err: rmcp::ErrorData = err.into();
        // internal_error uses -32603
        assert_eq!(mcp_err.code.0, -32603);
    }

    #[test]
    fn test_query_maps_to_internal_error() {
        let err = DbError::query("syntax error", None);
        let mcp_err: rmcp::ErrorData = err.into();
        assert_eq!(mcp_err.code.0, -32603);
    }

    #[test]
    fn test_internal_maps_to_internal_error() {
        let err = DbError::internal("unknown error");
        let mcp_err: rmcp::ErrorData = err.into();
        assert_eq!(mcp_err.code.0, -32603);
    }

    #[test]
    fn test_connection_error_includes_suggestion_in_data() {
        let err = DbError::connection("failed", "try reconnecting");
        let mcp_err: rmcp::ErrorData = err.into();
        let data = mcp_err.data.unwrap();
        assert_eq!(data["suggestion"], "try reconnecting");
    }

    #[test]
    fn test_query_error_includes_sql_state_in_data() {
        let err = DbError::query("syntax error", Some("42601".to_string()));
        let mcp_err: rmcp::ErrorData = err.into();
        let data = mcp_err.data.unwrap();
        assert_eq!(data["sql_state"], "42601");
    }

    #[test]
    fn test_sqlx_row_not_found_maps_to_query() {
        let err: DbError = DbError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, DbError::Query { .. }));
    }

    #[test]
    fn test_sqlx_column_not_found_maps_to_query() {
        let err: DbError = DbError::from(sqlx::Error::ColumnNotFound("missing".to_string()));
        assert!(matches!(err, DbError::Query { .. }));
        assert!(err.to_string().contains("missing"));
    }
}
