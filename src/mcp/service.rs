//! MCP service implementation using rmcp.
//!
//! This module defines the SandboxService struct exposing the database over
//! the MCP protocol: catalog tables as resources and a single `executeQuery`
//! tool that runs SQL inside an always-rolled-back transaction.
//!
//! Every handler invocation opens its own database session and closes it
//! before returning; no session outlives a request.

use crate::db::{CatalogReader, SandboxExecutor, SessionFactory};
use crate::error::{DbError, DbResult};
use crate::models::ColumnDescriptor;
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    model::{
        AnnotateAble, CallToolRequestParams, CallToolResult, Content, Implementation,
        ListResourcesResult, ListToolsResult, PaginatedRequestParams, ProtocolVersion,
        RawResource, ReadResourceRequestParams, ReadResourceResult, ResourceContents,
        ServerCapabilities, ServerInfo, Tool,
    },
    service::RequestContext,
};
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

/// Name of the single query tool.
pub const EXECUTE_QUERY_TOOL: &str = "executeQuery";

/// Trailing URI segment that marks a table-schema resource.
const SCHEMA_PATH_SEGMENT: &str = "schema";

#[derive(Clone)]
pub struct SandboxService {
    /// Factory for per-invocation database sessions
    sessions: Arc<SessionFactory>,
}

impl SandboxService {
    /// Create a new SandboxService instance.
    pub fn new(sessions: Arc<SessionFactory>) -> Self {
        Self { sessions }
    }

    /// Run one sandboxed query on a fresh session.
    ///
    /// The session is closed whether the query succeeds or fails. Returns the
    /// result rows JSON-encoded for transport.
    async fn run_query(&self, sql: &str) -> DbResult<String> {
        let mut session = self.sessions.open().await?;
        let result = SandboxExecutor::execute(&mut session, sql).await;
        session.close().await;

        let outcome = result?;
        serde_json::to_string(&outcome.rows)
            .map_err(|e| DbError::internal(format!("Failed to serialize result rows: {}", e)))
    }

    /// Fetch column descriptors for one table on a fresh session.
    async fn read_columns(&self, schema: &str, table: &str) -> DbResult<Vec<ColumnDescriptor>> {
        let mut session = self.sessions.open().await?;
        let result = CatalogReader::describe_columns(&mut session, schema, table).await;
        session.close().await;
        result
    }
}

/// Parse a table-schema resource URI.
///
/// The URI path must end in `<schemaName>/<tableName>/schema`; the three
/// trailing segments are popped in reverse and the last must equal the
/// literal marker.
fn parse_table_schema_uri(uri: &str) -> DbResult<(String, String)> {
    let mut segments = uri.rsplit('/');
    match (segments.next(), segments.next(), segments.next()) {
        (Some(SCHEMA_PATH_SEGMENT), Some(table), Some(schema))
            if !table.is_empty() && !schema.is_empty() =>
        {
            Ok((schema.to_string(), table.to_string()))
        }
        _ => Err(DbError::invalid_uri(uri)),
    }
}

fn execute_query_schema() -> Arc<serde_json::Map<String, serde_json::Value>> {
    Arc::new(rmcp::model::object(json!({
        "type": "object",
        "properties": {
            "sql": {
                "type": "string",
                "description": "The SQL statement to execute. Any statement is accepted, including INSERT/UPDATE/DELETE and DDL; the transaction is always rolled back, so nothing persists."
            }
        },
        "required": ["sql"]
    })))
}

impl ServerHandler for SandboxService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation {
                name: "db-sandbox-mcp".to_owned(),
                title: Some("DB Sandbox MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                description: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "SQL sandbox over a single database.\n\
                \n\
                Tables are exposed as resources; read one to get its column\n\
                descriptors (name, type, nullability).\n\
                \n\
                Use `executeQuery` to run any SQL statement. Every statement\n\
                executes inside a transaction that is always rolled back:\n\
                a statement observes its own writes, but nothing persists\n\
                after the call returns."
                    .to_string(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        let tool = Tool::new(
            EXECUTE_QUERY_TOOL,
            concat!(
                "Execute a SQL statement inside a transaction that is always rolled back. ",
                "Returns the complete result row set as JSON. ",
                "Writes and DDL are visible to the statement itself but never persist.",
            ),
            execute_query_schema(),
        );

        Ok(ListToolsResult {
            meta: None,
            tools: vec![tool],
            next_cursor: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        if request.name.as_ref() != EXECUTE_QUERY_TOOL {
            return Ok(CallToolResult::error(vec![Content::text(format!(
                "Tool '{}' not implemented",
                request.name
            ))]));
        }

        let args = request.arguments.unwrap_or_default();
        let sql = match args.get("sql").and_then(|v| v.as_str()) {
            Some(sql) => sql.to_string(),
            None => {
                return Ok(CallToolResult::error(vec![Content::text(
                    "The 'sql' argument is required and must be a string",
                )]));
            }
        };

        // Failures are wrapped as error-flagged content, never surfaced as
        // transport faults.
        match self.run_query(&sql).await {
            Ok(text) => Ok(CallToolResult::success(vec![Content::text(text)])),
            Err(e) => {
                let mut message = e.to_string();
                if let Some(suggestion) = e.suggestion() {
                    message.push_str("\nSuggestion: ");
                    message.push_str(suggestion);
                }
                Ok(CallToolResult::error(vec![Content::text(message)]))
            }
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        // Listing degrades to an empty catalog on any failure.
        let mut session = match self.sessions.open().await {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Failed to open session for resource listing");
                return Ok(ListResourcesResult {
                    meta: None,
                    resources: vec![],
                    next_cursor: None,
                });
            }
        };

        let tables = match CatalogReader::list_tables(&mut session).await {
            Ok(tables) => tables,
            Err(e) => {
                warn!(error = %e, "Failed to list tables for resources");
                Vec::new()
            }
        };
        session.close().await;

        let resources = tables
            .into_iter()
            .map(|t| {
                RawResource {
                    uri: format!("db://{}/{}/{}", t.schema, t.name, SCHEMA_PATH_SEGMENT),
                    name: format!("\"{}\" database schema", t.qualified()),
                    title: Some(format!("Table: {}", t.qualified())),
                    description: None,
                    mime_type: Some("application/json".to_string()),
                    size: None,
                    icons: None,
                    meta: None,
                }
                .no_annotation()
            })
            .collect();

        Ok(ListResourcesResult {
            meta: None,
            resources,
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        let (schema, table) = parse_table_schema_uri(&request.uri)?;

        let columns = self.read_columns(&schema, &table).await?;
        let text = serde_json::to_string_pretty(&columns)
            .map_err(|e| DbError::internal(format!("Failed to serialize columns: {}", e)))?;

        Ok(ReadResourceResult {
            contents: vec![ResourceContents::TextResourceContents {
                uri: request.uri.clone(),
                mime_type: Some("application/json".to_string()),
                text,
                meta: None,
            }],
        })
    }
}
