//! Rollback sandbox for query execution.
//!
//! Every query runs inside a transaction that is unconditionally rolled back,
//! so statements observe their own writes but never persist them. The sandbox
//! issues no COMMIT under any circumstances.

use crate::db::session::{DbConn, DbSession};
use crate::db::types::RowToJson;
use crate::error::DbResult;
use crate::models::QueryOutcome;
use serde_json::Value as JsonValue;
use sqlx::{Connection, MySqlConnection, PgConnection, SqliteConnection};
use std::time::Instant;
use tracing::{debug, info};

type JsonRows = Vec<serde_json::Map<String, JsonValue>>;

/// Executes SQL inside always-rolled-back transactions.
pub struct SandboxExecutor;

impl SandboxExecutor {
    /// Run one SQL statement in a fresh transaction and roll it back.
    ///
    /// The complete row set is decoded before the rollback is issued. A
    /// rollback failure after a successful query surfaces as an error, since
    /// the persistence guarantee can no longer be confirmed on this session.
    pub async fn execute(session: &mut DbSession, sql: &str) -> DbResult<QueryOutcome> {
        debug!(session_id = %session.id(), sql = sql, "Executing sandboxed query");
        let start = Instant::now();

        let rows = match &mut session.conn {
            DbConn::Postgres(conn) => postgres_rolled_back(conn, sql).await?,
            DbConn::MySql(conn) => mysql_rolled_back(conn, sql).await?,
            DbConn::SQLite(conn) => sqlite_rolled_back(conn, sql).await?,
        };

        let execution_time_ms = start.elapsed().as_millis() as u64;
        let outcome = QueryOutcome::new(rows, execution_time_ms);

        info!(
            session_id = %session.id(),
            row_count = outcome.row_count(),
            execution_time_ms,
            "Query executed and rolled back"
        );
        Ok(outcome)
    }
}

async fn postgres_rolled_back(conn: &mut PgConnection, sql: &str) -> DbResult<JsonRows> {
    let mut tx = conn.begin().await?;
    let rows = match sqlx::query(sql).fetch_all(&mut *tx).await {
        Ok(rows) => rows,
        Err(e) => {
            // Drop queues the cleanup rollback; its outcome is not surfaced.
            drop(tx);
            return Err(e.into());
        }
    };
    tx.rollback().await?;
    Ok(rows.iter().map(|row| row.to_json_map()).collect())
}

async fn mysql_rolled_back(conn: &mut MySqlConnection, sql: &str) -> DbResult<JsonRows> {
    let mut tx = conn.begin().await?;
    let rows = match sqlx::query(sql).fetch_all(&mut *tx).await {
        Ok(rows) => rows,
        Err(e) => {
            drop(tx);
            return Err(e.into());
        }
    };
    tx.rollback().await?;
    Ok(rows.iter().map(|row| row.to_json_map()).collect())
}

async fn sqlite_rolled_back(conn: &mut SqliteConnection, sql: &str) -> DbResult<JsonRows> {
    let mut tx = conn.begin().await?;
    let rows = match sqlx::query(sql).fetch_all(&mut *tx).await {
        Ok(rows) => rows,
        Err(e) => {
            drop(tx);
            return Err(e.into());
        }
    };
    tx.rollback().await?;
    Ok(rows.iter().map(|row| row.to_json_map()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::db::session::SessionFactory;
    use crate::error::DbError;

    async fn memory_session() -> DbSession {
        let config = DatabaseConfig::parse("sqlite::memory:").unwrap();
        let factory = SessionFactory::new(config).unwrap();
        factory.open().await.unwrap()
    }

    async fn exec(session: &mut DbSession, sql: &str) {
        match &mut session.conn {
            DbConn::SQLite(conn) => {
                sqlx::query(sql).execute(&mut *conn).await.unwrap();
            }
            _ => unreachable!("test sessions are SQLite"),
        }
    }

    #[tokio::test]
    async fn test_select_returns_complete_rows() {
        let mut session = memory_session().await;
        exec(&mut session, "CREATE TABLE t (id INTEGER, name TEXT)").await;
        exec(&mut session, "INSERT INTO t VALUES (1, 'a'), (2, 'b')").await;

        let outcome = SandboxExecutor::execute(&mut session, "SELECT * FROM t ORDER BY id")
            .await
            .unwrap();

        assert_eq!(outcome.row_count(), 2);
        assert_eq!(outcome.rows[0]["id"], serde_json::json!(1));
        assert_eq!(outcome.rows[0]["name"], serde_json::json!("a"));
        assert_eq!(outcome.rows[1]["id"], serde_json::json!(2));
        session.close().await;
    }

    #[tokio::test]
    async fn test_insert_is_rolled_back() {
        let mut session = memory_session().await;
        exec(&mut session, "CREATE TABLE t (id INTEGER)").await;
        exec(&mut session, "INSERT INTO t VALUES (1)").await;

        SandboxExecutor::execute(&mut session, "INSERT INTO t VALUES (2)")
            .await
            .unwrap();

        let outcome = SandboxExecutor::execute(&mut session, "SELECT COUNT(*) AS n FROM t")
            .await
            .unwrap();
        assert_eq!(outcome.rows[0]["n"], serde_json::json!(1));
        session.close().await;
    }

    #[tokio::test]
    async fn test_insert_sees_own_write_via_returning() {
        let mut session = memory_session().await;
        exec(&mut session, "CREATE TABLE t (id INTEGER, name TEXT)").await;

        let outcome = SandboxExecutor::execute(
            &mut session,
            "INSERT INTO t VALUES (9, 'x') RETURNING id, name",
        )
        .await
        .unwrap();

        assert_eq!(outcome.row_count(), 1);
        assert_eq!(outcome.rows[0]["id"], serde_json::json!(9));
        assert_eq!(outcome.rows[0]["name"], serde_json::json!("x"));
        session.close().await;
    }

    #[tokio::test]
    async fn test_ddl_is_rolled_back() {
        let mut session = memory_session().await;

        SandboxExecutor::execute(&mut session, "CREATE TABLE ghost (id INTEGER)")
            .await
            .unwrap();

        let outcome = SandboxExecutor::execute(
            &mut session,
            "SELECT name FROM sqlite_master WHERE name = 'ghost'",
        )
        .await
        .unwrap();
        assert!(outcome.is_empty());
        session.close().await;
    }

    #[tokio::test]
    async fn test_invalid_sql_is_a_query_error() {
        let mut session = memory_session().await;

        let err = SandboxExecutor::execute(&mut session, "SELEKT * FROM nowhere")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Query { .. }));

        // The session survives a failed statement
        let outcome = SandboxExecutor::execute(&mut session, "SELECT 1 AS one")
            .await
            .unwrap();
        assert_eq!(outcome.rows[0]["one"], serde_json::json!(1));
        session.close().await;
    }
}
