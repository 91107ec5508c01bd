//! Catalog introspection module.
//!
//! This module discovers base tables and their column layouts for
//! SQLite, PostgreSQL, and MySQL databases.
//!
//! # Architecture
//!
//! SQL queries are organized in the `queries` submodule with constants for each
//! database type. Database-specific implementations are in their respective
//! submodules (postgres, mysql, sqlite), each providing the same interface.
//! Every user-supplied filter is bound as a query parameter.

use crate::db::session::{DbConn, DbSession};
use crate::error::DbResult;
use crate::models::{ColumnDescriptor, TableRef};
use tracing::debug;

/// Catalog reader for table discovery and column descriptors.
pub struct CatalogReader;

impl CatalogReader {
    /// List all base tables visible to the session.
    pub async fn list_tables(session: &mut DbSession) -> DbResult<Vec<TableRef>> {
        match &mut session.conn {
            DbConn::Postgres(conn) => postgres::list_tables(conn).await,
            DbConn::MySql(conn) => mysql::list_tables(conn).await,
            DbConn::SQLite(conn) => sqlite::list_tables(conn).await,
        }
    }

    /// Fetch column descriptors for one table, in ordinal order.
    ///
    /// An unknown table yields an empty descriptor list rather than an error.
    pub async fn describe_columns(
        session: &mut DbSession,
        schema: &str,
        table: &str,
    ) -> DbResult<Vec<ColumnDescriptor>> {
        match &mut session.conn {
            DbConn::Postgres(conn) => postgres::describe_columns(conn, schema, table).await,
            DbConn::MySql(conn) => mysql::describe_columns(conn, schema, table).await,
            DbConn::SQLite(conn) => sqlite::describe_columns(conn, schema, table).await,
        }
    }
}

// =============================================================================
// SQL Query Templates
// =============================================================================
//
// Centralized SQL queries for catalog introspection. Each database has its own
// submodule with queries adapted to its specific system catalogs.

mod queries {
    pub mod postgres {
        pub const LIST_TABLES: &str = r#"
            SELECT table_schema, table_name
            FROM information_schema.tables
            WHERE table_type = 'BASE TABLE'
            AND table_schema NOT IN ('pg_catalog', 'information_schema')
            ORDER BY table_schema, table_name
            "#;

        pub const DESCRIBE_COLUMNS: &str = r#"
            SELECT column_name, data_type, is_nullable
            FROM information_schema.columns
            WHERE table_schema = $1 AND table_name = $2
            ORDER BY ordinal_position
            "#;
    }

    pub mod mysql {
        pub const LIST_TABLES: &str = r#"
            SELECT
                CONVERT(TABLE_SCHEMA USING utf8) AS TABLE_SCHEMA,
                CONVERT(TABLE_NAME USING utf8) AS TABLE_NAME
            FROM information_schema.TABLES
            WHERE TABLE_SCHEMA = DATABASE()
            AND TABLE_TYPE = 'BASE TABLE'
            ORDER BY TABLE_NAME
            "#;

        pub const DESCRIBE_COLUMNS: &str = r#"
            SELECT
                CONVERT(COLUMN_NAME USING utf8) AS COLUMN_NAME,
                CONVERT(COLUMN_TYPE USING utf8) AS COLUMN_TYPE,
                CONVERT(IS_NULLABLE USING utf8) AS IS_NULLABLE
            FROM information_schema.COLUMNS
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
            ORDER BY ORDINAL_POSITION
            "#;
    }

    pub mod sqlite {
        pub const LIST_TABLES: &str = r#"
            SELECT name FROM sqlite_master
            WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
            ORDER BY name
            "#;

        pub const DESCRIBE_COLUMNS: &str = r#"
            SELECT name, type, "notnull" FROM pragma_table_info(?) ORDER BY cid
            "#;
    }
}

// =============================================================================
// PostgreSQL Implementation
// =============================================================================

mod postgres {
    use super::*;
    use sqlx::{PgConnection, Row};

    pub async fn list_tables(conn: &mut PgConnection) -> DbResult<Vec<TableRef>> {
        let rows = sqlx::query(queries::postgres::LIST_TABLES)
            .fetch_all(&mut *conn)
            .await?;

        let tables = rows
            .iter()
            .filter_map(|row| {
                let schema: String = row.try_get("table_schema").ok()?;
                let name: String = row.try_get("table_name").ok()?;
                Some(TableRef::new(schema, name))
            })
            .collect::<Vec<_>>();

        debug!(count = tables.len(), "Listed PostgreSQL tables");
        Ok(tables)
    }

    pub async fn describe_columns(
        conn: &mut PgConnection,
        schema: &str,
        table: &str,
    ) -> DbResult<Vec<ColumnDescriptor>> {
        let rows = sqlx::query(queries::postgres::DESCRIBE_COLUMNS)
            .bind(schema)
            .bind(table)
            .fetch_all(&mut *conn)
            .await?;

        let columns = rows
            .iter()
            .filter_map(|row| {
                let name: String = row.try_get("column_name").ok()?;
                let type_name: String = row.try_get("data_type").ok()?;
                let nullable: String = row.try_get("is_nullable").ok()?;
                Some(ColumnDescriptor::new(name, type_name, nullable == "YES"))
            })
            .collect::<Vec<_>>();

        debug!(
            count = columns.len(),
            schema = schema,
            table = table,
            "Described PostgreSQL columns"
        );
        Ok(columns)
    }
}

// =============================================================================
// MySQL Implementation
// =============================================================================

mod mysql {
    use super::*;
    use sqlx::{MySqlConnection, Row};

    pub async fn list_tables(conn: &mut MySqlConnection) -> DbResult<Vec<TableRef>> {
        let rows = sqlx::query(queries::mysql::LIST_TABLES)
            .fetch_all(&mut *conn)
            .await?;

        let tables = rows
            .iter()
            .filter_map(|row| {
                let schema = get_string(row, "TABLE_SCHEMA")?;
                let name = get_string(row, "TABLE_NAME")?;
                Some(TableRef::new(schema, name))
            })
            .collect::<Vec<_>>();

        debug!(count = tables.len(), "Listed MySQL tables");
        Ok(tables)
    }

    pub async fn describe_columns(
        conn: &mut MySqlConnection,
        schema: &str,
        table: &str,
    ) -> DbResult<Vec<ColumnDescriptor>> {
        let rows = sqlx::query(queries::mysql::DESCRIBE_COLUMNS)
            .bind(schema)
            .bind(table)
            .fetch_all(&mut *conn)
            .await?;

        let columns = rows
            .iter()
            .filter_map(|row| {
                let name = get_string(row, "COLUMN_NAME")?;
                let type_name = get_string(row, "COLUMN_TYPE")?;
                let nullable = get_string(row, "IS_NULLABLE")?;
                Some(ColumnDescriptor::new(name, type_name, nullable == "YES"))
            })
            .collect::<Vec<_>>();

        debug!(
            count = columns.len(),
            schema = schema,
            table = table,
            "Described MySQL columns"
        );
        Ok(columns)
    }

    /// Safely get a string from a MySQL row.
    /// MySQL may return VARBINARY instead of VARCHAR depending on charset configuration.
    fn get_string(row: &sqlx::mysql::MySqlRow, column: &str) -> Option<String> {
        row.try_get::<String, _>(column).ok().or_else(|| {
            row.try_get::<Vec<u8>, _>(column)
                .ok()
                .and_then(|bytes| String::from_utf8(bytes).ok())
        })
    }
}

// =============================================================================
// SQLite Implementation
// =============================================================================

mod sqlite {
    use super::*;
    use sqlx::{Row, SqliteConnection};

    /// SQLite has no schema hierarchy; tables live under the fixed "main" schema.
    pub const MAIN_SCHEMA: &str = "main";

    pub async fn list_tables(conn: &mut SqliteConnection) -> DbResult<Vec<TableRef>> {
        let rows = sqlx::query(queries::sqlite::LIST_TABLES)
            .fetch_all(&mut *conn)
            .await?;

        let tables = rows
            .iter()
            .filter_map(|row| {
                let name: String = row.try_get("name").ok()?;
                Some(TableRef::new(MAIN_SCHEMA, name))
            })
            .collect::<Vec<_>>();

        debug!(count = tables.len(), "Listed SQLite tables");
        Ok(tables)
    }

    pub async fn describe_columns(
        conn: &mut SqliteConnection,
        schema: &str,
        table: &str,
    ) -> DbResult<Vec<ColumnDescriptor>> {
        if schema != MAIN_SCHEMA {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(queries::sqlite::DESCRIBE_COLUMNS)
            .bind(table)
            .fetch_all(&mut *conn)
            .await?;

        let columns = rows
            .iter()
            .filter_map(|row| {
                let name: String = row.try_get("name").ok()?;
                let type_name: String = row.try_get("type").ok()?;
                let notnull: i64 = row.try_get("notnull").ok()?;
                Some(ColumnDescriptor::new(name, type_name, notnull == 0))
            })
            .collect::<Vec<_>>();

        debug!(count = columns.len(), table = table, "Described SQLite columns");
        Ok(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::db::session::SessionFactory;

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
    async fn test_sqlite_list_tables() {
        let mut session = memory_session().await;
        exec(
            &mut session,
            "CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT)",
        )
        .await;
        exec(&mut session, "CREATE TABLE archive (id INTEGER)").await;

        let tables = CatalogReader::list_tables(&mut session).await.unwrap();
        let names: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();

        // Sorted, internal sqlite_sequence excluded
        assert_eq!(names, vec!["archive", "users"]);
        assert!(tables.iter().all(|t| t.schema == "main"));
        session.close().await;
    }

    #[tokio::test]
    async fn test_sqlite_describe_columns_in_ordinal_order() {
        let mut session = memory_session().await;
        exec(
            &mut session,
            "CREATE TABLE items (id INTEGER NOT NULL, label TEXT, score REAL NOT NULL)",
        )
        .await;

        let columns = CatalogReader::describe_columns(&mut session, "main", "items")
            .await
            .unwrap();

        assert_eq!(columns.len(), 3);
        assert_eq!(columns[0], ColumnDescriptor::new("id", "INTEGER", false));
        assert_eq!(columns[1], ColumnDescriptor::new("label", "TEXT", true));
        assert_eq!(columns[2], ColumnDescriptor::new("score", "REAL", false));
        session.close().await;
    }

    #[tokio::test]
    async fn test_sqlite_describe_unknown_table_is_empty() {
        let mut session = memory_session().await;
        let columns = CatalogReader::describe_columns(&mut session, "main", "missing")
            .await
            .unwrap();
        assert!(columns.is_empty());
        session.close().await;
    }

    #[tokio::test]
    async fn test_sqlite_describe_unknown_schema_is_empty() {
        let mut session = memory_session().await;
        exec(&mut session, "CREATE TABLE t (id INTEGER)").await;

        let columns = CatalogReader::describe_columns(&mut session, "other", "t")
            .await
            .unwrap();
        assert!(columns.is_empty());
        session.close().await;
    }
}
