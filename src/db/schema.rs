//! Schema introspection.
//!
//! SQL queries are organized in the `queries` submodule with constants for each
//! database type. Catalog text columns are cast to `text` on PostgreSQL so they
//! decode as `String` regardless of the `name`/`sql_identifier` domain types.

use crate::db::connection::DbConnection;
use crate::error::DbResult;
use crate::models::ColumnDefinition;
use sqlx::Row;
use tracing::debug;

/// Schema inspector for database introspection.
pub struct SchemaInspector;

impl SchemaInspector {
    /// Table names in `schema`, sorted. SQLite ignores `schema`.
    pub async fn list_tables(conn: &mut DbConnection, schema: &str) -> DbResult<Vec<String>> {
        let mut names = match conn {
            DbConnection::Postgres(c) => postgres::list_tables(c, schema).await?,
            DbConnection::SQLite(c) => sqlite::list_tables(c).await?,
        };
        names.sort();
        debug!(schema = %schema, count = names.len(), "Listed tables");
        Ok(names)
    }

    /// Columns of `table_name` in ordinal order. Empty when the table does not exist.
    pub async fn describe_table(
        conn: &mut DbConnection,
        table_name: &str,
        schema: &str,
    ) -> DbResult<Vec<ColumnDefinition>> {
        match conn {
            DbConnection::Postgres(c) => postgres::describe_table(c, table_name, schema).await,
            DbConnection::SQLite(c) => sqlite::describe_table(c, table_name).await,
        }
    }
}

mod queries {
    pub mod postgres {
        pub const LIST_TABLES: &str = r#"
            SELECT table_name::text AS table_name
            FROM information_schema.tables
            WHERE table_schema = $1
            ORDER BY table_name
            "#;

        pub const DESCRIBE_COLUMNS: &str = r#"
            SELECT
                column_name::text AS column_name,
                data_type::text AS data_type,
                is_nullable::text AS is_nullable,
                column_default::text AS column_default
            FROM information_schema.columns
            WHERE table_schema = $1 AND table_name = $2
            ORDER BY ordinal_position
            "#;
    }

    pub mod sqlite {
        pub const LIST_TABLES: &str = r#"
            SELECT name
            FROM sqlite_master
            WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%'
            ORDER BY name
            "#;

        pub const DESCRIBE_COLUMNS: &str = r#"
            SELECT
                name AS column_name,
                type AS data_type,
                CASE WHEN "notnull" = 0 THEN 'YES' ELSE 'NO' END AS is_nullable,
                dflt_value AS column_default
            FROM pragma_table_info(?1)
            ORDER BY cid
            "#;
    }
}

/// Build a column from the catalog's `information_schema`-shaped row.
fn column_from_row<R: Row>(row: &R) -> DbResult<ColumnDefinition>
where
    for<'r> String: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
    for<'r> Option<String>: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
    for<'a> &'a str: sqlx::ColumnIndex<R>,
{
    let name: String = row.try_get("column_name")?;
    let data_type: Option<String> = row.try_get("data_type")?;
    let is_nullable: Option<String> = row.try_get("is_nullable")?;
    let default_value: Option<String> = row.try_get("column_default").ok().flatten();

    Ok(ColumnDefinition::new(
        name,
        data_type.unwrap_or_default(),
        is_nullable.is_some_and(|v| v.eq_ignore_ascii_case("YES")),
    )
    .with_default(default_value))
}

mod postgres {
    use super::*;
    use sqlx::PgConnection;

    pub async fn list_tables(conn: &mut PgConnection, schema: &str) -> DbResult<Vec<String>> {
        let rows = sqlx::query(queries::postgres::LIST_TABLES)
            .bind(schema)
            .fetch_all(&mut *conn)
            .await?;
        rows.iter()
            .map(|row| row.try_get::<String, _>("table_name").map_err(Into::into))
            .collect()
    }

    pub async fn describe_table(
        conn: &mut PgConnection,
        table_name: &str,
        schema: &str,
    ) -> DbResult<Vec<ColumnDefinition>> {
        let rows = sqlx::query(queries::postgres::DESCRIBE_COLUMNS)
            .bind(schema)
            .bind(table_name)
            .fetch_all(&mut *conn)
            .await?;
        rows.iter().map(column_from_row).collect()
    }
}

mod sqlite {
    use super::*;
    use sqlx::SqliteConnection;

    pub async fn list_tables(conn: &mut SqliteConnection) -> DbResult<Vec<String>> {
        let rows = sqlx::query(queries::sqlite::LIST_TABLES)
            .fetch_all(&mut *conn)
            .await?;
        rows.iter()
            .map(|row| row.try_get::<String, _>("name").map_err(Into::into))
            .collect()
    }

    pub async fn describe_table(
        conn: &mut SqliteConnection,
        table_name: &str,
    ) -> DbResult<Vec<ColumnDefinition>> {
        let rows = sqlx::query(queries::sqlite::DESCRIBE_COLUMNS)
            .bind(table_name)
            .fetch_all(&mut *conn)
            .await?;
        rows.iter().map(column_from_row).collect()
    }
}
