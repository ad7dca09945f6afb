//! Database and table provisioning.

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{LoadError, LoadResult};
use crate::schema::{create_table_sql, quote_ident, ColumnSchema};

use super::connection::PgConnection;

pub const LIST_DATABASES_SQL: &str = "SELECT datname::text FROM pg_database";

pub const LIST_TABLES_SQL: &str = "SELECT table_name::text \
     FROM information_schema.tables \
     WHERE table_schema = 'public' AND table_type = 'BASE TABLE'";

/// Whether a database or table was reused or created by this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Provisioned {
    Existing,
    Created,
}

/// `true` if `name` is among the server's databases.
pub async fn database_exists(conn: &PgConnection, name: &str) -> LoadResult<bool> {
    let rows = conn
        .client()
        .query(LIST_DATABASES_SQL, &[])
        .await
        .map_err(|e| LoadError::provisioning(format!("database {name}"), LIST_DATABASES_SQL, e))?;
    Ok(rows.iter().any(|row| row.get::<_, &str>(0) == name))
}

/// `CREATE DATABASE` on an administrative connection.
///
/// The statement cannot run inside a transaction block, so it goes through the simple query
/// protocol on the autocommit connection.
pub async fn create_database(conn: &PgConnection, name: &str) -> LoadResult<()> {
    let sql = format!("CREATE DATABASE {}", quote_ident(name));
    debug!(%sql, "creating database");
    conn.client()
        .batch_execute(&sql)
        .await
        .map_err(|e| LoadError::provisioning(format!("database {name}"), sql.clone(), e))
}

/// Reuse `name` if listed, otherwise create it.
pub async fn ensure_database(conn: &PgConnection, name: &str) -> LoadResult<Provisioned> {
    if database_exists(conn, name).await? {
        return Ok(Provisioned::Existing);
    }
    create_database(conn, name).await?;
    Ok(Provisioned::Created)
}

/// `true` if `table` is a base table in the `public` schema.
pub async fn table_exists(conn: &PgConnection, table: &str) -> LoadResult<bool> {
    let rows = conn
        .client()
        .query(LIST_TABLES_SQL, &[])
        .await
        .map_err(|e| LoadError::provisioning(format!("table {table}"), LIST_TABLES_SQL, e))?;
    Ok(rows.iter().any(|row| row.get::<_, &str>(0) == table))
}

/// Reuse `table` if it exists, otherwise create it from `schema` in its own transaction.
///
/// An existing table is used as-is; its columns are not compared with `schema`.
pub async fn ensure_table(conn: &mut PgConnection, table: &str, schema: &ColumnSchema) -> LoadResult<Provisioned> {
    if table_exists(conn, table).await? {
        return Ok(Provisioned::Existing);
    }

    let sql = create_table_sql(table, schema);
    debug!(%sql, "creating table");
    let object = format!("table {table}");

    let tx = conn
        .transaction()
        .await
        .map_err(|e| LoadError::provisioning(object.clone(), sql.clone(), e))?;
    if let Err(e) = tx.batch_execute(&sql).await {
        if let Err(rollback_err) = tx.rollback().await {
            warn!("rollback after failed CREATE TABLE returned an error: {rollback_err}");
        }
        return Err(LoadError::provisioning(object, sql, e));
    }
    tx.commit()
        .await
        .map_err(|e| LoadError::provisioning(object, sql, e))?;
    Ok(Provisioned::Created)
}
