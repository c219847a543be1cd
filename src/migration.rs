//! Apply document schemas to the database: CREATE SCHEMA, CREATE TABLE, CREATE INDEX.
//! Idempotent: every statement uses IF NOT EXISTS.

use crate::error::AppError;
use crate::model::{Direction, Schema};
use crate::sql::builder::{qualified_table, quoted};
use sqlx::PgPool;

/// DDL statements for one schema, in execution order.
pub fn schema_ddl(pg_schema: &str, schema: &Schema) -> Vec<String> {
    let table = qualified_table(pg_schema, schema.collection);
    let mut col_defs = vec![format!("{} uuid PRIMARY KEY", quoted("id"))];
    for f in &schema.fields {
        let mut def = format!("{} {}", quoted(&f.column()), f.kind.pg_type());
        if f.unique {
            def.push_str(" UNIQUE");
        }
        col_defs.push(def);
    }
    let mut out = vec![format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
        table,
        col_defs.join(",\n  ")
    )];
    for idx in &schema.indexes {
        let cols: Vec<String> = idx
            .fields
            .iter()
            .filter_map(|(name, dir)| {
                schema.field(name).map(|f| {
                    let dir = match dir {
                        Direction::Asc => "ASC",
                        Direction::Desc => "DESC",
                    };
                    format!("{} {}", quoted(&f.column()), dir)
                })
            })
            .collect();
        if cols.is_empty() {
            continue;
        }
        out.push(format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
            quoted(idx.name),
            table,
            cols.join(", ")
        ));
    }
    out
}

/// Create the PostgreSQL schema and every table and index.
pub async fn apply_migrations(pool: &PgPool, pg_schema: &str, schemas: &[&Schema]) -> Result<(), AppError> {
    sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", quoted(pg_schema)))
        .execute(pool)
        .await?;
    for schema in schemas {
        for sql in schema_ddl(pg_schema, schema) {
            tracing::debug!(sql = %sql, "migration");
            sqlx::query(&sql).execute(pool).await?;
        }
        tracing::info!(collection = schema.collection, "table ready");
    }
    Ok(())
}
