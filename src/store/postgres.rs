//! PostgreSQL document store: one table per schema, one column per field.

use super::{duplicate_error, merged, DocumentStore, MergeCheck};
use crate::case::to_camel_case;
use crate::error::AppError;
use crate::model::{field::format_datetime, field::number_value, Document, FieldKind, Schema};
use crate::query::{Filter, QueryPlan};
use crate::sql::{self, PgBindValue, QueryBuf};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    /// PostgreSQL schema holding the tables.
    pg_schema: String,
}

impl PgStore {
    pub fn new(pool: PgPool, pg_schema: impl Into<String>) -> Self {
        PgStore {
            pool,
            pg_schema: pg_schema.into(),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn pg_schema(&self) -> &str {
        &self.pg_schema
    }

    async fn fetch_optional(&self, schema: &Schema, q: &QueryBuf) -> Result<Option<Document>, AppError> {
        fetch_optional(&self.pool, schema, q).await
    }

    async fn fetch_all(&self, schema: &Schema, q: &QueryBuf) -> Result<Vec<Document>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        let rows = query.fetch_all(&self.pool).await.map_err(|e| map_db_error(schema, e))?;
        Ok(rows.iter().map(|r| row_to_document(schema, r)).collect())
    }
}

async fn fetch_optional<'e, E: PgExecutor<'e>>(
    executor: E,
    schema: &Schema,
    q: &QueryBuf,
) -> Result<Option<Document>, AppError> {
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let mut query = sqlx::query(&q.sql);
    for p in &q.params {
        query = query.bind(PgBindValue::from_json(p));
    }
    let row = query.fetch_optional(executor).await.map_err(|e| map_db_error(schema, e))?;
    Ok(row.map(|r| row_to_document(schema, &r)))
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn insert(&self, schema: &Schema, doc: Document) -> Result<Document, AppError> {
        let id = Uuid::new_v4().to_string();
        let q = sql::insert(&self.pg_schema, schema, &id, &doc);
        self.fetch_optional(schema, &q)
            .await?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))
    }

    async fn find_by_id(&self, schema: &Schema, id: Uuid, filters: &[Filter]) -> Result<Option<Document>, AppError> {
        let q = sql::select_by_id(&self.pg_schema, schema, &id.to_string(), filters);
        self.fetch_optional(schema, &q).await
    }

    async fn find(&self, schema: &Schema, plan: &QueryPlan) -> Result<Vec<Document>, AppError> {
        let q = sql::select_list(&self.pg_schema, schema, plan);
        self.fetch_all(schema, &q).await
    }

    async fn find_where_in(
        &self,
        schema: &Schema,
        field: &str,
        values: &[Value],
        filters: &[Filter],
        fields: Option<&[String]>,
    ) -> Result<Vec<Document>, AppError> {
        if values.is_empty() {
            return Ok(Vec::new());
        }
        let q = sql::select_where_in(&self.pg_schema, schema, field, values, filters, fields);
        self.fetch_all(schema, &q).await
    }

    async fn update_by_id(
        &self,
        schema: &Schema,
        id: Uuid,
        filters: &[Filter],
        patch: &Document,
        check: &MergeCheck<'_>,
    ) -> Result<Option<Document>, AppError> {
        let id = id.to_string();
        // The row lock holds off concurrent updates until commit; dropping the transaction rolls back.
        let mut tx = self.pool.begin().await?;
        let q = sql::select_for_update(&self.pg_schema, schema, &id, filters);
        let Some(current) = fetch_optional(&mut *tx, schema, &q).await? else {
            return Ok(None);
        };
        check(&merged(&current, patch))?;
        let q = sql::update(&self.pg_schema, schema, &id, patch, filters);
        let updated = fetch_optional(&mut *tx, schema, &q).await?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn delete_by_id(&self, schema: &Schema, id: Uuid, filters: &[Filter]) -> Result<Option<Document>, AppError> {
        let q = sql::delete(&self.pg_schema, schema, &id.to_string(), filters);
        self.fetch_optional(schema, &q).await
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }
}

/// Unique violations become 409 naming the field; everything else stays a database error.
fn map_db_error(schema: &Schema, e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &e {
        if db.code().as_deref() == Some("23505") {
            // Postgres names inline unique constraints "<table>_<column>_key".
            let column = db
                .constraint()
                .and_then(|c| c.strip_prefix(schema.collection))
                .and_then(|c| c.strip_prefix('_'))
                .and_then(|c| c.strip_suffix("_key"))
                .unwrap_or("unknown");
            return duplicate_error(&to_camel_case(column));
        }
    }
    AppError::Db(e)
}

/// Row to document: columns back to API field names, SQL NULL left out.
fn row_to_document(schema: &Schema, row: &PgRow) -> Document {
    use sqlx::{Column, Row};
    let mut doc = Document::new();
    for col in row.columns() {
        let key = to_camel_case(col.name());
        let Some(kind) = schema.kind_of(&key) else {
            continue;
        };
        if let Some(v) = cell_to_value(row, col.ordinal(), kind) {
            doc.insert(key, v);
        }
    }
    doc
}

fn cell_to_value(row: &PgRow, idx: usize, kind: FieldKind) -> Option<Value> {
    use sqlx::Row;
    match kind {
        FieldKind::String => row.try_get::<Option<String>, _>(idx).ok().flatten().map(Value::String),
        FieldKind::Number => row.try_get::<Option<f64>, _>(idx).ok().flatten().map(number_value),
        FieldKind::Bool => row.try_get::<Option<bool>, _>(idx).ok().flatten().map(Value::Bool),
        FieldKind::DateTime => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx)
            .ok()
            .flatten()
            .map(|d| Value::String(format_datetime(d))),
        FieldKind::Id => row
            .try_get::<Option<Uuid>, _>(idx)
            .ok()
            .flatten()
            .map(|u| Value::String(u.to_string())),
        FieldKind::StringArray
        | FieldKind::DateTimeArray
        | FieldKind::IdArray
        | FieldKind::Point
        | FieldKind::PointArray => row.try_get::<Option<Value>, _>(idx).ok().flatten(),
    }
}
