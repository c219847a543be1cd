//! Document persistence seam. Services talk to [`DocumentStore`]; PostgreSQL backs production,
//! the in-memory store backs tests and `STORAGE=memory`.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::error::AppError;
use crate::model::{Document, Schema};
use crate::query::{Filter, QueryPlan};
use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

/// Validation run on the merged document inside an update.
pub type MergeCheck<'a> = dyn Fn(&Document) -> Result<(), AppError> + Send + Sync + 'a;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a new document; the store assigns the id. Returns the stored document.
    async fn insert(&self, schema: &Schema, doc: Document) -> Result<Document, AppError>;

    /// Fetch one document by id if it also matches `filters`.
    async fn find_by_id(&self, schema: &Schema, id: Uuid, filters: &[Filter]) -> Result<Option<Document>, AppError>;

    /// Run a list query.
    async fn find(&self, schema: &Schema, plan: &QueryPlan) -> Result<Vec<Document>, AppError>;

    /// Fetch documents whose `field` is one of `values`. Used to populate references.
    async fn find_where_in(
        &self,
        schema: &Schema,
        field: &str,
        values: &[Value],
        filters: &[Filter],
        fields: Option<&[String]>,
    ) -> Result<Vec<Document>, AppError>;

    /// Set the patch fields on one document matching `filters`. A null value unsets the field.
    /// `check` sees the stored document with the patch applied; an error aborts the write.
    /// The read, the check and the write are atomic with respect to other writers.
    async fn update_by_id(
        &self,
        schema: &Schema,
        id: Uuid,
        filters: &[Filter],
        patch: &Document,
        check: &MergeCheck<'_>,
    ) -> Result<Option<Document>, AppError>;

    /// Delete one document matching `filters`. Returns the deleted document.
    async fn delete_by_id(&self, schema: &Schema, id: Uuid, filters: &[Filter]) -> Result<Option<Document>, AppError>;

    /// Connectivity check for readiness probes.
    async fn ping(&self) -> Result<(), AppError>;
}

/// The stored document as it will look after `patch`. Nulls stay in place and read as unset.
pub(crate) fn merged(stored: &Document, patch: &Document) -> Document {
    let mut doc = stored.clone();
    for (k, v) in patch {
        doc.insert(k.clone(), v.clone());
    }
    doc
}

pub(crate) fn duplicate_error(field: &str) -> AppError {
    AppError::Conflict(format!("Duplicate field value for '{}'. Please use another value!", field))
}
