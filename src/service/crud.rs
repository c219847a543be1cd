//! Generic CRUD over any document schema.

use crate::error::AppError;
use crate::model::{Document, Schema, ID_FIELD};
use crate::query::QueryPlan;
use crate::service::RequestValidator;
use crate::store::DocumentStore;
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

pub struct CrudService;

impl CrudService {
    /// Insert one document: cast, setters, defaults, validation, pre-save hooks. Returns the created document.
    pub async fn create(store: &dyn DocumentStore, schema: &Schema, body: Document) -> Result<Document, AppError> {
        let mut doc = schema.cast(body).map_err(cast_error)?;
        schema.apply_setters(&mut doc);
        schema.apply_defaults(&mut doc);
        RequestValidator::validate(&doc, schema)?;
        schema.before_save(&mut doc);
        let saved = store.insert(schema, doc).await?;
        tracing::info!(collection = schema.collection, id = ?saved.get(ID_FIELD), "document created");
        Self::present_one(store, schema, saved).await
    }

    /// Fetch one document by id. Query middleware applies, so filtered-out documents read as missing.
    pub async fn read(store: &dyn DocumentStore, schema: &Schema, id: Uuid) -> Result<Option<Document>, AppError> {
        match store.find_by_id(schema, id, &schema.base_filters).await? {
            Some(doc) => Self::present_one(store, schema, doc).await.map(Some),
            None => Ok(None),
        }
    }

    /// Apply a partial update. The merged document is validated inside the store's update,
    /// so a concurrent write cannot slip between the check and the write.
    pub async fn update(
        store: &dyn DocumentStore,
        schema: &Schema,
        id: Uuid,
        body: Document,
    ) -> Result<Option<Document>, AppError> {
        let mut patch = schema.cast(body).map_err(cast_error)?;
        schema.apply_setters(&mut patch);
        let check = |merged: &Document| RequestValidator::validate(merged, schema);
        match store.update_by_id(schema, id, &schema.base_filters, &patch, &check).await? {
            Some(doc) => {
                tracing::info!(collection = schema.collection, %id, "document updated");
                Self::present_one(store, schema, doc).await.map(Some)
            }
            None => Ok(None),
        }
    }

    /// Delete one document by id. Returns the deleted document or None.
    pub async fn delete(store: &dyn DocumentStore, schema: &Schema, id: Uuid) -> Result<Option<Document>, AppError> {
        let deleted = store.delete_by_id(schema, id, &schema.base_filters).await?;
        if deleted.is_some() {
            tracing::info!(collection = schema.collection, %id, "document deleted");
        }
        Ok(deleted)
    }

    /// List documents. The schema's query middleware filters are prepended to the plan's.
    pub async fn list(store: &dyn DocumentStore, schema: &Schema, plan: QueryPlan) -> Result<Vec<Document>, AppError> {
        let plan = plan.with_filters(&schema.base_filters);
        let docs = store.find(schema, &plan).await?;
        Self::present(store, schema, docs, plan.fields.as_deref()).await
    }

    async fn present_one(store: &dyn DocumentStore, schema: &Schema, doc: Document) -> Result<Document, AppError> {
        let mut docs = Self::present(store, schema, vec![doc], None).await?;
        docs.pop().ok_or(AppError::Db(sqlx::Error::RowNotFound))
    }

    /// Output shaping: populate references, add virtuals, drop hidden fields.
    async fn present(
        store: &dyn DocumentStore,
        schema: &Schema,
        mut docs: Vec<Document>,
        selected: Option<&[String]>,
    ) -> Result<Vec<Document>, AppError> {
        for pop in &schema.populate {
            let mut ids: Vec<Value> = Vec::new();
            for d in &docs {
                if let Some(v @ Value::String(_)) = d.get(pop.field) {
                    if !ids.contains(v) {
                        ids.push(v.clone());
                    }
                }
            }
            if ids.is_empty() {
                continue;
            }
            let select: Vec<String> = pop.select.iter().map(|s| s.to_string()).collect();
            let found = store
                .find_where_in(&pop.target, ID_FIELD, &ids, &pop.target.base_filters, Some(&select))
                .await?;
            let by_id: HashMap<String, Document> = found
                .into_iter()
                .filter_map(|d| d.get(ID_FIELD).and_then(Value::as_str).map(|id| (id.to_string(), d.clone())))
                .collect();
            for d in docs.iter_mut() {
                let Some(Value::String(id)) = d.get(pop.field) else {
                    continue;
                };
                let replacement = by_id.get(id).cloned().map(Value::Object).unwrap_or(Value::Null);
                d.insert(pop.field.to_string(), replacement);
            }
        }
        for d in docs.iter_mut() {
            schema.add_virtuals(d);
            schema.strip_hidden(d, selected);
        }
        Ok(docs)
    }
}

fn cast_error(errors: Vec<String>) -> AppError {
    AppError::Validation(errors.join(". "))
}
