//! In-process document store. Evaluates the same query plans as the SQL store.

use super::{duplicate_error, merged, DocumentStore, MergeCheck};
use crate::error::AppError;
use crate::model::{Document, Schema, ID_FIELD};
use crate::query::{Filter, Op, QueryPlan};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<&'static str, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents in a collection, regardless of query middleware.
    pub fn len(&self, collection: &str) -> usize {
        let guard = self.collections.read();
        guard.get(collection).map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }
}

fn id_of(doc: &Document) -> Option<&str> {
    doc.get(ID_FIELD).and_then(Value::as_str)
}

/// Ordering between two JSON scalars of the same kind. Missing and null sort first.
fn compare(a: Option<&Value>, b: Option<&Value>) -> Option<Ordering> {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Some(Ordering::Equal),
        (None, Some(_)) => Some(Ordering::Less),
        (Some(_), None) => Some(Ordering::Greater),
        (Some(Value::Number(x)), Some(Value::Number(y))) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Some(Value::String(x)), Some(Value::String(y))) => Some(x.cmp(y)),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => Some(x.cmp(y)),
        (Some(x), Some(y)) => (x == y).then_some(Ordering::Equal),
    }
}

/// Every element of `wanted` appears in the stored array.
fn contains_all(stored: Option<&Value>, wanted: &[Value]) -> bool {
    match stored {
        Some(Value::Array(items)) => wanted.iter().all(|w| items.contains(w)),
        _ => false,
    }
}

fn matches(doc: &Document, filters: &[Filter]) -> bool {
    filters.iter().all(|f| {
        if let Value::Array(wanted) = &f.value {
            return match f.op {
                Op::Eq => contains_all(doc.get(&f.field), wanted),
                Op::Ne => !contains_all(doc.get(&f.field), wanted),
                _ => false,
            };
        }
        let ord = compare(doc.get(&f.field), Some(&f.value));
        match f.op {
            Op::Eq => ord == Some(Ordering::Equal),
            Op::Ne => ord != Some(Ordering::Equal),
            // Range comparisons never match a missing value.
            _ if doc.get(&f.field).map(Value::is_null).unwrap_or(true) => false,
            Op::Gt => ord == Some(Ordering::Greater),
            Op::Gte => matches!(ord, Some(Ordering::Greater | Ordering::Equal)),
            Op::Lt => ord == Some(Ordering::Less),
            Op::Lte => matches!(ord, Some(Ordering::Less | Ordering::Equal)),
        }
    })
}

fn project(doc: &Document, fields: Option<&[String]>) -> Document {
    match fields {
        None => doc.clone(),
        Some(fields) => doc
            .iter()
            .filter(|(k, _)| k.as_str() == ID_FIELD || fields.iter().any(|f| f == *k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    }
}

fn check_unique(schema: &Schema, docs: &[Document], candidate: &Document, own_id: Option<&str>) -> Result<(), AppError> {
    for field in schema.fields.iter().filter(|f| f.unique) {
        let Some(v) = candidate.get(field.name).filter(|v| !v.is_null()) else {
            continue;
        };
        let taken = docs
            .iter()
            .any(|d| id_of(d) != own_id && d.get(field.name) == Some(v));
        if taken {
            return Err(duplicate_error(field.name));
        }
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, schema: &Schema, mut doc: Document) -> Result<Document, AppError> {
        let mut guard = self.collections.write();
        let docs = guard.entry(schema.collection).or_default();
        doc.retain(|_, v| !v.is_null());
        check_unique(schema, docs, &doc, None)?;
        doc.insert(ID_FIELD.to_string(), Value::String(Uuid::new_v4().to_string()));
        docs.push(doc.clone());
        Ok(doc)
    }

    async fn find_by_id(&self, schema: &Schema, id: Uuid, filters: &[Filter]) -> Result<Option<Document>, AppError> {
        let id = id.to_string();
        let guard = self.collections.read();
        Ok(guard
            .get(schema.collection)
            .and_then(|docs| docs.iter().find(|d| id_of(d) == Some(id.as_str()) && matches(d, filters)))
            .cloned())
    }

    async fn find(&self, schema: &Schema, plan: &QueryPlan) -> Result<Vec<Document>, AppError> {
        let guard = self.collections.read();
        let Some(docs) = guard.get(schema.collection) else {
            return Ok(Vec::new());
        };
        let mut hits: Vec<&Document> = docs.iter().filter(|d| matches(d, &plan.filters)).collect();
        hits.sort_by(|a, b| {
            for key in &plan.sort {
                let ord = compare(a.get(&key.field), b.get(&key.field)).unwrap_or(Ordering::Equal);
                let ord = if key.descending { ord.reverse() } else { ord };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            id_of(a).cmp(&id_of(b))
        });
        Ok(hits
            .into_iter()
            .skip(plan.skip as usize)
            .take(plan.limit as usize)
            .map(|d| project(d, plan.fields.as_deref()))
            .collect())
    }

    async fn find_where_in(
        &self,
        schema: &Schema,
        field: &str,
        values: &[Value],
        filters: &[Filter],
        fields: Option<&[String]>,
    ) -> Result<Vec<Document>, AppError> {
        let guard = self.collections.read();
        let Some(docs) = guard.get(schema.collection) else {
            return Ok(Vec::new());
        };
        Ok(docs
            .iter()
            .filter(|d| d.get(field).map(|v| values.contains(v)).unwrap_or(false) && matches(d, filters))
            .map(|d| project(d, fields))
            .collect())
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
        let mut guard = self.collections.write();
        let Some(docs) = guard.get_mut(schema.collection) else {
            return Ok(None);
        };
        let Some(pos) = docs.iter().position(|d| id_of(d) == Some(id.as_str()) && matches(d, filters)) else {
            return Ok(None);
        };
        check(&merged(&docs[pos], patch))?;
        let mut updated = docs[pos].clone();
        for (k, v) in patch {
            if !schema.has_field(k) || k == ID_FIELD {
                continue;
            }
            if v.is_null() {
                updated.remove(k);
            } else {
                updated.insert(k.clone(), v.clone());
            }
        }
        check_unique(schema, docs, &updated, Some(id.as_str()))?;
        docs[pos] = updated.clone();
        Ok(Some(updated))
    }

    async fn delete_by_id(&self, schema: &Schema, id: Uuid, filters: &[Filter]) -> Result<Option<Document>, AppError> {
        let id = id.to_string();
        let mut guard = self.collections.write();
        let Some(docs) = guard.get_mut(schema.collection) else {
            return Ok(None);
        };
        let pos = docs.iter().position(|d| id_of(d) == Some(id.as_str()) && matches(d, filters));
        Ok(pos.map(|p| docs.remove(p)))
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tour;
    use crate::query::SortKey;
    use serde_json::json;

    fn doc(v: Value) -> Document {
        v.as_object().cloned().unwrap_or_default()
    }

    fn accept(_: &Document) -> Result<(), AppError> {
        Ok(())
    }

    async fn seeded() -> (MemoryStore, Schema) {
        let store = MemoryStore::new();
        let s = tour::schema();
        for (name, price, secret) in [("Forest Hiker", 397, false), ("Sea Explorer", 497, false), ("Hidden Gem", 997, true)] {
            store
                .insert(&s, doc(json!({ "name": name, "price": price, "secretTour": secret })))
                .await
                .unwrap();
        }
        (store, s)
    }

    #[tokio::test]
    async fn filters_sort_and_paginate() {
        let (store, s) = seeded().await;
        let plan = QueryPlan {
            filters: vec![Filter::new("price", Op::Gte, json!(400))],
            sort: vec![SortKey { field: "price".into(), descending: true }],
            ..QueryPlan::default()
        }
        .with_filters(&s.base_filters);
        let docs = store.find(&s, &plan).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["name"], json!("Sea Explorer"));

        let plan = QueryPlan {
            sort: vec![SortKey { field: "price".into(), descending: false }],
            limit: 1,
            skip: 1,
            fields: Some(vec!["name".into()]),
            ..QueryPlan::default()
        };
        let docs = store.find(&s, &plan).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["name"], json!("Sea Explorer"));
        assert!(docs[0].contains_key("id"));
        assert!(!docs[0].contains_key("price"));
    }

    #[tokio::test]
    async fn ne_true_keeps_missing_values() {
        let store = MemoryStore::new();
        let s = tour::schema();
        store.insert(&s, doc(json!({ "name": "No Flag At All" }))).await.unwrap();
        let plan = QueryPlan::default().with_filters(&s.base_filters);
        assert_eq!(store.find(&s, &plan).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn array_filters_match_membership() {
        let store = MemoryStore::new();
        let s = tour::schema();
        store
            .insert(&s, doc(json!({ "name": "Forest Hiker", "images": ["a.jpg", "b.jpg"] })))
            .await
            .unwrap();
        store.insert(&s, doc(json!({ "name": "Sea Explorer", "images": ["c.jpg"] }))).await.unwrap();

        let plan = QueryPlan {
            filters: vec![Filter::eq("images", json!(["b.jpg"]))],
            ..QueryPlan::default()
        };
        let docs = store.find(&s, &plan).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["name"], json!("Forest Hiker"));

        let plan = QueryPlan {
            filters: vec![Filter::new("images", Op::Ne, json!(["b.jpg"]))],
            ..QueryPlan::default()
        };
        let docs = store.find(&s, &plan).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["name"], json!("Sea Explorer"));
    }

    #[tokio::test]
    async fn failed_check_leaves_document_unchanged() {
        let (store, s) = seeded().await;
        let all = store.find(&s, &QueryPlan::default()).await.unwrap();
        let hiker = all.iter().find(|d| d["name"] == json!("Forest Hiker")).unwrap();
        let id: Uuid = hiker["id"].as_str().unwrap().parse().unwrap();

        let seen_price = std::sync::Mutex::new(None);
        let reject = |doc: &Document| -> Result<(), AppError> {
            *seen_price.lock().unwrap() = doc.get("price").cloned();
            Err(AppError::Validation("rejected".into()))
        };
        let patch = doc(json!({ "price": 1 }));
        let err = store.update_by_id(&s, id, &[], &patch, &reject).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(*seen_price.lock().unwrap(), Some(json!(1)));

        let stored = store.find_by_id(&s, id, &[]).await.unwrap().unwrap();
        assert_eq!(stored["price"], json!(397));
    }

    #[tokio::test]
    async fn unique_fields_conflict() {
        let (store, s) = seeded().await;
        let err = store.insert(&s, doc(json!({ "name": "Forest Hiker" }))).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn update_and_delete_respect_filters() {
        let (store, s) = seeded().await;
        let all = store.find(&s, &QueryPlan::default()).await.unwrap();
        let secret = all.iter().find(|d| d["secretTour"] == json!(true)).unwrap();
        let id: Uuid = secret["id"].as_str().unwrap().parse().unwrap();

        let patch = doc(json!({ "price": 1 }));
        assert!(store.update_by_id(&s, id, &s.base_filters, &patch, &accept).await.unwrap().is_none());
        assert!(store.delete_by_id(&s, id, &s.base_filters).await.unwrap().is_none());

        let updated = store.update_by_id(&s, id, &[], &patch, &accept).await.unwrap().unwrap();
        assert_eq!(updated["price"], json!(1));
        assert!(store.delete_by_id(&s, id, &[]).await.unwrap().is_some());
        assert_eq!(store.len("tours"), 2);
    }
}
