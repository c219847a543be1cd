//! Generic CRUD handlers. Each resource router binds its schema with an `Extension<Arc<Schema>>`,
//! so the same five handlers serve every model.

use crate::error::AppError;
use crate::model::{Document, Schema};
use crate::query::{ApiFeatures, Filter};
use crate::response::{success_many, success_one, success_one_ok, SuccessMany};
use crate::service::CrudService;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

pub(crate) fn parse_id(id_str: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id_str).map_err(|_| AppError::BadRequest(format!("Invalid id: {}", id_str)))
}

pub(crate) fn body_to_map(body: Result<Json<Value>, JsonRejection>) -> Result<Document, AppError> {
    match body {
        Ok(Json(Value::Object(m))) => Ok(m),
        Ok(_) => Err(AppError::BadRequest("body must be a JSON object".into())),
        Err(rejection) => Err(AppError::BadRequest(rejection.body_text())),
    }
}

/// Shared list path: query features, plus fixed filters from a parent route.
pub(crate) async fn list_documents(
    state: &AppState,
    schema: &Schema,
    params: &HashMap<String, String>,
    parent: &[Filter],
) -> Result<(StatusCode, Json<SuccessMany<Document>>), AppError> {
    let plan = ApiFeatures::new(schema, params)
        .filter()?
        .sort()
        .limit_fields()
        .paginate()
        .into_plan()
        .with_filters(parent);
    let docs = CrudService::list(state.store.as_ref(), schema, plan).await?;
    Ok(success_many(docs))
}

pub async fn get_all(
    State(state): State<AppState>,
    Extension(schema): Extension<Arc<Schema>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    list_documents(&state, &schema, &params, &[]).await
}

pub async fn create_one(
    State(state): State<AppState>,
    Extension(schema): Extension<Arc<Schema>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let body = body_to_map(body)?;
    let doc = CrudService::create(state.store.as_ref(), &schema, body).await?;
    Ok(success_one(doc))
}

pub async fn get_one(
    State(state): State<AppState>,
    Extension(schema): Extension<Arc<Schema>>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    let doc = CrudService::read(state.store.as_ref(), &schema, id)
        .await?
        .ok_or_else(AppError::no_document)?;
    Ok(success_one_ok(doc))
}

pub async fn update_one(
    State(state): State<AppState>,
    Extension(schema): Extension<Arc<Schema>>,
    Path(id_str): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    let body = body_to_map(body)?;
    let doc = CrudService::update(state.store.as_ref(), &schema, id, body)
        .await?
        .ok_or_else(AppError::no_document)?;
    Ok(success_one_ok(doc))
}

pub async fn delete_one(
    State(state): State<AppState>,
    Extension(schema): Extension<Arc<Schema>>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    CrudService::delete(state.store.as_ref(), &schema, id)
        .await?
        .ok_or_else(AppError::no_document)?;
    Ok(StatusCode::NO_CONTENT)
}
