//! Standard response envelope helpers.

use axum::{http::StatusCode, Json};
use serde::Serialize;

pub const SUCCESS: &str = "success";

#[derive(Serialize)]
pub struct DocData<T> {
    pub doc: T,
}

#[derive(Serialize)]
pub struct SuccessOne<T> {
    pub status: &'static str,
    pub data: DocData<T>,
}

#[derive(Serialize)]
pub struct SuccessMany<T> {
    pub status: &'static str,
    pub results: usize,
    pub data: DocData<Vec<T>>,
}

/// 201 with the created document.
pub fn success_one<T: Serialize>(doc: T) -> (StatusCode, Json<SuccessOne<T>>) {
    (
        StatusCode::CREATED,
        Json(SuccessOne {
            status: SUCCESS,
            data: DocData { doc },
        }),
    )
}

pub fn success_one_ok<T: Serialize>(doc: T) -> (StatusCode, Json<SuccessOne<T>>) {
    (
        StatusCode::OK,
        Json(SuccessOne {
            status: SUCCESS,
            data: DocData { doc },
        }),
    )
}

pub fn success_many<T: Serialize>(docs: Vec<T>) -> (StatusCode, Json<SuccessMany<T>>) {
    (
        StatusCode::OK,
        Json(SuccessMany {
            status: SUCCESS,
            results: docs.len(),
            data: DocData { doc: docs },
        }),
    )
}
