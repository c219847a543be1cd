//! Booking controller: checkout sessions, the booking-from-query redirect and per-tour listing.

use super::factory::{list_documents, parse_id};
use crate::error::AppError;
use crate::extractors::{CurrentUser, RequestOrigin};
use crate::model::Document;
use crate::payment::{CheckoutSessionRequest, LineItem};
use crate::query::Filter;
use crate::service::CrudService;
use crate::state::AppState;
use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

fn text<'a>(doc: &'a Document, key: &str) -> Option<&'a str> {
    doc.get(key).and_then(Value::as_str)
}

/// Build the provider request for one tour bought by `user`.
pub(crate) fn checkout_request(
    tour_id: &str,
    tour: &Document,
    user: &CurrentUser,
    origin: &RequestOrigin,
) -> Result<CheckoutSessionRequest, AppError> {
    let price = tour.get("price").and_then(Value::as_f64).ok_or_else(|| {
        AppError::BadRequest("Tour has no price".into())
    })?;
    // Keep integral prices free of a trailing ".0" in the success URL.
    let price_text = tour.get("price").map(Value::to_string).unwrap_or_default();
    let name = text(tour, "name").unwrap_or_default();
    let images = text(tour, "imageCover")
        .map(|cover| vec![origin.url(&format!("/img/tours/{}", cover))])
        .unwrap_or_default();

    Ok(CheckoutSessionRequest {
        payment_method_types: vec!["card".into()],
        mode: "payment".into(),
        success_url: origin.url(&format!(
            "/?tour={}&user={}&price={}",
            tour_id, user.id, price_text
        )),
        cancel_url: origin.url(&format!("/tour/{}", text(tour, "slug").unwrap_or_default())),
        customer_email: user.email.clone(),
        client_reference_id: tour_id.to_string(),
        line_items: vec![LineItem {
            name: format!("{} Tour", name),
            description: text(tour, "summary").map(str::to_string),
            images,
            amount: (price * 100.0).round() as i64,
            currency: "usd".into(),
            quantity: 1,
        }],
    })
}

pub async fn get_checkout_session(
    State(state): State<AppState>,
    Path(tour_id): Path<String>,
    user: CurrentUser,
    origin: RequestOrigin,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&tour_id)?;
    let tour = CrudService::read(state.store.as_ref(), &state.models.tours, id)
        .await?
        .ok_or_else(AppError::no_document)?;
    let req = checkout_request(&tour_id, &tour, &user, &origin)?;
    let session = state.payments.create_checkout_session(&req).await?;
    tracing::info!(tour = %tour_id, user = %user.id, "checkout session created");
    Ok((StatusCode::OK, Json(json!({ "status": "success", "session": session }))))
}

#[derive(Debug, Default, Deserialize)]
pub struct BookingCheckoutQuery {
    pub tour: Option<String>,
    pub user: Option<String>,
    pub price: Option<String>,
}

fn present(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}

/// Landing page handler. With `tour`, `user` and `price` in the query it records a
/// booking and redirects to the bare path. Anyone who knows the
/// success URL can create a booking this way; it stands in until payment webhooks exist.
pub async fn create_booking_checkout(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(q): Query<BookingCheckoutQuery>,
) -> Result<Response, AppError> {
    let (Some(tour), Some(user), Some(price)) = (present(q.tour), present(q.user), present(q.price))
    else {
        return overview(&state).await;
    };
    let mut body = Document::new();
    body.insert("tour".into(), Value::String(tour));
    body.insert("user".into(), Value::String(user));
    body.insert("price".into(), Value::String(price));
    let booking = CrudService::create(state.store.as_ref(), &state.models.bookings, body).await?;
    tracing::info!(booking = ?booking.get("id"), "booking created from checkout redirect");
    Ok(Redirect::to(uri.path()).into_response())
}

/// Tours listing served at the site root.
async fn overview(state: &AppState) -> Result<Response, AppError> {
    let resp = list_documents(state, &state.models.tours, &HashMap::new(), &[]).await?;
    Ok(resp.into_response())
}

pub async fn get_tour_bookings(
    State(state): State<AppState>,
    Path(tour_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&tour_id)?;
    let parent = [Filter::eq("tour", Value::String(id.to_string()))];
    list_documents(&state, &state.models.bookings, &params, &parent).await
}
