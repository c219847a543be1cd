//! Resource routers. Each binds its schema as an extension so the factory handlers know
//! which model they serve.

use crate::handlers::{
    create_booking_checkout, create_one, delete_one, get_all, get_checkout_session, get_one,
    get_tour_bookings, update_one,
};
use crate::routes::common_routes;
use crate::state::AppState;
use axum::{routing::get, Extension, Router};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

/// /api/v1/tours: CRUD plus the bookings of one tour.
pub fn tour_routes(state: AppState) -> Router {
    let schema = state.models.tours.clone();
    Router::new()
        .route("/", get(get_all).post(create_one))
        .route("/:id", get(get_one).patch(update_one).delete(delete_one))
        .route("/:id/bookings", get(get_tour_bookings))
        .layer(Extension(schema))
        .with_state(state)
}

/// /api/v1/bookings: CRUD plus checkout sessions.
pub fn booking_routes(state: AppState) -> Router {
    let schema = state.models.bookings.clone();
    Router::new()
        .route("/checkout-session/:id", get(get_checkout_session))
        .route("/", get(get_all).post(create_one))
        .route("/:id", get(get_one).patch(update_one).delete(delete_one))
        .layer(Extension(schema))
        .with_state(state)
}

/// The whole service: site root, common routes and the versioned API.
pub fn app(state: AppState, body_limit: usize) -> Router {
    Router::new()
        .route("/", get(create_booking_checkout))
        .with_state(state.clone())
        .merge(common_routes(state.clone()))
        .nest("/api/v1/tours", tour_routes(state.clone()))
        .nest("/api/v1/bookings", booking_routes(state))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
}
