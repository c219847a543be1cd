//! Routers.

mod api;
mod common;

pub use api::{app, booking_routes, tour_routes};
pub use common::common_routes;
