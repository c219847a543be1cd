//! HTTP handlers: the generic CRUD factory and the booking controller.

pub mod booking;
pub mod factory;

pub use booking::{create_booking_checkout, get_checkout_session, get_tour_bookings};
pub use factory::{create_one, delete_one, get_all, get_one, update_one};
