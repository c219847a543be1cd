//! Document schemas: field rules, defaults, virtuals, and query middleware.

pub mod booking;
pub mod field;
pub mod schema;
pub mod tour;

pub use field::{Constraint, FieldDef, FieldKind, ValidationRule};
pub use schema::{slugify, CrossCheck, Direction, Document, IndexDef, Populate, Schema, Virtual, ID_FIELD};

use std::sync::Arc;

/// All schemas served by the API.
#[derive(Clone, Debug)]
pub struct Models {
    pub tours: Arc<Schema>,
    pub bookings: Arc<Schema>,
}

impl Models {
    pub fn new() -> Self {
        let tours = Arc::new(tour::schema());
        let bookings = Arc::new(booking::schema(tours.clone()));
        Models { tours, bookings }
    }

    pub fn all(&self) -> [&Arc<Schema>; 2] {
        [&self.tours, &self.bookings]
    }
}

impl Default for Models {
    fn default() -> Self {
        Self::new()
    }
}
