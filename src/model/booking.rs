//! Booking schema. Every read populates the referenced tour's name.

use crate::model::field::{format_datetime, FieldDef};
use crate::model::schema::{Direction, IndexDef, Populate, Schema};
use serde_json::{json, Value};
use std::sync::Arc;

pub fn schema(tours: Arc<Schema>) -> Schema {
    let mut s = Schema::new("Booking", "bookings");
    s.fields = vec![
        FieldDef::id("tour").required("Booking must belong to a Tour!"),
        FieldDef::id("user").required("Booking must belong to a User!"),
        FieldDef::number("price").required("Booking must have a price."),
        FieldDef::datetime("createdAt").default_value(|| Value::String(format_datetime(chrono::Utc::now()))),
        FieldDef::boolean("paid").default_value(|| json!(true)),
    ];
    s.populate = vec![Populate {
        field: "tour",
        target: tours,
        select: &["name"],
    }];
    s.indexes = vec![IndexDef {
        name: "bookings_tour_idx",
        fields: &[("tour", Direction::Asc)],
    }];
    s
}
