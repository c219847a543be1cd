//! Tour schema.

use crate::model::field::{format_datetime, number_value, FieldDef, FieldKind};
use crate::model::schema::{slugify, CrossCheck, Direction, Document, IndexDef, Schema, Virtual};
use crate::query::{Filter, Op};
use serde_json::{json, Value};

pub const DIFFICULTIES: &[&str] = &["easy", "medium", "difficult"];

pub fn schema() -> Schema {
    let mut s = Schema::new("Tour", "tours");
    s.fields = vec![
        FieldDef::string("name")
            .required("A tour must have a name")
            .unique()
            .trim()
            .max_length(40, "A tour name must have less or equal then 40 characters")
            .min_length(10, "A tour name must have more or equal then 10 characters"),
        FieldDef::string("slug"),
        FieldDef::number("duration").required("A tour must have a duration"),
        FieldDef::number("maxGroupSize").required("A tour must have a group size"),
        FieldDef::string("difficulty")
            .required("A tour must have a difficulty")
            .one_of(DIFFICULTIES, "Difficulty is either: easy, medium, difficult"),
        FieldDef::number("ratingsAverage")
            .default_value(|| json!(4.5))
            .min(1.0, "Rating must be above 1.0")
            .max(5.0, "Rating must be below 5.0")
            .set(round_rating),
        FieldDef::number("ratingsQuantity").default_value(|| json!(0)),
        FieldDef::number("price").required("A tour must have a price"),
        FieldDef::number("priceDiscount"),
        FieldDef::string("summary").trim().required("A tour must have a description"),
        FieldDef::string("description").trim(),
        FieldDef::string("imageCover").required("A tour must have a cover image"),
        FieldDef::new("images", FieldKind::StringArray),
        FieldDef::datetime("createdAt")
            .default_value(|| Value::String(format_datetime(chrono::Utc::now())))
            .hidden(),
        FieldDef::new("startDates", FieldKind::DateTimeArray),
        FieldDef::boolean("secretTour").default_value(|| json!(false)),
        FieldDef::new("startLocation", FieldKind::Point),
        FieldDef::new("locations", FieldKind::PointArray),
        FieldDef::new("guides", FieldKind::IdArray),
    ];
    s.checks = vec![CrossCheck {
        field: "priceDiscount",
        check: discount_below_price,
        message: "Discount price ({VALUE}) should be below regular price",
    }];
    s.virtuals = vec![Virtual {
        name: "durationWeeks",
        compute: duration_weeks,
    }];
    s.pre_save = vec![set_slug];
    s.base_filters = vec![Filter::new("secretTour", Op::Ne, Value::Bool(true))];
    s.indexes = vec![
        IndexDef {
            name: "tours_price_ratings_average_idx",
            fields: &[("price", Direction::Asc), ("ratingsAverage", Direction::Desc)],
        },
        IndexDef {
            name: "tours_slug_idx",
            fields: &[("slug", Direction::Asc)],
        },
    ];
    s
}

fn round_rating(v: Value) -> Value {
    match v.as_f64() {
        Some(n) => number_value((n * 10.0).round() / 10.0),
        None => v,
    }
}

fn discount_below_price(doc: &Document) -> bool {
    match (
        doc.get("priceDiscount").and_then(Value::as_f64),
        doc.get("price").and_then(Value::as_f64),
    ) {
        (Some(discount), Some(price)) => discount < price,
        _ => true,
    }
}

fn duration_weeks(doc: &Document) -> Option<Value> {
    let days = doc.get("duration")?.as_f64()?;
    serde_json::Number::from_f64(days / 7.0).map(Value::Number)
}

fn set_slug(doc: &mut Document) {
    if let Some(name) = doc.get("name").and_then(Value::as_str) {
        let slug = slugify(name);
        doc.insert("slug".into(), Value::String(slug));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(v: Value) -> Document {
        v.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn rating_rounds_to_one_decimal() {
        assert_eq!(round_rating(json!(4.666)), json!(4.7));
        assert_eq!(round_rating(json!(4.0)), json!(4));
    }

    #[test]
    fn discount_must_be_below_price() {
        assert!(discount_below_price(&doc(json!({ "price": 497, "priceDiscount": 100 }))));
        assert!(!discount_below_price(&doc(json!({ "price": 497, "priceDiscount": 497 }))));
        assert!(discount_below_price(&doc(json!({ "price": 497 }))));
    }

    #[test]
    fn duration_weeks_is_days_over_seven() {
        let weeks = duration_weeks(&doc(json!({ "duration": 14 }))).unwrap();
        assert_eq!(weeks.as_f64(), Some(2.0));
        assert!(duration_weeks(&doc(json!({}))).is_none());
    }

    #[test]
    fn pre_save_sets_slug() {
        let mut d = doc(json!({ "name": "The Sea Explorer" }));
        set_slug(&mut d);
        assert_eq!(d["slug"], json!("the-sea-explorer"));
    }

    #[test]
    fn secret_tours_are_filtered_by_default() {
        let s = schema();
        assert_eq!(s.base_filters.len(), 1);
        assert_eq!(s.base_filters[0].field, "secretTour");
        assert!(s.field("createdAt").map(|f| f.hidden).unwrap_or(false));
    }
}
