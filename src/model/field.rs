//! Field definitions: storage kind, casting, validation rules, defaults, and setters.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde_json::Value;

/// Storage kind of a field. Drives casting of incoming values and the column type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Number,
    Bool,
    DateTime,
    Id,
    StringArray,
    DateTimeArray,
    IdArray,
    /// GeoJSON point object: `{ type, coordinates, address, description, day? }`.
    Point,
    PointArray,
}

impl FieldKind {
    /// Array kinds: equality filters on them test membership.
    pub fn is_array(&self) -> bool {
        matches!(
            self,
            FieldKind::StringArray | FieldKind::DateTimeArray | FieldKind::IdArray | FieldKind::PointArray
        )
    }

    /// PostgreSQL column type used for this kind.
    pub fn pg_type(&self) -> &'static str {
        match self {
            FieldKind::String => "text",
            FieldKind::Number => "double precision",
            FieldKind::Bool => "boolean",
            FieldKind::DateTime => "timestamptz",
            FieldKind::Id => "uuid",
            FieldKind::StringArray
            | FieldKind::DateTimeArray
            | FieldKind::IdArray
            | FieldKind::Point
            | FieldKind::PointArray => "jsonb",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            FieldKind::String => "String",
            FieldKind::Number => "Number",
            FieldKind::Bool => "Boolean",
            FieldKind::DateTime => "Date",
            FieldKind::Id => "UUID",
            FieldKind::StringArray => "[String]",
            FieldKind::DateTimeArray => "[Date]",
            FieldKind::IdArray => "[UUID]",
            FieldKind::Point => "Point",
            FieldKind::PointArray => "[Point]",
        }
    }

    /// Cast a raw JSON value into this kind. Null always passes through.
    /// Returns a human readable cast error naming the path on failure.
    pub fn cast(&self, path: &str, v: Value) -> Result<Value, String> {
        if v.is_null() {
            return Ok(v);
        }
        let failed = |v: &Value| format!("Cast to {} failed for value {} at path \"{}\"", self.label(), v, path);
        match self {
            FieldKind::String => match v {
                Value::String(_) => Ok(v),
                Value::Number(n) => Ok(Value::String(n.to_string())),
                Value::Bool(b) => Ok(Value::String(b.to_string())),
                other => Err(failed(&other)),
            },
            FieldKind::Number => match &v {
                Value::Number(n) => n.as_f64().map(number_value).ok_or_else(|| failed(&v)),
                Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()).map(number_value).ok_or_else(|| failed(&v)),
                _ => Err(failed(&v)),
            },
            FieldKind::Bool => match &v {
                Value::Bool(_) => Ok(v),
                Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
                Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
                _ => Err(failed(&v)),
            },
            FieldKind::DateTime => parse_datetime(&v).map(Value::String).ok_or_else(|| failed(&v)),
            FieldKind::Id => match &v {
                Value::String(s) => uuid::Uuid::parse_str(s.trim())
                    .map(|u| Value::String(u.to_string()))
                    .map_err(|_| failed(&v)),
                _ => Err(failed(&v)),
            },
            FieldKind::StringArray => cast_array(path, v, FieldKind::String),
            FieldKind::DateTimeArray => cast_array(path, v, FieldKind::DateTime),
            FieldKind::IdArray => cast_array(path, v, FieldKind::Id),
            FieldKind::Point => cast_point(path, v),
            FieldKind::PointArray => match v {
                Value::Array(items) => items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| cast_point(&format!("{}.{}", path, i), item))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array),
                other => Err(failed(&other)),
            },
        }
    }
}

fn cast_array(path: &str, v: Value, inner: FieldKind) -> Result<Value, String> {
    match v {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| inner.cast(&format!("{}.{}", path, i), item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        // A single scalar becomes a one-element array.
        scalar => inner.cast(&format!("{}.0", path), scalar).map(|v| Value::Array(vec![v])),
    }
}

fn cast_point(path: &str, v: Value) -> Result<Value, String> {
    let Value::Object(mut obj) = v else {
        return Err(format!("Cast to Point failed at path \"{}\"", path));
    };
    if let Some(coords) = obj.remove("coordinates") {
        let coords = match coords {
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, c)| FieldKind::Number.cast(&format!("{}.coordinates.{}", path, i), c))
                .collect::<Result<Vec<_>, _>>()?,
            other => return Err(format!("Cast to [Number] failed for value {} at path \"{}.coordinates\"", other, path)),
        };
        obj.insert("coordinates".into(), Value::Array(coords));
    }
    if let Some(day) = obj.remove("day") {
        obj.insert("day".into(), FieldKind::Number.cast(&format!("{}.day", path), day)?);
    }
    for key in ["type", "address", "description"] {
        if let Some(s) = obj.remove(key) {
            obj.insert(key.into(), FieldKind::String.cast(&format!("{}.{}", path, key), s)?);
        }
    }
    Ok(Value::Object(obj))
}

/// Number as JSON: integral values stay integers so `497` round-trips as `497`.
pub fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        Value::Number((n as i64).into())
    } else {
        serde_json::Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

/// Canonical timestamp text: RFC 3339, UTC, millisecond precision.
pub fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_datetime(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(format_datetime(dt.with_timezone(&Utc)));
            }
            if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                return d.and_hms_opt(0, 0, 0).map(|n| format_datetime(n.and_utc()));
            }
            if let Ok(n) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
                return Some(format_datetime(n.and_utc()));
            }
            None
        }
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(format_datetime),
        _ => None,
    }
}

/// A bound with an optional custom failure message. `{VALUE}` in the message is replaced by the offending value.
#[derive(Clone, Debug)]
pub struct Constraint<T> {
    pub limit: T,
    pub message: Option<&'static str>,
}

#[derive(Clone, Debug, Default)]
pub struct ValidationRule {
    /// Some(message) when the field is required.
    pub required: Option<&'static str>,
    pub min_length: Option<Constraint<usize>>,
    pub max_length: Option<Constraint<usize>>,
    pub minimum: Option<Constraint<f64>>,
    pub maximum: Option<Constraint<f64>>,
    pub allowed: Option<Constraint<&'static [&'static str]>>,
}

pub type Setter = fn(Value) -> Value;
pub type DefaultFn = fn() -> Value;

#[derive(Clone, Debug)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
    pub rule: ValidationRule,
    pub default: Option<DefaultFn>,
    pub trim: bool,
    pub setter: Option<Setter>,
    /// Excluded from responses unless explicitly selected.
    pub hidden: bool,
    pub unique: bool,
}

impl FieldDef {
    pub fn new(name: &'static str, kind: FieldKind) -> Self {
        FieldDef {
            name,
            kind,
            rule: ValidationRule::default(),
            default: None,
            trim: false,
            setter: None,
            hidden: false,
            unique: false,
        }
    }

    pub fn string(name: &'static str) -> Self {
        Self::new(name, FieldKind::String)
    }

    pub fn number(name: &'static str) -> Self {
        Self::new(name, FieldKind::Number)
    }

    pub fn boolean(name: &'static str) -> Self {
        Self::new(name, FieldKind::Bool)
    }

    pub fn datetime(name: &'static str) -> Self {
        Self::new(name, FieldKind::DateTime)
    }

    pub fn id(name: &'static str) -> Self {
        Self::new(name, FieldKind::Id)
    }

    pub fn required(mut self, message: &'static str) -> Self {
        self.rule.required = Some(message);
        self
    }

    pub fn min_length(mut self, limit: usize, message: &'static str) -> Self {
        self.rule.min_length = Some(Constraint { limit, message: Some(message) });
        self
    }

    pub fn max_length(mut self, limit: usize, message: &'static str) -> Self {
        self.rule.max_length = Some(Constraint { limit, message: Some(message) });
        self
    }

    pub fn min(mut self, limit: f64, message: &'static str) -> Self {
        self.rule.minimum = Some(Constraint { limit, message: Some(message) });
        self
    }

    pub fn max(mut self, limit: f64, message: &'static str) -> Self {
        self.rule.maximum = Some(Constraint { limit, message: Some(message) });
        self
    }

    pub fn one_of(mut self, values: &'static [&'static str], message: &'static str) -> Self {
        self.rule.allowed = Some(Constraint { limit: values, message: Some(message) });
        self
    }

    pub fn default_value(mut self, f: DefaultFn) -> Self {
        self.default = Some(f);
        self
    }

    pub fn trim(mut self) -> Self {
        self.trim = true;
        self
    }

    pub fn set(mut self, setter: Setter) -> Self {
        self.setter = Some(setter);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Storage column name (snake_case).
    pub fn column(&self) -> String {
        crate::case::to_snake_case(self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn number_cast_accepts_numeric_strings() {
        assert_eq!(FieldKind::Number.cast("price", json!("497")).unwrap(), json!(497));
        assert_eq!(FieldKind::Number.cast("price", json!(4.75)).unwrap(), json!(4.75));
        let err = FieldKind::Number.cast("price", json!("cheap")).unwrap_err();
        assert!(err.contains("at path \"price\""));
    }

    #[test]
    fn datetime_cast_normalizes_to_utc() {
        let v = FieldKind::DateTime.cast("startDates", json!("2021-06-19T09:00:00+02:00")).unwrap();
        assert_eq!(v, json!("2021-06-19T07:00:00.000Z"));
        let v = FieldKind::DateTime.cast("startDates", json!("2021-07-20")).unwrap();
        assert_eq!(v, json!("2021-07-20T00:00:00.000Z"));
    }

    #[test]
    fn id_cast_rejects_non_uuid() {
        assert_eq!(
            FieldKind::Id.cast("tour", json!("5c88fa8cf4afda39709c2955")).unwrap_err(),
            "Cast to UUID failed for value \"5c88fa8cf4afda39709c2955\" at path \"tour\""
        );
        let id = uuid::Uuid::new_v4().to_string();
        assert_eq!(FieldKind::Id.cast("tour", json!(id.clone())).unwrap(), json!(id));
    }

    #[test]
    fn scalar_becomes_single_element_array() {
        assert_eq!(FieldKind::StringArray.cast("images", json!("a.jpg")).unwrap(), json!(["a.jpg"]));
    }

    #[test]
    fn point_coordinates_are_numbers() {
        let v = FieldKind::Point
            .cast("startLocation", json!({ "coordinates": ["-80.18", 25.77], "address": "Miami" }))
            .unwrap();
        assert_eq!(v["coordinates"], json!([-80.18, 25.77]));
        assert!(FieldKind::Point.cast("startLocation", json!([1, 2])).is_err());
    }

    #[test]
    fn column_is_snake_case() {
        assert_eq!(FieldDef::number("ratingsAverage").column(), "ratings_average");
    }
}
