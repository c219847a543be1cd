//! Document schema: fields plus the document lifecycle (cast, setters, defaults, hooks, virtuals).

use crate::model::field::{FieldDef, FieldKind};
use crate::query::Filter;
use serde_json::{Map, Value};
use std::sync::Arc;

/// A stored document: JSON object keyed by API (camelCase) field names, plus `id`.
pub type Document = Map<String, Value>;

/// Document middleware run before a new document is saved.
pub type Hook = fn(&mut Document);

pub const ID_FIELD: &str = "id";

/// Field computed on output, never stored.
#[derive(Clone, Debug)]
pub struct Virtual {
    pub name: &'static str,
    pub compute: fn(&Document) -> Option<Value>,
}

/// Replace a reference id with a subset of the referenced document on every read.
#[derive(Clone, Debug)]
pub struct Populate {
    pub field: &'static str,
    pub target: Arc<Schema>,
    pub select: &'static [&'static str],
}

/// Validation that needs more than one field of the document.
#[derive(Clone, Debug)]
pub struct CrossCheck {
    pub field: &'static str,
    pub check: fn(&Document) -> bool,
    pub message: &'static str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Clone, Debug)]
pub struct IndexDef {
    pub name: &'static str,
    pub fields: &'static [(&'static str, Direction)],
}

#[derive(Clone, Debug)]
pub struct Schema {
    /// Model name used in messages (e.g. "Tour").
    pub name: &'static str,
    /// Collection / table name.
    pub collection: &'static str,
    pub fields: Vec<FieldDef>,
    pub virtuals: Vec<Virtual>,
    pub pre_save: Vec<Hook>,
    /// Query middleware: filters added to every find (list, by id, update, delete).
    pub base_filters: Vec<Filter>,
    pub populate: Vec<Populate>,
    pub checks: Vec<CrossCheck>,
    pub indexes: Vec<IndexDef>,
}

impl Schema {
    pub fn new(name: &'static str, collection: &'static str) -> Self {
        Schema {
            name,
            collection,
            fields: Vec::new(),
            virtuals: Vec::new(),
            pre_save: Vec::new(),
            base_filters: Vec::new(),
            populate: Vec::new(),
            checks: Vec::new(),
            indexes: Vec::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        name == ID_FIELD || self.field(name).is_some()
    }

    pub fn kind_of(&self, name: &str) -> Option<FieldKind> {
        if name == ID_FIELD {
            return Some(FieldKind::Id);
        }
        self.field(name).map(|f| f.kind)
    }

    /// Keep only known fields and cast each to its kind. `id` is never taken from input.
    /// Collects every cast failure into one message.
    pub fn cast(&self, input: Document) -> Result<Document, Vec<String>> {
        let mut out = Document::new();
        let mut errors = Vec::new();
        for (k, v) in input {
            let Some(field) = self.field(&k) else {
                continue;
            };
            match field.kind.cast(field.name, v) {
                Ok(v) => {
                    out.insert(k, v);
                }
                Err(e) => errors.push(e),
            }
        }
        if errors.is_empty() {
            Ok(out)
        } else {
            Err(errors)
        }
    }

    /// Trim strings and run per-field setters on the fields present.
    pub fn apply_setters(&self, doc: &mut Document) {
        for field in &self.fields {
            let Some(v) = doc.get_mut(field.name) else {
                continue;
            };
            if field.trim {
                if let Value::String(s) = v {
                    let trimmed = s.trim();
                    if trimmed.len() != s.len() {
                        *s = trimmed.to_string();
                    }
                }
            }
            if let Some(setter) = field.setter {
                if !v.is_null() {
                    *v = setter(v.take());
                }
            }
        }
    }

    /// Fill missing fields that declare a default. Point objects get their `type` default.
    pub fn apply_defaults(&self, doc: &mut Document) {
        for field in &self.fields {
            if let Some(default) = field.default {
                if !doc.contains_key(field.name) {
                    doc.insert(field.name.to_string(), default());
                }
            }
            match (field.kind, doc.get_mut(field.name)) {
                (FieldKind::Point, Some(Value::Object(point))) => default_point_type(point),
                (FieldKind::PointArray, Some(Value::Array(points))) => {
                    for p in points.iter_mut() {
                        if let Value::Object(point) = p {
                            default_point_type(point);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    pub fn before_save(&self, doc: &mut Document) {
        for hook in &self.pre_save {
            hook(doc);
        }
    }

    pub fn add_virtuals(&self, doc: &mut Document) {
        for v in &self.virtuals {
            if let Some(value) = (v.compute)(doc) {
                doc.insert(v.name.to_string(), value);
            }
        }
    }

    /// Remove hidden fields unless they were explicitly selected.
    pub fn strip_hidden(&self, doc: &mut Document, selected: Option<&[String]>) {
        for field in self.fields.iter().filter(|f| f.hidden) {
            let wanted = selected.map(|s| s.iter().any(|n| n == field.name)).unwrap_or(false);
            if !wanted {
                doc.remove(field.name);
            }
        }
    }
}

fn default_point_type(point: &mut Map<String, Value>) {
    if !point.contains_key("type") {
        point.insert("type".into(), Value::String("Point".into()));
    }
}

/// Lowercase URL slug: ASCII alphanumerics kept, every other run of characters becomes one `-`.
pub fn slugify(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending_dash = false;
    for c in s.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::field::FieldDef;
    use serde_json::json;

    fn sample() -> Schema {
        let mut s = Schema::new("Sample", "samples");
        s.fields = vec![
            FieldDef::string("title").trim(),
            FieldDef::number("score").default_value(|| json!(0)).set(|v| json!(v.as_f64().unwrap_or(0.0).round())),
            FieldDef::string("secret").hidden(),
            FieldDef::new("where", FieldKind::Point),
        ];
        s.virtuals = vec![Virtual {
            name: "double",
            compute: |d| d.get("score").and_then(Value::as_f64).map(|n| json!(n * 2.0)),
        }];
        s
    }

    fn doc(v: Value) -> Document {
        match v {
            Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    #[test]
    fn cast_drops_unknown_fields_and_id() {
        let out = sample().cast(doc(json!({ "id": "x", "title": "a", "bogus": 1 }))).unwrap();
        assert_eq!(Value::Object(out), json!({ "title": "a" }));
    }

    #[test]
    fn cast_collects_errors() {
        let errs = sample().cast(doc(json!({ "score": "lots", "where": 3 }))).unwrap_err();
        assert_eq!(errs.len(), 2);
    }

    #[test]
    fn setters_defaults_and_virtuals() {
        let s = sample();
        let mut d = doc(json!({ "title": "  hello  ", "where": { "coordinates": [1, 2] } }));
        s.apply_setters(&mut d);
        s.apply_defaults(&mut d);
        s.add_virtuals(&mut d);
        assert_eq!(d["title"], json!("hello"));
        assert_eq!(d["score"], json!(0));
        assert_eq!(d["where"]["type"], json!("Point"));
        assert_eq!(d["double"].as_f64(), Some(0.0));
    }

    #[test]
    fn hidden_fields_need_explicit_selection() {
        let s = sample();
        let mut d = doc(json!({ "secret": "s", "title": "t" }));
        s.strip_hidden(&mut d, None);
        assert!(!d.contains_key("secret"));
        let mut d = doc(json!({ "secret": "s" }));
        s.strip_hidden(&mut d, Some(&["secret".to_string()]));
        assert!(d.contains_key("secret"));
    }

    #[test]
    fn slugify_lowercases_and_dashes() {
        assert_eq!(slugify("The Forest Hiker"), "the-forest-hiker");
        assert_eq!(slugify("  Sea & Sun: Explorer!! "), "sea-sun-explorer");
        assert_eq!(slugify("Snow-Adventurer"), "snow-adventurer");
    }
}
