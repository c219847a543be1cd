//! Document validation from schema rules.

use crate::error::AppError;
use crate::model::{Document, FieldDef, Schema};
use serde_json::Value;

pub struct RequestValidator;

impl RequestValidator {
    /// Validate a whole document: required fields, per-field rules, then cross-field checks.
    /// Every violation is reported, joined into one message.
    pub fn validate(doc: &Document, schema: &Schema) -> Result<(), AppError> {
        let mut errors = Vec::new();
        for field in &schema.fields {
            let val = doc.get(field.name).filter(|v| !v.is_null());
            match val {
                None => {
                    if let Some(msg) = field.rule.required {
                        errors.push(msg.to_string());
                    }
                }
                Some(v) => {
                    if let Err(msg) = validate_field(field, v) {
                        errors.push(msg);
                    }
                }
            }
        }
        for check in &schema.checks {
            let Some(v) = doc.get(check.field).filter(|v| !v.is_null()) else {
                continue;
            };
            if !(check.check)(doc) {
                errors.push(render(check.message, v));
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors.join(". ")))
        }
    }
}

fn render(template: &str, v: &Value) -> String {
    let value = match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    template.replace("{VALUE}", &value)
}

fn validate_field(field: &FieldDef, v: &Value) -> Result<(), String> {
    let rule = &field.rule;
    let col = field.name;
    let fail = |message: Option<&'static str>, fallback: String| -> String {
        message.map(|m| render(m, v)).unwrap_or(fallback)
    };
    if let Some(c) = &rule.max_length {
        if let Some(s) = v.as_str() {
            if s.chars().count() > c.limit {
                return Err(fail(c.message, format!("{} must be at most {} characters", col, c.limit)));
            }
        }
    }
    if let Some(c) = &rule.min_length {
        if let Some(s) = v.as_str() {
            if s.chars().count() < c.limit {
                return Err(fail(c.message, format!("{} must be at least {} characters", col, c.limit)));
            }
        }
    }
    if let Some(c) = &rule.allowed {
        let ok = v.as_str().map(|s| c.limit.iter().any(|a| *a == s)).unwrap_or(false);
        if !ok {
            return Err(fail(c.message, format!("{} must be one of: {:?}", col, c.limit)));
        }
    }
    if let Some(c) = &rule.minimum {
        if let Some(n) = v.as_f64() {
            if n < c.limit {
                return Err(fail(c.message, format!("{} must be at least {}", col, c.limit)));
            }
        }
    }
    if let Some(c) = &rule.maximum {
        if let Some(n) = v.as_f64() {
            if n > c.limit {
                return Err(fail(c.message, format!("{} must be at most {}", col, c.limit)));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tour;
    use serde_json::json;

    fn valid_tour() -> Document {
        json!({
            "name": "The Forest Hiker",
            "duration": 5,
            "maxGroupSize": 25,
            "difficulty": "easy",
            "price": 397,
            "summary": "Breathtaking hike through the Canadian Banff National Park",
            "imageCover": "tour-1-cover.jpg"
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    fn message(doc: &Document) -> String {
        match RequestValidator::validate(doc, &tour::schema()) {
            Err(AppError::Validation(m)) => m,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn valid_document_passes() {
        assert!(RequestValidator::validate(&valid_tour(), &tour::schema()).is_ok());
    }

    #[test]
    fn required_fields_are_all_reported() {
        let m = message(&Document::new());
        assert!(m.contains("A tour must have a name"));
        assert!(m.contains("A tour must have a price"));
        assert!(m.contains("A tour must have a cover image"));
    }

    #[test]
    fn name_length_and_difficulty() {
        let mut d = valid_tour();
        d.insert("name".into(), json!("Short"));
        d.insert("difficulty".into(), json!("extreme"));
        let m = message(&d);
        assert!(m.contains("more or equal then 10 characters"));
        assert!(m.contains("Difficulty is either"));
    }

    #[test]
    fn rating_bounds() {
        let mut d = valid_tour();
        d.insert("ratingsAverage".into(), json!(5.5));
        assert!(message(&d).contains("Rating must be below 5.0"));
    }

    #[test]
    fn discount_message_includes_value() {
        let mut d = valid_tour();
        d.insert("priceDiscount".into(), json!(400));
        assert_eq!(message(&d), "Discount price (400) should be below regular price");
    }
}
