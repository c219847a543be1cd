//! Query features: filter, sort, field selection, and pagination parsed from the query string.
//!
//! `?difficulty=easy&price[lt]=1500&sort=-price,ratingsAverage&fields=name,price&page=2&limit=10`

use crate::error::AppError;
use crate::model::{Schema, ID_FIELD};
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;

pub const DEFAULT_LIMIT: u32 = 100;
pub const MAX_LIMIT: u32 = 1000;
/// Largest offset PostgreSQL accepts (`bigint`).
pub const MAX_SKIP: u64 = i64::MAX as u64;

/// Keys that configure the query rather than filter it.
const RESERVED: &[&str] = &["page", "sort", "limit", "fields"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Op {
    fn parse(s: &str) -> Option<Op> {
        Some(match s {
            "gte" => Op::Gte,
            "gt" => Op::Gt,
            "lte" => Op::Lte,
            "lt" => Op::Lt,
            "ne" => Op::Ne,
            "eq" => Op::Eq,
            _ => return None,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: Op,
    pub value: Value,
}

impl Filter {
    pub fn new(field: impl Into<String>, op: Op, value: Value) -> Self {
        Filter {
            field: field.into(),
            op,
            value,
        }
    }

    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, Op::Eq, value)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

/// Everything a store needs to run a list query.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryPlan {
    pub filters: Vec<Filter>,
    pub sort: Vec<SortKey>,
    /// Projection; `None` means every non-hidden field.
    pub fields: Option<Vec<String>>,
    pub limit: u32,
    pub skip: u64,
}

impl Default for QueryPlan {
    fn default() -> Self {
        QueryPlan {
            filters: Vec::new(),
            sort: Vec::new(),
            fields: None,
            limit: DEFAULT_LIMIT,
            skip: 0,
        }
    }
}

impl QueryPlan {
    /// Prepend filters that always apply (query middleware, nested route parent).
    pub fn with_filters(mut self, extra: &[Filter]) -> Self {
        let mut filters = extra.to_vec();
        filters.append(&mut self.filters);
        self.filters = filters;
        self
    }
}

fn operator_key() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\[(gte|gt|lte|lt|ne|eq)\]$").expect("static regex"))
}

/// Builds a [`QueryPlan`] step by step, the same chain for every schema:
/// `ApiFeatures::new(schema, &params).filter()?.sort().limit_fields().paginate().into_plan()`.
pub struct ApiFeatures<'a> {
    schema: &'a Schema,
    params: &'a HashMap<String, String>,
    plan: QueryPlan,
}

impl<'a> ApiFeatures<'a> {
    pub fn new(schema: &'a Schema, params: &'a HashMap<String, String>) -> Self {
        ApiFeatures {
            schema,
            params,
            plan: QueryPlan::default(),
        }
    }

    /// Every non-reserved key is a filter. `field[op]=value` compares, plain `field=value` matches.
    /// Keys naming no field of the schema are ignored; values are cast to the field's kind.
    pub fn filter(mut self) -> Result<Self, AppError> {
        let mut keys: Vec<&String> = self.params.keys().collect();
        keys.sort();
        for key in keys {
            if RESERVED.contains(&key.as_str()) {
                continue;
            }
            let (field, op) = match operator_key().captures(key) {
                Some(caps) => (caps[1].to_string(), Op::parse(&caps[2]).unwrap_or(Op::Eq)),
                None => (key.clone(), Op::Eq),
            };
            let Some(kind) = self.schema.kind_of(&field) else {
                continue;
            };
            // Arrays support membership only.
            if kind.is_array() && !matches!(op, Op::Eq | Op::Ne) {
                continue;
            }
            let raw = Value::String(self.params[key].clone());
            let value = kind
                .cast(&field, raw)
                .map_err(AppError::BadRequest)?;
            self.plan.filters.push(Filter::new(field, op, value));
        }
        Ok(self)
    }

    /// `sort=price,-ratingsAverage`. Defaults to newest first when the schema has `createdAt`.
    pub fn sort(mut self) -> Self {
        let keys: Vec<SortKey> = match self.params.get("sort") {
            Some(s) => s
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .filter_map(|s| {
                    let (name, descending) = match s.strip_prefix('-') {
                        Some(rest) => (rest, true),
                        None => (s, false),
                    };
                    self.schema.has_field(name).then(|| SortKey {
                        field: name.to_string(),
                        descending,
                    })
                })
                .collect(),
            None => Vec::new(),
        };
        self.plan.sort = if keys.is_empty() && self.schema.has_field("createdAt") {
            vec![SortKey {
                field: "createdAt".into(),
                descending: true,
            }]
        } else {
            keys
        };
        self
    }

    /// `fields=name,duration`. The id is always returned.
    pub fn limit_fields(mut self) -> Self {
        if let Some(s) = self.params.get("fields") {
            let fields: Vec<String> = s
                .split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty() && *f != ID_FIELD && self.schema.has_field(f))
                .map(str::to_string)
                .collect();
            if !fields.is_empty() {
                self.plan.fields = Some(fields);
            }
        }
        self
    }

    /// `page` (from 1) and `limit` (default 100, at most 1000).
    pub fn paginate(mut self) -> Self {
        let page = self
            .params
            .get("page")
            .and_then(|p| p.parse::<u64>().ok())
            .filter(|p| *p > 0)
            .unwrap_or(1);
        let limit = self
            .params
            .get("limit")
            .and_then(|l| l.parse::<u32>().ok())
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_LIMIT)
            .min(MAX_LIMIT);
        self.plan.limit = limit;
        self.plan.skip = (page - 1).saturating_mul(limit as u64).min(MAX_SKIP);
        self
    }

    pub fn into_plan(self) -> QueryPlan {
        self.plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tour;
    use serde_json::json;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn plan(pairs: &[(&str, &str)]) -> QueryPlan {
        let schema = tour::schema();
        let p = params(pairs);
        ApiFeatures::new(&schema, &p).filter().unwrap().sort().limit_fields().paginate().into_plan()
    }

    #[test]
    fn operators_and_casting() {
        let p = plan(&[("price[gte]", "500"), ("difficulty", "easy"), ("page", "2")]);
        assert_eq!(
            p.filters,
            vec![
                Filter::eq("difficulty", json!("easy")),
                Filter::new("price", Op::Gte, json!(500)),
            ]
        );
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let p = plan(&[("bogus", "1"), ("price[between]", "3")]);
        assert!(p.filters.is_empty());
    }

    #[test]
    fn uncastable_filter_is_bad_request() {
        let schema = tour::schema();
        let p = params(&[("duration[lt]", "soon")]);
        assert!(matches!(ApiFeatures::new(&schema, &p).filter(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn sort_parses_direction_and_defaults_to_newest() {
        let p = plan(&[("sort", "price,-ratingsAverage,nope")]);
        assert_eq!(
            p.sort,
            vec![
                SortKey { field: "price".into(), descending: false },
                SortKey { field: "ratingsAverage".into(), descending: true },
            ]
        );
        let p = plan(&[]);
        assert_eq!(p.sort, vec![SortKey { field: "createdAt".into(), descending: true }]);
    }

    #[test]
    fn fields_projection() {
        let p = plan(&[("fields", "name, duration,id,unknown")]);
        assert_eq!(p.fields, Some(vec!["name".to_string(), "duration".to_string()]));
        assert_eq!(plan(&[]).fields, None);
    }

    #[test]
    fn pagination_defaults_and_caps() {
        let p = plan(&[("page", "3"), ("limit", "10")]);
        assert_eq!((p.limit, p.skip), (10, 20));
        let p = plan(&[("limit", "50000"), ("page", "0")]);
        assert_eq!((p.limit, p.skip), (MAX_LIMIT, 0));
        let p = plan(&[]);
        assert_eq!((p.limit, p.skip), (DEFAULT_LIMIT, 0));
    }

    #[test]
    fn huge_page_clamps_offset() {
        let p = plan(&[("page", "18446744073709551615"), ("limit", "1000")]);
        assert_eq!(p.skip, MAX_SKIP);
    }

    #[test]
    fn array_fields_filter_by_membership_only() {
        let p = plan(&[("images", "a.jpg"), ("images[gte]", "b.jpg")]);
        assert_eq!(p.filters, vec![Filter::eq("images", json!(["a.jpg"]))]);
    }

    #[test]
    fn with_filters_prepends() {
        let p = QueryPlan {
            filters: vec![Filter::eq("a", json!(1))],
            ..QueryPlan::default()
        }
        .with_filters(&[Filter::eq("b", json!(2))]);
        assert_eq!(p.filters[0].field, "b");
        assert_eq!(p.filters[1].field, "a");
    }
}
