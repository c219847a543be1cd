//! Builds parameterized INSERT, SELECT, UPDATE, DELETE from a document schema.

use crate::model::{Document, FieldKind, Schema, ID_FIELD};
use crate::query::{Filter, Op, QueryPlan};
use serde_json::Value;

/// Quote identifier for PostgreSQL (safe: only from schema definitions).
pub(crate) fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Full qualified table name.
pub(crate) fn qualified_table(pg_schema: &str, table: &str) -> String {
    format!("{}.{}", quoted(pg_schema), quoted(table))
}

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> u32 {
        let n = self.params.len() as u32 + 1;
        self.params.push(v);
        n
    }

    /// Push a parameter and return its placeholder cast to the column type.
    fn placeholder(&mut self, v: Value, kind: FieldKind) -> String {
        let n = self.push_param(v);
        format!("${}::{}", n, kind.pg_type())
    }
}

/// Column for an API field name; `id` maps to itself.
fn column_of(schema: &Schema, field: &str) -> Option<(String, FieldKind)> {
    if field == ID_FIELD {
        return Some((ID_FIELD.to_string(), FieldKind::Id));
    }
    schema.field(field).map(|f| (f.column(), f.kind))
}

/// SELECT list: id plus the selected fields (all fields when `fields` is None).
fn select_column_list(schema: &Schema, fields: Option<&[String]>) -> String {
    let mut cols = vec![quoted(ID_FIELD)];
    for f in &schema.fields {
        let wanted = fields.map(|s| s.iter().any(|n| n == f.name)).unwrap_or(true);
        if wanted {
            cols.push(quoted(&f.column()));
        }
    }
    cols.join(", ")
}

fn filter_parts(q: &mut QueryBuf, schema: &Schema, filters: &[Filter]) -> Vec<String> {
    let mut parts = Vec::new();
    for f in filters {
        let Some((col, kind)) = column_of(schema, &f.field) else {
            continue;
        };
        let col = quoted(&col);
        if f.value.is_null() {
            match f.op {
                Op::Eq => parts.push(format!("{} IS NULL", col)),
                Op::Ne => parts.push(format!("{} IS NOT NULL", col)),
                _ => parts.push("FALSE".to_string()),
            }
            continue;
        }
        let ph = q.placeholder(f.value.clone(), kind);
        if kind.is_array() {
            // Membership: the column contains every element of the filter array.
            match f.op {
                Op::Eq => parts.push(format!("{} @> {}", col, ph)),
                Op::Ne => parts.push(format!("NOT COALESCE({} @> {}, FALSE)", col, ph)),
                _ => parts.push("FALSE".to_string()),
            }
            continue;
        }
        let op = match f.op {
            Op::Eq => "=",
            Op::Ne => "IS DISTINCT FROM",
            Op::Gt => ">",
            Op::Gte => ">=",
            Op::Lt => "<",
            Op::Lte => "<=",
        };
        parts.push(format!("{} {} {}", col, op, ph));
    }
    parts
}

fn where_clause(parts: &[String]) -> String {
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

/// SELECT by id, also honoring the schema's query middleware filters.
pub fn select_by_id(pg_schema: &str, schema: &Schema, id: &str, filters: &[Filter]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(pg_schema, schema.collection);
    let id_ph = q.placeholder(Value::String(id.to_string()), FieldKind::Id);
    let mut parts = vec![format!("{} = {}", quoted(ID_FIELD), id_ph)];
    parts.extend(filter_parts(&mut q, schema, filters));
    q.sql = format!(
        "SELECT {} FROM {}{}",
        select_column_list(schema, None),
        table,
        where_clause(&parts)
    );
    q
}

/// SELECT by id with a row lock, for read-check-write inside a transaction.
pub fn select_for_update(pg_schema: &str, schema: &Schema, id: &str, filters: &[Filter]) -> QueryBuf {
    let mut q = select_by_id(pg_schema, schema, id, filters);
    q.sql.push_str(" FOR UPDATE");
    q
}

/// SELECT list: filters, ORDER BY the plan's sort keys then id, LIMIT/OFFSET.
pub fn select_list(pg_schema: &str, schema: &Schema, plan: &QueryPlan) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(pg_schema, schema.collection);
    let parts = filter_parts(&mut q, schema, &plan.filters);

    let mut order: Vec<String> = plan
        .sort
        .iter()
        .filter_map(|k| {
            column_of(schema, &k.field).map(|(col, _)| {
                format!("{} {}", quoted(&col), if k.descending { "DESC" } else { "ASC" })
            })
        })
        .collect();
    order.push(format!("{} ASC", quoted(ID_FIELD)));

    q.sql = format!(
        "SELECT {} FROM {}{} ORDER BY {} LIMIT {} OFFSET {}",
        select_column_list(schema, plan.fields.as_deref()),
        table,
        where_clause(&parts),
        order.join(", "),
        plan.limit,
        plan.skip
    );
    q
}

/// SELECT ... WHERE field IN (...). Used to batch-load populated references.
pub fn select_where_in(
    pg_schema: &str,
    schema: &Schema,
    field: &str,
    values: &[Value],
    filters: &[Filter],
    fields: Option<&[String]>,
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(pg_schema, schema.collection);
    let cols = select_column_list(schema, fields);
    let Some((col, kind)) = column_of(schema, field).filter(|_| !values.is_empty()) else {
        q.sql = format!("SELECT {} FROM {} WHERE 1 = 0", cols, table);
        return q;
    };
    let placeholders: Vec<String> = values.iter().map(|v| q.placeholder(v.clone(), kind)).collect();
    let mut parts = vec![format!("{} IN ({})", quoted(&col), placeholders.join(", "))];
    parts.extend(filter_parts(&mut q, schema, filters));
    q.sql = format!("SELECT {} FROM {}{}", cols, table, where_clause(&parts));
    q
}

/// INSERT the id and every field present in the document. Returns all columns.
pub fn insert(pg_schema: &str, schema: &Schema, id: &str, doc: &Document) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(pg_schema, schema.collection);
    let mut cols = vec![quoted(ID_FIELD)];
    let mut placeholders = vec![q.placeholder(Value::String(id.to_string()), FieldKind::Id)];
    for f in &schema.fields {
        let Some(v) = doc.get(f.name) else { continue };
        cols.push(quoted(&f.column()));
        placeholders.push(q.placeholder(v.clone(), f.kind));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        table,
        cols.join(", "),
        placeholders.join(", "),
        select_column_list(schema, None)
    );
    q
}

/// UPDATE by id: SET only schema fields present in the patch. An empty patch reads the row instead.
pub fn update(pg_schema: &str, schema: &Schema, id: &str, patch: &Document, filters: &[Filter]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(pg_schema, schema.collection);
    let mut sets = Vec::new();
    for f in &schema.fields {
        let Some(v) = patch.get(f.name) else { continue };
        let ph = q.placeholder(v.clone(), f.kind);
        sets.push(format!("{} = {}", quoted(&f.column()), ph));
    }
    if sets.is_empty() {
        return select_by_id(pg_schema, schema, id, filters);
    }
    let id_ph = q.placeholder(Value::String(id.to_string()), FieldKind::Id);
    let mut parts = vec![format!("{} = {}", quoted(ID_FIELD), id_ph)];
    parts.extend(filter_parts(&mut q, schema, filters));
    q.sql = format!(
        "UPDATE {} SET {}{} RETURNING {}",
        table,
        sets.join(", "),
        where_clause(&parts),
        select_column_list(schema, None)
    );
    q
}

/// DELETE by id, honoring query middleware filters. Returns the deleted row.
pub fn delete(pg_schema: &str, schema: &Schema, id: &str, filters: &[Filter]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(pg_schema, schema.collection);
    let id_ph = q.placeholder(Value::String(id.to_string()), FieldKind::Id);
    let mut parts = vec![format!("{} = {}", quoted(ID_FIELD), id_ph)];
    parts.extend(filter_parts(&mut q, schema, filters));
    q.sql = format!(
        "DELETE FROM {}{} RETURNING {}",
        table,
        where_clause(&parts),
        select_column_list(schema, None)
    );
    q
}
