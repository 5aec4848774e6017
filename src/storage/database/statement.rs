//! Statement generation for the database backend.

use serde_json::Value;

use crate::criteria::Criteria;
use crate::storage::Row;

/// SQL text with one bound parameter per `?` placeholder, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    /// `select <fields> from <table>[ where <f> = ? and typeof(<f>) = typeof(?) and ...]`
    ///
    /// Each filter binds its value twice so the comparison is strict: SQLite
    /// would otherwise let a text `"1"` equal the integer `1` through column
    /// affinity. A `null` filter renders `<f> is null`.
    pub fn select(table: &str, fields: &[&str], criteria: &Criteria) -> Self {
        let mut sql = format!("select {} from {}", fields.join(", "), table);
        let mut params = Vec::new();

        if !criteria.is_empty() {
            let conditions: Vec<String> = criteria
                .iter()
                .map(|(field, value)| {
                    if value.is_null() {
                        format!("{} is null", field)
                    } else {
                        params.push(value.clone());
                        params.push(value.clone());
                        format!("{f} = ? and typeof({f}) = typeof(?)", f = field)
                    }
                })
                .collect();
            sql.push_str(" where ");
            sql.push_str(&conditions.join(" and "));
        }

        Self { sql, params }
    }

    /// `select <fields> from <table> where <id_field> = ?`
    ///
    /// Identifier lookups keep SQLite's own comparison, so `"7"` finds row 7.
    pub fn find(table: &str, fields: &[&str], id_field: &str, id: &Value) -> Self {
        Self {
            sql: format!(
                "select {} from {} where {} = ?",
                fields.join(", "),
                table,
                id_field
            ),
            params: vec![id.clone()],
        }
    }

    /// `insert into <table>(<fields>) values (?, ...)`
    ///
    /// With no fields: `insert into <table> default values`.
    pub fn insert(table: &str, values: &Row, fields: &[&str]) -> Self {
        if fields.is_empty() {
            return Self {
                sql: format!("insert into {} default values", table),
                params: Vec::new(),
            };
        }

        let placeholders = vec!["?"; fields.len()].join(", ");
        Self {
            sql: format!(
                "insert into {}({}) values ({})",
                table,
                fields.join(", "),
                placeholders
            ),
            params: bind(values, fields),
        }
    }

    /// `update <table> set <f> = ?, ... where <id_field> = ?`
    pub fn update(table: &str, id_field: &str, id: &Value, values: &Row, fields: &[&str]) -> Self {
        let assignments: Vec<String> = fields.iter().map(|f| format!("{} = ?", f)).collect();
        let mut params = bind(values, fields);
        params.push(id.clone());

        Self {
            sql: format!(
                "update {} set {} where {} = ?",
                table,
                assignments.join(", "),
                id_field
            ),
            params,
        }
    }

    /// `delete from <table> where <id_field> = ?`
    pub fn delete(table: &str, id_field: &str, id: &Value) -> Self {
        Self {
            sql: format!("delete from {} where {} = ?", table, id_field),
            params: vec![id.clone()],
        }
    }

    pub fn placeholder_count(&self) -> usize {
        self.sql.matches('?').count()
    }
}

fn bind(values: &Row, fields: &[&str]) -> Vec<Value> {
    fields
        .iter()
        .map(|field| values.get(*field).cloned().unwrap_or(Value::Null))
        .collect()
}
