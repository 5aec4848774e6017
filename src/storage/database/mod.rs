//! DatabaseStorage - one table per model type in a SQLite database.
//!
//! Tables are not created here; the table for a model type is named
//! [`ModelType::table_name`] and has one column per stored field. Declare
//! columns with the affinity of the values they hold (or none): SQLite
//! converts values on write to match the column, e.g. an integer into a
//! `text` column reads back as a string.

mod statement;

use std::cell::RefCell;
use std::ops::ControlFlow;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use parking_lot::ReentrantMutex;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::Connection;
use serde_json::{Number, Value};

use super::{json_type, Changeset, Row, StorageBackend};
use crate::criteria::Criteria;
use crate::error::{ModelError, ModelResult};
use crate::model::ModelType;

pub use statement::Statement;

/// Backend executing generated statements against a SQLite connection.
///
/// The connection lock is re-entrant: a `scan` visitor runs while the query is
/// still stepping and may call back into the same backend.
///
/// Values are written as SQLite integers, reals and text. Booleans, arrays and
/// objects have no column type that reads back as the same JSON value, so
/// writing or filtering on one is a validation error.
#[derive(Debug, Default)]
pub struct DatabaseStorage {
    conn: ReentrantMutex<RefCell<Option<Connection>>>,
}

impl DatabaseStorage {
    /// An unconfigured backend. Every operation fails until
    /// [`DatabaseStorage::set_connection`] is called.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connection(conn: Connection) -> Self {
        Self {
            conn: ReentrantMutex::new(RefCell::new(Some(conn))),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> ModelResult<Self> {
        Ok(Self::with_connection(Connection::open(path)?))
    }

    pub fn open_in_memory() -> ModelResult<Self> {
        Ok(Self::with_connection(Connection::open_in_memory()?))
    }

    /// Fails when called from inside a running `scan`.
    pub fn set_connection(&self, conn: Connection) -> ModelResult<()> {
        let guard = self.conn.lock();
        let mut slot = guard
            .try_borrow_mut()
            .map_err(|_| ModelError::Database("connection is in use by a running query".into()))?;
        *slot = Some(conn);
        Ok(())
    }

    /// Run raw SQL outside of any model, e.g. to create tables.
    pub fn execute_batch(&self, sql: &str) -> ModelResult<()> {
        self.with_conn("the database", |conn| Ok(conn.execute_batch(sql)?))
    }

    fn with_conn<T>(
        &self,
        model: &str,
        f: impl FnOnce(&Connection) -> ModelResult<T>,
    ) -> ModelResult<T> {
        let guard = self.conn.lock();
        let slot = guard
            .try_borrow()
            .map_err(|_| ModelError::Database("connection is being replaced".into()))?;
        match slot.as_ref() {
            Some(conn) => f(conn),
            None => Err(ModelError::Configuration(format!(
                "no connection set for {}",
                model
            ))),
        }
    }

    fn execute(conn: &Connection, stmt: &Statement) -> ModelResult<usize> {
        tracing::debug!(sql = %stmt.sql, params = stmt.params.len(), "executing statement");
        let params = bind_params(stmt)?;
        Ok(conn.execute(&stmt.sql, rusqlite::params_from_iter(params.iter()))?)
    }

    /// Step through the query, handing each row to `visit` as it is read.
    fn query(
        conn: &Connection,
        stmt: &Statement,
        fields: &[&str],
        visit: &mut dyn FnMut(Row) -> ControlFlow<()>,
    ) -> ModelResult<()> {
        tracing::debug!(sql = %stmt.sql, params = stmt.params.len(), "executing query");
        let params = bind_params(stmt)?;
        let mut prepared = conn.prepare(&stmt.sql)?;
        let mut rows = prepared.query(rusqlite::params_from_iter(params.iter()))?;

        while let Some(row) = rows.next()? {
            let mut record = Row::new();
            for (index, field) in fields.iter().enumerate() {
                record.insert(field.to_string(), from_sql(row.get_ref(index)?));
            }
            if visit(record).is_break() {
                break;
            }
        }
        Ok(())
    }
}

impl StorageBackend for DatabaseStorage {
    fn name(&self) -> &'static str {
        "database"
    }

    fn save(&self, model: &ModelType, changes: &Changeset<'_>) -> ModelResult<Value> {
        let table = model.table_name();
        self.with_conn(model.name(), |conn| match changes.id {
            None => {
                let stmt = Statement::insert(&table, changes.values, changes.fields);
                Self::execute(conn, &stmt)?;
                Ok(Value::from(conn.last_insert_rowid()))
            }
            Some(id) if changes.fields.is_empty() => Ok(id.clone()),
            Some(id) => {
                let stmt = Statement::update(
                    &table,
                    model.id_field(),
                    id,
                    changes.values,
                    changes.fields,
                );
                if Self::execute(conn, &stmt)? == 0 {
                    tracing::warn!(
                        model = model.name(),
                        %id,
                        "update matched no rows; record was deleted"
                    );
                }
                Ok(id.clone())
            }
        })
    }

    fn delete(&self, model: &ModelType, id: Option<&Value>) -> ModelResult<bool> {
        let table = model.table_name();
        self.with_conn(model.name(), |conn| {
            let Some(id) = id else {
                return Ok(true);
            };
            let stmt = Statement::delete(&table, model.id_field(), id);
            Ok(Self::execute(conn, &stmt)? > 0)
        })
    }

    fn find(&self, model: &ModelType, id: &Value) -> ModelResult<Option<Row>> {
        let fields = model.stored_fields();
        let stmt = Statement::find(&model.table_name(), &fields, model.id_field(), id);
        let mut found = None;
        self.with_conn(model.name(), |conn| {
            Self::query(conn, &stmt, &fields, &mut |row| {
                found = Some(row);
                ControlFlow::Break(())
            })
        })?;
        Ok(found)
    }

    fn scan(
        &self,
        model: &ModelType,
        criteria: &Criteria,
        visit: &mut dyn FnMut(Row) -> ControlFlow<()>,
    ) -> ModelResult<()> {
        let fields = model.stored_fields();
        let stmt = Statement::select(&model.table_name(), &fields, criteria);
        self.with_conn(model.name(), |conn| Self::query(conn, &stmt, &fields, visit))
    }
}

fn bind_params(stmt: &Statement) -> ModelResult<Vec<SqlValue>> {
    stmt.params.iter().map(to_sql).collect()
}

fn to_sql(value: &Value) -> ModelResult<SqlValue> {
    match value {
        Value::Null => Ok(SqlValue::Null),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Ok(SqlValue::Integer(i)),
            (None, Some(f)) if n.is_f64() => Ok(SqlValue::Real(f)),
            _ => Err(ModelError::Validation(format!(
                "{} does not fit a database integer",
                n
            ))),
        },
        Value::String(s) => Ok(SqlValue::Text(s.clone())),
        other => Err(ModelError::Validation(format!(
            "{} values cannot be stored in a database column",
            json_type(other)
        ))),
    }
}

fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(text) => Value::String(String::from_utf8_lossy(text).into_owned()),
        ValueRef::Blob(bytes) => Value::String(STANDARD.encode(bytes)),
    }
}
