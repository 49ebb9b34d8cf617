//! SQLite-backed registry.
//!
//! # Responsibility
//! - Answer partial-key lookups against a `registry.sqlite3` index file.
//!
//! # Invariants
//! - The registry is read-only here; index maintenance belongs to whoever
//!   ingests datasets.
//! - Identifiers are validated before being interpolated into SQL.

use super::{Constraint, LookupQuery, Registry};
use crate::error::{RepoError, RepoResult};
use crate::model::DataValue;
use log::debug;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection, OpenFlags};
use std::path::Path;
use std::sync::Mutex;

pub struct SqliteRegistry {
    conn: Mutex<Connection>,
}

impl SqliteRegistry {
    /// Opens an existing registry file read-only.
    pub fn open(path: &Path) -> RepoResult<Self> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        debug!(
            "event=registry_open module=registry status=ok kind=sqlite path={}",
            path.display()
        );
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl Registry for SqliteRegistry {
    fn lookup(&self, query: &LookupQuery) -> RepoResult<Vec<Vec<DataValue>>> {
        if query.properties.is_empty() {
            return Ok(Vec::new());
        }
        if query.references.is_empty() {
            return Err(RepoError::Configuration(
                "sqlite registry lookup needs at least one reference table".to_string(),
            ));
        }
        for identifier in query.properties.iter().chain(&query.references) {
            validate_identifier(identifier)?;
        }

        let mut sql = String::from("SELECT DISTINCT ");
        sql.push_str(&query.properties.join(", "));
        sql.push_str(" FROM ");
        sql.push_str(&query.references.join(" NATURAL JOIN "));

        let mut bindings: Vec<SqlValue> = Vec::new();
        if !query.data_id.is_empty() {
            let mut clauses = Vec::new();
            for (key, constraint) in &query.data_id {
                validate_identifier(key)?;
                match constraint {
                    Constraint::Equals(value) => {
                        clauses.push(format!("{key} = ?"));
                        bindings.push(to_sql_value(value));
                    }
                    Constraint::Range(low, high) => {
                        clauses.push(format!("({key} BETWEEN ? AND ?)"));
                        bindings.push(to_sql_value(low));
                        bindings.push(to_sql_value(high));
                    }
                }
            }
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        let conn = self.conn.lock().map_err(|_| {
            RepoError::Io(std::io::Error::other("registry connection poisoned"))
        })?;
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bindings))?;
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            let mut tuple = Vec::with_capacity(query.properties.len());
            for index in 0..query.properties.len() {
                tuple.push(from_sql_value(row.get::<_, SqlValue>(index)?)?);
            }
            result.push(tuple);
        }
        Ok(result)
    }
}

fn validate_identifier(identifier: &str) -> RepoResult<()> {
    let valid = !identifier.is_empty()
        && identifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(RepoError::Configuration(format!(
            "invalid registry identifier `{identifier}`"
        )))
    }
}

fn to_sql_value(value: &DataValue) -> SqlValue {
    match value {
        DataValue::Int(value) => SqlValue::Integer(*value),
        DataValue::Float(value) => SqlValue::Real(*value),
        DataValue::Text(value) => SqlValue::Text(value.clone()),
    }
}

fn from_sql_value(value: SqlValue) -> RepoResult<DataValue> {
    match value {
        SqlValue::Integer(value) => Ok(DataValue::Int(value)),
        SqlValue::Real(value) => Ok(DataValue::Float(value)),
        SqlValue::Text(value) => Ok(DataValue::Text(value)),
        SqlValue::Null => Err(RepoError::Configuration(
            "registry row contains NULL for a requested property".to_string(),
        )),
        SqlValue::Blob(_) => Err(RepoError::Configuration(
            "registry row contains a blob for a requested property".to_string(),
        )),
    }
}
