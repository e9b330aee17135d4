// 🗄️ Persistence Gateway - parameterized statements over one leased connection
//
// Every other feature that touches storage goes through `Gateway`:
// - execute:      mutating statement, auto-committed, returns an Ack
// - fetch_all:    read query, returns a Table (zero rows is still a Table)
// - fetch_scalar: read query for a single cell, returns Scalar::Empty on no row / NULL
//
// Statements always bind positional parameters (?1, ?2, ...). Prepared
// statements and row cursors are scoped to the call, so they are dropped on
// every exit path. The connection itself is leased through a mutex guard.

use rusqlite::types::ValueRef;
use rusqlite::{Connection, ErrorCode, Params};
use serde::Serialize;
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, error, warn};

// ============================================================================
// ERRORS
// ============================================================================

/// Which side of the store failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// Store unreachable, locked, unreadable or not a database
    Connection,
    /// Statement rejected: syntax, constraint, bad parameter, type mismatch
    Statement,
}

impl fmt::Display for QueryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryErrorKind::Connection => write!(f, "connection error"),
            QueryErrorKind::Statement => write!(f, "statement error"),
        }
    }
}

#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct QueryError {
    kind: QueryErrorKind,
    message: String,
    code: Option<ErrorCode>,
}

impl QueryError {
    pub fn connection(message: impl Into<String>) -> Self {
        QueryError {
            kind: QueryErrorKind::Connection,
            message: message.into(),
            code: None,
        }
    }

    pub fn kind(&self) -> QueryErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// True when the store refused the row because of a UNIQUE / NOT NULL /
    /// FOREIGN KEY / CHECK constraint.
    pub fn is_constraint_violation(&self) -> bool {
        self.code == Some(ErrorCode::ConstraintViolation)
    }
}

impl From<rusqlite::Error> for QueryError {
    fn from(err: rusqlite::Error) -> Self {
        let code = match &err {
            rusqlite::Error::SqliteFailure(failure, _) => Some(failure.code),
            _ => None,
        };

        let kind = match code {
            Some(ErrorCode::CannotOpen)
            | Some(ErrorCode::NotADatabase)
            | Some(ErrorCode::DatabaseBusy)
            | Some(ErrorCode::DatabaseLocked)
            | Some(ErrorCode::DatabaseCorrupt)
            | Some(ErrorCode::SystemIoFailure)
            | Some(ErrorCode::PermissionDenied)
            | Some(ErrorCode::ReadOnly)
            | Some(ErrorCode::DiskFull) => QueryErrorKind::Connection,
            _ => QueryErrorKind::Statement,
        };

        QueryError {
            kind,
            message: err.to_string(),
            code,
        }
    }
}

// ============================================================================
// RESULT TYPES
// ============================================================================

/// Acknowledgement of a committed mutating statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Ack {
    pub rows_affected: usize,
    /// Row id of the most recent successful INSERT on this connection
    pub last_insert_id: i64,
}

/// A single cell read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            Value::Real(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(v) => Value::Integer(v),
            ValueRef::Real(v) => Value::Real(v),
            ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
            ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Real(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "{}", s),
            Value::Blob(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

/// Outcome of a single-cell query. `Empty` is not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Value(Value),
    Empty,
}

impl Scalar {
    /// The cell value, or the default `0` when the query produced nothing.
    pub fn value(&self) -> Value {
        match self {
            Scalar::Value(v) => v.clone(),
            Scalar::Empty => Value::Integer(0),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Scalar::Empty)
    }

    pub fn as_i64(&self) -> i64 {
        self.value().as_i64().unwrap_or(0)
    }
}

/// Rows of a read query, with column names in query order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// Borrowed view of one row, addressable by column name.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    columns: &'a [String],
    cells: &'a [Value],
}

impl<'a> Record<'a> {
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|idx| self.cells.get(idx))
    }
}

impl Table {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.rows.iter().map(move |cells| Record {
            columns: &self.columns,
            cells,
        })
    }

    /// Write the table as CSV (header row first).
    pub fn write_csv<W: Write>(&self, writer: W) -> anyhow::Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.columns)?;
        for row in &self.rows {
            wtr.write_record(row.iter().map(|cell| cell.to_string()))?;
        }
        wtr.flush()?;
        Ok(())
    }
}

// ============================================================================
// GATEWAY
// ============================================================================

/// Owns the single long-lived connection; callers lease it per statement.
pub struct Gateway {
    conn: Mutex<Connection>,
}

impl Gateway {
    /// Open (or create) the SQLite database at `path`.
    pub fn open(path: &Path) -> Result<Self, QueryError> {
        let conn = Connection::open(path).map_err(|e| {
            error!(path = %path.display(), error = %e, "failed to open database");
            QueryError::connection(e.to_string())
        })?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        debug!(path = %path.display(), "database opened");
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> Result<Self, QueryError> {
        let conn = Connection::open_in_memory().map_err(|e| QueryError::connection(e.to_string()))?;
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Gateway {
            conn: Mutex::new(conn),
        }
    }

    /// Lease the connection. The guard releases it when dropped.
    pub fn lease(&self) -> Result<MutexGuard<'_, Connection>, QueryError> {
        self.conn
            .lock()
            .map_err(|_| QueryError::connection("connection lease poisoned by a panicked caller"))
    }

    /// Run a mutating statement and commit it.
    pub fn execute<P: Params>(&self, statement: &str, params: P) -> Result<Ack, QueryError> {
        let result = self.lease().and_then(|conn| {
            let rows_affected = conn.execute(statement, params)?;
            Ok(Ack {
                rows_affected,
                last_insert_id: conn.last_insert_rowid(),
            })
        });

        match &result {
            Ok(ack) => debug!(statement, rows = ack.rows_affected, "statement committed"),
            Err(e) => error!(statement, kind = %e.kind(), error = %e.message(), "statement failed"),
        }
        result
    }

    /// Run a read query and collect every row.
    pub fn fetch_all<P: Params>(&self, query: &str, params: P) -> Result<Table, QueryError> {
        let result = self.lease().and_then(|conn| {
            let mut stmt = conn.prepare(query)?;
            let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
            let width = columns.len();

            let mut rows = stmt.query(params)?;
            let mut table = Table {
                columns,
                rows: Vec::new(),
            };
            while let Some(row) = rows.next()? {
                let mut cells = Vec::with_capacity(width);
                for idx in 0..width {
                    cells.push(Value::from(row.get_ref(idx)?));
                }
                table.rows.push(cells);
            }
            Ok(table)
        });

        match &result {
            Ok(table) => debug!(query, rows = table.len(), "query returned"),
            Err(e) => error!(query, kind = %e.kind(), error = %e.message(), "query failed"),
        }
        result
    }

    /// Run a read query expected to yield one row with one column.
    pub fn fetch_scalar<P: Params>(&self, query: &str, params: P) -> Result<Scalar, QueryError> {
        let result = self.lease().and_then(|conn| {
            let mut stmt = conn.prepare(query)?;
            let mut rows = stmt.query(params)?;
            let scalar = match rows.next()? {
                Some(row) => match row.get_ref(0)? {
                    ValueRef::Null => Scalar::Empty,
                    cell => Scalar::Value(Value::from(cell)),
                },
                None => Scalar::Empty,
            };
            Ok(scalar)
        });

        match &result {
            Ok(Scalar::Empty) => warn!(query, "query returned no results"),
            Ok(Scalar::Value(_)) => debug!(query, "scalar query returned"),
            Err(e) => error!(query, kind = %e.kind(), error = %e.message(), "scalar query failed"),
        }
        result
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

/// Stand-in for the pre-existing production schema, used by unit tests only.
#[cfg(test)]
pub(crate) mod fixtures {
    use super::Gateway;
    use crate::credentials::{CredentialStore, Session};

    pub const SCHEMA: &str = "
        CREATE TABLE users (
            username TEXT PRIMARY KEY,
            password TEXT NOT NULL
        );
        CREATE TABLE tenants (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            phone_number TEXT,
            email TEXT
        );
        CREATE TABLE apartments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            apartment_number TEXT NOT NULL,
            building TEXT NOT NULL,
            floor INTEGER NOT NULL,
            room_count INTEGER NOT NULL,
            status TEXT NOT NULL CHECK (status IN ('Available', 'Occupied', 'Maintenance'))
        );
        CREATE TABLE maintenance (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            apartment_id INTEGER NOT NULL REFERENCES apartments(id),
            description TEXT NOT NULL,
            status TEXT NOT NULL CHECK (status IN ('Due', 'Completed')),
            priority TEXT NOT NULL CHECK (priority IN ('High Priority', 'Normal Priority'))
        );
    ";

    pub fn gateway() -> Gateway {
        let gateway = Gateway::open_in_memory().unwrap();
        {
            let conn = gateway.lease().unwrap();
            conn.pragma_update(None, "foreign_keys", "ON").unwrap();
            conn.execute_batch(SCHEMA).unwrap();
        }
        gateway
    }

    /// Register a throwaway operator and log in as them.
    pub fn session(gateway: &Gateway) -> Session {
        let store = CredentialStore::new(gateway);
        store.register("operator", "operator-pass").unwrap();
        store.login("operator", "operator-pass").unwrap()
    }
}
