// Property Records - tenants, apartments, maintenance
//
// Thin typed layer over the Gateway. Every operation takes the operator's
// Session; nothing is cached, each call round-trips to the store.

pub mod apartment;
pub mod maintenance;
pub mod tenant;

pub use apartment::{Apartment, ApartmentStatus, NewApartment};
pub use maintenance::{MaintenanceRecord, MaintenanceStatus, NewMaintenance};
pub use tenant::{NewTenant, Tenant};

use crate::db::{Ack, QueryError, Record};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("column '{0}' missing or malformed")]
    Malformed(&'static str),

    #[error("unknown {field} value '{value}'")]
    UnknownValue { field: &'static str, value: String },
}

pub(crate) fn integer(record: &Record<'_>, column: &'static str) -> Result<i64, RecordError> {
    record
        .get(column)
        .and_then(|v| v.as_i64())
        .ok_or(RecordError::Malformed(column))
}

/// Text column; NULL reads as an empty string
pub(crate) fn text(record: &Record<'_>, column: &'static str) -> Result<String, RecordError> {
    match record.get(column) {
        Some(v) if v.is_null() => Ok(String::new()),
        Some(v) => v
            .as_str()
            .map(str::to_string)
            .ok_or(RecordError::Malformed(column)),
        None => Err(RecordError::Malformed(column)),
    }
}

/// Update/delete acks touching no row mean the id does not exist
pub(crate) fn require_row(ack: Ack, entity: &'static str, id: i64) -> Result<(), RecordError> {
    if ack.rows_affected == 0 {
        Err(RecordError::NotFound { entity, id })
    } else {
        Ok(())
    }
}
