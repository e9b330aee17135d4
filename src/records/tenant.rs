// 👤 Tenants

use super::{integer, require_row, text, RecordError};
use crate::credentials::Session;
use crate::db::{Gateway, Record};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTenant {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub email: String,
}

impl Tenant {
    fn from_record(record: &Record<'_>) -> Result<Self, RecordError> {
        Ok(Tenant {
            id: integer(record, "id")?,
            first_name: text(record, "first_name")?,
            last_name: text(record, "last_name")?,
            phone_number: text(record, "phone_number")?,
            email: text(record, "email")?,
        })
    }
}

pub fn list(gateway: &Gateway, _session: &Session) -> Result<Vec<Tenant>, RecordError> {
    let table = gateway.fetch_all(
        "SELECT id, first_name, last_name, phone_number, email FROM tenants ORDER BY id",
        [],
    )?;
    let tenants = table
        .records()
        .map(|r| Tenant::from_record(&r))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tenants)
}

/// Insert a tenant; returns the id assigned by the store
pub fn add(gateway: &Gateway, session: &Session, tenant: &NewTenant) -> Result<i64, RecordError> {
    let ack = gateway.execute(
        "INSERT INTO tenants (first_name, last_name, phone_number, email) VALUES (?1, ?2, ?3, ?4)",
        params![tenant.first_name, tenant.last_name, tenant.phone_number, tenant.email],
    )?;

    info!(operator = session.username(), id = ack.last_insert_id, "tenant added");
    Ok(ack.last_insert_id)
}

pub fn update_email(
    gateway: &Gateway,
    session: &Session,
    id: i64,
    email: &str,
) -> Result<(), RecordError> {
    let ack = gateway.execute(
        "UPDATE tenants SET email = ?1 WHERE id = ?2",
        params![email, id],
    )?;
    require_row(ack, "tenant", id)?;

    info!(operator = session.username(), id, "tenant email updated");
    Ok(())
}

pub fn delete(gateway: &Gateway, session: &Session, id: i64) -> Result<(), RecordError> {
    let ack = gateway.execute("DELETE FROM tenants WHERE id = ?1", params![id])?;
    require_row(ack, "tenant", id)?;

    info!(operator = session.username(), id, "tenant deleted");
    Ok(())
}
