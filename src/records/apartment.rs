// 🏢 Apartments

use super::{integer, require_row, text, RecordError};
use crate::credentials::Session;
use crate::db::{Gateway, Record};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApartmentStatus {
    Available,
    Occupied,
    Maintenance,
}

impl ApartmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApartmentStatus::Available => "Available",
            ApartmentStatus::Occupied => "Occupied",
            ApartmentStatus::Maintenance => "Maintenance",
        }
    }
}

impl fmt::Display for ApartmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApartmentStatus {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Available" => Ok(ApartmentStatus::Available),
            "Occupied" => Ok(ApartmentStatus::Occupied),
            "Maintenance" => Ok(ApartmentStatus::Maintenance),
            other => Err(RecordError::UnknownValue {
                field: "apartment status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Apartment {
    pub id: i64,
    pub apartment_number: String,
    pub building: String,
    pub floor: i64,
    pub room_count: i64,
    pub status: ApartmentStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewApartment {
    pub apartment_number: String,
    pub building: String,
    pub floor: i64,
    pub room_count: i64,
    pub status: ApartmentStatus,
}

impl Apartment {
    fn from_record(record: &Record<'_>) -> Result<Self, RecordError> {
        Ok(Apartment {
            id: integer(record, "id")?,
            apartment_number: text(record, "apartment_number")?,
            building: text(record, "building")?,
            floor: integer(record, "floor")?,
            room_count: integer(record, "room_count")?,
            status: text(record, "status")?.parse()?,
        })
    }
}

pub fn list(gateway: &Gateway, _session: &Session) -> Result<Vec<Apartment>, RecordError> {
    let table = gateway.fetch_all(
        "SELECT id, apartment_number, building, floor, room_count, status FROM apartments ORDER BY id",
        [],
    )?;
    let apartments = table
        .records()
        .map(|r| Apartment::from_record(&r))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(apartments)
}

pub fn add(
    gateway: &Gateway,
    session: &Session,
    apartment: &NewApartment,
) -> Result<i64, RecordError> {
    let ack = gateway.execute(
        "INSERT INTO apartments (apartment_number, building, floor, room_count, status)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            apartment.apartment_number,
            apartment.building,
            apartment.floor,
            apartment.room_count,
            apartment.status.as_str(),
        ],
    )?;

    info!(operator = session.username(), id = ack.last_insert_id, "apartment added");
    Ok(ack.last_insert_id)
}

pub fn update_status(
    gateway: &Gateway,
    session: &Session,
    id: i64,
    status: ApartmentStatus,
) -> Result<(), RecordError> {
    let ack = gateway.execute(
        "UPDATE apartments SET status = ?1 WHERE id = ?2",
        params![status.as_str(), id],
    )?;
    require_row(ack, "apartment", id)?;

    info!(operator = session.username(), id, status = %status, "apartment status updated");
    Ok(())
}

pub fn delete(gateway: &Gateway, session: &Session, id: i64) -> Result<(), RecordError> {
    let ack = gateway.execute("DELETE FROM apartments WHERE id = ?1", params![id])?;
    require_row(ack, "apartment", id)?;

    info!(operator = session.username(), id, "apartment deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures;

    fn unit(number: &str, status: ApartmentStatus) -> NewApartment {
        NewApartment {
            apartment_number: number.to_string(),
            building: "North Tower".to_string(),
            floor: 4,
            room_count: 3,
            status,
        }
    }

    #[test]
    fn test_add_and_list() {
        let gateway = fixtures::gateway();
        let session = fixtures::session(&gateway);

        let id = add(&gateway, &session, &unit("4B", ApartmentStatus::Available)).unwrap();
        let apartments = list(&gateway, &session).unwrap();

        assert_eq!(apartments.len(), 1);
        assert_eq!(apartments[0].id, id);
        assert_eq!(apartments[0].apartment_number, "4B");
        assert_eq!(apartments[0].floor, 4);
        assert_eq!(apartments[0].status, ApartmentStatus::Available);
    }

    #[test]
    fn test_update_status() {
        let gateway = fixtures::gateway();
        let session = fixtures::session(&gateway);
        let id = add(&gateway, &session, &unit("4B", ApartmentStatus::Available)).unwrap();

        update_status(&gateway, &session, id, ApartmentStatus::Occupied).unwrap();
        assert_eq!(list(&gateway, &session).unwrap()[0].status, ApartmentStatus::Occupied);

        let err = update_status(&gateway, &session, id + 100, ApartmentStatus::Occupied).unwrap_err();
        assert!(matches!(err, RecordError::NotFound { entity: "apartment", .. }));
    }

    #[test]
    fn test_unknown_stored_status_is_error() {
        let gateway = fixtures::gateway();
        let session = fixtures::session(&gateway);
        gateway
            .lease()
            .unwrap()
            .execute_batch(
                "PRAGMA ignore_check_constraints = ON;
                 INSERT INTO apartments (apartment_number, building, floor, room_count, status)
                 VALUES ('1A', 'South', 1, 2, 'Demolished');",
            )
            .unwrap();

        let err = list(&gateway, &session).unwrap_err();
        assert!(matches!(err, RecordError::UnknownValue { .. }));
    }

    #[test]
    fn test_status_strings() {
        assert_eq!("Maintenance".parse::<ApartmentStatus>().unwrap(), ApartmentStatus::Maintenance);
        assert!("available".parse::<ApartmentStatus>().is_err());
        assert_eq!(ApartmentStatus::Occupied.to_string(), "Occupied");
    }

    #[test]
    fn test_delete() {
        let gateway = fixtures::gateway();
        let session = fixtures::session(&gateway);
        let id = add(&gateway, &session, &unit("4B", ApartmentStatus::Available)).unwrap();

        delete(&gateway, &session, id).unwrap();
        assert!(list(&gateway, &session).unwrap().is_empty());
    }
}
