// 🔧 Maintenance Requests
//
// Priority is assigned by the TriageClassifier exactly once, when the request
// is recorded. Status updates never touch it.

use super::{integer, require_row, text, RecordError};
use crate::credentials::Session;
use crate::db::{Gateway, Record};
use crate::triage::{PriorityLabel, TriageClassifier};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaintenanceStatus {
    Due,
    Completed,
}

impl MaintenanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaintenanceStatus::Due => "Due",
            MaintenanceStatus::Completed => "Completed",
        }
    }
}

impl fmt::Display for MaintenanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MaintenanceStatus {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Due" => Ok(MaintenanceStatus::Due),
            "Completed" => Ok(MaintenanceStatus::Completed),
            other => Err(RecordError::UnknownValue {
                field: "maintenance status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceRecord {
    pub id: i64,
    pub apartment_id: i64,
    pub description: String,
    pub status: MaintenanceStatus,
    pub priority: PriorityLabel,
}

impl MaintenanceRecord {
    fn from_record(record: &Record<'_>) -> Result<Self, RecordError> {
        let priority = text(record, "priority")?;
        let priority = priority
            .parse::<PriorityLabel>()
            .map_err(|value| RecordError::UnknownValue {
                field: "priority",
                value,
            })?;

        Ok(MaintenanceRecord {
            id: integer(record, "id")?,
            apartment_id: integer(record, "apartment_id")?,
            description: text(record, "description")?,
            status: text(record, "status")?.parse()?,
            priority,
        })
    }

    /// "🔴 High" / "🟢 Normal"
    pub fn priority_marker(&self) -> &'static str {
        self.priority.marker()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMaintenance {
    pub apartment_id: i64,
    pub description: String,
    pub status: MaintenanceStatus,
}

pub fn list(gateway: &Gateway, _session: &Session) -> Result<Vec<MaintenanceRecord>, RecordError> {
    let table = gateway.fetch_all(
        "SELECT id, apartment_id, description, status, priority FROM maintenance ORDER BY id",
        [],
    )?;
    let records = table
        .records()
        .map(|r| MaintenanceRecord::from_record(&r))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

/// Triage the description and record the request.
/// Returns the new id and the priority that was stored.
pub fn add(
    gateway: &Gateway,
    session: &Session,
    request: &NewMaintenance,
    classifier: &TriageClassifier,
) -> Result<(i64, PriorityLabel), RecordError> {
    let priority = classifier.classify(&request.description);

    let ack = gateway.execute(
        "INSERT INTO maintenance (apartment_id, description, status, priority)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            request.apartment_id,
            request.description,
            request.status.as_str(),
            priority.as_str(),
        ],
    )?;

    info!(
        operator = session.username(),
        id = ack.last_insert_id,
        apartment_id = request.apartment_id,
        priority = %priority,
        "maintenance request recorded"
    );
    Ok((ack.last_insert_id, priority))
}

pub fn update_status(
    gateway: &Gateway,
    session: &Session,
    id: i64,
    status: MaintenanceStatus,
) -> Result<(), RecordError> {
    let ack = gateway.execute(
        "UPDATE maintenance SET status = ?1 WHERE id = ?2",
        params![status.as_str(), id],
    )?;
    require_row(ack, "maintenance record", id)?;

    info!(operator = session.username(), id, status = %status, "maintenance status updated");
    Ok(())
}

pub fn delete(gateway: &Gateway, session: &Session, id: i64) -> Result<(), RecordError> {
    let ack = gateway.execute("DELETE FROM maintenance WHERE id = ?1", params![id])?;
    require_row(ack, "maintenance record", id)?;

    info!(operator = session.username(), id, "maintenance record deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures;
    use crate::records::apartment::{self, ApartmentStatus, NewApartment};

    fn seed_apartment(gateway: &Gateway, session: &Session) -> i64 {
        apartment::add(
            gateway,
            session,
            &NewApartment {
                apartment_number: "12C".to_string(),
                building: "East".to_string(),
                floor: 12,
                room_count: 2,
                status: ApartmentStatus::Occupied,
            },
        )
        .unwrap()
    }

    fn request(apartment_id: i64, description: &str) -> NewMaintenance {
        NewMaintenance {
            apartment_id,
            description: description.to_string(),
            status: MaintenanceStatus::Due,
        }
    }

    #[test]
    fn test_add_assigns_priority() {
        let gateway = fixtures::gateway();
        let session = fixtures::session(&gateway);
        let classifier = TriageClassifier::new();
        let apt = seed_apartment(&gateway, &session);

        let (_, urgent) = add(&gateway, &session, &request(apt, "Burst pipe flooding the bathroom"), &classifier).unwrap();
        let (_, routine) = add(&gateway, &session, &request(apt, "Please repaint the wall"), &classifier).unwrap();

        assert_eq!(urgent, PriorityLabel::High);
        assert_eq!(routine, PriorityLabel::Normal);

        let records = list(&gateway, &session).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].priority, PriorityLabel::High);
        assert_eq!(records[0].priority_marker(), "🔴 High");
        assert_eq!(records[1].priority, PriorityLabel::Normal);
        assert_eq!(records[1].priority_marker(), "🟢 Normal");
    }

    #[test]
    fn test_status_update_keeps_priority() {
        let gateway = fixtures::gateway();
        let session = fixtures::session(&gateway);
        let classifier = TriageClassifier::new();
        let apt = seed_apartment(&gateway, &session);

        let (id, _) = add(&gateway, &session, &request(apt, "Gas leak near the stove"), &classifier).unwrap();
        update_status(&gateway, &session, id, MaintenanceStatus::Completed).unwrap();

        let records = list(&gateway, &session).unwrap();
        assert_eq!(records[0].status, MaintenanceStatus::Completed);
        assert_eq!(records[0].priority, PriorityLabel::High);
    }

    #[test]
    fn test_unknown_apartment_rejected_by_store() {
        let gateway = fixtures::gateway();
        let session = fixtures::session(&gateway);
        let classifier = TriageClassifier::new();

        let err = add(&gateway, &session, &request(999, "Broken window"), &classifier).unwrap_err();
        match err {
            RecordError::Query(e) => assert!(e.is_constraint_violation()),
            other => panic!("expected query error, got {:?}", other),
        }
    }

    #[test]
    fn test_delete() {
        let gateway = fixtures::gateway();
        let session = fixtures::session(&gateway);
        let classifier = TriageClassifier::new();
        let apt = seed_apartment(&gateway, &session);
        let (id, _) = add(&gateway, &session, &request(apt, "Squeaky door"), &classifier).unwrap();

        delete(&gateway, &session, id).unwrap();
        assert!(list(&gateway, &session).unwrap().is_empty());
        assert!(matches!(
            delete(&gateway, &session, id).unwrap_err(),
            RecordError::NotFound { .. }
        ));
    }
}
