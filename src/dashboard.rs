// 📊 Dashboard - headline counts for the operator

use crate::credentials::Session;
use crate::db::{Gateway, QueryError};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub occupied_apartments: i64,
    pub total_tenants: i64,
    pub maintenance_due: i64,
    pub high_priority_due: i64,
}

/// Four COUNT queries; an empty result reads as 0.
pub fn summary(gateway: &Gateway, _session: &Session) -> Result<DashboardSummary, QueryError> {
    let count = |query: &str| -> Result<i64, QueryError> {
        Ok(gateway.fetch_scalar(query, [])?.as_i64())
    };

    Ok(DashboardSummary {
        occupied_apartments: count("SELECT COUNT(*) FROM apartments WHERE status = 'Occupied'")?,
        total_tenants: count("SELECT COUNT(*) FROM tenants")?,
        maintenance_due: count("SELECT COUNT(*) FROM maintenance WHERE status = 'Due'")?,
        high_priority_due: count(
            "SELECT COUNT(*) FROM maintenance WHERE priority = 'High Priority' AND status = 'Due'",
        )?,
    })
}
