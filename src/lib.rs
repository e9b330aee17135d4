// Property Operations Console - Core Library
// Exposes all modules for use in the CLI, API server, and tests

pub mod config;
pub mod credentials; // Signup, login, password digests
pub mod dashboard;   // Headline counts
pub mod db;          // Persistence Gateway
pub mod records;     // Tenants, apartments, maintenance
pub mod telemetry;
pub mod triage;      // Maintenance priority classifier
pub mod valuation;   // Apartment price estimate

// Re-export commonly used types
pub use config::{AppConfig, ConfigError, ServerConfig, TelemetryConfig, ValuationConfig};
pub use credentials::{hash_password, CredentialStore, RegistrationError, Session};
pub use dashboard::DashboardSummary;
pub use db::{Ack, Gateway, QueryError, QueryErrorKind, Record, Scalar, Table, Value};
pub use records::{
    Apartment, ApartmentStatus, MaintenanceRecord, MaintenanceStatus, NewApartment,
    NewMaintenance, NewTenant, RecordError, Tenant,
};
pub use triage::{PriorityLabel, TriageClassifier, URGENT_KEYWORDS};
pub use valuation::{FeatureSchema, LinearModel, RegressionModel, ValuationEngine, ValuationError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
