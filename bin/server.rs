// Property Operations Console - Web Server
// JSON API over the core services, bearer-token sessions

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, patch, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use uuid::Uuid;

use property_ops::records::{apartment, maintenance, tenant};
use property_ops::{
    dashboard, telemetry, AppConfig, Apartment, ApartmentStatus, CredentialStore,
    DashboardSummary, Gateway, MaintenanceRecord, MaintenanceStatus, NewApartment,
    NewMaintenance, NewTenant, PriorityLabel, QueryError, RecordError, Session, Tenant,
    TriageClassifier, ValuationEngine,
};

/// Shared application state
#[derive(Clone)]
struct AppState {
    gateway: Arc<Gateway>,
    engine: Arc<ValuationEngine>,
    classifier: Arc<TriageClassifier>,
    sessions: Arc<Mutex<HashMap<Uuid, Session>>>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "missing or invalid session token")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "success": false, "error": self.message }));
        (self.status, body).into_response()
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        let status = if err.is_constraint_violation() {
            StatusCode::CONFLICT
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self::new(status, err.to_string())
    }
}

impl From<RecordError> for ApiError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::Query(e) => e.into(),
            RecordError::NotFound { .. } => Self::new(StatusCode::NOT_FOUND, err.to_string()),
            RecordError::Malformed(_) | RecordError::UnknownValue { .. } => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        }
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

// ============================================================================
// Request / Response bodies
// ============================================================================

#[derive(Deserialize)]
struct Credentials {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct LoginResponse {
    token: Uuid,
    username: String,
}

#[derive(Deserialize)]
struct PredictRequest {
    location: String,
    area: f64,
    bathrooms: u32,
    bedrooms: u32,
}

#[derive(Serialize)]
struct PredictResponse {
    price: f64,
    known_location: bool,
}

#[derive(Deserialize)]
struct TriageRequest {
    description: String,
}

#[derive(Serialize)]
struct MaintenanceCreated {
    id: i64,
    priority: PriorityLabel,
}

#[derive(Deserialize)]
struct EmailUpdate {
    email: String,
}

#[derive(Deserialize)]
struct ApartmentStatusUpdate {
    status: ApartmentStatus,
}

#[derive(Deserialize)]
struct MaintenanceStatusUpdate {
    status: MaintenanceStatus,
}

// ============================================================================
// Sessions
// ============================================================================

fn bearer_token(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .and_then(|token| Uuid::parse_str(token.trim()).ok())
}

fn session(state: &AppState, headers: &HeaderMap) -> Result<Session, ApiError> {
    let token = bearer_token(headers).ok_or_else(ApiError::unauthorized)?;
    let sessions = state
        .sessions
        .lock()
        .map_err(|_| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "session table poisoned"))?;
    sessions.get(&token).cloned().ok_or_else(ApiError::unauthorized)
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    ApiResponse::ok("OK")
}

/// POST /api/signup
async fn signup(State(state): State<AppState>, Json(body): Json<Credentials>) -> ApiResult<&'static str> {
    CredentialStore::new(&state.gateway)
        .register(&body.username, &body.password)
        .map_err(|e| ApiError::new(StatusCode::CONFLICT, e.to_string()))?;
    Ok(ApiResponse::ok("Account created successfully"))
}

/// POST /api/login - returns a bearer token
async fn login(State(state): State<AppState>, Json(body): Json<Credentials>) -> ApiResult<LoginResponse> {
    let session = CredentialStore::new(&state.gateway)
        .login(&body.username, &body.password)
        .ok_or_else(|| ApiError::new(StatusCode::UNAUTHORIZED, "Invalid credentials"))?;

    let response = LoginResponse {
        token: session.id(),
        username: session.username().to_string(),
    };
    state
        .sessions
        .lock()
        .map_err(|_| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "session table poisoned"))?
        .insert(session.id(), session);

    Ok(ApiResponse::ok(response))
}

/// POST /api/logout
async fn logout(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<&'static str> {
    let session = session(&state, &headers)?;
    state
        .sessions
        .lock()
        .map_err(|_| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "session table poisoned"))?
        .remove(&session.id());
    info!(username = session.username(), "logged out");
    Ok(ApiResponse::ok("Logged out successfully"))
}

/// GET /api/locations - location columns known to the price model
async fn locations(State(state): State<AppState>) -> ApiResult<Vec<String>> {
    Ok(ApiResponse::ok(state.engine.locations().to_vec()))
}

/// POST /api/predict
async fn predict(State(state): State<AppState>, Json(body): Json<PredictRequest>) -> ApiResult<PredictResponse> {
    let price = state
        .engine
        .predict(&body.location, body.area, body.bathrooms, body.bedrooms);
    let known_location = state.engine.schema().location_index(&body.location).is_some();
    Ok(ApiResponse::ok(PredictResponse {
        price,
        known_location,
    }))
}

/// POST /api/triage
async fn triage(State(state): State<AppState>, Json(body): Json<TriageRequest>) -> ApiResult<PriorityLabel> {
    Ok(ApiResponse::ok(state.classifier.classify(&body.description)))
}

/// GET /api/dashboard
async fn get_dashboard(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<DashboardSummary> {
    let session = session(&state, &headers)?;
    Ok(ApiResponse::ok(dashboard::summary(&state.gateway, &session)?))
}

async fn list_tenants(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Vec<Tenant>> {
    let session = session(&state, &headers)?;
    Ok(ApiResponse::ok(tenant::list(&state.gateway, &session)?))
}

async fn add_tenant(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<NewTenant>,
) -> ApiResult<i64> {
    let session = session(&state, &headers)?;
    Ok(ApiResponse::ok(tenant::add(&state.gateway, &session, &body)?))
}

async fn update_tenant(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<EmailUpdate>,
) -> ApiResult<i64> {
    let session = session(&state, &headers)?;
    tenant::update_email(&state.gateway, &session, id, &body.email)?;
    Ok(ApiResponse::ok(id))
}

async fn delete_tenant(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> ApiResult<i64> {
    let session = session(&state, &headers)?;
    tenant::delete(&state.gateway, &session, id)?;
    Ok(ApiResponse::ok(id))
}

async fn list_apartments(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Vec<Apartment>> {
    let session = session(&state, &headers)?;
    Ok(ApiResponse::ok(apartment::list(&state.gateway, &session)?))
}

async fn add_apartment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<NewApartment>,
) -> ApiResult<i64> {
    let session = session(&state, &headers)?;
    Ok(ApiResponse::ok(apartment::add(&state.gateway, &session, &body)?))
}

async fn update_apartment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<ApartmentStatusUpdate>,
) -> ApiResult<i64> {
    let session = session(&state, &headers)?;
    apartment::update_status(&state.gateway, &session, id, body.status)?;
    Ok(ApiResponse::ok(id))
}

async fn delete_apartment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> ApiResult<i64> {
    let session = session(&state, &headers)?;
    apartment::delete(&state.gateway, &session, id)?;
    Ok(ApiResponse::ok(id))
}

async fn list_maintenance(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Vec<MaintenanceRecord>> {
    let session = session(&state, &headers)?;
    Ok(ApiResponse::ok(maintenance::list(&state.gateway, &session)?))
}

async fn add_maintenance(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<NewMaintenance>,
) -> ApiResult<MaintenanceCreated> {
    let session = session(&state, &headers)?;
    let (id, priority) = maintenance::add(&state.gateway, &session, &body, &state.classifier)?;
    Ok(ApiResponse::ok(MaintenanceCreated { id, priority }))
}

async fn update_maintenance(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<MaintenanceStatusUpdate>,
) -> ApiResult<i64> {
    let session = session(&state, &headers)?;
    maintenance::update_status(&state.gateway, &session, id, body.status)?;
    Ok(ApiResponse::ok(id))
}

async fn delete_maintenance(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> ApiResult<i64> {
    let session = session(&state, &headers)?;
    maintenance::delete(&state.gateway, &session, id)?;
    Ok(ApiResponse::ok(id))
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let gateway = Gateway::open(&config.database_path).map_err(|e| {
        error!(path = ?config.database_path, error = %e, "database unavailable");
        e
    })?;
    let engine = ValuationEngine::load(&config.valuation.columns_path, &config.valuation.model_path)?;

    let state = AppState {
        gateway: Arc::new(gateway),
        engine: Arc::new(engine),
        classifier: Arc::new(TriageClassifier::new()),
        sessions: Arc::new(Mutex::new(HashMap::new())),
    };

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/locations", get(locations))
        .route("/predict", post(predict))
        .route("/triage", post(triage))
        .route("/dashboard", get(get_dashboard))
        .route("/tenants", get(list_tenants).post(add_tenant))
        .route("/tenants/:id", patch(update_tenant).delete(delete_tenant))
        .route("/apartments", get(list_apartments).post(add_apartment))
        .route("/apartments/:id", patch(update_apartment).delete(delete_apartment))
        .route("/maintenance", get(list_maintenance).post(add_maintenance))
        .route("/maintenance/:id", patch(update_maintenance).delete(delete_maintenance))
        .with_state(state);

    let app = Router::new()
        .nest("/api", api_routes)
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()));

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "server listening");

    axum::serve(listener, app).await?;
    Ok(())
}
