use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

mod config;
mod error;
mod models;
mod projections;
mod source;


use config::ServerConfig;
use error::{ApiError, StartupError};
use models::{ApiResponse, ApprovalStatus, BookingUpdate, BookingView, Client, NewBooking};
use projections::{filter_clients, BookingClassifier, ClassificationFilters, ClassificationResult};
use source::{demo_bookings, demo_clients, load_json_seed, BookingSource, BookingStore, Clock, ClientStore, SystemClock};

/// Booking dashboard API
/// Every read recomputes its projection from the current store snapshot
#[derive(Clone)]
struct AppState {
    bookings: Arc<BookingStore>,
    clients: Arc<ClientStore>,
    clock: Arc<dyn Clock>,
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    // RUST_LOG overrides the default level
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let config = ServerConfig::from_env()?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let bookings = match &config.bookings_file {
        Some(path) => load_json_seed(path)?,
        None => {
            log::info!("No bookings file configured, using demo bookings");
            demo_bookings(clock.now())
        }
    };
    let clients = match &config.clients_file {
        Some(path) => load_json_seed(path)?,
        None => demo_clients(),
    };

    let state = AppState {
        bookings: Arc::new(BookingStore::new(bookings)),
        clients: Arc::new(ClientStore::new(clients)),
        clock,
    };

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    log::info!("Server running on http://{}", config.bind_addr);
    axum::serve(listener, app(state)).await?;
    Ok(())
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/bookings", get(list_bookings).post(create_booking))
        .route(
            "/bookings/:id",
            get(get_booking).patch(update_booking).delete(delete_booking),
        )
        .route("/bookings/:id/approve", post(approve_booking))
        .route("/bookings/:id/reject", post(reject_booking))
        .route("/events", get(classify_events))
        .route("/clients", get(list_clients))
        .route("/clients/:id", axum::routing::delete(delete_client))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn root() -> &'static str {
    "VIP Concierge Bookings API v0.1.0"
}

async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": state.clock.now().to_rfc3339(),
    }))
}

async fn list_bookings(State(state): State<AppState>) -> Json<Vec<BookingView>> {
    Json(
        state
            .bookings
            .list_bookings()
            .into_iter()
            .map(BookingView::from)
            .collect(),
    )
}

async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BookingView>, ApiError> {
    state
        .bookings
        .get(&id)
        .map(|record| Json(BookingView::from(record)))
        .ok_or(ApiError::BookingNotFound(id))
}

async fn create_booking(
    State(state): State<AppState>,
    Json(input): Json<NewBooking>,
) -> Result<(StatusCode, Json<ApiResponse>), ApiError> {
    let record = state.bookings.create(input, state.clock.now())?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            format!(
                "VIP booking for {} has been scheduled",
                record.client_name.as_deref().unwrap_or_default()
            ),
            Some(serde_json::json!({ "booking": BookingView::from(record) })),
        )),
    ))
}

async fn update_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<BookingUpdate>,
) -> Result<Json<ApiResponse>, ApiError> {
    let record = state.bookings.update(&id, input)?;
    Ok(Json(ApiResponse::success(
        format!("Event updated: {}", record.id),
        Some(serde_json::json!({ "booking": BookingView::from(record) })),
    )))
}

async fn approve_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse>, ApiError> {
    update_approval(&state, &id, ApprovalStatus::Approved)
}

async fn reject_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse>, ApiError> {
    update_approval(&state, &id, ApprovalStatus::Rejected)
}

fn update_approval(
    state: &AppState,
    id: &str,
    approval: ApprovalStatus,
) -> Result<Json<ApiResponse>, ApiError> {
    let record = state.bookings.set_approval(id, approval)?;
    Ok(Json(ApiResponse::success(
        format!(
            "Event {}: {}",
            models::approval_label(record.approval_status.as_ref()).to_lowercase(),
            record.id
        ),
        Some(serde_json::json!({ "booking": BookingView::from(record) })),
    )))
}

async fn delete_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse>, ApiError> {
    let removed = state.bookings.delete(&id)?;
    Ok(Json(ApiResponse::success(
        format!("Event deleted: {}", removed.id),
        None,
    )))
}

#[derive(Debug, Deserialize)]
struct EventsQuery {
    search: Option<String>,
    status: Option<String>,
    /// RFC 3339 reference instant; the server clock when absent
    now: Option<String>,
}

/// Upcoming/previous buckets and summary metrics
async fn classify_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<ClassificationResult>, ApiError> {
    let now = match query.now.as_deref() {
        Some(raw) => parse_reference_time(raw)?,
        None => state.clock.now(),
    };
    let filters = ClassificationFilters::new(query.search.as_deref(), query.status.as_deref());

    Ok(Json(classify_from(state.bookings.as_ref(), now, &filters)))
}

fn classify_from<S: BookingSource + ?Sized>(
    source: &S,
    now: DateTime<Utc>,
    filters: &ClassificationFilters,
) -> ClassificationResult {
    let records = source.list_bookings();
    BookingClassifier::new(&records).classify(Some(now), filters)
}

fn parse_reference_time(raw: &str) -> Result<DateTime<Utc>, ApiError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ApiError::BadQuery(format!("now must be an RFC 3339 timestamp, got '{}'", raw)))
}

#[derive(Debug, Deserialize)]
struct ClientsQuery {
    search: Option<String>,
}

async fn list_clients(
    State(state): State<AppState>,
    Query(query): Query<ClientsQuery>,
) -> Json<serde_json::Value> {
    let clients = state.clients.list_clients();
    let matching: Vec<&Client> = filter_clients(&clients, query.search.as_deref().unwrap_or_default());

    Json(serde_json::json!({
        "clients": matching,
        "count": matching.len(),
    }))
}

async fn delete_client(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse>, ApiError> {
    let removed = state.clients.delete(&id)?;
    Ok(Json(ApiResponse::success(
        format!("{} has been removed from the client database", removed.full_name),
        None,
    )))
}
