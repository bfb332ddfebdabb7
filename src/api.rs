// 🌐 REST API (axum)
//
// Thin request layer: parse and validate input, call the store or the
// estimator, wrap the result in the ApiResponse envelope. Status codes:
// validation 400, not found 404, storage 500.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::db::SqliteStore;
use crate::entities::{
    EvSpec, EvSpecUpdate, EvValueEstimation, MarketPrice, MarketType, NewEvSpec, NewMarketPrice,
    PriceQuery,
};
use crate::error::Error;
use crate::estimator::{estimate_value, EstimatorConfig};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SqliteStore>,
    pub estimation: Arc<EstimatorConfig>,
}

impl AppState {
    pub fn new(store: SqliteStore, estimation: EstimatorConfig) -> Self {
        Self {
            store: Arc::new(store),
            estimation: Arc::new(estimation),
        }
    }
}

// ============================================================================
// Envelope and errors
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn failure(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(Error::invalid("body", rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError(Error::invalid("path", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError(Error::invalid("query", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        } else {
            warn!(error = %self.0, "request rejected");
        }

        (status, Json(ApiResponse::<()>::failure(self.0.to_string()))).into_response()
    }
}

type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

fn ok<T>(data: T) -> ApiResult<T> {
    Ok((StatusCode::OK, Json(ApiResponse::ok(data))))
}

fn created<T>(data: T) -> ApiResult<T> {
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(data))))
}

// ============================================================================
// Request shapes
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct EstimateRequest {
    pub ev_spec_id: i64,
    pub annual_km: i64,
}

/// Raw query string for GET /api/market-prices
#[derive(Debug, Default, Deserialize)]
pub struct PriceQueryParams {
    pub market_type: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub limit: Option<usize>,
}

fn parse_query_time(field: &str, value: &str) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::invalid(field, format!("expected RFC 3339 timestamp: {}", e)))
}

impl TryFrom<PriceQueryParams> for PriceQuery {
    type Error = Error;

    fn try_from(params: PriceQueryParams) -> Result<Self, Self::Error> {
        let market_type = match params.market_type.as_deref() {
            Some(raw) if !raw.is_empty() => Some(raw.parse::<MarketType>()?),
            _ => None,
        };
        let from = params
            .from
            .as_deref()
            .map(|v| parse_query_time("from", v))
            .transpose()?;
        let to = params
            .to
            .as_deref()
            .map(|v| parse_query_time("to", v))
            .transpose()?;

        let query = PriceQuery {
            market_type,
            from,
            to,
            limit: params.limit,
        };
        query.validate()?;
        Ok(query)
    }
}

// ============================================================================
// Handlers
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

/// GET /api/health
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok(HealthStatus {
        status: "ok".to_string(),
        timestamp: Utc::now(),
    }))
}

/// GET /api/ev-specs
async fn list_ev_specs(State(state): State<AppState>) -> ApiResult<Vec<EvSpec>> {
    ok(state.store.list_ev_specs()?)
}

/// POST /api/ev-specs
async fn create_ev_spec(
    State(state): State<AppState>,
    body: Result<Json<NewEvSpec>, JsonRejection>,
) -> ApiResult<EvSpec> {
    let Json(input) = body?;
    created(state.store.create_ev_spec(&input)?)
}

/// PATCH /api/ev-specs/:id
async fn update_ev_spec(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<EvSpecUpdate>, JsonRejection>,
) -> ApiResult<EvSpec> {
    let Path(id) = id?;
    let Json(update) = body?;
    ok(state.store.update_ev_spec(id, &update)?)
}

/// GET /api/market-prices?market_type=&from=&to=&limit=
async fn list_market_prices(
    State(state): State<AppState>,
    params: Result<Query<PriceQueryParams>, QueryRejection>,
) -> ApiResult<Vec<MarketPrice>> {
    let Query(params) = params?;
    let query = PriceQuery::try_from(params)?;
    ok(state.store.list_market_prices(&query)?)
}

/// POST /api/market-prices
async fn create_market_price(
    State(state): State<AppState>,
    body: Result<Json<NewMarketPrice>, JsonRejection>,
) -> ApiResult<MarketPrice> {
    let Json(input) = body?;
    created(state.store.create_market_price(&input)?)
}

/// POST /api/estimations
async fn create_estimation(
    State(state): State<AppState>,
    body: Result<Json<EstimateRequest>, JsonRejection>,
) -> ApiResult<EvValueEstimation> {
    let Json(request) = body?;
    let estimation = estimate_value(
        state.store.as_ref(),
        &state.estimation,
        request.ev_spec_id,
        request.annual_km,
    )?;
    created(estimation)
}

/// GET /api/estimations
async fn list_estimations(
    State(state): State<AppState>,
) -> ApiResult<Vec<EvValueEstimation>> {
    ok(state.store.list_estimations()?)
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/ev-specs", get(list_ev_specs).post(create_ev_spec))
        .route("/ev-specs/:id", patch(update_ev_spec))
        .route("/market-prices", get(list_market_prices).post(create_market_price))
        .route("/estimations", get(list_estimations).post(create_estimation))
        .with_state(state);

    Router::new().nest("/api", api_routes).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    )
}

// ============================================================================
// TESTS
// ============================================================================
