//! # API REST
//!
//! REST API implementation for the referrals service.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (FHIR JSON bodies, problem responses, CORS)
//!
//! Uses `api-shared` for the problem and health bodies and `referrals-core` for everything else.

#![warn(rust_2018_idioms)]

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use api_shared::{HealthRes, HealthService, ProblemDetails, ValidationErrorRes};
use fhir::{Bundle, FHIR_JSON_MEDIA_TYPE};
use referrals_core::{ReferralError, ReferralService};

pub const REST_ADDR_ENV: &str = "REFERRALS_REST_ADDR";
pub const DEFAULT_REST_ADDR: &str = "0.0.0.0:3000";

const REFERRALS_PATH: &str = "/api/v1/referrals";

/// Application state for the REST API server.
#[derive(Clone, Debug)]
pub struct AppState {
    service: ReferralService,
}

impl AppState {
    pub fn new(service: ReferralService) -> Self {
        Self { service }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(health, create_referral, get_referral),
    components(schemas(HealthRes, ProblemDetails, ValidationErrorRes))
)]
pub struct ApiDoc;

type ApiError = (StatusCode, Json<ProblemDetails>);

/// Build the application router with docs and CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(REFERRALS_PATH, post(create_referral))
        .route(&format!("{REFERRALS_PATH}/:id"), get(get_referral))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// The single place a core error becomes an HTTP response.
fn problem(err: ReferralError) -> ApiError {
    let details = ProblemDetails::from_error(&err);
    let status =
        StatusCode::from_u16(details.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if status.is_server_error() {
        tracing::error!("Referral request error: {:?}", err);
    } else {
        tracing::info!("Referral request rejected ({}): {}", status, err);
    }

    (status, Json(details))
}

fn fhir_response(bundle: &Bundle, location: Option<String>) -> Result<Response, ApiError> {
    let body = bundle.render().map_err(|e| problem(e.into()))?;

    let mut response = (
        StatusCode::OK,
        [(header::CONTENT_TYPE, FHIR_JSON_MEDIA_TYPE)],
        body,
    )
        .into_response();

    if let Some(location) = location {
        match location.parse() {
            Ok(value) => {
                response.headers_mut().insert(header::LOCATION, value);
            }
            Err(e) => tracing::warn!("Unrepresentable Location header {}: {}", location, e),
        }
    }

    Ok(response)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/api/v1/referrals",
    request_body(
        content = String,
        content_type = "application/fhir+json",
        description = "FHIR message bundle carrying one referral"
    ),
    responses(
        (status = 200, description = "Referral stored; returns the enriched bundle", content_type = "application/fhir+json", body = String),
        (status = 400, description = "Malformed bundle or failed validation", body = ProblemDetails),
        (status = 429, description = "Store is throttling requests", body = ProblemDetails),
        (status = 500, description = "Storage or internal failure", body = ProblemDetails)
    )
)]
/// Create a referral from a FHIR bundle.
///
/// The bundle is mapped to a referral record, validated and stored. The response is the
/// submitted bundle with the server-assigned case number, referral id and booking date written
/// into it, and a `Location` header naming the stored document.
///
/// # Errors
/// - `400` for broken JSON, a body that is not a referral bundle, or a record that fails
///   validation (every failing field is listed).
/// - `429`/`500` for storage failures, `500` for anything else.
#[axum::debug_handler]
async fn create_referral(
    State(state): State<AppState>,
    body: String,
) -> Result<Response, ApiError> {
    tracing::info!("POST {} ({} bytes)", REFERRALS_PATH, body.len());

    let created = state.service.create_referral(&body).map_err(problem)?;
    let location = format!("{REFERRALS_PATH}/{}", created.id());

    fhir_response(&created.bundle, Some(location))
}

#[utoipa::path(
    get,
    path = "/api/v1/referrals/{id}",
    params(
        ("id" = String, Path, description = "Referral document id (GUID)")
    ),
    responses(
        (status = 200, description = "Bundle synthesized from the stored referral", content_type = "application/fhir+json", body = String),
        (status = 400, description = "Id is not a GUID", body = ProblemDetails),
        (status = 404, description = "No referral with this id", body = ProblemDetails),
        (status = 429, description = "Store is throttling requests", body = ProblemDetails),
        (status = 500, description = "Storage or internal failure", body = ProblemDetails)
    )
)]
/// Fetch a stored referral as a synthesized FHIR bundle.
#[axum::debug_handler]
async fn get_referral(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    tracing::info!("GET {}/{}", REFERRALS_PATH, id);

    if Uuid::parse_str(&id).is_err() {
        tracing::info!("Rejected referral id {}", id);
        return Err((StatusCode::BAD_REQUEST, Json(ProblemDetails::invalid_id(&id))));
    }

    let bundle = state.service.get_referral(&id).map_err(problem)?;
    fhir_response(&bundle, None)
}
