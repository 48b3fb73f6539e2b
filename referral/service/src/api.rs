// Copyright (c) 2024 The Botho Foundation

//! HTTP API for the referral service
//!
//! Endpoints:
//! - GET /api/stats/:address
//! - GET /api/leaderboard
//! - POST /api/referral
//! - GET /health

use anyhow::Result;
use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Path, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bth_referral_core::{
    ErrorResponse, LeaderboardEntry, ReferralError, RegisterReferralRequest,
    RegisterReferralResponse, ServerSettings, UserStats,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{debug, error, info};

use crate::service::ReferralService;

/// Error returned by handlers.
#[derive(Debug)]
pub enum ApiError {
    /// A referral operation failed
    Referral(ReferralError),
    /// The request body was rejected before reaching the service
    Rejected { status: StatusCode, message: String },
    /// A blocking task panicked or was cancelled
    Internal(String),
}

impl From<ReferralError> for ApiError {
    fn from(err: ReferralError) -> Self {
        ApiError::Referral(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Referral(err) if err.is_client_error() => {
                debug!("Rejected request: {}", err);
                (StatusCode::BAD_REQUEST, err.message())
            }
            ApiError::Referral(err) => {
                error!("Referral store error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, err.message())
            }
            ApiError::Rejected { status, message } => {
                debug!("Rejected request body ({}): {}", status, message);
                (status, message)
            }
            ApiError::Internal(message) => {
                error!("Internal error: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    bth_referral_core::error::INTERNAL_ERROR_MESSAGE.to_string(),
                )
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// Build the API router.
pub fn router(service: ReferralService, settings: &ServerSettings) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/stats/:address", get(stats))
        .route("/api/leaderboard", get(leaderboard))
        .route("/api/referral", post(register_referral))
        .layer(DefaultBodyLimit::max(settings.max_body_bytes))
        .layer(cors_layer(settings))
        .with_state(service)
}

/// Start the API server
pub async fn serve(service: ReferralService, settings: &ServerSettings) -> Result<()> {
    let app = router(service, settings);

    let listener = tokio::net::TcpListener::bind(&settings.listen_addr).await?;
    info!("Referral API listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Referral API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}

fn cors_layer(settings: &ServerSettings) -> CorsLayer {
    let origins = if settings.allowed_origins.is_empty() {
        AllowOrigin::predicate(|origin: &HeaderValue, _| {
            origin.to_str().map(is_localhost_origin).unwrap_or(false)
        })
    } else {
        AllowOrigin::list(
            settings
                .allowed_origins
                .iter()
                .filter_map(|origin| HeaderValue::from_str(origin).ok()),
        )
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}

/// `http://localhost` with an optional numeric port.
fn is_localhost_origin(origin: &str) -> bool {
    match origin.strip_prefix("http://localhost") {
        Some("") => true,
        Some(rest) => rest
            .strip_prefix(':')
            .map(|port| !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()))
            .unwrap_or(false),
        None => false,
    }
}

/// Run a store operation on the blocking thread pool.
async fn blocking<T, F>(op: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ReferralError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ApiError::from)
}

/// Map a JSON extraction failure. Undecodable bodies are reported as 400;
/// other statuses (413 for oversized bodies, 415 for a wrong content type)
/// are kept.
fn body_rejection(rejection: JsonRejection) -> ApiError {
    let status = match rejection.status() {
        StatusCode::UNPROCESSABLE_ENTITY => StatusCode::BAD_REQUEST,
        status => status,
    };
    ApiError::Rejected {
        status,
        message: rejection.body_text(),
    }
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    "OK"
}

/// Stats for one address, creating the user on first lookup
async fn stats(
    State(service): State<ReferralService>,
    Path(address): Path<String>,
) -> Result<Json<UserStats>, ApiError> {
    let stats = blocking(move || service.get_stats(&address)).await?;
    Ok(Json(stats))
}

/// Top referrers
async fn leaderboard(
    State(service): State<ReferralService>,
) -> Result<Json<Vec<LeaderboardEntry>>, ApiError> {
    let entries = blocking(move || service.leaderboard()).await?;
    Ok(Json(entries))
}

/// Register a new referral
async fn register_referral(
    State(service): State<ReferralService>,
    payload: Result<Json<RegisterReferralRequest>, JsonRejection>,
) -> Result<Json<RegisterReferralResponse>, ApiError> {
    let Json(request) = payload.map_err(body_rejection)?;
    let response = blocking(move || service.register_referral(&request)).await?;
    Ok(Json(response))
}
