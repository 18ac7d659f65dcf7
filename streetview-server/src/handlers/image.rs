//! Street View image handler
//!
//! `GET /v1/street-view?latitude=..&longitude=..` with an `x-correlation-id`
//! header. Responds with the raw JPEG bytes or a mapped error.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use streetview_core::image::EXPECTED_CONTENT_TYPE;
use streetview_core::logging::fields;
use streetview_core::{codes, messages, with_correlation_id, RetrievalError, Severity};
use uuid::Uuid;
use utoipa::IntoParams;

use crate::error::ApiError;
use crate::state::AppState;
use crate::validation::validate_correlation_id;

pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StreetViewQuery {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

/// GET /v1/street-view - Street-level photo for a coordinate pair
///
/// Served from cache when possible; otherwise fetched from the imagery API,
/// validated as JPEG and cached.
#[utoipa::path(
    get,
    path = "/v1/street-view",
    tag = "Street View",
    params(
        StreetViewQuery,
        ("x-correlation-id" = String, Header, description = "Version-4 UUID identifying the request")
    ),
    responses(
        (status = 200, description = "JPEG image", content_type = "image/jpeg", body = Vec<u8>),
        (status = 400, description = "Missing or invalid correlation id, or malformed coordinates"),
        (status = 404, description = "No street view imagery at these coordinates"),
        (status = 500, description = "Unknown error, retry later")
    )
)]
pub async fn street_view_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<StreetViewQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let correlation_id = match correlation_id_from(&headers) {
        Ok(id) => id,
        Err(err) => return Err(reject(&state, &err).await),
    };

    let Query(StreetViewQuery {
        latitude,
        longitude,
    }) = query.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;

    let bytes = with_correlation_id(correlation_id, async {
        state
            .logger
            .record(
                Severity::Info,
                "Request received",
                fields([("latitude", json!(latitude)), ("longitude", json!(longitude))]),
            )
            .await;

        match state.handler.handle(latitude, longitude).await {
            Ok(bytes) => Ok(bytes),
            Err(err) => Err(reject(&state, &err).await),
        }
    })
    .await?;

    Ok(([(header::CONTENT_TYPE, EXPECTED_CONTENT_TYPE)], bytes).into_response())
}

/// An absent header counts as empty; a present one that is not visible ASCII
/// can never be a UUID.
fn correlation_id_from(headers: &HeaderMap) -> Result<Uuid, RetrievalError> {
    match headers.get(CORRELATION_ID_HEADER) {
        None => validate_correlation_id(""),
        Some(value) => match value.to_str() {
            Ok(raw) => validate_correlation_id(raw),
            Err(_) => Err(RetrievalError::user(
                codes::INVALID_CORRELATION_ID,
                messages::INVALID_CORRELATION_ID,
            )),
        },
    }
}

async fn reject(state: &AppState, err: &RetrievalError) -> ApiError {
    ApiError::from(state.mapper.map_to_transport_error(Some(err)).await)
}
