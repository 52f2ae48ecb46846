use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use bytes::Bytes;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::extractors::AuthUser,
    error::ApiError,
    inference::InferenceError,
    state::AppState,
};

use super::dto::{
    CareTipsRequest, CareTipsResponse, IdentificationListItem, IdentifyResponse, ListQuery,
};
use super::image::{downscale_if_large, RESIZE_THRESHOLD_BYTES};
use super::parse::parse_plant_reply;
use super::repo_types::PlantIdentification;

const MAX_LIST_LIMIT: i64 = 50;
const CARE_TIPS_FALLBACK: &str = "Sorry, I couldn't generate care tips at this time.";

pub fn plant_routes() -> Router<AppState> {
    Router::new()
        .route("/identify-plant", post(identify_plant))
        .route("/plant-identifications", get(list_identifications))
        .route("/generate-care-tips", post(generate_care_tips))
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024)) // 10MB upload cap
}

async fn read_image_field(multipart: &mut Multipart) -> Result<Option<Bytes>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(e.to_string()))?
    {
        if field.name() == Some("image") {
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::Validation(e.to_string()))?;
            return Ok(Some(data));
        }
    }
    Ok(None)
}

#[instrument(skip(state, multipart))]
async fn identify_plant(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut multipart: Multipart,
) -> Result<Json<IdentifyResponse>, ApiError> {
    let image = read_image_field(&mut multipart)
        .await?
        .ok_or_else(|| ApiError::Validation("No image provided".into()))?;
    if image.is_empty() {
        return Err(ApiError::Validation("No image provided".into()));
    }

    let prepared = downscale_if_large(image, RESIZE_THRESHOLD_BYTES)
        .map_err(|_| ApiError::Validation("Unsupported image".into()))?;
    let encoded = BASE64.encode(&prepared);

    let reply = state
        .inference
        .identify_plant(&encoded)
        .await
        .map_err(|e| match e {
            InferenceError::Unavailable(e) => ApiError::InferenceUnavailable(e),
            InferenceError::Malformed(detail) => ApiError::InferenceFailed(detail),
        })?;

    let plant = parse_plant_reply(&reply).map_err(|e| ApiError::InferenceFailed(e.to_string()))?;

    // A write failure after a successful inference still returns the parsed
    // record; the caller sees id: null and the divergence is logged.
    let id = match PlantIdentification::insert(&state.db, user_id, &plant).await {
        Ok(record) => Some(record.id),
        Err(e) => {
            error!(user_id = %user_id, error = %e, "identification computed but not persisted");
            None
        }
    };

    info!(user_id = %user_id, plant = %plant.name, persisted = id.is_some(), "plant identified");
    Ok(Json(IdentifyResponse::from_parsed(plant, id)))
}

#[instrument(skip(state))]
async fn list_identifications(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<IdentificationListItem>>, ApiError> {
    let limit = query.limit.clamp(1, MAX_LIST_LIMIT);
    let records = PlantIdentification::list_by_user(&state.db, user_id, limit).await?;
    Ok(Json(
        records.into_iter().map(IdentificationListItem::from).collect(),
    ))
}

/// Best-effort enrichment: an inference failure degrades to a static
/// fallback message instead of an error, and nothing is persisted.
#[instrument(skip(state, payload))]
async fn generate_care_tips(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CareTipsRequest>,
) -> Result<Json<CareTipsResponse>, ApiError> {
    let care_tips = match state
        .inference
        .generate_care_tips(
            &payload.plant_name,
            &payload.plant_type,
            &payload.care_level,
        )
        .await
    {
        Ok(tips) => tips,
        Err(e) => {
            warn!(user_id = %user_id, error = %e, "care tips degraded to fallback");
            CARE_TIPS_FALLBACK.to_string()
        }
    };
    Ok(Json(CareTipsResponse { care_tips }))
}
