use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use axum_extra::extract::CookieJar;
use time::{macros::format_description, Date};
use tracing::{info, instrument};

use crate::{
    auth::{
        dto::StatusResponse,
        extractors::AuthUser,
        jwt::clear_session_cookie,
        repo_types::{ProfileUpdate, User},
    },
    error::ApiError,
    state::AppState,
};

use super::dto::{DeleteAccountRequest, ProfileResponse, UpdateProfileRequest};

pub fn profile_routes() -> Router<AppState> {
    Router::new().route(
        "/profile",
        get(get_profile).put(update_profile).delete(delete_account),
    )
}

#[instrument(skip(state))]
async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    Ok(Json(ProfileResponse::from(user)))
}

#[instrument(skip(state, payload))]
async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let date_of_birth = match payload.date_of_birth.as_deref() {
        None => None,
        Some(raw) => {
            let format = format_description!("[year]-[month]-[day]");
            Some(
                Date::parse(raw, &format)
                    .map_err(|_| ApiError::Validation("Invalid date of birth".into()))?,
            )
        }
    };

    let update = ProfileUpdate {
        first_name: payload.first_name,
        last_name: payload.last_name,
        display_name: payload.display_name,
        date_of_birth,
        gender: payload.gender,
        location: payload.location,
    };

    let updated = User::update_profile(&state.db, user_id, &update).await?;
    if !updated {
        return Err(ApiError::NotFound("User not found".into()));
    }

    info!(user_id = %user_id, "profile updated");
    Ok(Json(StatusResponse::ok("Profile updated successfully")))
}

/// Irreversible: requires the literal confirmation string and removes the
/// user together with every owned identification in one transaction.
#[instrument(skip(state, jar, payload))]
async fn delete_account(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    jar: CookieJar,
    Json(payload): Json<DeleteAccountRequest>,
) -> Result<(CookieJar, Json<StatusResponse>), ApiError> {
    if payload.confirmation != "delete" {
        return Err(ApiError::Validation(
            "Type \"delete\" to confirm account deletion".into(),
        ));
    }

    let deleted = User::delete_with_identifications(&state.db, user_id).await?;
    if !deleted {
        return Err(ApiError::NotFound("User not found".into()));
    }

    info!(user_id = %user_id, "account deleted");
    let jar = jar.add(clear_session_cookie(state.config.production));
    Ok((jar, Json(StatusResponse::ok("Account deleted successfully"))))
}
