use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::CookieJar;
use lazy_static::lazy_static;
use regex::Regex;
use time::{macros::format_description, Date};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            ChangePasswordRequest, CheckAuthResponse, CheckAvailabilityRequest,
            ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest,
            SendOtpRequest, StatusResponse,
        },
        extractors::AuthUser,
        jwt::{clear_session_cookie, session_cookie, JwtKeys, SESSION_COOKIE},
        password::{hash_password, verify_password},
        repo::is_unique_violation,
        repo_types::{NewUser, User},
    },
    error::ApiError,
    otp::{service as otp_service, service::OtpIssueError, OtpPurpose},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/send-otp", post(send_otp))
        .route("/check-availability", post(check_availability))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/check-auth", get(check_auth))
        .route("/change-password", post(change_password))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn parse_date_of_birth(raw: Option<&str>) -> Result<Option<Date>, ApiError> {
    let Some(raw) = raw else { return Ok(None) };
    let format = format_description!("[year]-[month]-[day]");
    Date::parse(raw, &format)
        .map(Some)
        .map_err(|_| ApiError::Validation("Invalid date of birth".into()))
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < 8 {
        return Err(ApiError::Validation("Password too short".into()));
    }
    Ok(())
}

#[instrument(skip(state, payload))]
async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<StatusResponse>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    payload.username = payload.username.trim().to_string();

    if payload.username.is_empty() {
        return Err(ApiError::Validation("Username is required".into()));
    }
    if !is_valid_email(&payload.email) {
        return Err(ApiError::Validation("Invalid email".into()));
    }
    validate_password(&payload.password)?;
    let date_of_birth = parse_date_of_birth(payload.date_of_birth.as_deref())?;

    // Conflict check comes first: verifying consumes the code, and a
    // rejected registration must leave it usable for the retry.
    if User::username_or_email_taken(&state.db, &payload.username, &payload.email).await? {
        return Err(ApiError::Conflict("Username or email already exists".into()));
    }

    let verified = otp_service::verify(
        &state,
        &payload.email,
        &payload.otp,
        OtpPurpose::Registration,
    )
    .await?;
    if !verified {
        warn!(email = %payload.email, "registration with invalid or expired otp");
        return Err(ApiError::Validation("Invalid or expired OTP".into()));
    }

    let candidate = NewUser {
        username: payload.username,
        email: payload.email.clone(),
        password_hash: hash_password(&payload.password)?,
        first_name: payload.first_name,
        last_name: payload.last_name,
        display_name: payload.display_name,
        date_of_birth,
        gender: payload.gender,
        location: payload.location,
    };

    let user = User::create(&state.db, &candidate).await.map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::Conflict("Username or email already exists".into())
        } else {
            ApiError::Internal(e)
        }
    })?;

    // Any other outstanding registration codes for this address are dead now
    otp_service::discard_all(&state, &payload.email, OtpPurpose::Registration).await?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(StatusResponse::ok("User registered successfully")),
    ))
}

#[instrument(skip(state, payload))]
async fn send_otp(
    State(state): State<AppState>,
    Json(payload): Json<SendOtpRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let email = payload.email.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(ApiError::Validation("Invalid email".into()));
    }

    otp_service::issue(&state, &email, OtpPurpose::Registration)
        .await
        .map_err(|e| match e {
            OtpIssueError::RateLimited => ApiError::TooManyRequests(e.to_string()),
            OtpIssueError::Other(e) => ApiError::Internal(e),
        })?;

    Ok(Json(StatusResponse::ok("OTP sent successfully")))
}

#[instrument(skip(state, payload))]
async fn check_availability(
    State(state): State<AppState>,
    Json(payload): Json<CheckAvailabilityRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let email = payload.email.trim().to_lowercase();
    let username = payload.username.trim();

    if User::username_or_email_taken(&state.db, username, &email).await? {
        return Err(ApiError::Conflict("Username or email already exists".into()));
    }
    Ok(Json(StatusResponse::ok("Username and email are available")))
}

#[instrument(skip(state, jar, payload))]
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<StatusResponse>), ApiError> {
    let user = User::find_by_username(&state.db, payload.username.trim())
        .await?
        .ok_or_else(|| {
            warn!(username = %payload.username, "login unknown username");
            ApiError::Unauthorized("Invalid credentials".into())
        })?;

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id)?;
    let jar = jar.add(session_cookie(
        token,
        keys.ttl_seconds(),
        state.config.production,
    ));

    info!(user_id = %user.id, username = %user.username, "user logged in");
    Ok((jar, Json(StatusResponse::ok("Logged in"))))
}

#[instrument(skip(state, jar))]
async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Json<StatusResponse>) {
    let jar = jar.add(clear_session_cookie(state.config.production));
    (jar, Json(StatusResponse::ok("Logged out")))
}

#[instrument(skip(state, jar))]
async fn check_auth(State(state): State<AppState>, jar: CookieJar) -> Response {
    let keys = JwtKeys::from_ref(&state);
    let authenticated = jar
        .get(SESSION_COOKIE)
        .map(|c| keys.verify(c.value()).is_ok())
        .unwrap_or(false);

    let body = Json(CheckAuthResponse {
        is_authenticated: authenticated,
    });
    if authenticated {
        body.into_response()
    } else {
        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}

#[instrument(skip(state, payload))]
async fn change_password(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    validate_password(&payload.new_password)?;

    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    if !verify_password(&payload.current_password, &user.password_hash)? {
        return Err(ApiError::Validation("Current password is incorrect".into()));
    }

    let hash = hash_password(&payload.new_password)?;
    User::update_password(&state.db, user_id, &hash).await?;

    info!(user_id = %user_id, "password changed");
    Ok(Json(StatusResponse::ok("Password changed successfully")))
}

#[instrument(skip(state, payload))]
async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let email = payload.email.trim().to_lowercase();

    if User::find_by_email(&state.db, &email).await?.is_none() {
        return Err(ApiError::NotFound("Email not found".into()));
    }

    otp_service::issue(&state, &email, OtpPurpose::PasswordReset)
        .await
        .map_err(|e| match e {
            OtpIssueError::RateLimited => ApiError::TooManyRequests(e.to_string()),
            OtpIssueError::Other(e) => ApiError::Internal(e),
        })?;

    Ok(Json(StatusResponse::ok("OTP sent successfully")))
}

#[instrument(skip(state, payload))]
async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let email = payload.email.trim().to_lowercase();
    validate_password(&payload.new_password)?;

    let verified =
        otp_service::verify(&state, &email, &payload.otp, OtpPurpose::PasswordReset).await?;
    if !verified {
        warn!(email = %email, "password reset with invalid or expired otp");
        return Err(ApiError::Validation("Invalid or expired OTP".into()));
    }

    let hash = hash_password(&payload.new_password)?;
    User::update_password_by_email(&state.db, &email, &hash).await?;
    otp_service::discard_all(&state, &email, OtpPurpose::PasswordReset).await?;

    info!(email = %email, "password reset");
    Ok(Json(StatusResponse::ok("Password reset successfully")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("a.b+c@sub.domain.org"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("user@nodot"));
        assert!(!is_valid_email("spaces in@example.com"));
    }

    #[test]
    fn date_of_birth_parsing() {
        assert_eq!(parse_date_of_birth(None).expect("none"), None);
        let parsed = parse_date_of_birth(Some("1990-04-01")).expect("valid");
        assert_eq!(parsed.map(|d| d.to_string()), Some("1990-04-01".into()));
        assert!(parse_date_of_birth(Some("01/04/1990")).is_err());
    }

    #[test]
    fn password_length_rule() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("long-enough").is_ok());
    }

    // Needs a migrated Postgres at DATABASE_URL; run with `cargo test -- --ignored`.
    #[tokio::test]
    #[ignore]
    async fn rejected_registration_leaves_otp_usable() {
        use sqlx::postgres::PgPoolOptions;

        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL");
        let mut state = AppState::fake();
        state.db = PgPoolOptions::new()
            .max_connections(2)
            .connect(&url)
            .await
            .expect("connect to test database");

        let tag = uuid::Uuid::new_v4().simple().to_string();
        let taken_username = format!("taken-{tag}");
        let seed = NewUser {
            username: taken_username.clone(),
            email: format!("seed-{tag}@example.com"),
            password_hash: hash_password("long-enough-pw").expect("hash"),
            first_name: None,
            last_name: None,
            display_name: None,
            date_of_birth: None,
            gender: None,
            location: None,
        };
        User::create(&state.db, &seed).await.expect("seed user");

        let email = format!("retry-{tag}@example.com");
        crate::otp::repo::insert(&state.db, &email, "123456", OtpPurpose::Registration)
            .await
            .expect("seed otp");

        let payload = RegisterRequest {
            username: taken_username,
            email: email.clone(),
            password: "long-enough-pw".into(),
            otp: "123456".into(),
            first_name: None,
            last_name: None,
            display_name: None,
            date_of_birth: None,
            gender: None,
            location: None,
        };
        let err = register(State(state.clone()), Json(payload))
            .await
            .expect_err("username is taken");
        assert!(matches!(err, ApiError::Conflict(_)));

        // The code survives the rejected attempt, so retrying with a free
        // username still succeeds.
        let still_valid = otp_service::verify(&state, &email, "123456", OtpPurpose::Registration)
            .await
            .expect("verify");
        assert!(still_valid);
    }
}
