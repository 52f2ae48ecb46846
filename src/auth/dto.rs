use serde::{Deserialize, Serialize};

/// Request body for user registration. The date of birth arrives as an
/// ISO `YYYY-MM-DD` string and is parsed at the handler boundary.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub otp: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SendOtpRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckAvailabilityRequest {
    pub username: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email: String,
    pub otp: String,
    pub new_password: String,
}

/// Uniform `{success, message}` body for the auth flows.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub success: bool,
    pub message: String,
}

impl StatusResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckAuthResponse {
    pub is_authenticated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_request_accepts_camel_case() {
        let body = r#"{
            "username": "fern",
            "email": "fern@example.com",
            "password": "hunter2hunter2",
            "otp": "042137",
            "firstName": "Fern",
            "dateOfBirth": "1990-04-01"
        }"#;
        let req: RegisterRequest = serde_json::from_str(body).expect("parse");
        assert_eq!(req.first_name.as_deref(), Some("Fern"));
        assert_eq!(req.date_of_birth.as_deref(), Some("1990-04-01"));
        assert!(req.last_name.is_none());
    }

    #[test]
    fn status_response_shape() {
        let json = serde_json::to_string(&StatusResponse::ok("done")).expect("serialize");
        assert!(json.contains(r#""success":true"#));
        assert!(json.contains(r#""message":"done""#));
    }
}
