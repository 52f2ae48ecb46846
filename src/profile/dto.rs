use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::auth::repo_types::User;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
    pub location: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub join_date: OffsetDateTime,
}

impl From<User> for ProfileResponse {
    fn from(user: User) -> Self {
        Self {
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            display_name: user.display_name,
            date_of_birth: user.date_of_birth.map(|d| d.to_string()),
            gender: user.gender,
            location: user.location,
            join_date: user.created_at,
        }
    }
}

/// Profile edits only touch the optional descriptive fields; username,
/// email and password have their own flows.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
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
pub struct DeleteAccountRequest {
    pub confirmation: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};
    use uuid::Uuid;

    #[test]
    fn profile_response_uses_camel_case() {
        let user = User {
            id: Uuid::new_v4(),
            username: "fern".into(),
            email: "fern@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            first_name: Some("Fern".into()),
            last_name: None,
            display_name: None,
            date_of_birth: Some(date!(1990 - 04 - 01)),
            gender: None,
            location: None,
            created_at: datetime!(2024-01-15 12:00 UTC),
        };
        let json = serde_json::to_string(&ProfileResponse::from(user)).expect("serialize");
        assert!(json.contains(r#""firstName":"Fern""#));
        assert!(json.contains(r#""dateOfBirth":"1990-04-01""#));
        assert!(json.contains(r#""joinDate""#));
        assert!(!json.contains("password"));
    }
}
