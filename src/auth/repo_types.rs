use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // never exposed in JSON
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: Option<String>,
    pub date_of_birth: Option<Date>,
    pub gender: Option<String>,
    pub location: Option<String>,
    pub created_at: OffsetDateTime,
}

/// Profile-edit payload; identity and credential fields are untouchable here.
#[derive(Debug)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: Option<String>,
    pub date_of_birth: Option<Date>,
    pub gender: Option<String>,
    pub location: Option<String>,
}

/// Candidate for registration, password already hashed by the caller.
#[derive(Debug)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: Option<String>,
    pub date_of_birth: Option<Date>,
    pub gender: Option<String>,
    pub location: Option<String>,
}
