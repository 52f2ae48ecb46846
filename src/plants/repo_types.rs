use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Persisted identification record. Immutable once created; removed only by
/// the cascading account deletion.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PlantIdentification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plant_name: String,
    pub scientific_name: String,
    pub family: String,
    pub plant_type: String,
    pub care_level: String,
    pub description: String,
    pub identified_at: OffsetDateTime,
}
