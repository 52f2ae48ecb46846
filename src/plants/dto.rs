use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::parse::ParsedPlant;
use super::repo_types::PlantIdentification;

/// Structured identification returned to the caller. `id` is null when the
/// record could not be persisted after a successful inference.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyResponse {
    pub id: Option<Uuid>,
    pub name: String,
    pub scientific_name: String,
    pub family: String,
    #[serde(rename = "type")]
    pub plant_type: String,
    pub care_level: String,
    pub description: String,
}

impl IdentifyResponse {
    pub fn from_parsed(plant: ParsedPlant, id: Option<Uuid>) -> Self {
        Self {
            id,
            name: plant.name,
            scientific_name: plant.scientific_name,
            family: plant.family,
            plant_type: plant.plant_type,
            care_level: plant.care_level,
            description: plant.description,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentificationListItem {
    pub id: Uuid,
    pub plant_name: String,
    pub scientific_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub identified_at: OffsetDateTime,
}

impl From<PlantIdentification> for IdentificationListItem {
    fn from(record: PlantIdentification) -> Self {
        Self {
            id: record.id,
            plant_name: record.plant_name,
            scientific_name: record.scientific_name,
            identified_at: record.identified_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    10
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CareTipsRequest {
    pub plant_name: String,
    pub plant_type: String,
    pub care_level: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CareTipsResponse {
    pub care_tips: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identify_response_uses_original_field_names() {
        let plant = ParsedPlant {
            name: "Monstera".into(),
            scientific_name: "Monstera deliciosa".into(),
            family: "Araceae".into(),
            plant_type: "Houseplant".into(),
            care_level: "Easy".into(),
            description: "A popular vine".into(),
        };
        let json = serde_json::to_string(&IdentifyResponse::from_parsed(plant, None))
            .expect("serialize");
        assert!(json.contains(r#""scientificName":"Monstera deliciosa""#));
        assert!(json.contains(r#""type":"Houseplant""#));
        assert!(json.contains(r#""careLevel":"Easy""#));
        assert!(json.contains(r#""id":null"#));
    }
}
