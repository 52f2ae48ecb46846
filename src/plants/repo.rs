use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use super::parse::ParsedPlant;
use super::repo_types::PlantIdentification;

const COLUMNS: &str = "id, user_id, plant_name, scientific_name, family, plant_type, \
care_level, description, identified_at";

impl PlantIdentification {
    pub async fn insert(
        db: &PgPool,
        user_id: Uuid,
        plant: &ParsedPlant,
    ) -> anyhow::Result<PlantIdentification> {
        let record = sqlx::query_as::<_, PlantIdentification>(&format!(
            r#"
            INSERT INTO plant_identifications (
                user_id, plant_name, scientific_name, family, plant_type,
                care_level, description
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(&plant.name)
        .bind(&plant.scientific_name)
        .bind(&plant.family)
        .bind(&plant.plant_type)
        .bind(&plant.care_level)
        .bind(&plant.description)
        .fetch_one(db)
        .await
        .context("insert plant identification")?;
        Ok(record)
    }

    pub async fn list_by_user(
        db: &PgPool,
        user_id: Uuid,
        limit: i64,
    ) -> anyhow::Result<Vec<PlantIdentification>> {
        let rows = sqlx::query_as::<_, PlantIdentification>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM plant_identifications
            WHERE user_id = $1
            ORDER BY identified_at DESC
            LIMIT $2
            "#
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(db)
        .await
        .context("list plant identifications")?;
        Ok(rows)
    }
}
