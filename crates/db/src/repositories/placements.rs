use aisle_core::chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};

use aisle_core::domain::placement::{Placement, PlacementId, PlacementStatus};

use super::{PlacementRepository, RepositoryError};
use crate::DbPool;

/// Task-result store for background placements: the submitting caller gets
/// an immediate 202, so this table is where a placement's fate is queryable
/// after the fact.
pub struct SqlPlacementRepository {
    pool: DbPool,
}

impl SqlPlacementRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn set_status(
        &self,
        id: &PlacementId,
        status: PlacementStatus,
        error: Option<&str>,
        order_id: Option<i64>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE placements
             SET status = ?, error = ?, order_id = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(status.as_str())
        .bind(error)
        .bind(order_id)
        .bind(Utc::now().to_rfc3339())
        .bind(&id.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl PlacementRepository for SqlPlacementRepository {
    async fn create(&self, placement: &Placement) -> Result<(), RepositoryError> {
        let shopping_list_json = serde_json::to_string(&placement.shopping_list)
            .map_err(|error| RepositoryError::Decode(error.to_string()))?;

        sqlx::query(
            "INSERT INTO placements (
                id,
                status,
                shopping_list_json,
                error,
                order_id,
                created_at,
                updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&placement.id.0)
        .bind(placement.status.as_str())
        .bind(&shopping_list_json)
        .bind(placement.error.as_deref())
        .bind(placement.order_id)
        .bind(placement.created_at.to_rfc3339())
        .bind(placement.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn mark_running(&self, id: &PlacementId) -> Result<(), RepositoryError> {
        self.set_status(id, PlacementStatus::Running, None, None).await
    }

    async fn mark_placed(&self, id: &PlacementId, order_id: i64) -> Result<(), RepositoryError> {
        self.set_status(id, PlacementStatus::Placed, None, Some(order_id)).await
    }

    async fn mark_failed(&self, id: &PlacementId, error: &str) -> Result<(), RepositoryError> {
        self.set_status(id, PlacementStatus::Failed, Some(error), None).await
    }

    async fn find_by_id(&self, id: &PlacementId) -> Result<Option<Placement>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, status, shopping_list_json, error, order_id, created_at, updated_at
             FROM placements
             WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(placement_from_row).transpose()
    }
}

fn placement_from_row(row: SqliteRow) -> Result<Placement, RepositoryError> {
    let status_raw: String = row.get("status");
    let status = PlacementStatus::parse(&status_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown placement status `{status_raw}`")))?;

    let shopping_list_raw: String = row.get("shopping_list_json");
    let shopping_list: Vec<String> = serde_json::from_str(&shopping_list_raw)
        .map_err(|error| RepositoryError::Decode(format!("invalid shopping list: {error}")))?;

    Ok(Placement {
        id: PlacementId(row.get("id")),
        status,
        shopping_list,
        error: row.get("error"),
        order_id: row.get("order_id"),
        created_at: parse_timestamp(&row, "created_at")?,
        updated_at: parse_timestamp(&row, "updated_at")?,
    })
}

fn parse_timestamp(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>, RepositoryError> {
    let raw: String = row.get(column);
    DateTime::parse_from_rfc3339(&raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("invalid {column}: {error}")))
}
