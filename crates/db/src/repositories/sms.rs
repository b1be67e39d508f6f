use aisle_core::chrono::Utc;
use sqlx::Row;

use aisle_core::twofa::{self, CodeLookupError, CodeSource};

use super::{RepositoryError, SmsRepository};
use crate::DbPool;

pub struct SqlSmsRepository {
    pool: DbPool,
}

impl SqlSmsRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SmsRepository for SqlSmsRepository {
    async fn store_message(&self, body: &str) -> Result<i64, RepositoryError> {
        let received_at = Utc::now().to_rfc3339();
        let inserted =
            sqlx::query("INSERT INTO sms_messages (body, received_at, used) VALUES (?, ?, 0)")
                .bind(body)
                .bind(&received_at)
                .execute(&self.pool)
                .await?;

        Ok(inserted.last_insert_rowid())
    }

    async fn consume_latest_code(&self) -> Result<Option<String>, RepositoryError> {
        // Selection and mark-as-used run inside one transaction; the
        // conditional UPDATE keeps the consume at-most-once even if two
        // placements race on the same message.
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "SELECT id, body FROM sms_messages
             WHERE used = 0
             ORDER BY received_at DESC, id DESC
             LIMIT 1",
        )
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else { return Ok(None) };
        let id: i64 = row.get("id");
        let body: String = row.get("body");

        // A body without a standalone 6-digit token stays unused; a corrected
        // resend will be picked up by a later lookup.
        let Some(code) = twofa::extract_code(&body) else { return Ok(None) };
        let code = code.to_owned();

        let updated = sqlx::query("UPDATE sms_messages SET used = 1 WHERE id = ? AND used = 0")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        tx.commit().await?;
        Ok(Some(code))
    }
}

#[async_trait::async_trait]
impl CodeSource for SqlSmsRepository {
    async fn consume_latest_code(&self) -> Result<Option<String>, CodeLookupError> {
        SmsRepository::consume_latest_code(self)
            .await
            .map_err(|error| CodeLookupError(error.to_string()))
    }
}
