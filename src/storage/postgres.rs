use crate::domain::device::{DeviceFilter, DeviceRecord, NewDevice};
use crate::error::{AppError, Result};
use crate::storage::records::DeviceRow;
use crate::storage::{DbPool, DeviceStore};
use async_trait::async_trait;

#[derive(Clone, Debug)]
pub struct PgDeviceStore {
    pool: DbPool,
}

impl PgDeviceStore {
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeviceStore for PgDeviceStore {
    #[tracing::instrument(level = "debug", skip(self, device), fields(platform = %device.platform), err)]
    async fn upsert(&self, device: NewDevice) -> Result<DeviceRecord> {
        let row = sqlx::query_as::<_, DeviceRow>(
            r"
            INSERT INTO devices (token, owner_id, platform)
            VALUES ($1, $2, $3)
            ON CONFLICT (token) DO UPDATE
            SET owner_id = EXCLUDED.owner_id,
                platform = EXCLUDED.platform,
                updated_at = NOW()
            RETURNING token, owner_id, platform, created_at, updated_at
            ",
        )
        .bind(&device.token)
        .bind(&device.owner_id)
        .bind(device.platform.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from_db)?;

        Ok(row.into())
    }

    #[tracing::instrument(level = "debug", skip(self), err)]
    async fn list(&self, filter: &DeviceFilter) -> Result<Vec<DeviceRecord>> {
        let rows = sqlx::query_as::<_, DeviceRow>(
            r"
            SELECT token, owner_id, platform, created_at, updated_at
            FROM devices
            WHERE ($1::TEXT IS NULL OR owner_id = $1)
              AND ($2::TEXT IS NULL OR platform = $2)
              AND ($3::TEXT IS NULL OR LEFT(token, LENGTH($3)) <> $3)
            ORDER BY created_at ASC, token ASC
            ",
        )
        .bind(filter.owner_id.as_deref())
        .bind(filter.platform.map(|p| p.as_str()))
        .bind(filter.exclude_token_prefix.as_deref())
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from_db)?;

        Ok(rows.into_iter().map(DeviceRecord::from).collect())
    }

    #[tracing::instrument(level = "debug", skip(self, token), err)]
    async fn delete(&self, token: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM devices WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(AppError::from_db)?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await.map_err(AppError::from_db)?;
        Ok(())
    }
}
