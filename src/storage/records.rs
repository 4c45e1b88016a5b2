use crate::domain::device::{DeviceRecord, Platform};
use time::OffsetDateTime;

#[derive(Debug, sqlx::FromRow)]
pub struct DeviceRow {
    pub(crate) token: String,
    pub(crate) owner_id: String,
    pub(crate) platform: String,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) updated_at: OffsetDateTime,
}

impl From<DeviceRow> for DeviceRecord {
    fn from(row: DeviceRow) -> Self {
        Self {
            token: row.token,
            owner_id: row.owner_id,
            // Rows written by older clients may carry free-form platform labels.
            platform: Platform::from_label(Some(&row.platform)),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
