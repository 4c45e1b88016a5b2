use crate::domain::device::{ANONYMOUS_OWNER, DeviceFilter, DeviceRecord, NewDevice, Platform};
use crate::error::{AppError, Result};
use crate::storage::DeviceStore;
use std::sync::Arc;

const MAX_TOKEN_LEN: usize = 4096;

/// Validated access to the set of registered devices.
#[derive(Clone, Debug)]
pub struct DeviceRegistry {
    store: Arc<dyn DeviceStore>,
}

impl DeviceRegistry {
    #[must_use]
    pub fn new(store: Arc<dyn DeviceStore>) -> Self {
        Self { store }
    }

    /// Registers a device, or updates owner and platform if the token is already known.
    ///
    /// # Errors
    /// Returns `AppError::Validation` if the token is missing, blank or oversized.
    /// Returns a storage error if the write fails.
    #[tracing::instrument(skip_all, fields(platform = tracing::field::Empty))]
    pub async fn upsert(&self, token: Option<&str>, owner_id: Option<&str>, platform: Option<&str>) -> Result<DeviceRecord> {
        let token = token.map(str::trim).unwrap_or_default();
        if token.is_empty() {
            return Err(AppError::Validation("Device token is required".into()));
        }
        if token.len() > MAX_TOKEN_LEN {
            return Err(AppError::Validation(format!("Device token is too long (max {MAX_TOKEN_LEN} characters)")));
        }

        let owner_id = owner_id.map(str::trim).filter(|o| !o.is_empty()).unwrap_or(ANONYMOUS_OWNER);
        let platform = Platform::from_label(platform);
        tracing::Span::current().record("platform", platform.as_str());

        let record = self
            .store
            .upsert(NewDevice { token: token.to_string(), owner_id: owner_id.to_string(), platform })
            .await?;

        tracing::info!(owner_id = %record.owner_id, "Device registered");
        Ok(record)
    }

    /// # Errors
    /// Returns a storage error if the store cannot be read.
    pub async fn list_all(&self) -> Result<Vec<DeviceRecord>> {
        self.store.list(&DeviceFilter::all()).await
    }

    /// # Errors
    /// Returns a storage error if the store cannot be read.
    pub async fn list_by_filter(&self, filter: &DeviceFilter) -> Result<Vec<DeviceRecord>> {
        self.store.list(filter).await
    }

    /// Removes a device. Unknown tokens are ignored.
    ///
    /// # Errors
    /// Returns a storage error if the delete fails.
    #[tracing::instrument(level = "debug", skip(self, token))]
    pub async fn delete(&self, token: &str) -> Result<()> {
        if self.store.delete(token).await? {
            tracing::info!("Device removed");
        } else {
            tracing::debug!("Device already absent");
        }
        Ok(())
    }

    /// # Errors
    /// Returns a storage error if the store is unreachable.
    pub async fn ping(&self) -> Result<()> {
        self.store.ping().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryDeviceStore;

    fn registry() -> (DeviceRegistry, InMemoryDeviceStore) {
        let store = InMemoryDeviceStore::new();
        (DeviceRegistry::new(Arc::new(store.clone())), store)
    }

    #[tokio::test]
    async fn test_upsert_rejects_missing_token() {
        let (registry, store) = registry();

        let res = registry.upsert(None, Some("u1"), None).await;
        assert!(matches!(res, Err(AppError::Validation(_))));

        let res = registry.upsert(Some("   "), Some("u1"), None).await;
        assert!(matches!(res, Err(AppError::Validation(_))));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_rejects_oversized_token() {
        let (registry, _) = registry();
        let token = "A".repeat(MAX_TOKEN_LEN + 1);

        let res = registry.upsert(Some(&token), None, None).await;
        match res {
            Err(AppError::Validation(msg)) => assert_eq!(msg, "Device token is too long (max 4096 characters)"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_upsert_applies_defaults() {
        let (registry, _) = registry();

        let record = registry.upsert(Some("T1"), None, None).await.unwrap();
        assert_eq!(record.owner_id, ANONYMOUS_OWNER);
        assert_eq!(record.platform, Platform::Ios);

        let record = registry.upsert(Some("T2"), Some(""), Some("test")).await.unwrap();
        assert_eq!(record.owner_id, ANONYMOUS_OWNER);
        assert_eq!(record.platform, Platform::Other);
    }

    #[tokio::test]
    async fn test_upsert_twice_keeps_latest_owner() {
        let (registry, _) = registry();

        registry.upsert(Some("T1"), Some("u1"), Some("ios")).await.unwrap();
        registry.upsert(Some("T1"), Some("u2"), Some("ios")).await.unwrap();

        let all = registry.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].owner_id, "u2");
    }

    #[tokio::test]
    async fn test_token_is_trimmed() {
        let (registry, store) = registry();

        registry.upsert(Some("  T1\n"), None, None).await.unwrap();
        assert!(store.contains("T1"));
    }

    #[tokio::test]
    async fn test_delete_unknown_token_is_noop() {
        let (registry, _) = registry();
        assert!(registry.delete("missing").await.is_ok());
    }
}
