use crate::domain::device::{DeviceFilter, DeviceRecord, NewDevice};
use crate::error::Result;
use crate::storage::DeviceStore;
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use time::OffsetDateTime;

/// Process-local device store, used when no database is configured.
///
/// Per-token atomicity comes from the shard locks held by the map's entry API.
#[derive(Clone, Debug, Default)]
pub struct InMemoryDeviceStore {
    devices: Arc<DashMap<String, DeviceRecord>>,
}

impl InMemoryDeviceStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    #[must_use]
    pub fn contains(&self, token: &str) -> bool {
        self.devices.contains_key(token)
    }
}

#[async_trait]
impl DeviceStore for InMemoryDeviceStore {
    async fn upsert(&self, device: NewDevice) -> Result<DeviceRecord> {
        let now = OffsetDateTime::now_utc();
        let record = match self.devices.entry(device.token) {
            Entry::Occupied(mut entry) => {
                let existing = entry.get_mut();
                existing.owner_id = device.owner_id;
                existing.platform = device.platform;
                existing.updated_at = now;
                existing.clone()
            }
            Entry::Vacant(entry) => {
                let record = DeviceRecord {
                    token: entry.key().clone(),
                    owner_id: device.owner_id,
                    platform: device.platform,
                    created_at: now,
                    updated_at: now,
                };
                entry.insert(record.clone());
                record
            }
        };
        Ok(record)
    }

    async fn list(&self, filter: &DeviceFilter) -> Result<Vec<DeviceRecord>> {
        let mut devices: Vec<DeviceRecord> =
            self.devices.iter().filter(|entry| filter.matches(entry.value())).map(|entry| entry.value().clone()).collect();
        devices.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.token.cmp(&b.token)));
        Ok(devices)
    }

    async fn delete(&self, token: &str) -> Result<bool> {
        Ok(self.devices.remove(token).is_some())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::device::Platform;

    fn new_device(token: &str, owner: &str, platform: Platform) -> NewDevice {
        NewDevice { token: token.into(), owner_id: owner.into(), platform }
    }

    #[tokio::test]
    async fn test_upsert_same_token_updates_in_place() {
        let store = InMemoryDeviceStore::new();

        let first = store.upsert(new_device("T1", "u1", Platform::Ios)).await.unwrap();
        let second = store.upsert(new_device("T1", "u2", Platform::Android)).await.unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(second.owner_id, "u2");
        assert_eq!(second.platform, Platform::Android);
        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at >= first.updated_at);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = InMemoryDeviceStore::new();
        store.upsert(new_device("T1", "u1", Platform::Ios)).await.unwrap();

        assert!(store.delete("T1").await.unwrap());
        assert!(!store.delete("T1").await.unwrap());
        assert!(!store.delete("never-registered").await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_list_applies_filter() {
        let store = InMemoryDeviceStore::new();
        store.upsert(new_device("T1", "u1", Platform::Ios)).await.unwrap();
        store.upsert(new_device("T2", "u2", Platform::Android)).await.unwrap();
        store.upsert(new_device("test-token-1", "u1", Platform::Ios)).await.unwrap();

        let owned = store.list(&DeviceFilter::owner("u1")).await.unwrap();
        assert_eq!(owned.len(), 2);

        let real = store.list(&DeviceFilter::all().excluding_prefix(Some("test-token-".into()))).await.unwrap();
        let tokens: Vec<_> = real.iter().map(|d| d.token.as_str()).collect();
        assert_eq!(tokens.len(), 2);
        assert!(tokens.contains(&"T1"));
        assert!(tokens.contains(&"T2"));
    }

    #[tokio::test]
    async fn test_concurrent_upserts_of_one_token_leave_one_record() {
        let store = InMemoryDeviceStore::new();

        let mut tasks = Vec::new();
        for i in 0..50 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store.upsert(new_device("shared", &format!("u{i}"), Platform::Ios)).await.unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(store.len(), 1);
    }
}
