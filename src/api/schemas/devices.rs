use crate::domain::device::DeviceRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDeviceRequest {
    #[serde(alias = "token")]
    pub device_token: Option<String>,
    #[serde(alias = "ownerId")]
    pub user_id: Option<String>,
    pub platform: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterDeviceResponse {
    pub success: bool,
    pub device: DeviceRecord,
}

#[derive(Debug, Serialize)]
pub struct ListDevicesResponse {
    pub count: usize,
    pub devices: Vec<DeviceRecord>,
}
