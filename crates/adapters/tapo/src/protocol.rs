//! JSON messages exchanged with the plug inside the encrypted channel.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use sunsink_domain::plug::PlugInfo;

use crate::error::TapoError;

pub const GET_DEVICE_INFO: &str = "get_device_info";
pub const SET_DEVICE_INFO: &str = "set_device_info";

#[derive(Debug, Serialize)]
pub struct Request<'a> {
    pub method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
    #[serde(rename = "requestTimeMils")]
    pub request_time_mils: i64,
}

impl<'a> Request<'a> {
    #[must_use]
    pub fn new(method: &'a str, params: Option<serde_json::Value>) -> Self {
        Self {
            method,
            params,
            request_time_mils: chrono::Utc::now().timestamp_millis(),
        }
    }

    #[must_use]
    pub fn set_device_on(on: bool) -> Self {
        Self::new(SET_DEVICE_INFO, Some(serde_json::json!({ "device_on": on })))
    }
}

#[derive(Debug, Deserialize)]
pub struct Response {
    pub error_code: i64,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
}

impl Response {
    /// Check the error code and hand out the `result` object, if any.
    ///
    /// # Errors
    ///
    /// Returns [`TapoError::Device`] for a non-zero error code.
    pub fn into_result(self, method: &'static str) -> Result<Option<serde_json::Value>, TapoError> {
        if self.error_code != 0 {
            return Err(TapoError::Device {
                method,
                code: self.error_code,
            });
        }
        Ok(self.result)
    }
}

/// Subset of the `get_device_info` result the controller cares about.
#[derive(Debug, Deserialize)]
pub struct DeviceInfoResult {
    pub device_on: bool,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub signal_level: Option<i64>,
}

impl From<DeviceInfoResult> for PlugInfo {
    fn from(raw: DeviceInfoResult) -> Self {
        Self {
            device_on: raw.device_on,
            nickname: raw.nickname.map(|name| decode_text(&name)),
            model: raw.model,
            device_id: raw.device_id,
            signal_level: raw.signal_level,
        }
    }
}

/// Firmware reports user-set names base64 encoded; keep the raw text when
/// it is not.
fn decode_text(value: &str) -> String {
    STANDARD
        .decode(value)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| value.to_string())
}
