use serde::{Deserialize, Serialize};
use std::fmt;

/// Inventory group a device belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceGroup {
    Branch,
    Core,
}

/// Device represents a network device enumerated in the inventory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub vendor: String,
    #[serde(rename = "ip")]
    pub address: String,
    pub group: DeviceGroup,
}

/// Playbook-backed actions. The diff action never runs a playbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionType {
    Ping,
    Backup,
    Restart,
    Uptime,
}

impl ActionType {
    pub const ALL: [ActionType; 4] = [Self::Ping, Self::Backup, Self::Restart, Self::Uptime];

    /// Directory name under the log root
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::Backup => "backup",
            Self::Restart => "restart",
            Self::Uptime => "uptime",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical action status values
pub mod action_status {
    pub const SUCCESS: &str = "success";
    pub const FAIL: &str = "fail";
    pub const NOT_FOUND: &str = "notfound";
    pub const UNSUPPORTED_VENDOR: &str = "unsupported_vendor";
    pub const NO_BACKUPS: &str = "no_backups";
    pub const NOT_ENOUGH_BACKUPS: &str = "not_enough_backups";

    pub fn from_success(success: bool) -> &'static str {
        if success {
            SUCCESS
        } else {
            FAIL
        }
    }
}

/// ActionResponse is returned by every device action
#[derive(Debug, Clone, Serialize)]
pub struct ActionResponse {
    pub status: &'static str,
    pub device_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    pub logfile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
}

impl ActionResponse {
    pub fn new(status: &'static str, device_id: &str) -> Self {
        Self {
            status,
            device_id: device_id.to_string(),
            vendor: None,
            logfile: None,
            output: None,
            message: None,
            diff: None,
        }
    }

    pub fn not_found(device_id: &str) -> Self {
        Self::new(action_status::NOT_FOUND, device_id)
    }

    pub fn with_vendor(mut self, vendor: &str) -> Self {
        self.vendor = Some(vendor.to_string());
        self
    }

    pub fn with_logfile(mut self, logfile: impl Into<String>) -> Self {
        self.logfile = Some(logfile.into());
        self
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_diff(mut self, diff: impl Into<String>) -> Self {
        self.diff = Some(diff.into());
        self
    }
}

/// UptimeResponse carries the extracted uptime; `uptime` is serialized as
/// null when the label was missing from the playbook output.
#[derive(Debug, Clone, Serialize)]
pub struct UptimeResponse {
    #[serde(flatten)]
    pub action: ActionResponse,
    pub uptime: Option<String>,
}

/// DeviceListResponse is the device overview grouped for the console
#[derive(Debug, Clone, Serialize)]
pub struct DeviceListResponse {
    pub branch_devices: Vec<Device>,
    pub core_devices: Vec<Device>,
    pub branch_by_vendor: Vec<VendorDevices>,
}

/// Branch devices sharing a vendor
#[derive(Debug, Clone, Serialize)]
pub struct VendorDevices {
    pub vendor: String,
    pub devices: Vec<Device>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_serializes_null_logfile() {
        let json = serde_json::to_value(ActionResponse::not_found("r9")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"status": "notfound", "device_id": "r9", "logfile": null})
        );
    }

    #[test]
    fn test_uptime_response_is_flat() {
        let resp = UptimeResponse {
            action: ActionResponse::new(action_status::FAIL, "r1").with_vendor("Cisco"),
            uptime: None,
        };
        let json = serde_json::to_value(resp).unwrap();
        assert_eq!(json["status"], "fail");
        assert_eq!(json["vendor"], "Cisco");
        assert!(json["uptime"].is_null());
        assert!(json.get("action").is_none());
    }

    #[test]
    fn test_device_address_serializes_as_ip() {
        let device = Device {
            id: "sw1".to_string(),
            name: "Core Switch".to_string(),
            vendor: "Juniper".to_string(),
            address: "10.1.0.1".to_string(),
            group: DeviceGroup::Core,
        };
        let json = serde_json::to_value(device).unwrap();
        assert_eq!(json["ip"], "10.1.0.1");
        assert_eq!(json["group"], "core");
    }
}
