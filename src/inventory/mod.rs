pub mod watcher;

pub use watcher::{InventoryWatcher, SharedRegistry};

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::models::{Device, DeviceGroup, DeviceListResponse, VendorDevices};

/// Host variables; any scalar is accepted and read as text
#[derive(Debug, Default, Deserialize)]
struct HostVars {
    #[serde(default)]
    device_name: Option<serde_yaml::Value>,
    #[serde(default)]
    name: Option<serde_yaml::Value>,
    #[serde(default)]
    vendor: Option<serde_yaml::Value>,
    #[serde(default)]
    ip: Option<serde_yaml::Value>,
    #[serde(default)]
    ansible_host: Option<serde_yaml::Value>,
}

/// DeviceRegistry is an immutable snapshot of the inventory
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    branch: Vec<Device>,
    core: Vec<Device>,
}

impl DeviceRegistry {
    pub fn new(branch: Vec<Device>, core: Vec<Device>) -> Self {
        Self { branch, core }
    }

    /// Load the registry from an inventory file
    pub async fn load(path: &Path) -> Result<Self> {
        let (branch, core) = load_devices(path).await?;
        Ok(Self::new(branch, core))
    }

    /// Find a device by inventory host id. Branch devices win over core.
    pub fn find(&self, id: &str) -> Option<&Device> {
        self.branch
            .iter()
            .chain(self.core.iter())
            .find(|d| d.id == id)
    }

    pub fn len(&self) -> usize {
        self.branch.len() + self.core.len()
    }

    /// Device overview: both groups sorted by name, branch devices grouped by vendor
    pub fn grouped(&self) -> DeviceListResponse {
        let mut branch_devices = self.branch.clone();
        let mut core_devices = self.core.clone();
        branch_devices.sort_by_key(|d| d.name.to_lowercase());
        core_devices.sort_by_key(|d| d.name.to_lowercase());

        let mut branch_by_vendor: Vec<VendorDevices> = Vec::new();
        for device in &branch_devices {
            match branch_by_vendor.iter_mut().find(|g| g.vendor == device.vendor) {
                Some(group) => group.devices.push(device.clone()),
                None => branch_by_vendor.push(VendorDevices {
                    vendor: device.vendor.clone(),
                    devices: vec![device.clone()],
                }),
            }
        }
        branch_by_vendor.sort_by_key(|g| g.vendor.to_lowercase());

        DeviceListResponse {
            branch_devices,
            core_devices,
            branch_by_vendor,
        }
    }
}

/// Load devices from the inventory into (branch, core) lists, keeping document order
pub async fn load_devices(path: &Path) -> Result<(Vec<Device>, Vec<Device>)> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read inventory {}", path.display()))?;
    parse_inventory(&content)
        .with_context(|| format!("Failed to parse inventory {}", path.display()))
}

/// Parse inventory YAML into (branch, core) device lists.
/// Layout: `all.children.<branch|core>.hosts.<host id>: { vars }`
pub fn parse_inventory(content: &str) -> Result<(Vec<Device>, Vec<Device>)> {
    let doc: serde_yaml::Value = serde_yaml::from_str(content)?;
    let children = doc.get("all").and_then(|a| a.get("children"));

    let branch = group_hosts(children, "branch", DeviceGroup::Branch)?;
    let core = group_hosts(children, "core", DeviceGroup::Core)?;
    Ok((branch, core))
}

fn group_hosts(
    children: Option<&serde_yaml::Value>,
    group_name: &str,
    group: DeviceGroup,
) -> Result<Vec<Device>> {
    let hosts = match children
        .and_then(|c| c.get(group_name))
        .and_then(|g| g.get("hosts"))
        .and_then(|h| h.as_mapping())
    {
        Some(hosts) => hosts,
        None => return Ok(Vec::new()),
    };

    let mut devices = Vec::with_capacity(hosts.len());
    for (host_id, vars) in hosts {
        let id = match host_id {
            serde_yaml::Value::String(s) => s.clone(),
            serde_yaml::Value::Number(n) => n.to_string(),
            other => anyhow::bail!("Invalid host id in group {}: {:?}", group_name, other),
        };
        let vars: HostVars = if vars.is_null() {
            HostVars::default()
        } else {
            serde_yaml::from_value(vars.clone())
                .with_context(|| format!("Invalid host vars for {}", id))?
        };

        devices.push(Device {
            name: first_non_empty([vars.device_name, vars.name]).unwrap_or_else(|| id.clone()),
            vendor: first_non_empty([vars.vendor]).unwrap_or_else(|| "Unknown".to_string()),
            address: first_non_empty([vars.ip, vars.ansible_host]).unwrap_or_default(),
            group,
            id,
        });
    }
    Ok(devices)
}

fn first_non_empty<const N: usize>(candidates: [Option<serde_yaml::Value>; N]) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .filter_map(|v| scalar_text(&v))
        .find(|s| !s.is_empty())
}

/// Text of a scalar YAML value; mappings, sequences and null have none
fn scalar_text(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INVENTORY: &str = r#"
all:
  children:
    branch:
      hosts:
        taplejung:
          device_name: Taplejung
          vendor: Sophos
          ip: 10.70.35.1
        ilam:
          vendor: Cisco
          ansible_host: 10.70.36.1
        bhojpur:
          name: bhojpur-fw
          vendor: sophos
    core:
      hosts:
        r1:
          device_name: Core Router
          vendor: Cisco
          ip: 10.0.0.1
        taplejung:
          vendor: Juniper
"#;

    #[test]
    fn test_parse_inventory_groups() {
        let (branch, core) = parse_inventory(INVENTORY).unwrap();
        assert_eq!(branch.len(), 3);
        assert_eq!(core.len(), 2);

        assert_eq!(branch[0].id, "taplejung");
        assert_eq!(branch[0].name, "Taplejung");
        assert_eq!(branch[0].address, "10.70.35.1");
        assert_eq!(branch[0].group, DeviceGroup::Branch);

        // name falls back to ansible fields then the host id
        assert_eq!(branch[1].name, "ilam");
        assert_eq!(branch[1].address, "10.70.36.1");
        assert_eq!(branch[2].name, "bhojpur-fw");
        assert_eq!(branch[2].address, "");

        assert_eq!(core[0].group, DeviceGroup::Core);
        assert_eq!(core[1].vendor, "Juniper");
    }

    #[test]
    fn test_missing_vendor_defaults_to_unknown() {
        let yaml = "all:\n  children:\n    core:\n      hosts:\n        sw9:\n";
        let (branch, core) = parse_inventory(yaml).unwrap();
        assert!(branch.is_empty());
        assert_eq!(core[0].vendor, "Unknown");
        assert_eq!(core[0].name, "sw9");
    }

    #[test]
    fn test_numeric_scalars_are_read_as_text() {
        let yaml = "all:\n  children:\n    branch:\n      hosts:\n        1234:\n          device_name: 1234\n          vendor: 3com\n          ip: 10\n        sw2:\n          name: true\n          vendor: [not, a, scalar]\n";
        let (branch, _) = parse_inventory(yaml).unwrap();
        assert_eq!(branch[0].id, "1234");
        assert_eq!(branch[0].name, "1234");
        assert_eq!(branch[0].vendor, "3com");
        assert_eq!(branch[0].address, "10");
        assert_eq!(branch[1].name, "true");
        assert_eq!(branch[1].vendor, "Unknown");
    }

    #[test]
    fn test_empty_and_null_groups() {
        assert_eq!(parse_inventory("").unwrap().0.len(), 0);
        let yaml = "all:\n  children:\n    branch:\n      hosts:\n";
        let (branch, core) = parse_inventory(yaml).unwrap();
        assert!(branch.is_empty() && core.is_empty());
    }

    #[test]
    fn test_malformed_inventory_is_error() {
        assert!(parse_inventory("all: [unclosed").is_err());
    }

    #[test]
    fn test_find_prefers_branch() {
        let (branch, core) = parse_inventory(INVENTORY).unwrap();
        let registry = DeviceRegistry::new(branch, core);
        assert_eq!(registry.find("taplejung").unwrap().vendor, "Sophos");
        assert_eq!(registry.find("r1").unwrap().group, DeviceGroup::Core);
        assert!(registry.find("nope").is_none());
        assert_eq!(registry.len(), 5);
    }

    #[test]
    fn test_grouped_sorts_case_insensitively() {
        let (branch, core) = parse_inventory(INVENTORY).unwrap();
        let view = DeviceRegistry::new(branch, core).grouped();

        let names: Vec<_> = view.branch_devices.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["bhojpur-fw", "ilam", "Taplejung"]);

        let vendors: Vec<_> = view.branch_by_vendor.iter().map(|g| g.vendor.as_str()).collect();
        assert_eq!(vendors, vec!["Cisco", "sophos", "Sophos"]);
        assert_eq!(view.core_devices[0].name, "Core Router");
    }

    #[tokio::test]
    async fn test_load_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(DeviceRegistry::load(&dir.path().join("absent.yml")).await.is_err());
    }
}
