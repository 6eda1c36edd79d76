use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::models::ActionType;

/// PlaybookRegistry maps (action, vendor) to the playbook that implements it.
/// Actions may also register a vendor-agnostic playbook.
#[derive(Debug, Clone, Default)]
pub struct PlaybookRegistry {
    by_vendor: HashMap<(ActionType, String), PathBuf>,
    any_vendor: HashMap<ActionType, PathBuf>,
}

impl PlaybookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default playbook table rooted at the playbooks directory
    pub fn with_defaults(playbooks_dir: &Path) -> Self {
        let mut registry = Self::new();
        registry.register_any(ActionType::Ping, playbooks_dir.join("ping_test.yml"));

        let vendor_playbooks: &[(ActionType, &str, &str)] = &[
            (ActionType::Backup, "Juniper", "backup_juniper.yml"),
            (ActionType::Backup, "Cisco", "backup_cisco.yml"),
            (ActionType::Backup, "PaloAlto", "backup_paloalto.yml"),
            (ActionType::Restart, "Cisco", "restart_cisco.yml"),
            (ActionType::Restart, "Juniper", "restart_juniper.yml"),
            (ActionType::Uptime, "Cisco", "uptime_cisco.yml"),
            (ActionType::Uptime, "Juniper", "uptime_juniper.yml"),
        ];
        for (action, vendor, file) in vendor_playbooks {
            registry.register(*action, vendor, playbooks_dir.join(file));
        }
        registry
    }

    pub fn register(&mut self, action: ActionType, vendor: &str, playbook: PathBuf) {
        self.by_vendor.insert((action, vendor.to_string()), playbook);
    }

    pub fn register_any(&mut self, action: ActionType, playbook: PathBuf) {
        self.any_vendor.insert(action, playbook);
    }

    /// Playbook for the action and vendor; a vendor-specific entry wins
    pub fn lookup(&self, action: ActionType, vendor: &str) -> Option<&Path> {
        self.by_vendor
            .get(&(action, vendor.to_string()))
            .or_else(|| self.any_vendor.get(&action))
            .map(PathBuf::as_path)
    }

    /// Vendors with a dedicated playbook for the action, sorted
    pub fn vendors_for(&self, action: ActionType) -> Vec<&str> {
        let mut vendors: Vec<&str> = self
            .by_vendor
            .keys()
            .filter(|(a, _)| *a == action)
            .map(|(_, v)| v.as_str())
            .collect();
        vendors.sort_unstable();
        vendors
    }
}
