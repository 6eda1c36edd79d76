pub mod secrets;

pub use secrets::{EnvSecretProvider, FileSecretProvider, SecretProvider, StaticSecretProvider};

use anyhow::Result;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Extra-variable names carrying credentials
pub const USER_PARAM: &str = "ansible_user";
pub const PASSWORD_PARAM: &str = "ansible_password";

/// VendorProfile holds the connection parameters for one vendor.
/// Parameters are kept sorted so generated extra-vars are reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VendorProfile {
    pub vendor: String,
    pub params: BTreeMap<String, String>,
}

impl VendorProfile {
    pub fn new(vendor: &str) -> Self {
        Self {
            vendor: vendor.to_string(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: &str, value: &str) -> Self {
        self.params.insert(key.to_string(), value.to_string());
        self
    }
}

/// VendorProfileStore merges compiled-in connection defaults with secrets
/// resolved from the provider on every lookup.
pub struct VendorProfileStore {
    defaults: HashMap<String, BTreeMap<String, String>>,
    secrets: Arc<dyn SecretProvider>,
}

impl VendorProfileStore {
    pub fn new(secrets: Arc<dyn SecretProvider>) -> Self {
        Self {
            defaults: default_connection_params(),
            secrets,
        }
    }

    /// Resolve the full profile for a vendor. Unknown vendors yield an empty profile.
    pub async fn resolve(&self, vendor: &str) -> Result<VendorProfile> {
        let mut profile = VendorProfile::new(vendor);
        if let Some(params) = self.defaults.get(vendor) {
            profile.params.extend(params.clone());
        }

        if let Some(secret) = self.secrets.resolve(vendor).await? {
            if !secret.user.is_empty() {
                profile = profile.with_param(USER_PARAM, &secret.user);
            }
            if !secret.password.is_empty() {
                profile = profile.with_param(PASSWORD_PARAM, &secret.password);
            }
        } else if !self.defaults.contains_key(vendor) {
            tracing::debug!("No vendor profile for '{}', running without extra vars", vendor);
        }

        Ok(profile)
    }
}

/// Non-secret connection parameters per vendor
fn default_connection_params() -> HashMap<String, BTreeMap<String, String>> {
    let table: &[(&str, &[(&str, &str)])] = &[
        (
            "Juniper",
            &[
                ("ansible_connection", "ansible.netcommon.network_cli"),
                ("ansible_network_os", "junipernetworks.junos.junos"),
            ],
        ),
        ("Cisco", &[("ansible_port", "23")]),
        (
            "Sophos",
            &[
                ("ansible_connection", "ssh"),
                ("ansible_network_os", "sophos"),
            ],
        ),
    ];

    table
        .iter()
        .map(|(vendor, params)| {
            let params = params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            (vendor.to_string(), params)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> VendorProfileStore {
        let secrets = StaticSecretProvider::default().with_secret("Juniper", "root", "j-secret");
        VendorProfileStore::new(Arc::new(secrets))
    }

    #[tokio::test]
    async fn test_resolve_merges_defaults_and_secrets() {
        let profile = store().resolve("Juniper").await.unwrap();
        assert_eq!(profile.vendor, "Juniper");
        assert_eq!(profile.params["ansible_network_os"], "junipernetworks.junos.junos");
        assert_eq!(profile.params[USER_PARAM], "root");
        assert_eq!(profile.params[PASSWORD_PARAM], "j-secret");
    }

    #[tokio::test]
    async fn test_resolve_without_secret_keeps_defaults() {
        let profile = store().resolve("Cisco").await.unwrap();
        assert_eq!(profile.params.len(), 1);
        assert_eq!(profile.params["ansible_port"], "23");
    }

    #[tokio::test]
    async fn test_unknown_vendor_is_empty() {
        let profile = store().resolve("Unknown").await.unwrap();
        assert!(profile.params.is_empty());
    }

    #[test]
    fn test_params_iterate_sorted() {
        let profile = VendorProfile::new("X")
            .with_param("b", "2")
            .with_param("a", "1");
        let keys: Vec<_> = profile.params.keys().cloned().collect();
        assert_eq!(keys, vec!["a", "b"]);
    }
}
