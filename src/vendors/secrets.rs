use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// Credentials used to log into a vendor's devices
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct VendorSecret {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
}

/// SecretProvider resolves vendor credentials at invocation time
#[async_trait::async_trait]
pub trait SecretProvider: Send + Sync {
    async fn resolve(&self, vendor: &str) -> Result<Option<VendorSecret>>;
}

/// Reads `VENDOR_<VENDOR>_USER` and `VENDOR_<VENDOR>_PASSWORD`
#[derive(Debug, Clone, Default)]
pub struct EnvSecretProvider;

impl EnvSecretProvider {
    /// Environment variable prefix for a vendor, e.g. "Palo Alto" -> "VENDOR_PALO_ALTO"
    pub fn env_prefix(vendor: &str) -> String {
        let key: String = vendor
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect();
        format!("VENDOR_{}", key)
    }
}

#[async_trait::async_trait]
impl SecretProvider for EnvSecretProvider {
    async fn resolve(&self, vendor: &str) -> Result<Option<VendorSecret>> {
        let prefix = Self::env_prefix(vendor);
        let user = std::env::var(format!("{}_USER", prefix)).ok();
        let password = std::env::var(format!("{}_PASSWORD", prefix)).ok();

        if user.is_none() && password.is_none() {
            return Ok(None);
        }
        Ok(Some(VendorSecret {
            user: user.unwrap_or_default(),
            password: password.unwrap_or_default(),
        }))
    }
}

/// Reads a YAML file of `<vendor>: { user, password }` on every lookup,
/// so rotated credentials apply without a restart.
#[derive(Debug, Clone)]
pub struct FileSecretProvider {
    path: PathBuf,
}

impl FileSecretProvider {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait::async_trait]
impl SecretProvider for FileSecretProvider {
    async fn resolve(&self, vendor: &str) -> Result<Option<VendorSecret>> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read vendor secrets {}", self.path.display()))?;
        let mut secrets = serde_yaml::from_str::<Option<HashMap<String, VendorSecret>>>(&content)
            .with_context(|| format!("Failed to parse vendor secrets {}", self.path.display()))?
            .unwrap_or_default();
        Ok(secrets.remove(vendor))
    }
}

/// In-memory secrets
#[derive(Debug, Clone, Default)]
pub struct StaticSecretProvider {
    secrets: HashMap<String, VendorSecret>,
}

impl StaticSecretProvider {
    pub fn with_secret(mut self, vendor: &str, user: &str, password: &str) -> Self {
        self.secrets.insert(
            vendor.to_string(),
            VendorSecret {
                user: user.to_string(),
                password: password.to_string(),
            },
        );
        self
    }
}

#[async_trait::async_trait]
impl SecretProvider for StaticSecretProvider {
    async fn resolve(&self, vendor: &str) -> Result<Option<VendorSecret>> {
        Ok(self.secrets.get(vendor).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_prefix() {
        assert_eq!(EnvSecretProvider::env_prefix("Cisco"), "VENDOR_CISCO");
        assert_eq!(EnvSecretProvider::env_prefix("Palo Alto"), "VENDOR_PALO_ALTO");
    }

    #[tokio::test]
    async fn test_env_provider_reads_vars() {
        std::env::set_var("VENDOR_ENVTESTVENDOR_USER", "ops");
        std::env::set_var("VENDOR_ENVTESTVENDOR_PASSWORD", "pw");
        let secret = EnvSecretProvider.resolve("EnvTestVendor").await.unwrap().unwrap();
        assert_eq!(secret.user, "ops");
        assert_eq!(secret.password, "pw");
        assert!(EnvSecretProvider.resolve("NoSuchVendorXyz").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_provider_rereads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.yml");
        tokio::fs::write(&path, "Cisco:\n  user: admin\n  password: one\n").await.unwrap();

        let provider = FileSecretProvider::new(path.clone());
        assert_eq!(provider.resolve("Cisco").await.unwrap().unwrap().password, "one");
        assert!(provider.resolve("Juniper").await.unwrap().is_none());

        tokio::fs::write(&path, "Cisco:\n  user: admin\n  password: two\n").await.unwrap();
        assert_eq!(provider.resolve("Cisco").await.unwrap().unwrap().password, "two");
    }

    #[tokio::test]
    async fn test_file_provider_missing_file_is_error() {
        let provider = FileSecretProvider::new(PathBuf::from("/nonexistent/secrets.yml"));
        assert!(provider.resolve("Cisco").await.is_err());
    }
}
