use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::RwLock;
use tokio::time::{interval, Duration};

use super::DeviceRegistry;

/// Shared handle to the current registry snapshot
pub type SharedRegistry = Arc<RwLock<Arc<DeviceRegistry>>>;

/// InventoryWatcher reloads the device registry when the inventory file changes
pub struct InventoryWatcher {
    inventory_path: PathBuf,
    registry: SharedRegistry,
    poll_secs: u64,
    stop_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl InventoryWatcher {
    pub fn new(inventory_path: PathBuf, registry: SharedRegistry, poll_secs: u64) -> Self {
        Self {
            inventory_path,
            registry,
            poll_secs: poll_secs.max(1),
            stop_tx: None,
        }
    }

    /// Start watching the inventory file
    pub fn start(&mut self) {
        let (stop_tx, mut stop_rx) = tokio::sync::oneshot::channel();
        self.stop_tx = Some(stop_tx);

        let inventory_path = self.inventory_path.clone();
        let registry = self.registry.clone();
        let poll_secs = self.poll_secs;

        tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(poll_secs));
            let mut last_modified = modified_time(&inventory_path).await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let modified = modified_time(&inventory_path).await;
                        if modified.is_some() && modified != last_modified {
                            last_modified = modified;
                            reload(&inventory_path, &registry).await;
                        }
                    }
                    _ = &mut stop_rx => {
                        tracing::info!("Inventory watcher stopped");
                        break;
                    }
                }
            }
        });
    }

    /// Stop watching the inventory file
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Reload the registry from disk. A failed load keeps the previous snapshot.
pub async fn reload(inventory_path: &std::path::Path, registry: &SharedRegistry) -> bool {
    match DeviceRegistry::load(inventory_path).await {
        Ok(loaded) => {
            tracing::info!(
                "Inventory reloaded from {} ({} devices)",
                inventory_path.display(),
                loaded.len()
            );
            *registry.write().await = Arc::new(loaded);
            true
        }
        Err(e) => {
            tracing::warn!("Inventory reload failed, keeping previous devices: {:#}", e);
            false
        }
    }
}

async fn modified_time(path: &std::path::Path) -> Option<SystemTime> {
    tokio::fs::metadata(path).await.ok()?.modified().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reload_swaps_registry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devices.yml");
        tokio::fs::write(&path, "all:\n  children:\n    core:\n      hosts:\n        r1:\n          vendor: Cisco\n")
            .await
            .unwrap();

        let registry: SharedRegistry = Arc::new(RwLock::new(Arc::new(DeviceRegistry::default())));
        assert!(reload(&path, &registry).await);
        assert!(registry.read().await.find("r1").is_some());
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devices.yml");
        tokio::fs::write(&path, "all:\n  children:\n    core:\n      hosts:\n        r1:\n")
            .await
            .unwrap();

        let registry: SharedRegistry = Arc::new(RwLock::new(Arc::new(DeviceRegistry::default())));
        assert!(reload(&path, &registry).await);

        tokio::fs::write(&path, "all: [broken").await.unwrap();
        assert!(!reload(&path, &registry).await);
        assert!(registry.read().await.find("r1").is_some());
    }
}
