mod backup;
mod config;
mod extract;
mod handlers;
mod inventory;
mod models;
mod playbooks;
mod router;
mod runner;
mod services;
mod vendors;

use std::sync::Arc;
use tokio::signal;
use tokio::sync::RwLock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;
use inventory::{DeviceRegistry, InventoryWatcher, SharedRegistry};
use services::ActionService;
use vendors::{EnvSecretProvider, FileSecretProvider, SecretProvider};

/// Application state shared across handlers
pub struct AppState {
    pub config: Config,
    pub registry: SharedRegistry,
    pub actions: ActionService,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "device_console=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let cfg = Config::load();
    tracing::info!("Starting device console");
    tracing::info!("Inventory: {}", cfg.inventory_path.display());
    tracing::info!("Playbooks: {}", cfg.playbooks_dir.display());
    tracing::info!("Logs: {}", cfg.log_dir.display());
    tracing::info!("Listen: {}", cfg.listen_addr);

    // Load the device inventory; an unreadable file starts with an empty registry
    let registry = match DeviceRegistry::load(&cfg.inventory_path).await {
        Ok(registry) => {
            tracing::info!("Loaded {} devices", registry.len());
            registry
        }
        Err(e) => {
            tracing::warn!("Failed to load inventory: {:#}", e);
            DeviceRegistry::default()
        }
    };
    let registry: SharedRegistry = Arc::new(RwLock::new(Arc::new(registry)));

    // Reload the registry when the inventory changes
    let mut inventory_watcher = InventoryWatcher::new(
        cfg.inventory_path.clone(),
        registry.clone(),
        cfg.inventory_poll_secs,
    );
    inventory_watcher.start();

    // Vendor credentials are resolved per invocation, never compiled in
    let secrets: Arc<dyn SecretProvider> = match &cfg.vendor_secrets_file {
        Some(path) => {
            tracing::info!("Vendor secrets: {}", path.display());
            Arc::new(FileSecretProvider::new(path.clone()))
        }
        None => {
            tracing::info!("Vendor secrets: environment");
            Arc::new(EnvSecretProvider)
        }
    };

    let actions = ActionService::new(&cfg, registry.clone(), secrets);

    // Create app state
    let state = Arc::new(AppState {
        config: cfg.clone(),
        registry,
        actions,
    });

    // Build router
    let app = router::build(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&cfg.listen_addr).await?;
    tracing::info!("Device console listening on {}", cfg.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    inventory_watcher.stop();
    tracing::info!("Device console shutting down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
