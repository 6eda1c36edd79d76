use anyhow::Result;
use std::sync::Arc;

use crate::backup::{BackupDiffEngine, DiffOutcome};
use crate::config::Config;
use crate::extract::Extractors;
use crate::inventory::SharedRegistry;
use crate::models::{action_status, ActionResponse, ActionType, Device, UptimeResponse};
use crate::playbooks::PlaybookRegistry;
use crate::runner::{CommandBuilder, ExecutionResult, Invocation, LogPersister, PlaybookRunner};
use crate::vendors::{SecretProvider, VendorProfileStore};

/// Outcome of resolving a device and playbook for an action
enum Prepared {
    Ready(Invocation),
    Rejected(ActionResponse),
}

/// ActionService runs device actions end to end.
///
/// Device lookup, playbook selection and profile resolution happen before
/// anything is launched, so a rejected request never spawns a process or
/// writes an artifact.
pub struct ActionService {
    registry: SharedRegistry,
    profiles: VendorProfileStore,
    playbooks: PlaybookRegistry,
    runner: PlaybookRunner,
    diff_engine: BackupDiffEngine,
    extractors: Extractors,
    timeout_secs: u64,
}

impl ActionService {
    pub fn new(config: &Config, registry: SharedRegistry, secrets: Arc<dyn SecretProvider>) -> Self {
        let playbooks = PlaybookRegistry::with_defaults(&config.playbooks_dir);
        for action in ActionType::ALL {
            let vendors = playbooks.vendors_for(action);
            if vendors.is_empty() {
                tracing::info!("{} playbook: any vendor", action);
            } else {
                tracing::info!("{} playbooks: {}", action, vendors.join(", "));
            }
        }

        Self {
            registry,
            profiles: VendorProfileStore::new(secrets),
            playbooks,
            runner: PlaybookRunner::new(
                CommandBuilder::new(config.ansible_bin.clone(), config.inventory_path.clone()),
                LogPersister::new(config.log_dir.clone()),
            ),
            diff_engine: BackupDiffEngine::new(
                config.config_backup_dir.clone(),
                config.diff_log_dir.clone(),
            ),
            extractors: Extractors::default(),
            timeout_secs: config.playbook_timeout_secs,
        }
    }

    /// Replace the playbook table
    #[cfg(test)]
    pub fn with_playbooks(mut self, playbooks: PlaybookRegistry) -> Self {
        self.playbooks = playbooks;
        self
    }

    /// Ping a device; `output` carries the extracted ping text
    pub async fn ping(&self, device_id: &str) -> Result<ActionResponse> {
        let invocation = match self.prepare(ActionType::Ping, device_id).await? {
            Prepared::Ready(invocation) => invocation,
            Prepared::Rejected(response) => return Ok(response),
        };

        let result = self.runner.run(&invocation).await?;
        let output = self.extractors.ping_output(&result.output);
        Ok(completed(&invocation, &result).with_output(output))
    }

    /// Back up a device configuration; only the log path is returned
    pub async fn backup(&self, device_id: &str) -> Result<ActionResponse> {
        let invocation = match self.prepare(ActionType::Backup, device_id).await? {
            Prepared::Ready(invocation) => invocation,
            Prepared::Rejected(response) => return Ok(response),
        };

        let result = self.runner.run(&invocation).await?;
        Ok(completed(&invocation, &result))
    }

    /// Restart a device; `output` carries the full tool output
    pub async fn restart(&self, device_id: &str) -> Result<ActionResponse> {
        let invocation = match self.prepare(ActionType::Restart, device_id).await? {
            Prepared::Ready(invocation) => invocation,
            Prepared::Rejected(response) => return Ok(response),
        };

        let result = self.runner.run(&invocation).await?;
        let output = result.output.clone();
        Ok(completed(&invocation, &result).with_output(output))
    }

    /// Report device uptime. A run that exits cleanly without an `UPTIME:`
    /// label is still a failure.
    pub async fn uptime(&self, device_id: &str) -> Result<UptimeResponse> {
        let invocation = match self.prepare(ActionType::Uptime, device_id).await? {
            Prepared::Ready(invocation) => invocation,
            Prepared::Rejected(action) => return Ok(UptimeResponse { action, uptime: None }),
        };

        let result = self.runner.run(&invocation).await?;
        let uptime = self.extractors.uptime(&result.output);
        if result.success && uptime.is_none() {
            tracing::warn!("No UPTIME label in output for {}", invocation.host_id);
        }

        let mut action = completed(&invocation, &result).with_output(result.output.clone());
        action.status = action_status::from_success(result.success && uptime.is_some());
        Ok(UptimeResponse { action, uptime })
    }

    /// Diff the two latest configuration backups of a device. Nothing is executed.
    pub async fn diff(&self, device_id: &str, max_lines: usize) -> Result<ActionResponse> {
        let device = match self.find_device(device_id).await {
            Some(device) => device,
            None => return Ok(ActionResponse::not_found(device_id)),
        };

        let response = match self.diff_engine.diff(&device.vendor, &device.id, max_lines).await? {
            DiffOutcome::NoBackups => ActionResponse::new(action_status::NO_BACKUPS, device_id)
                .with_vendor(&device.vendor)
                .with_message(format!("No backups found for {}", device_id)),
            DiffOutcome::NotEnoughBackups => {
                ActionResponse::new(action_status::NOT_ENOUGH_BACKUPS, device_id)
                    .with_vendor(&device.vendor)
                    .with_message("At least two backups are needed to compare")
            }
            DiffOutcome::Diff(result) => {
                let mut message = format!("{} -> {}", result.from, result.to);
                if result.truncated {
                    message.push_str(&format!(" ({} lines, truncated)", result.total_lines));
                }
                ActionResponse::new(action_status::SUCCESS, device_id)
                    .with_vendor(&device.vendor)
                    .with_message(message)
                    .with_logfile(result.log_file)
                    .with_diff(result.view)
            }
        };
        Ok(response)
    }

    async fn find_device(&self, device_id: &str) -> Option<Device> {
        let device = self.registry.read().await.find(device_id).cloned();
        if device.is_none() {
            tracing::info!("Device {} not found in inventory", device_id);
        }
        device
    }

    async fn prepare(&self, action: ActionType, device_id: &str) -> Result<Prepared> {
        let device = match self.find_device(device_id).await {
            Some(device) => device,
            None => return Ok(Prepared::Rejected(ActionResponse::not_found(device_id))),
        };

        let playbook = match self.playbooks.lookup(action, &device.vendor) {
            Some(playbook) => playbook.to_path_buf(),
            None => {
                let message = format!("No {} playbook for vendor '{}'", action, device.vendor);
                tracing::info!("{} ({})", message, device_id);
                return Ok(Prepared::Rejected(
                    ActionResponse::new(action_status::UNSUPPORTED_VENDOR, device_id)
                        .with_vendor(&device.vendor)
                        .with_message(message),
                ));
            }
        };

        let profile = self.profiles.resolve(&device.vendor).await?;
        Ok(Prepared::Ready(Invocation {
            action,
            playbook,
            host_id: device.id,
            profile,
            timeout_secs: self.timeout_secs,
        }))
    }
}

fn completed(invocation: &Invocation, result: &ExecutionResult) -> ActionResponse {
    ActionResponse::new(action_status::from_success(result.success), &invocation.host_id)
        .with_vendor(&invocation.profile.vendor)
        .with_logfile(result.log_file.clone())
}
