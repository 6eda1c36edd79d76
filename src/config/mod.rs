use std::env;
use std::path::PathBuf;

/// Config holds all application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: String,
    pub inventory_path: PathBuf,
    pub playbooks_dir: PathBuf,
    pub log_dir: PathBuf,
    pub diff_log_dir: PathBuf,
    pub config_backup_dir: PathBuf,
    pub ansible_bin: String,
    pub playbook_timeout_secs: u64,
    pub diff_max_lines: usize,
    pub inventory_poll_secs: u64,
    pub vendor_secrets_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn load() -> Self {
        Self {
            listen_addr: get_env("LISTEN_ADDR", "0.0.0.0:3399"),
            inventory_path: get_env("INVENTORY_PATH", "ansible/inventories/devices.yml").into(),
            playbooks_dir: get_env("PLAYBOOKS_DIR", "ansible/playbooks").into(),
            log_dir: get_env("LOG_DIR", "logs").into(),
            diff_log_dir: get_env("DIFF_LOG_DIR", "logs/diff").into(),
            config_backup_dir: get_env("CONFIG_BACKUP_DIR", "backups").into(),
            ansible_bin: get_env("ANSIBLE_PLAYBOOK_BIN", "ansible-playbook"),
            playbook_timeout_secs: get_env("PLAYBOOK_TIMEOUT_SECS", "90")
                .parse()
                .unwrap_or(90),
            diff_max_lines: get_env("DIFF_MAX_LINES", "200").parse().unwrap_or(200),
            inventory_poll_secs: get_env("INVENTORY_POLL_SECS", "10")
                .parse()
                .unwrap_or(10),
            vendor_secrets_file: env::var("VENDOR_SECRETS_FILE")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
        }
    }

    /// Config rooted at a single directory, used to isolate tests
    #[cfg(test)]
    pub fn rooted_at(root: &std::path::Path) -> Self {
        Self {
            listen_addr: "127.0.0.1:0".to_string(),
            inventory_path: root.join("inventory.yml"),
            playbooks_dir: root.join("playbooks"),
            log_dir: root.join("logs"),
            diff_log_dir: root.join("logs").join("diff"),
            config_backup_dir: root.join("backups"),
            ansible_bin: "ansible-playbook".to_string(),
            playbook_timeout_secs: 5,
            diff_max_lines: 200,
            inventory_poll_secs: 10,
            vendor_secrets_file: None,
        }
    }
}

fn get_env(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
