use anyhow::{Context, Result};
use chrono::Local;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Timestamp format used for artifact file names
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Write `content` to a new `<dir>/<timestamp>.<ext>` file.
///
/// Files are created exclusively; when a file for the same second already
/// exists a `_1`, `_2`, ... suffix is appended, so nothing is ever overwritten.
pub async fn write_artifact(dir: &Path, ext: &str, content: &str) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
    let mut attempt: u32 = 0;
    loop {
        let file_name = if attempt == 0 {
            format!("{}.{}", timestamp, ext)
        } else {
            format!("{}_{}.{}", timestamp, attempt, ext)
        };
        let path = dir.join(file_name);

        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(mut file) => {
                file.write_all(content.as_bytes())
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                file.flush().await?;
                return Ok(path);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to create {}", path.display()));
            }
        }
    }
}

/// Resolve a relative root against the working directory once, so that
/// artifact paths handed back to callers are absolute.
pub fn absolute_root(root: PathBuf) -> PathBuf {
    if root.is_absolute() {
        return root;
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(root),
        Err(e) => {
            tracing::warn!("Cannot resolve {} against working directory: {}", root.display(), e);
            root
        }
    }
}

/// LogPersister stores raw playbook output under `<root>/<action>/<vendor>/<host>/`
#[derive(Debug, Clone)]
pub struct LogPersister {
    root: PathBuf,
}

impl LogPersister {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root: absolute_root(root),
        }
    }

    /// Directory holding the logs for one action, vendor and host
    pub fn dir_for(&self, action: &str, vendor: &str, host_id: &str) -> PathBuf {
        self.root
            .join(path_component(action))
            .join(path_component(vendor))
            .join(path_component(host_id))
    }

    /// Persist raw output and return the artifact path
    pub async fn persist(&self, action: &str, vendor: &str, host_id: &str, output: &str) -> Result<String> {
        let dir = self.dir_for(action, vendor, host_id);
        let path = write_artifact(&dir, "log", output).await?;
        Ok(path.display().to_string())
    }
}

/// Make a value safe to use as a single path component
pub fn path_component(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .map(|c| if c == '/' || c == '\\' || c == '\0' { '_' } else { c })
        .collect();
    match cleaned.as_str() {
        "" => "_".to_string(),
        "." | ".." => cleaned.replace('.', "_"),
        _ => cleaned,
    }
}
