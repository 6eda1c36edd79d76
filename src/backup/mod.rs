use anyhow::{Context, Result};
use similar::TextDiff;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::runner::logs::{absolute_root, path_component, write_artifact};

/// Canonical diff body when the two latest backups are identical
pub const NO_CHANGES: &str = "NO_CHANGES";

/// Lines of context around each hunk
const CONTEXT_LINES: usize = 3;

/// Result of comparing the two most recent backups of a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffResult {
    /// File name of the older backup
    pub from: String,
    /// File name of the newer backup
    pub to: String,
    /// Body bounded to the requested number of lines
    pub view: String,
    pub total_lines: usize,
    pub truncated: bool,
    pub log_file: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffOutcome {
    NoBackups,
    NotEnoughBackups,
    Diff(DiffResult),
}

/// BackupDiffEngine compares stored configuration snapshots
#[derive(Debug, Clone)]
pub struct BackupDiffEngine {
    config_root: PathBuf,
    diff_log_root: PathBuf,
}

impl BackupDiffEngine {
    pub fn new(config_root: PathBuf, diff_log_root: PathBuf) -> Self {
        Self {
            config_root: absolute_root(config_root),
            diff_log_root: absolute_root(diff_log_root),
        }
    }

    /// Diff the two most recently modified backups of a device and persist the full diff
    pub async fn diff(&self, vendor: &str, host_id: &str, max_lines: usize) -> Result<DiffOutcome> {
        let dir = match self.resolve_backup_dir(vendor, host_id).await {
            Some(dir) => dir,
            None => return Ok(DiffOutcome::NoBackups),
        };

        let latest = latest_files(&dir, 2).await?;
        let (newer, older) = match latest.as_slice() {
            [newer, older] => (newer, older),
            _ => return Ok(DiffOutcome::NotEnoughBackups),
        };

        let old_text = read_lossy(older).await?;
        let new_text = read_lossy(newer).await?;
        let from = file_name(older);
        let to = file_name(newer);

        let body = unified_diff(&old_text, &new_text, &from, &to);

        let log_dir = self
            .diff_log_root
            .join(path_component(vendor))
            .join(path_component(host_id));
        let log_file = write_artifact(&log_dir, "diff", &body)
            .await?
            .display()
            .to_string();

        let (view, total_lines, truncated) = truncate_view(&body, max_lines, &log_file);
        tracing::info!(
            "Diff for {}/{}: {} -> {} ({} lines, saved to {})",
            vendor,
            host_id,
            from,
            to,
            total_lines,
            log_file
        );

        Ok(DiffOutcome::Diff(DiffResult {
            from,
            to,
            view,
            total_lines,
            truncated,
            log_file,
        }))
    }

    /// First existing of `<root>/<vendor>/<host>`, `<root>/<vendor lowercased>/<host>`, `<root>/<host>`
    async fn resolve_backup_dir(&self, vendor: &str, host_id: &str) -> Option<PathBuf> {
        let host = path_component(host_id);
        let candidates = [
            self.config_root.join(path_component(vendor)).join(&host),
            self.config_root
                .join(path_component(&vendor.to_lowercase()))
                .join(&host),
            self.config_root.join(&host),
        ];

        for candidate in candidates {
            if let Ok(meta) = tokio::fs::metadata(&candidate).await {
                if meta.is_dir() {
                    return Some(candidate);
                }
            }
        }
        None
    }
}

/// Up to `n` regular files in `dir`, newest first.
/// Equal modification times are ordered by file name, descending.
async fn latest_files(dir: &Path, n: usize) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("Failed to list backups in {}", dir.display()))?;

    let mut files: Vec<(SystemTime, PathBuf)> = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let meta = match tokio::fs::metadata(&path).await {
            Ok(meta) => meta,
            Err(_) => continue,
        };
        if !meta.is_file() {
            continue;
        }
        let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        files.push((modified, path));
    }

    files.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
    Ok(files.into_iter().take(n).map(|(_, path)| path).collect())
}

async fn read_lossy(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read backup {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Line-based unified diff from `old` to `new`, or NO_CHANGES when identical
pub fn unified_diff(old: &str, new: &str, from: &str, to: &str) -> String {
    let diff = TextDiff::from_lines(old, new);
    let text = diff
        .unified_diff()
        .context_radius(CONTEXT_LINES)
        .header(from, to)
        .to_string();

    if text.trim().is_empty() {
        NO_CHANGES.to_string()
    } else {
        text
    }
}

/// Keep the first `max_lines` lines; a truncated view gets one trailing marker line.
/// Returns (view, total line count, truncated).
pub fn truncate_view(body: &str, max_lines: usize, log_file: &str) -> (String, usize, bool) {
    let lines: Vec<&str> = body.lines().collect();
    let total = lines.len();
    if total <= max_lines {
        return (body.to_string(), total, false);
    }

    let mut view: String = lines[..max_lines].iter().map(|l| format!("{}\n", l)).collect();
    view.push_str(&format!(
        "... truncated: {} lines total, full diff in {}",
        total, log_file
    ));
    (view, total, true)
}
