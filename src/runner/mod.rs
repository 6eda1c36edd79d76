pub mod command;
pub mod logs;
pub mod process;

pub use command::CommandBuilder;
pub use logs::LogPersister;
pub use process::EnvironmentError;

use anyhow::Result;
use std::path::PathBuf;

use crate::models::ActionType;
use crate::vendors::VendorProfile;

/// Lines of output echoed to the log when a run fails
const FAILURE_TAIL_LINES: usize = 80;

/// Invocation is one playbook run requested for one host
#[derive(Debug, Clone)]
pub struct Invocation {
    pub action: ActionType,
    pub playbook: PathBuf,
    pub host_id: String,
    pub profile: VendorProfile,
    pub timeout_secs: u64,
}

/// ExecutionResult is produced once per invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub success: bool,
    pub output: String,
    pub log_file: String,
}

/// PlaybookRunner builds, executes and persists playbook runs
#[derive(Debug, Clone)]
pub struct PlaybookRunner {
    builder: CommandBuilder,
    persister: LogPersister,
}

impl PlaybookRunner {
    pub fn new(builder: CommandBuilder, persister: LogPersister) -> Self {
        Self { builder, persister }
    }

    /// Run an invocation to completion or timeout and persist its output.
    /// Fails only when the tool cannot be launched or the log cannot be written.
    pub async fn run(&self, invocation: &Invocation) -> Result<ExecutionResult> {
        let spec = self
            .builder
            .build(&invocation.playbook, &invocation.host_id, &invocation.profile);
        tracing::info!("Running: {}", spec.masked());

        let outcome = process::execute(&spec, invocation.timeout_secs).await?;

        let log_file = self
            .persister
            .persist(
                invocation.action.as_str(),
                &invocation.profile.vendor,
                &invocation.host_id,
                &outcome.output,
            )
            .await?;

        if !outcome.success {
            tracing::warn!(
                "Playbook failed: action={} vendor={} host={} timed_out={} log={}\n---- last log lines ----\n{}",
                invocation.action,
                invocation.profile.vendor,
                invocation.host_id,
                outcome.timed_out,
                log_file,
                tail_lines(&outcome.output, FAILURE_TAIL_LINES)
            );
        }

        Ok(ExecutionResult {
            success: outcome.success,
            output: outcome.output,
            log_file,
        })
    }
}

/// Last `n` lines of `text`
fn tail_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}

#[cfg(all(test, unix))]
pub(crate) mod test_support {
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    /// Write an executable stand-in for ansible-playbook
    pub(crate) fn fake_tool(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("fake-ansible-playbook");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::test_support::fake_tool;
    use super::*;
    use std::path::Path;

    fn invocation(timeout_secs: u64) -> Invocation {
        Invocation {
            action: ActionType::Ping,
            playbook: PathBuf::from("ping_test.yml"),
            host_id: "r1".to_string(),
            profile: VendorProfile::new("Cisco").with_param("ansible_password", "pw"),
            timeout_secs,
        }
    }

    #[tokio::test]
    async fn test_run_persists_output() {
        let dir = tempfile::tempdir().unwrap();
        let tool = fake_tool(dir.path(), "echo \"args: $*\"");
        let runner = PlaybookRunner::new(
            CommandBuilder::new(tool.display().to_string(), dir.path().join("inv.yml")),
            LogPersister::new(dir.path().join("logs")),
        );

        let result = runner.run(&invocation(5)).await.unwrap();
        assert!(result.success);
        assert!(result.output.contains("--limit r1 -e ansible_password=pw"));
        assert!(result.log_file.contains("/logs/ping/Cisco/r1/"));
        assert_eq!(std::fs::read_to_string(&result.log_file).unwrap(), result.output);
    }

    #[tokio::test]
    async fn test_timeout_is_failed_result_with_log() {
        let dir = tempfile::tempdir().unwrap();
        let tool = fake_tool(dir.path(), "sleep 30");
        let runner = PlaybookRunner::new(
            CommandBuilder::new(tool.display().to_string(), dir.path().join("inv.yml")),
            LogPersister::new(dir.path().join("logs")),
        );

        let result = runner.run(&invocation(1)).await.unwrap();
        assert!(!result.success);
        assert!(result.output.starts_with("TIMEOUT: fake-ansible-playbook exceeded 1s"));
        assert!(Path::new(&result.log_file).exists());
    }

    #[tokio::test]
    async fn test_missing_tool_propagates_environment_error() {
        let dir = tempfile::tempdir().unwrap();
        let runner = PlaybookRunner::new(
            CommandBuilder::new("/nonexistent/ansible-playbook", dir.path().join("inv.yml")),
            LogPersister::new(dir.path().join("logs")),
        );

        let err = runner.run(&invocation(5)).await.unwrap_err();
        assert!(err.downcast_ref::<EnvironmentError>().is_some());
        assert!(!dir.path().join("logs").exists());
    }

    #[test]
    fn test_tail_lines() {
        assert_eq!(tail_lines("a\nb\nc", 2), "b\nc");
        assert_eq!(tail_lines("a", 5), "a");
    }
}
