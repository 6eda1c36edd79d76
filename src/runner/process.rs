use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{timeout, Duration};

use super::command::CommandSpec;

/// The external tool could not be started at all (missing binary, permissions).
/// This is a host misconfiguration, not a device failure.
#[derive(Debug)]
pub struct EnvironmentError {
    pub program: String,
    pub source: std::io::Error,
}

impl std::fmt::Display for EnvironmentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to launch {}: {}", self.program, self.source)
    }
}

impl std::error::Error for EnvironmentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Outcome of one process run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub success: bool,
    pub output: String,
    pub timed_out: bool,
}

/// Run the command in its own process group and wait up to `timeout_secs`.
///
/// A non-zero exit is a normal failed result. On timeout the whole process
/// group is killed and a diagnostic output is synthesized. Only a failure to
/// spawn is returned as an error.
pub async fn execute(spec: &CommandSpec, timeout_secs: u64) -> Result<ProcessOutput, EnvironmentError> {
    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);

    let child = cmd.spawn().map_err(|source| EnvironmentError {
        program: spec.program.clone(),
        source,
    })?;
    let pid = child.id();

    match timeout(Duration::from_secs(timeout_secs), child.wait_with_output()).await {
        Ok(Ok(out)) => {
            let mut output = String::from_utf8_lossy(&out.stdout).into_owned();
            output.push('\n');
            output.push_str(&String::from_utf8_lossy(&out.stderr));
            Ok(ProcessOutput {
                success: out.status.success(),
                output,
                timed_out: false,
            })
        }
        Ok(Err(e)) => {
            tracing::warn!("Failed to collect output from {}: {}", spec.program, e);
            Ok(ProcessOutput {
                success: false,
                output: format!("ERROR: failed to collect output from {}: {}\n", spec.program, e),
                timed_out: false,
            })
        }
        Err(_) => {
            if let Some(pid) = pid {
                kill_process_group(pid);
            }
            tracing::warn!("{} exceeded {}s and was killed", spec.program, timeout_secs);
            Ok(ProcessOutput {
                success: false,
                output: format!(
                    "TIMEOUT: {} exceeded {}s and was killed.\n",
                    program_name(&spec.program),
                    timeout_secs
                ),
                timed_out: true,
            })
        }
    }
}

#[cfg(unix)]
fn kill_process_group(pid: u32) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        tracing::warn!("Failed to kill process group {}: {}", pid, e);
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}

fn program_name(program: &str) -> &str {
    std::path::Path::new(program)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(program)
}
