use regex_lite::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::vendors::VendorProfile;

/// Replacement for credential values in echoed commands
pub const MASK: &str = "********";

/// Matches `…user=`, `…password=` and `…pass=` followed by a quoted or bare value
const SECRET_PATTERN: &str =
    r#"([A-Za-z0-9_]*(?:user|password|pass)=)("(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*'|[^\s"']+)"#;

/// CommandSpec is the exact program and argument vector to execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Shell-like rendering; arguments containing whitespace are double-quoted
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(|arg| {
                if arg.is_empty() || arg.chars().any(char::is_whitespace) {
                    format!("\"{}\"", arg)
                } else {
                    arg.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Rendering safe to log: credential values are masked
    pub fn masked(&self) -> String {
        mask_sensitive(&self.display())
    }
}

/// Mask credential values in a human-readable command line
pub fn mask_sensitive(cmd: &str) -> String {
    static SECRET_RE: OnceLock<Option<Regex>> = OnceLock::new();
    match SECRET_RE.get_or_init(|| Regex::new(SECRET_PATTERN).ok()) {
        Some(re) => re.replace_all(cmd, format!("${{1}}{}", MASK).as_str()).into_owned(),
        None => MASK.to_string(),
    }
}

/// CommandBuilder builds ansible-playbook invocations
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    program: String,
    inventory: PathBuf,
}

impl CommandBuilder {
    pub fn new(program: impl Into<String>, inventory: PathBuf) -> Self {
        Self {
            program: program.into(),
            inventory,
        }
    }

    /// `<program> -i <inventory> <playbook> --limit <host> -e "<k=v ...>"`
    pub fn build(&self, playbook: &Path, host_id: &str, profile: &VendorProfile) -> CommandSpec {
        let mut args = vec![
            "-i".to_string(),
            self.inventory.display().to_string(),
            playbook.display().to_string(),
            "--limit".to_string(),
            host_id.to_string(),
        ];

        let extra = extra_vars(profile);
        if !extra.is_empty() {
            args.push("-e".to_string());
            args.push(extra);
        }

        CommandSpec::new(self.program.clone(), args)
    }
}

/// Join profile parameters as space-separated `key=value` pairs
pub fn extra_vars(profile: &VendorProfile) -> String {
    profile
        .params
        .iter()
        .map(|(k, v)| format!("{}={}", k, quote_value(v)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Quote a value so the tool's key=value parser keeps it as one token.
/// Backslashes are escaped in both quoting styles since the parser decodes escapes.
fn quote_value(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || c == '\'' || c == '"' || c == '\\');
    if !needs_quotes {
        return value.to_string();
    }
    let escaped = value.replace('\\', "\\\\");
    if value.contains('\'') {
        format!("\"{}\"", escaped.replace('"', "\\\""))
    } else {
        format!("'{}'", escaped)
    }
}
