//! Best-effort scrapers that pull single values out of free-form playbook output.
//!
//! Both scrapers sit behind [`OutputExtractor`] so they can be swapped for a
//! structured-output parser without touching the action handlers.

use regex_lite::Regex;

/// Label of the registered ping result in ansible's debug output
/// An empty field does not match, so callers fall back to the raw output
const PING_STDOUT_PATTERN: &str = r#""ping_output\.stdout":\s*"((?:[^"\\]|\\.)+)""#;

/// Label printed by the uptime playbooks
const UPTIME_PATTERN: &str = r"UPTIME:([^\r\n]*)";

/// OutputExtractor pulls one value out of raw tool output
pub trait OutputExtractor: Send + Sync {
    /// The extracted value, or None when the output does not carry it
    fn extract(&self, raw: &str) -> Option<String>;
}

/// Extracts the escaped `ping_output.stdout` string and unescapes it
pub struct PingStdoutExtractor {
    re: Option<Regex>,
}

impl Default for PingStdoutExtractor {
    fn default() -> Self {
        Self {
            re: Regex::new(PING_STDOUT_PATTERN).ok(),
        }
    }
}

impl OutputExtractor for PingStdoutExtractor {
    fn extract(&self, raw: &str) -> Option<String> {
        let caps = self.re.as_ref()?.captures(raw)?;
        let escaped = caps.get(1)?.as_str();
        Some(unescape(escaped).trim().to_string())
    }
}

/// Extracts the remainder of the first `UPTIME:` line
pub struct UptimeExtractor {
    re: Option<Regex>,
}

impl Default for UptimeExtractor {
    fn default() -> Self {
        Self {
            re: Regex::new(UPTIME_PATTERN).ok(),
        }
    }
}

impl OutputExtractor for UptimeExtractor {
    fn extract(&self, raw: &str) -> Option<String> {
        let caps = self.re.as_ref()?.captures(raw)?;
        Some(caps.get(1)?.as_str().trim().to_string())
    }
}

/// Extractors used by the action service
pub struct Extractors {
    pub ping: Box<dyn OutputExtractor>,
    pub uptime: Box<dyn OutputExtractor>,
}

impl Default for Extractors {
    fn default() -> Self {
        Self {
            ping: Box::new(PingStdoutExtractor::default()),
            uptime: Box::new(UptimeExtractor::default()),
        }
    }
}

impl Extractors {
    /// Ping text, falling back to the trimmed raw output when the field is absent
    pub fn ping_output(&self, raw: &str) -> String {
        self.ping
            .extract(raw)
            .unwrap_or_else(|| raw.trim().to_string())
    }

    /// Uptime string; None means the playbook did not report one
    pub fn uptime(&self, raw: &str) -> Option<String> {
        self.uptime.extract(raw)
    }
}

/// Decode backslash escapes as they appear in JSON-ish / Python repr strings.
/// Unknown escapes are kept verbatim.
pub fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some('\\') => out.push('\\'),
            Some('/') => out.push('/'),
            Some('x') => push_hex_escape(&mut out, &mut chars, 'x', 2),
            Some('u') => push_hex_escape(&mut out, &mut chars, 'u', 4),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn push_hex_escape(
    out: &mut String,
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    kind: char,
    digits: usize,
) {
    let mut hex = String::with_capacity(digits);
    while hex.len() < digits {
        match chars.peek() {
            Some(c) if c.is_ascii_hexdigit() => {
                hex.push(*c);
                chars.next();
            }
            _ => break,
        }
    }

    let decoded = if hex.len() == digits {
        u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32)
    } else {
        None
    };
    match decoded {
        Some(ch) => out.push(ch),
        None => {
            out.push('\\');
            out.push(kind);
            out.push_str(&hex);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_field_is_unescaped_and_trimmed() {
        let raw = r#"ok: [r1] => {
    "ping_output.stdout": "\nPING ok\n"
}"#;
        assert_eq!(Extractors::default().ping_output(raw), "PING ok");
    }

    #[test]
    fn test_ping_multiline_summary() {
        let raw = r#"TASK [debug] "ping_output.stdout": "PING 10.0.0.1: 56 data bytes\n5 packets transmitted, 5 received\tdone \"quoted\""  "#;
        assert_eq!(
            Extractors::default().ping_output(raw),
            "PING 10.0.0.1: 56 data bytes\n5 packets transmitted, 5 received\tdone \"quoted\""
        );
    }

    #[test]
    fn test_ping_falls_back_to_raw() {
        let raw = "\n  fatal: [r1]: UNREACHABLE!  \n";
        assert_eq!(Extractors::default().ping_output(raw), "fatal: [r1]: UNREACHABLE!");
    }

    #[test]
    fn test_empty_ping_field_falls_back_to_raw() {
        let raw = "ok: [r1] => {\n    \"ping_output.stdout\": \"\"\n}\n";
        assert_eq!(PingStdoutExtractor::default().extract(raw), None);
        assert_eq!(Extractors::default().ping_output(raw), raw.trim());
    }

    #[test]
    fn test_uptime_found_anywhere_in_blob() {
        let raw = "PLAY [uptime]\nok: [r1]\nmsg: UPTIME: 14 days, 3:02  \nPLAY RECAP";
        assert_eq!(Extractors::default().uptime(raw).as_deref(), Some("14 days, 3:02"));
    }

    #[test]
    fn test_uptime_absent_is_none_but_empty_is_some() {
        let extractors = Extractors::default();
        assert_eq!(extractors.uptime("no label here"), None);
        assert_eq!(extractors.uptime("UPTIME:\r\nnext").as_deref(), Some(""));
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r"a\nb"), "a\nb");
        assert_eq!(unescape(r"\x41é"), "Aé");
        assert_eq!(unescape(r"\q"), r"\q");
        assert_eq!(unescape(r"\xZ"), r"\xZ");
        assert_eq!(unescape("tail\\"), "tail\\");
    }

    struct Fixed;

    impl OutputExtractor for Fixed {
        fn extract(&self, _raw: &str) -> Option<String> {
            Some("structured".to_string())
        }
    }

    #[test]
    fn test_extractors_are_replaceable() {
        let extractors = Extractors {
            ping: Box::new(Fixed),
            uptime: Box::new(Fixed),
        };
        assert_eq!(extractors.ping_output("anything"), "structured");
        assert_eq!(extractors.uptime("anything").as_deref(), Some("structured"));
    }
}
