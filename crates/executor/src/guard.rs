//! Last-resort safety net for shell commands, evaluated independently of
//! policy and not overridable by any policy document.

use regex::Regex;
use std::sync::OnceLock;

const BLOCK_REASON: &str = "Command contains blocked operation";

/// Patterns that refuse execution outright: recursive force-removes,
/// redirects to raw block devices, and chains that feed destructive
/// commands.
const DANGEROUS_PATTERNS: &[&str] = &[
    r"(?i)\brm\s+.*-rf",
    r"(?i)\brm\s+-r\s+-f\b",
    r"(?i)>\s*/dev/",
    r"(?i)/dev/sd[a-z]",
    r"(?i)\|.*\brm\b",
    r"(?i);\s*rm\b",
    r"(?i)&&.*\brm\b",
    r"(?i)\$\([^)]*\brm\b",
    r"(?i)\bmkfs",
    r"(?i)\bdd\s+if=/dev/",
    r":\(\)\{\s*:\|:&\s*\};:",
];

fn patterns() -> &'static Vec<Regex> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        DANGEROUS_PATTERNS
            .iter()
            .map(|p| Regex::new(p).expect("dangerous pattern must compile"))
            .collect()
    })
}

pub struct CommandGuard;

impl CommandGuard {
    /// Returns the refusal reason when the command matches a dangerous
    /// pattern.
    pub fn check(command: &str) -> Result<(), String> {
        for pattern in patterns() {
            if pattern.is_match(command) {
                tracing::warn!(command, pattern = pattern.as_str(), "command refused by guard");
                return Err(BLOCK_REASON.to_string());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recursive_force_remove_is_refused() {
        assert!(CommandGuard::check("rm -rf /").is_err());
        assert!(CommandGuard::check("run rm -rf build").is_err());
        assert!(CommandGuard::check("RM -RF tmp").is_err());
    }

    #[test]
    fn test_device_redirects_are_refused() {
        assert!(CommandGuard::check("echo x > /dev/sda").is_err());
        assert!(CommandGuard::check("dd if=/dev/zero of=disk.img").is_err());
    }

    #[test]
    fn test_chains_feeding_rm_are_refused() {
        assert!(CommandGuard::check("find . -name '*.o' | xargs rm").is_err());
        assert!(CommandGuard::check("true; rm important").is_err());
        assert!(CommandGuard::check("make && rm out").is_err());
    }

    #[test]
    fn test_refusal_reason_is_stable() {
        let reason = CommandGuard::check("rm -rf /").unwrap_err();
        assert_eq!(reason, "Command contains blocked operation");
    }

    #[test]
    fn test_ordinary_commands_pass() {
        assert!(CommandGuard::check("make test").is_ok());
        assert!(CommandGuard::check("cd build && make").is_ok());
        assert!(CommandGuard::check("python3 src/app.py").is_ok());
        assert!(CommandGuard::check("git status").is_ok());
        // "format" and "transform" must not trip the rm patterns
        assert!(CommandGuard::check("cargo fmt").is_ok());
    }
}
