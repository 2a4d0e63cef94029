use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};

/// Header and table words that show up next to device identifiers in
/// storage, health and patch tables.
pub const BOILERPLATE_WORDS: &[&str] = &[
    "approved", "available", "capacity", "check", "compliance", "critical", "desktop",
    "device", "devices", "disk", "disks", "drive", "drives", "enterprise", "error", "failed",
    "free", "fully", "gb", "hostname", "install", "installed", "kb", "label", "laptop", "last",
    "letter", "mb", "microsoft", "missing", "name", "offline", "online", "operating", "passed",
    "patch", "patched", "patches", "pending", "percent", "percentage", "policy", "professional",
    "reboot", "required", "server", "size", "space", "status", "storage", "summary", "support",
    "supported", "system", "tb", "total", "unsupported", "update", "updates", "used", "user",
    "version", "volume", "windows", "workstation",
];

pub fn is_boilerplate(token: &str) -> bool {
    let lowered = token.to_ascii_lowercase();
    BOILERPLATE_WORDS.contains(&lowered.as_str())
}

/// Uppercase and strip everything that is not alphanumeric.
pub fn normalize_device_id(raw: &str) -> String {
    raw.chars()
        .filter(|character| character.is_ascii_alphanumeric())
        .map(|character| character.to_ascii_uppercase())
        .collect()
}

pub fn trim_token(token: &str) -> &str {
    token.trim_matches(|character: char| {
        matches!(
            character,
            ',' | ';' | ':' | '(' | ')' | '[' | ']' | '"' | '\'' | '|' | '*'
        )
    })
}

/// Shapes of device names seen in monitoring exports.
#[derive(Debug)]
pub struct DeviceShapes {
    known_prefix: Option<Regex>,
    hostname: Regex,
    alias: Regex,
}

impl DeviceShapes {
    pub fn new(prefixes: &[String]) -> Result<Self> {
        let alternation = prefixes
            .iter()
            .map(|prefix| prefix.trim())
            .filter(|prefix| !prefix.is_empty())
            .map(regex::escape)
            .collect::<Vec<String>>()
            .join("|");
        let known_prefix = if alternation.is_empty() {
            None
        } else {
            let pattern = format!(r"^(?:{alternation})-?\d+[A-Za-z0-9]*$");
            let regex = RegexBuilder::new(&pattern)
                .case_insensitive(true)
                .build()
                .context("failed to compile device prefix regex")?;
            Some(regex)
        };
        let hostname = RegexBuilder::new(r"^(?:DESKTOP|LAPTOP)-[A-Z0-9]+$")
            .case_insensitive(true)
            .build()
            .context("failed to compile hostname regex")?;
        let alias = Regex::new(r"^[A-Za-z][A-Za-z0-9]+(?:-[A-Za-z0-9]+)+$")
            .context("failed to compile alias regex")?;

        Ok(Self {
            known_prefix,
            hostname,
            alias,
        })
    }

    pub fn is_known_prefix(&self, token: &str) -> bool {
        self.known_prefix
            .as_ref()
            .is_some_and(|regex| regex.is_match(token))
    }

    pub fn is_hostname(&self, token: &str) -> bool {
        self.hostname.is_match(token)
    }

    /// `PREFIX-SUFFIX` naming that is not a raw Windows hostname.
    pub fn is_alias(&self, token: &str) -> bool {
        self.alias.is_match(token) && !self.is_hostname(token)
    }

    /// Known prefix or hostname pattern, or an alphanumeric token of at
    /// least six characters carrying a digit. Plain words such as a first
    /// name never qualify.
    pub fn is_device_id(&self, token: &str) -> bool {
        let token = trim_token(token);
        if token.is_empty() || is_boilerplate(token) {
            return false;
        }
        if self.is_known_prefix(token) || self.is_hostname(token) {
            return true;
        }
        token.len() >= 6
            && token.chars().all(|character| character.is_ascii_alphanumeric())
            && token.chars().any(|character| character.is_ascii_digit())
    }
}

pub fn default_prefixes() -> Vec<String> {
    ["PC", "WS", "NB", "LT", "SRV"]
        .iter()
        .map(|prefix| prefix.to_string())
        .collect()
}
