//! # Secret redaction
//!
//! Launch payloads carry credential passwords and request logs carry bearer
//! tokens. Anything headed for a log line or dry-run output goes through
//! these helpers first.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

const REPLACEMENT: &str = "[REDACTED]";

/// Key fragments whose values are always treated as secret.
const SECRET_KEY_FRAGMENTS: &[&str] = &["password", "passphrase", "secret", "token", "ssh_key_unlock", "authorization"];

static REDACT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)(authorization:\s*)(\S+(?:\s+\S+)?)",
        r"(?i)(\bBearer\s+)([A-Za-z0-9\-._~+/]+=*)",
        r#"(?i)("[A-Za-z0-9_.-]*(?:password|secret|token|ssh_key_unlock)[A-Za-z0-9_.-]*"\s*:\s*")([^"]*)(")"#,
        r"(?i)([A-Z0-9_]*(?:KEY|TOKEN|SECRET|PASSWORD)\s*=\s*)(\S+)",
        r"(?i)(^|\s)((?:[a-z0-9_]*password|[a-z0-9_]*token|ssh_key_unlock):\s+)(\S+)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("redaction pattern compiles"))
    .collect()
});

/// Redacts values that look like secrets in free text.
///
/// Key names are kept so the output still reads sensibly:
///
/// ```rust
/// use launchdeck_util::redact_sensitive;
///
/// assert_eq!(redact_sensitive("Authorization: Bearer abc123"), "Authorization: [REDACTED]");
/// assert_eq!(redact_sensitive("API_TOKEN=xyz"), "API_TOKEN=[REDACTED]");
/// ```
pub fn redact_sensitive(input: &str) -> String {
    let mut redacted = input.to_string();
    for pattern in REDACT_PATTERNS.iter() {
        redacted = pattern
            .replace_all(&redacted, |captures: &Captures| {
                let groups: Vec<&str> = captures
                    .iter()
                    .skip(1)
                    .map(|group| group.map(|m| m.as_str()).unwrap_or(""))
                    .collect();
                match groups.as_slice() {
                    [prefix, _value] => format!("{}{}", prefix, REPLACEMENT),
                    [prefix, key, _value] if !key.ends_with('"') && key.ends_with(char::is_whitespace) => {
                        format!("{}{}{}", prefix, key, REPLACEMENT)
                    }
                    [prefix, _value, suffix] => format!("{}{}{}", prefix, REPLACEMENT, suffix),
                    _ => REPLACEMENT.to_string(),
                }
            })
            .to_string();
    }
    redacted
}

/// Returns a copy of `value` with every secret-looking key's value replaced.
///
/// Whole objects under a secret key (such as `credential_passwords`) are
/// replaced field by field, so the shape stays visible.
pub fn redact_json(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, entry)| {
                    let redacted = if is_secret_key(key) {
                        redact_leaf(entry)
                    } else {
                        redact_json(entry)
                    };
                    (key.clone(), redacted)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_json).collect()),
        other => other.clone(),
    }
}

fn redact_leaf(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(map.iter().map(|(key, entry)| (key.clone(), redact_leaf(entry))).collect()),
        Value::Null => Value::Null,
        _ => Value::String(REPLACEMENT.to_string()),
    }
}

fn is_secret_key(key: &str) -> bool {
    let lowered = key.to_ascii_lowercase();
    SECRET_KEY_FRAGMENTS.iter().any(|fragment| lowered.contains(fragment))
}
