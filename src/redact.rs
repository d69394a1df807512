use lazy_static::lazy_static;
use regex::Regex;

const REDACTION_MARKER: &str = "#PASSWORD REMOVED#";

lazy_static! {
    /// Splits a config line into tokens at `=` or space, mirroring the
    /// `key = value` / `key value` forms these files use.
    static ref KEY_SPLIT: Regex = Regex::new(r"[= ]").unwrap();
}

/// Strip credential values from fetched text before it touches disk.
///
/// Any line mentioning `password` or `secret` (case-insensitive) is truncated
/// to its key token plus a fixed marker. Lines naming `auth_type` pass through
/// untouched: they select an auth mechanism rather than carry a credential.
/// Pure function, no I/O.
pub fn scrub_passwords(text: &str) -> String {
    let mut scrubbed = Vec::new();
    for line in text.lines() {
        let lower = line.to_lowercase();
        if (lower.contains("password") || lower.contains("secret")) && !lower.contains("auth_type")
        {
            let key = KEY_SPLIT.split(line).next().unwrap_or("");
            scrubbed.push(format!("{key} {REDACTION_MARKER}"));
        } else {
            scrubbed.push(line.to_string());
        }
    }
    scrubbed.join("\n")
}
