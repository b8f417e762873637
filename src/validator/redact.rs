use std::sync::OnceLock;

use regex::Regex;

fn redaction_rules() -> &'static [(Regex, &'static str)] {
    static RULES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    RULES.get_or_init(|| {
        [
            (r"(?i)\bbearer\s+\S+", "Bearer [REDACTED]"),
            (
                r"\b(sk|pk|rk|key|api|token)[-_][A-Za-z0-9_\-]{16,}",
                "[REDACTED]",
            ),
            (r"\bAIza[0-9A-Za-z_\-]{30,}", "[REDACTED]"),
            (r"\b[A-Za-z0-9]{32,}\b", "[REDACTED]"),
            (
                r"(?i)\b(password|secret|token|api[_-]?key)\s*(?:is|=|:)\s*\S+",
                "$1=[REDACTED]",
            ),
            (r"://[^:/@\s]+:[^/@\s]+@", "://[USER]:[REDACTED]@"),
        ]
        .into_iter()
        .map(|(pattern, replacement)| {
            (
                Regex::new(pattern).expect("redaction patterns compile"),
                replacement,
            )
        })
        .collect()
    })
}

/// Replaces credential-like substrings with `[REDACTED]`.
pub fn redact_secrets(text: &str) -> String {
    let mut out = text.to_string();
    for (pattern, replacement) in redaction_rules() {
        out = pattern.replace_all(&out, *replacement).into_owned();
    }
    out
}

/// First `max_chars` characters of `text`, with an ellipsis when cut.
pub fn bounded_excerpt(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let excerpt: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{excerpt}…")
    } else {
        excerpt
    }
}
