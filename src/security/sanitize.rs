//! Input sanitization.
//!
//! Every text field passes through [`sanitize`] before validation. The
//! escaping step is what makes output safe to display; the pattern strip
//! in front of it is a coarse pre-filter and will never be complete
//! against encoded or obfuscated payloads.

use std::sync::LazyLock;

use regex::Regex;

/// How a field is post-processed after escaping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldKind {
    #[default]
    Text,
    Name,
    Email,
}

static DANGEROUS_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?is)<script.*?>.*?</script\s*>",
        r"(?is)<iframe.*?>.*?</iframe\s*>",
        r"(?i)javascript:",
        r"(?i)on\w+\s*=",
        r"(?i)<embed",
        r"(?i)<object",
        r"(?i)eval\(",
        r"(?i)expression\(",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("static sanitizer pattern"))
    .collect()
});

/// Strip blocklisted markup until the text stops changing, so that
/// split payloads such as `javajavascript:script:` cannot reassemble.
pub fn remove_dangerous_patterns(input: &str) -> String {
    let mut current = input.to_string();
    loop {
        let mut next = current.clone();
        for pattern in DANGEROUS_PATTERNS.iter() {
            next = pattern.replace_all(&next, "").into_owned();
        }
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Escape text for use as HTML text content.
pub fn encode_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Sanitize a raw field value. Never fails; empty input yields `""`.
pub fn sanitize(raw: &str, kind: FieldKind) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let cleaned = encode_html(&remove_dangerous_patterns(trimmed));

    match kind {
        FieldKind::Text => cleaned,
        FieldKind::Name => cleaned
            .chars()
            .filter(|c| c.is_ascii_alphabetic() || c.is_whitespace() || *c == '-' || *c == '\'')
            .collect(),
        FieldKind::Email => cleaned.to_lowercase(),
    }
}

/// Sanitize an optional value, mapping absent input to `""`.
pub fn sanitize_opt(raw: Option<&str>, kind: FieldKind) -> String {
    raw.map(|value| sanitize(value, kind)).unwrap_or_default()
}
