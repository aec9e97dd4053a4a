//! Input normalization and injection heuristics
//!
//! The detectors below are advisory pattern matching over raw text. They are
//! known to flag harmless prose (anything with `AND ... =`, or a bare SQL
//! keyword such as "select") and to miss obfuscated payloads. Persistence
//! must still use parameterized queries.

use crate::error::{InjectionKind, LeadflowError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9._%+\-]+@[a-z0-9](?:[a-z0-9\-]*[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9\-]*[a-z0-9])?)*\.[a-z]{2,}$")
        .expect("Failed to compile email regex")
});

static INTEGER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?\d+$").expect("Failed to compile integer regex"));

static SQL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // Statement keywords
        r"(?i)\b(SELECT|INSERT|UPDATE|DELETE|DROP|CREATE|ALTER|EXEC|EXECUTE|UNION|TRUNCATE)\b",
        // Comment sequences
        r"(--|/\*|\*/)",
        // Boolean tautologies: OR/AND followed by an equality
        r"(?i)\b(OR|AND)\b.*=",
        r"(?i)'\s*(OR|AND)\s*'",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Failed to compile SQL heuristic"))
    .collect()
});

static CODE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)<\s*script\b",
        r"(?i)javascript\s*:",
        // Inline event handlers such as onclick= / onerror=
        r"(?i)\bon[a-z]+\s*=",
        r"(?i)\beval\s*\(",
        r"(?i)\bimport\s*\(",
        r"(?i)^\s*import\s+[\w{*]",
        r"(?i)\brequire\s*\(",
        r"(?i)\bnew\s+Function\s*\(",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Failed to compile code heuristic"))
    .collect()
});

/// Trim, drop null bytes and escape HTML-significant characters
pub fn sanitize_string(input: &str) -> String {
    let cleaned: String = input.trim().chars().filter(|c| *c != '\0').collect();

    let mut escaped = String::with_capacity(cleaned.len());
    for c in cleaned.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Lower-case and trim an email address; `None` when it is not structurally valid
pub fn sanitize_email(input: &str) -> Option<String> {
    let normalized: String = input
        .trim()
        .chars()
        .filter(|c| *c != '\0')
        .collect::<String>()
        .to_lowercase();

    if normalized.len() > 254 || normalized.contains("..") {
        return None;
    }

    EMAIL_REGEX.is_match(&normalized).then_some(normalized)
}

/// Accept only absolute http/https URLs with a host
pub fn sanitize_url(input: &str) -> Option<String> {
    let url = url::Url::parse(input.trim()).ok()?;

    match url.scheme() {
        "http" | "https" if url.host_str().is_some_and(|h| !h.is_empty()) => Some(url.to_string()),
        _ => None,
    }
}

/// Accept integers and integer-formatted strings; decimals and text are rejected
pub fn sanitize_integer(input: &Value) -> Option<i64> {
    match input {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Some(i);
            }
            let f = n.as_f64()?;
            // 42.0 is still an integer value
            if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
                Some(f as i64)
            } else {
                None
            }
        }
        Value::String(s) => {
            let trimmed = s.trim();
            if INTEGER_REGEX.is_match(trimmed) {
                trimmed.parse::<i64>().ok()
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Accept booleans, numeric truthiness and yes/no style strings
pub fn sanitize_boolean(input: &Value) -> Option<bool> {
    match input {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Heuristic check for SQL keywords, comment sequences and tautologies
pub fn detect_sql_injection_pattern(input: &str) -> bool {
    SQL_PATTERNS.iter().any(|re| re.is_match(input))
}

/// Heuristic check for script tags, event handlers and dynamic code loading
pub fn detect_code_injection_pattern(input: &str) -> bool {
    CODE_PATTERNS.iter().any(|re| re.is_match(input))
}

/// Screen free-form input and return its sanitized form
///
/// Detection runs on the raw text, before escaping.
pub fn validate_input(input: &str, field_label: &str) -> Result<String> {
    if detect_sql_injection_pattern(input) {
        log::warn!("Rejected input for field '{}': SQL pattern", field_label);
        return Err(LeadflowError::InjectionDetected {
            field: field_label.to_string(),
            kind: InjectionKind::Sql,
        });
    }

    if detect_code_injection_pattern(input) {
        log::warn!("Rejected input for field '{}': code pattern", field_label);
        return Err(LeadflowError::InjectionDetected {
            field: field_label.to_string(),
            kind: InjectionKind::Code,
        });
    }

    Ok(sanitize_string(input))
}
