//! Small helpers shared by the service and the CLI.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Longest excerpt of a remote error body kept in messages
const EXCERPT_CHARS: usize = 180;

/// Trimmed text, or `None` when missing or blank
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    value.and_then(|text| {
        let trimmed = text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

pub fn is_http_url(value: &str) -> bool {
    ["http://", "https://"]
        .iter()
        .any(|scheme| value.starts_with(scheme))
}

/// Trimmed prefix of `value`, short enough for a one-line error
pub fn compact_text(value: &str) -> String {
    value.trim().chars().take(EXCERPT_CHARS).collect()
}

/// Stable-per-process fingerprint so device ids stay out of the logs.
pub fn device_fingerprint(device_id: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    device_id.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_option_drops_blank() {
        assert_eq!(normalize_text_option(None), None);
        assert_eq!(normalize_text_option(Some(" \t ".to_string())), None);
    }

    #[test]
    fn normalize_text_option_trims_value() {
        assert_eq!(
            normalize_text_option(Some(" http://10.0.0.4:8080 ".to_string())),
            Some("http://10.0.0.4:8080".to_string())
        );
    }

    #[test]
    fn is_http_url_requires_scheme() {
        assert!(is_http_url("http://192.168.1.10:8080"));
        assert!(is_http_url("https://sync.shop.test"));
        assert!(!is_http_url("ws://192.168.1.10"));
        assert!(!is_http_url("192.168.1.10:8080"));
    }

    #[test]
    fn compact_text_caps_length() {
        let long = format!("  {}  ", "x".repeat(500));
        assert_eq!(compact_text(&long).len(), EXCERPT_CHARS);
        assert_eq!(compact_text(" gateway down "), "gateway down");
    }

    #[test]
    fn device_fingerprint_is_deterministic() {
        assert_eq!(device_fingerprint("laptop-1"), device_fingerprint("laptop-1"));
        assert_ne!(device_fingerprint("laptop-1"), device_fingerprint("laptop-2"));
    }
}
