// --- File: crates/services/templi_backend/src/cors.rs ---
//! Origin allow-list with `*` wildcards, e.g. `chrome-extension://*`.

use http::{header, request::Parts, HeaderValue, Method};
use templi_config::CorsConfig;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Whether `origin` matches `pattern`, where each `*` stands for any run of characters.
pub fn origin_matches(pattern: &str, origin: &str) -> bool {
    let mut parts = pattern.split('*');
    let Some(first) = parts.next() else {
        return false;
    };
    let Some(mut rest) = origin.strip_prefix(first) else {
        return false;
    };

    let remaining: Vec<&str> = parts.collect();
    let Some((last, middle)) = remaining.split_last() else {
        // No wildcard at all
        return rest.is_empty();
    };

    for part in middle {
        match rest.find(part) {
            Some(index) => rest = &rest[index + part.len()..],
            None => return false,
        }
    }
    rest.ends_with(last)
}

pub fn origin_allowed(patterns: &[String], origin: &str) -> bool {
    patterns.iter().any(|pattern| origin_matches(pattern, origin))
}

/// Browser access for the extension and the Stripe/Google pages it runs on.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let patterns = config.allowed_origins.clone();
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts: &Parts| {
                origin
                    .to_str()
                    .map(|origin| origin_allowed(&patterns, origin))
                    .unwrap_or(false)
            },
        ))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_patterns() {
        assert!(origin_matches(
            "chrome-extension://*",
            "chrome-extension://abcdefghijklmnop"
        ));
        assert!(origin_matches("https://*.google.com", "https://mail.google.com"));
        assert!(!origin_matches("https://*.google.com", "https://google.com.evil.io"));
        assert!(!origin_matches("https://*.google.com", "http://mail.google.com"));
        assert!(origin_matches("https://app.example", "https://app.example"));
        assert!(!origin_matches("https://app.example", "https://app.example.org"));
    }

    #[test]
    fn test_default_allow_list() {
        let patterns = CorsConfig::default().allowed_origins;
        assert!(origin_allowed(&patterns, "https://checkout.stripe.com"));
        assert!(origin_allowed(&patterns, "chrome-extension://xyz"));
        assert!(!origin_allowed(&patterns, "https://attacker.example"));
    }
}
