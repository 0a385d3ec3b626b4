//! URL helper functions
//!
//! Every emitted link, the preview server and the link checker go through
//! these functions, so base-path handling cannot drift between them.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::config::SiteConfig;

/// Characters left alone by `encodeURIComponent`, minus `'`
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'(')
    .remove(b')');

/// Normalize a configured base path to "" or "/segment[/segment...]"
///
/// # Examples
/// ```ignore
/// normalize_base_path("/blog2026/") // -> "/blog2026"
/// normalize_base_path("/")          // -> ""
/// ```
pub fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

/// Prefix an absolute site path with an already-normalized base path
pub fn with_base_path(base: &str, path: &str) -> String {
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

/// Generate a URL with the base path
///
/// # Examples
/// ```ignore
/// url_for(&config, "/css/style.css") // -> "/blog/css/style.css"
/// ```
pub fn url_for(config: &SiteConfig, path: &str) -> String {
    with_base_path(&config.normalized_base_path(), path)
}

/// Generate a full URL including the domain
///
/// # Examples
/// ```ignore
/// full_url_for(&config, "/rss.xml") // -> "https://example.com/blog/rss.xml"
/// ```
pub fn full_url_for(config: &SiteConfig, path: &str) -> String {
    format!(
        "{}{}",
        config.site_url.trim_end_matches('/'),
        url_for(config, path)
    )
}

/// Percent-encode a single path component
pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

pub const HOME_PATH: &str = "/";
pub const FEED_PATH: &str = "/rss.xml";
pub const SITEMAP_PATH: &str = "/sitemap.xml";
pub const NOT_FOUND_PATH: &str = "/404.html";

pub fn post_path(slug: &str) -> String {
    format!("/posts/{}/", encode_component(slug))
}

pub fn tag_path(tag: &str) -> String {
    format!("/tags/{}/", encode_component(tag))
}

pub fn og_image_path(slug: &str) -> String {
    format!("/og/{}.svg", encode_component(slug))
}

/// Remove the base path from a request path
///
/// Returns `None` when a base path is set and `path` lies outside of it.
pub fn strip_base_path(base: &str, path: &str) -> Option<String> {
    if base.is_empty() {
        return Some(path.to_string());
    }

    if path != base && !path.starts_with(&format!("{}/", base)) {
        return None;
    }

    let rest = &path[base.len()..];
    if rest.is_empty() {
        Some("/".to_string())
    } else {
        Some(rest.to_string())
    }
}

/// Decode a URL path into safe relative segments
///
/// `..` pops a segment but never climbs above the root.
pub fn normalize_segments(path: &str) -> Vec<String> {
    let decoded = percent_decode_str(path).decode_utf8_lossy();
    let mut segments: Vec<String> = Vec::new();

    for part in decoded.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other.to_string()),
        }
    }

    segments
}
