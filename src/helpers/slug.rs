//! Slug generation for posts

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref DISALLOWED: Regex =
        Regex::new(r"[^a-z0-9\x{3040}-\x{30ff}\x{3400}-\x{9fbf}\s-]").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref DASHES: Regex = Regex::new(r"-+").unwrap();
}

/// Turn a title or file stem into a URL path segment
///
/// Keeps ASCII letters and digits, kana and CJK ideographs. Everything else
/// except whitespace and `-` is dropped; whitespace becomes `-`.
///
/// # Examples
/// ```ignore
/// slugify("Hello, World!") // -> "hello-world"
/// slugify("Rust 入門")      // -> "rust-入門"
/// ```
pub fn slugify(value: &str) -> String {
    let lowered = value.to_lowercase();
    let kept = DISALLOWED.replace_all(lowered.trim(), "");
    let dashed = WHITESPACE.replace_all(&kept, "-");
    DASHES.replace_all(&dashed, "-").into_owned()
}
