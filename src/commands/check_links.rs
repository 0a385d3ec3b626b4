//! Check that every internal link in the built site points at a file

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::helpers::{normalize_segments, strip_base_path, unescape_entities};
use crate::Site;

lazy_static! {
    static ref LINK_ATTR: Regex = Regex::new(r#"(?:href|src)=["']([^"']+)["']"#).unwrap();
    static ref IGNORED: Regex =
        Regex::new(r"(?i)^(?:https?:|mailto:|tel:|javascript:|data:|#|//)").unwrap();
}

/// A link whose target does not exist in the output directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokenLink {
    /// HTML file containing the link, relative to the output directory
    pub file: String,
    /// Attribute value as written
    pub link: String,
}

impl fmt::Display for BrokenLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.file, self.link)
    }
}

#[derive(Debug, Default)]
pub struct LinkReport {
    pub html_files: usize,
    pub broken: Vec<BrokenLink>,
}

impl LinkReport {
    pub fn is_ok(&self) -> bool {
        self.broken.is_empty()
    }
}

/// Scans emitted HTML for `href`/`src` values and resolves them on disk
pub struct LinkChecker {
    output_dir: PathBuf,
    base_path: String,
}

impl LinkChecker {
    pub fn new(site: &Site) -> Self {
        Self::with_base(&site.output_dir, &site.config.normalized_base_path())
    }

    /// `base_path` must already be normalized
    pub fn with_base(output_dir: impl Into<PathBuf>, base_path: &str) -> Self {
        Self {
            output_dir: output_dir.into(),
            base_path: base_path.to_string(),
        }
    }

    pub fn scan(&self) -> Result<LinkReport> {
        let mut report = LinkReport::default();

        for entry in WalkDir::new(&self.output_dir).sort_by_file_name() {
            let entry = entry.with_context(|| format!("Failed to walk {:?}", self.output_dir))?;
            let path = entry.path();
            let is_html = path.extension().and_then(|e| e.to_str()) == Some("html");
            if !entry.file_type().is_file() || !is_html {
                continue;
            }

            report.html_files += 1;
            let source =
                fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
            let relative = path
                .strip_prefix(&self.output_dir)
                .unwrap_or(path)
                .to_string_lossy()
                .replace('\\', "/");

            for capture in LINK_ATTR.captures_iter(&source) {
                let link = &capture[1];
                if let Some(segments) = self.resolve(link, &relative) {
                    if !self.exists(&segments) {
                        report.broken.push(BrokenLink {
                            file: relative.clone(),
                            link: link.to_string(),
                        });
                    }
                }
            }
        }

        Ok(report)
    }

    /// Output-relative segments a link points at, or `None` if it is not checked
    fn resolve(&self, link: &str, html_file: &str) -> Option<Vec<String>> {
        let link = unescape_entities(link);
        if link.is_empty() || IGNORED.is_match(&link) {
            return None;
        }

        let clean = link.split('#').next()?.split('?').next()?;
        if clean.is_empty() {
            return None;
        }

        if clean.starts_with('/') {
            let rest = strip_base_path(&self.base_path, clean)?;
            return Some(normalize_segments(&rest));
        }

        let dir = match html_file.rsplit_once('/') {
            Some((dir, _)) => dir,
            None => "",
        };
        Some(normalize_segments(&format!("/{}/{}", dir, clean)))
    }

    fn exists(&self, segments: &[String]) -> bool {
        let target = segments
            .iter()
            .fold(self.output_dir.clone(), |path, s| path.join(s));

        let has_extension = segments
            .last()
            .map(|last| Path::new(last).extension().is_some())
            .unwrap_or(false);

        if has_extension {
            return target.is_file();
        }

        let mut with_html = target.clone().into_os_string();
        with_html.push(".html");

        [target.join("index.html"), PathBuf::from(with_html), target]
            .iter()
            .any(|candidate| candidate.exists())
    }
}

/// Check the site's output directory; any broken link is an error
pub fn run(site: &Site) -> Result<LinkReport> {
    if !site.output_dir.is_dir() {
        anyhow::bail!(
            "Output directory {:?} does not exist, run build first",
            site.output_dir
        );
    }

    let report = LinkChecker::new(site).scan()?;
    if !report.is_ok() {
        for broken in &report.broken {
            tracing::error!("- {}", broken);
        }
        anyhow::bail!("Broken internal links detected: {}", report.broken.len());
    }

    tracing::info!("Link check passed: {} HTML files", report.html_files);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_resolve_skips_external_and_outside_base() {
        let checker = LinkChecker::with_base("/out", "/blog");
        for link in [
            "https://example.com/",
            "HTTP://example.com/",
            "mailto:a@b.c",
            "#top",
            "//cdn.example.com/x.js",
            "data:image/png;base64,xx",
            "/other/page/",
        ] {
            assert_eq!(checker.resolve(link, "index.html"), None, "{}", link);
        }
    }

    #[test]
    fn test_resolve_paths() {
        let checker = LinkChecker::with_base("/out", "/blog");
        assert_eq!(
            checker.resolve("/blog/posts/a/?x=1#y", "index.html"),
            Some(vec!["posts".to_string(), "a".to_string()])
        );
        assert_eq!(checker.resolve("/blog", "index.html"), Some(vec![]));
        assert_eq!(
            checker.resolve("../b/", "posts/a/index.html"),
            Some(vec!["posts".to_string(), "b".to_string()])
        );
        assert_eq!(
            checker.resolve("/blog/tags/%E6%97%A5%E8%A8%98/", "index.html"),
            Some(vec!["tags".to_string(), "日記".to_string()])
        );
        assert_eq!(
            checker.resolve("/blog/a?x=1&amp;y=2", "index.html"),
            Some(vec!["a".to_string()])
        );
    }

    #[test]
    fn test_scan_reports_broken_links() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path();
        write(out, "index.html", r#"<a href="/posts/a/">a</a> <a href='/missing/'>m</a>"#);
        write(out, "posts/a/index.html", r#"<img src="../../logo.png"><a href="/about">x</a>"#);
        write(out, "logo.png", "");
        write(out, "about.html", "");

        let report = LinkChecker::with_base(out, "").scan().unwrap();
        assert_eq!(report.html_files, 3);
        assert_eq!(
            report.broken,
            vec![BrokenLink {
                file: "index.html".to_string(),
                link: "/missing/".to_string(),
            }]
        );
    }

    #[test]
    fn test_file_with_extension_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path();
        write(out, "index.html", r#"<link href="/style.css">"#);

        let report = LinkChecker::with_base(out, "").scan().unwrap();
        assert_eq!(report.broken.len(), 1);
    }
}
