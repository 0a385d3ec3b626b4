//! Site configuration (site.yml + environment overrides)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::SiteError;
use crate::helpers::{check_date_format, normalize_base_path};

pub const ENV_SITE_URL: &str = "BLOG_SITE_URL";
pub const ENV_BASE_PATH: &str = "BLOG_BASE_PATH";
pub const ENV_AUTHOR: &str = "BLOG_AUTHOR";
pub const ENV_PREVIEW_HOST: &str = "PREVIEW_HOST";
pub const ENV_PREVIEW_PORT: &str = "PREVIEW_PORT";

const PLACEHOLDER_SITE_URL: &str = "YOUR_GITHUB_USERNAME";
const PLACEHOLDER_AUTHOR: &str = "YOUR_NAME";

/// Characters the router or the URL syntax would read specially
const BASE_PATH_RESERVED: &[char] = &['*', ':', '{', '}', '?', '#', '\\'];

/// Whether drafts are published and placeholder config is tolerated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum BuildMode {
    Production,
    #[default]
    Development,
}

impl BuildMode {
    pub fn is_production(self) -> bool {
        self == BuildMode::Production
    }
}

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub language: String,
    pub author: String,
    pub timezone: String,
    pub date_format: String,

    // URL
    pub site_url: String,
    pub base_path: String,

    // Directory
    pub content_dir: String,
    pub public_dir: String,
    pub output_dir: String,

    #[serde(default)]
    pub highlight: HighlightConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "My Blog".to_string(),
            description: String::new(),
            language: "en".to_string(),
            author: PLACEHOLDER_AUTHOR.to_string(),
            timezone: "UTC".to_string(),
            date_format: "YYYY/MM/DD".to_string(),

            site_url: format!("https://{}.github.io", PLACEHOLDER_SITE_URL),
            base_path: "/".to_string(),

            content_dir: "content/posts".to_string(),
            public_dir: "public".to_string(),
            output_dir: "dist".to_string(),

            highlight: HighlightConfig::default(),
            preview: PreviewConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        let config: SiteConfig = serde_yaml::from_str(&content)
            .map_err(|e| SiteError::config(format!("{}: {}", path.display(), e)))?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) -> Result<(), SiteError> {
        self.apply_env_with(|name| std::env::var(name).ok())
    }

    /// Apply overrides using `lookup` to read variables
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), SiteError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |name: &str, fallback: &str| -> String {
            match lookup(name) {
                Some(value) if !value.trim().is_empty() => value.trim().to_string(),
                _ => fallback.to_string(),
            }
        };

        self.site_url = pick(ENV_SITE_URL, &self.site_url);
        self.base_path = pick(ENV_BASE_PATH, &self.base_path);
        self.author = pick(ENV_AUTHOR, &self.author);
        self.preview.host = pick(ENV_PREVIEW_HOST, &self.preview.host);

        let port = pick(ENV_PREVIEW_PORT, &self.preview.port.to_string());
        self.preview.port = port.parse().map_err(|_| {
            SiteError::config(format!("{} must be a port number, got {:?}", ENV_PREVIEW_PORT, port))
        })?;

        Ok(())
    }

    /// Base path normalized to "" or "/segment[/segment...]"
    pub fn normalized_base_path(&self) -> String {
        normalize_base_path(&self.base_path)
    }

    /// Parse the configured IANA timezone
    pub fn site_timezone(&self) -> Result<chrono_tz::Tz, SiteError> {
        self.timezone
            .trim()
            .parse::<chrono_tz::Tz>()
            .map_err(|_| SiteError::config(format!("unknown timezone: {}", self.timezone)))
    }

    /// True while site_url or author still hold scaffold values
    pub fn has_placeholder(&self) -> bool {
        self.site_url.contains(PLACEHOLDER_SITE_URL)
            || self.author.contains(PLACEHOLDER_AUTHOR)
            || self.site_url.trim().is_empty()
            || self.author.trim().is_empty()
    }

    /// Reject configuration that would produce a broken site
    pub fn validate(&self, mode: BuildMode) -> Result<(), SiteError> {
        if mode.is_production() && self.has_placeholder() {
            return Err(SiteError::config(format!(
                "placeholder values remain in site.yml; set {} / {} / {} and try again",
                ENV_SITE_URL, ENV_BASE_PATH, ENV_AUTHOR
            )));
        }

        if !(self.site_url.starts_with("http://") || self.site_url.starts_with("https://")) {
            return Err(SiteError::config("site_url must start with http:// or https://"));
        }

        let base = self.normalized_base_path();
        let bad_segment = base
            .split('/')
            .skip(1)
            .any(|segment| segment == "." || segment == ".." || segment.contains(BASE_PATH_RESERVED));
        if bad_segment {
            return Err(SiteError::config(format!(
                "base_path {:?} may not contain {:?} or dot segments",
                self.base_path,
                BASE_PATH_RESERVED.iter().collect::<String>()
            )));
        }

        self.site_timezone()?;
        check_date_format(&self.date_format)?;

        Ok(())
    }
}

/// Code highlighting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    pub theme: String,
    pub line_numbers: bool,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            theme: "base16-ocean.dark".to_string(),
            line_numbers: false,
        }
    }
}

/// Preview server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub host: String,
    pub port: u16,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4173,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_default_config() {
        let config = SiteConfig::default();
        assert_eq!(config.title, "My Blog");
        assert_eq!(config.output_dir, "dist");
        assert_eq!(config.preview.port, 4173);
        assert_eq!(config.normalized_base_path(), "");
        assert!(config.has_placeholder());
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
title: Blog 2026
author: tris
site_url: https://tris.github.io
base_path: /blog2026/
highlight:
  theme: InspiredGitHub
"#;
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.title, "Blog 2026");
        assert_eq!(config.normalized_base_path(), "/blog2026");
        assert_eq!(config.highlight.theme, "InspiredGitHub");
        assert!(!config.highlight.line_numbers);
        assert_eq!(config.content_dir, "content/posts");
    }

    #[test]
    fn test_env_overrides_trim_and_fall_back() {
        let vars = env(&[
            (ENV_SITE_URL, "  https://me.example.com  "),
            (ENV_BASE_PATH, "   "),
            (ENV_PREVIEW_PORT, "8080"),
        ]);
        let mut config = SiteConfig::default();
        config.base_path = "/docs".to_string();
        config
            .apply_env_with(|name| vars.get(name).cloned())
            .unwrap();

        assert_eq!(config.site_url, "https://me.example.com");
        assert_eq!(config.base_path, "/docs");
        assert_eq!(config.author, PLACEHOLDER_AUTHOR);
        assert_eq!(config.preview.port, 8080);
    }

    #[test]
    fn test_invalid_port_is_config_error() {
        let vars = env(&[(ENV_PREVIEW_PORT, "http")]);
        let mut config = SiteConfig::default();
        let err = config
            .apply_env_with(|name| vars.get(name).cloned())
            .unwrap_err();
        assert!(matches!(err, SiteError::Config(_)));
    }

    #[test]
    fn test_production_rejects_placeholders() {
        let config = SiteConfig::default();
        assert!(config.validate(BuildMode::Development).is_ok());
        assert!(config.validate(BuildMode::Production).is_err());
    }

    #[test]
    fn test_site_url_scheme_and_timezone() {
        let mut config = SiteConfig {
            site_url: "example.com".to_string(),
            author: "me".to_string(),
            ..Default::default()
        };
        assert!(config.validate(BuildMode::Production).is_err());

        config.site_url = "https://example.com".to_string();
        assert!(config.validate(BuildMode::Production).is_ok());

        config.timezone = "Mars/Olympus".to_string();
        assert!(config.validate(BuildMode::Production).is_err());

        config.timezone = "Asia/Tokyo".to_string();
        assert_eq!(config.site_timezone().unwrap(), chrono_tz::Asia::Tokyo);
    }

    #[test]
    fn test_base_path_rejects_route_syntax() {
        for base_path in ["/blog/*rest", "/:id", "/{name}/", "/a/../b", "/a?b"] {
            let config = SiteConfig {
                base_path: base_path.to_string(),
                ..Default::default()
            };
            assert!(
                matches!(config.validate(BuildMode::Development), Err(SiteError::Config(_))),
                "{}",
                base_path
            );
        }

        let config = SiteConfig {
            base_path: "/blog-2026/notes/".to_string(),
            ..Default::default()
        };
        assert!(config.validate(BuildMode::Development).is_ok());
    }

    #[test]
    fn test_date_format_with_percent_is_accepted() {
        let config = SiteConfig {
            date_format: "YYYY/MM/DD 100%".to_string(),
            ..Default::default()
        };
        assert!(config.validate(BuildMode::Development).is_ok());
    }
}
