//! inkpress: a small static blog generator
//!
//! Markdown posts with YAML front-matter go in, a deployable site comes out:
//! post pages, tag indexes, an RSS feed, a sitemap, OG image placeholders and
//! a 404 page, all sharing one base-path aware URL scheme. The same URL rules
//! drive the preview server and the link checker.

pub mod commands;
pub mod config;
pub mod content;
pub mod error;
pub mod generator;
pub mod helpers;
pub mod server;
pub mod templates;

use anyhow::{Context, Result};
use std::path::{Component, Path, PathBuf};

pub use config::{BuildMode, SiteConfig};
pub use error::SiteError;

/// Name of the site configuration file in the site root
pub const CONFIG_FILE: &str = "site.yml";

/// A site rooted at a directory, with its resolved configuration
#[derive(Debug, Clone)]
pub struct Site {
    /// Site configuration
    pub config: SiteConfig,
    /// Build mode (drafts, placeholder checks)
    pub mode: BuildMode,
    /// Base directory
    pub base_dir: PathBuf,
    /// Markdown posts
    pub content_dir: PathBuf,
    /// Static files copied verbatim into the output
    pub public_dir: PathBuf,
    /// Generated site
    pub output_dir: PathBuf,
}

impl Site {
    /// Load `site.yml` (if present) and environment overrides from a directory
    pub fn new<P: AsRef<Path>>(base_dir: P, mode: BuildMode) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join(CONFIG_FILE);

        let mut config = if config_path.exists() {
            SiteConfig::load(&config_path)?
        } else {
            tracing::debug!("No {} found in {:?}, using defaults", CONFIG_FILE, base_dir);
            SiteConfig::default()
        };
        config.apply_env()?;

        Self::from_config(base_dir, config, mode)
    }

    /// Build a site from an already-resolved configuration
    pub fn from_config<P: AsRef<Path>>(
        base_dir: P,
        config: SiteConfig,
        mode: BuildMode,
    ) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        config.validate(mode)?;

        let content_dir = normalize_path(&base_dir.join(&config.content_dir));
        let public_dir = normalize_path(&base_dir.join(&config.public_dir));
        let output_dir = normalize_path(&base_dir.join(&config.output_dir));

        let covers_sources = if config.output_dir.trim().is_empty() {
            true
        } else {
            let base = absolute(&base_dir)?;
            let out = absolute(&output_dir)?;
            base.starts_with(&out)
                || absolute(&content_dir)?.starts_with(&out)
                || absolute(&public_dir)?.starts_with(&out)
                || out.starts_with(absolute(&public_dir)?)
        };
        if covers_sources {
            return Err(SiteError::config(format!(
                "output_dir {:?} would overwrite the site sources",
                config.output_dir
            ))
            .into());
        }

        Ok(Self {
            config,
            mode,
            base_dir,
            content_dir,
            public_dir,
            output_dir,
        })
    }

    /// Path of the configuration file for this site
    pub fn config_path(&self) -> PathBuf {
        self.base_dir.join(CONFIG_FILE)
    }

    /// Generate the static site
    pub fn build(&self) -> Result<commands::build::BuildReport> {
        commands::build::run(self)
    }

    /// Remove the output directory
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}

/// Drop `.` and resolve `..` without touching the filesystem
fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other),
        }
    }
    out
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(normalize_path(path));
    }
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    Ok(normalize_path(&cwd.join(path)))
}
