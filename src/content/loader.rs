//! Content loader - loads posts from the content directory

use anyhow::{Context, Result};
use chrono_tz::Tz;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use super::{FrontMatter, MarkdownRenderer, Post};
use crate::error::SiteError;
use crate::helpers::{format_date, slugify};
use crate::Site;

/// Loads content from the content directory
pub struct ContentLoader<'a> {
    site: &'a Site,
    renderer: MarkdownRenderer,
    timezone: Tz,
}

impl<'a> ContentLoader<'a> {
    /// Create a new content loader
    pub fn new(site: &'a Site) -> Result<Self> {
        let highlight = &site.config.highlight;
        let renderer = MarkdownRenderer::with_options(&highlight.theme, highlight.line_numbers)?;
        let timezone = site.config.site_timezone()?;
        Ok(Self {
            site,
            renderer,
            timezone,
        })
    }

    /// Load every post, drafts included, in source path order
    pub fn load_posts(&self) -> Result<Vec<Post>> {
        let content_dir = &self.site.content_dir;
        if !content_dir.exists() {
            tracing::warn!("Content directory {:?} does not exist", content_dir);
            return Ok(Vec::new());
        }

        let mut posts = Vec::new();

        for entry in WalkDir::new(content_dir)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = entry.with_context(|| format!("Failed to walk {:?}", content_dir))?;
            let path = entry.path();
            if path.is_file() && is_markdown_file(path) {
                posts.push(self.load_post(path)?);
            }
        }

        tracing::debug!("Loaded {} posts from {:?}", posts.len(), content_dir);
        Ok(posts)
    }

    /// Load a single post from a file
    fn load_post(&self, path: &Path) -> Result<Post> {
        let source = path
            .strip_prefix(&self.site.content_dir)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");

        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        let (fm, body) =
            FrontMatter::parse(&content).map_err(|e| SiteError::content(&source, e.to_string()))?;

        let (Some(title), Some(_)) = (fm.title(), fm.date_str()) else {
            return Err(SiteError::content(&source, "title/date is required").into());
        };

        let date = fm
            .parse_date(&self.timezone)
            .ok_or_else(|| SiteError::content(&source, "invalid date"))?;

        // Explicit slug wins over the file stem; both go through slugify
        let file_stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
        let slug = slugify(fm.slug.as_deref().unwrap_or(file_stem));
        if slug.is_empty() {
            return Err(SiteError::content(&source, "slug is empty").into());
        }

        let tags = normalize_tags(&fm.tags);
        if let Some(bad) = tags.iter().find(|t| !is_valid_tag(t)) {
            return Err(SiteError::content(&source, format!("invalid tag {:?}", bad)).into());
        }

        let description = fm.description.clone().unwrap_or_default();

        let mut post = Post::new(title.to_string(), date, slug, source);
        post.date_text = format_date(&post.date, &self.site.config.date_format)?;
        post.tags = tags;
        post.draft = fm.draft;
        post.og_title = fm.og_title.clone().unwrap_or_else(|| post.title.clone());
        post.og_description = fm.og_description.clone().unwrap_or_else(|| description.clone());
        post.description = description;
        post.html = self.renderer.render(body);

        Ok(post)
    }
}

/// Check if a file is a markdown file
fn is_markdown_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e == "md" || e == "markdown")
        .unwrap_or(false)
}

/// Trim tags, drop empties and keep the first occurrence of duplicates
fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut seen = Vec::new();
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !seen.iter().any(|t: &String| t == tag) {
            seen.push(tag.to_string());
        }
    }
    seen
}

/// Tag pages live at `tags/<tag>/` on disk, so a tag must be one path segment
fn is_valid_tag(tag: &str) -> bool {
    !tag.contains('/') && !tag.contains('\\') && tag != "." && tag != ".."
}
