//! Generator module - renders the site tree with the built-in Tera templates
//! and writes it to the output directory

use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use indexmap::IndexMap;
use std::fs;
use std::path::Path;

use tera::Context;
use walkdir::WalkDir;

use crate::content::Post;
use crate::error::SiteError;
use crate::helpers::{
    date_iso, date_rfc2822, full_url_for, og_image_path, post_path, tag_path, url_for, FEED_PATH,
    HOME_PATH, NOT_FOUND_PATH,
};
use crate::templates::{
    ConfigData, FeedItem, PageMeta, PostData, SitemapEntry, TagLink, TemplateRenderer,
};
use crate::Site;

/// Rendered site: output-relative path -> file contents, in write order
#[derive(Debug, Default)]
pub struct SiteTree {
    files: IndexMap<String, String>,
}

impl SiteTree {
    fn insert(&mut self, path: impl Into<String>, contents: String) {
        self.files.insert(path.into(), contents);
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Static site generator using Tera templates
pub struct Generator<'a> {
    site: &'a Site,
    renderer: TemplateRenderer,
    build_time: DateTime<Tz>,
}

impl<'a> Generator<'a> {
    /// Create a new generator; `build_time` feeds `lastBuildDate` and the footer year
    pub fn new(site: &'a Site, build_time: DateTime<Utc>) -> Result<Self> {
        let timezone = site.config.site_timezone()?;
        Ok(Self {
            site,
            renderer: TemplateRenderer::new()?,
            build_time: build_time.with_timezone(&timezone),
        })
    }

    /// Posts that will be emitted, newest first
    ///
    /// Drafts are dropped in production. Two published posts sharing a slug
    /// abort the build.
    pub fn published(&self, posts: Vec<Post>) -> Result<Vec<Post>> {
        let mut published: Vec<Post> = posts
            .into_iter()
            .filter(|p| !p.draft || !self.site.mode.is_production())
            .collect();

        published.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.slug.cmp(&b.slug)));

        let mut seen: IndexMap<&str, &str> = IndexMap::new();
        for post in &published {
            if let Some(first) = seen.insert(&post.slug, &post.source) {
                return Err(SiteError::content(
                    &post.source,
                    format!("slug {:?} is already used by {}", post.slug, first),
                )
                .into());
            }
        }

        Ok(published)
    }

    /// Render every artifact for an already-published post list
    pub fn render(&self, posts: &[Post]) -> Result<SiteTree> {
        let mut tree = SiteTree::default();
        let tags = build_tag_index(posts);

        for post in posts {
            self.render_post(&mut tree, post)?;
        }
        self.render_index(&mut tree, posts)?;
        for (tag, tag_posts) in &tags {
            self.render_tag(&mut tree, tag, tag_posts)?;
        }
        self.render_feed(&mut tree, posts)?;
        self.render_sitemap(&mut tree, posts, &tags)?;
        self.render_not_found(&mut tree)?;
        tree.insert(".nojekyll", String::new());

        Ok(tree)
    }

    /// Wipe the output directory, write the tree and copy static files over it
    pub fn write(&self, tree: &SiteTree) -> Result<()> {
        let output_dir = &self.site.output_dir;

        if output_dir.exists() {
            fs::remove_dir_all(output_dir)
                .with_context(|| format!("Failed to remove {:?}", output_dir))?;
        }
        fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create {:?}", output_dir))?;

        for (relative, contents) in &tree.files {
            let output_path = output_dir.join(relative);
            if let Some(parent) = output_path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create dir {:?}", parent))?;
            }
            fs::write(&output_path, contents)
                .with_context(|| format!("Failed to write {:?}", output_path))?;
            tracing::debug!("Generated: {:?}", output_path);
        }

        copy_dir(&self.site.public_dir, output_dir)
    }

    fn config_data(&self) -> ConfigData {
        let config = &self.site.config;
        ConfigData {
            title: config.title.clone(),
            description: config.description.clone(),
            language: config.language.clone(),
            author: config.author.clone(),
        }
    }

    /// Shared layout context for an HTML page
    fn page_context(&self, meta: PageMeta) -> Result<Context> {
        let config = &self.site.config;
        let mut context = Context::from_serialize(meta)?;
        context.insert("config", &self.config_data());
        context.insert("home_path", &url_for(config, HOME_PATH));
        context.insert("feed_path", &url_for(config, FEED_PATH));
        context.insert("current_year", &self.build_time.format("%Y").to_string());
        context.insert("generator_version", env!("CARGO_PKG_VERSION"));
        Ok(context)
    }

    /// Head metadata for a non-article page
    fn page_meta(&self, title: &str, description: &str, canonical_path: &str) -> PageMeta {
        let full_title = format!("{} | {}", title, self.site.config.title);
        PageMeta {
            og_title: full_title.clone(),
            og_description: description.to_string(),
            full_title,
            description: description.to_string(),
            canonical_url: full_url_for(&self.site.config, canonical_path),
            og_type: "website".to_string(),
            og_image: String::new(),
            noindex: false,
        }
    }

    fn post_data(&self, post: &Post) -> PostData {
        let config = &self.site.config;
        PostData {
            title: post.title.clone(),
            slug: post.slug.clone(),
            path: url_for(config, &post_path(&post.slug)),
            date_text: post.date_text.clone(),
            description: post.description.clone(),
            tags: post
                .tags
                .iter()
                .map(|tag| TagLink {
                    name: tag.clone(),
                    path: url_for(config, &tag_path(tag)),
                })
                .collect(),
            html: post.html.clone(),
        }
    }

    fn render_post(&self, tree: &mut SiteTree, post: &Post) -> Result<()> {
        let config = &self.site.config;
        let meta = PageMeta {
            full_title: format!("{} | {}", post.title, config.title),
            description: post.description.clone(),
            canonical_url: full_url_for(config, &post_path(&post.slug)),
            og_type: "article".to_string(),
            og_title: post.og_title.clone(),
            og_description: post.og_description.clone(),
            og_image: full_url_for(config, &og_image_path(&post.slug)),
            noindex: false,
        };

        let mut context = self.page_context(meta)?;
        context.insert("post", &self.post_data(post));
        let html = self.renderer.render("post.html", &context)?;
        tree.insert(format!("posts/{}/index.html", post.slug), html);

        let mut og = Context::new();
        og.insert("site_title", &config.title);
        og.insert("og_title", &post.og_title);
        og.insert("og_description", &post.og_description);
        let svg = self.renderer.render("og.svg", &og)?;
        tree.insert(format!("og/{}.svg", post.slug), svg);

        Ok(())
    }

    fn render_index(&self, tree: &mut SiteTree, posts: &[Post]) -> Result<()> {
        let meta = self.page_meta("Home", &self.site.config.description, HOME_PATH);
        let mut context = self.page_context(meta)?;
        let post_data: Vec<PostData> = posts.iter().map(|p| self.post_data(p)).collect();
        context.insert("posts", &post_data);

        let html = self.renderer.render("index.html", &context)?;
        tree.insert("index.html", html);
        Ok(())
    }

    fn render_tag(&self, tree: &mut SiteTree, tag: &str, posts: &[&Post]) -> Result<()> {
        let meta = self.page_meta(
            &format!("Tag: {}", tag),
            &format!("Posts tagged {}", tag),
            &tag_path(tag),
        );
        let mut context = self.page_context(meta)?;
        let post_data: Vec<PostData> = posts.iter().map(|p| self.post_data(p)).collect();
        context.insert("posts", &post_data);
        context.insert("tag_name", tag);

        let html = self.renderer.render("tag.html", &context)?;
        tree.insert(format!("tags/{}/index.html", tag), html);
        Ok(())
    }

    fn render_feed(&self, tree: &mut SiteTree, posts: &[Post]) -> Result<()> {
        let config = &self.site.config;
        let items: Vec<FeedItem> = posts
            .iter()
            .map(|post| FeedItem {
                title: post.title.clone(),
                link: full_url_for(config, &post_path(&post.slug)),
                pub_date: date_rfc2822(&post.date),
                description: post.description.clone(),
            })
            .collect();

        let mut context = Context::new();
        context.insert("config", &self.config_data());
        context.insert("home_url", &full_url_for(config, HOME_PATH));
        context.insert("last_build_date", &date_rfc2822(&self.build_time));
        context.insert("items", &items);

        let xml = self.renderer.render("rss.xml", &context)?;
        tree.insert("rss.xml", xml);
        Ok(())
    }

    fn render_sitemap(
        &self,
        tree: &mut SiteTree,
        posts: &[Post],
        tags: &IndexMap<String, Vec<&Post>>,
    ) -> Result<()> {
        let config = &self.site.config;
        let mut entries = vec![SitemapEntry {
            loc: full_url_for(config, HOME_PATH),
            lastmod: None,
        }];
        entries.extend(posts.iter().map(|post| SitemapEntry {
            loc: full_url_for(config, &post_path(&post.slug)),
            lastmod: Some(date_iso(&post.date)),
        }));
        entries.extend(tags.keys().map(|tag| SitemapEntry {
            loc: full_url_for(config, &tag_path(tag)),
            lastmod: None,
        }));

        let mut context = Context::new();
        context.insert("entries", &entries);
        let xml = self.renderer.render("sitemap.xml", &context)?;
        tree.insert("sitemap.xml", xml);
        Ok(())
    }

    fn render_not_found(&self, tree: &mut SiteTree) -> Result<()> {
        let mut meta = self.page_meta("Not Found", "Page not found", NOT_FOUND_PATH);
        meta.noindex = true;
        let context = self.page_context(meta)?;
        let html = self.renderer.render("not_found.html", &context)?;
        tree.insert(NOT_FOUND_PATH.trim_start_matches('/'), html);
        Ok(())
    }
}

/// Tag -> posts carrying it, in order of first appearance in `posts`
fn build_tag_index(posts: &[Post]) -> IndexMap<String, Vec<&Post>> {
    let mut tags: IndexMap<String, Vec<&Post>> = IndexMap::new();
    for post in posts {
        for tag in &post.tags {
            tags.entry(tag.clone()).or_default().push(post);
        }
    }
    tags
}

/// Recursively copy `src` over `dest`; a missing `src` is skipped
fn copy_dir(src: &Path, dest: &Path) -> Result<()> {
    if !src.exists() {
        tracing::debug!("No static directory at {:?}, skipping copy", src);
        return Ok(());
    }

    for entry in WalkDir::new(src).follow_links(true) {
        let entry = entry.with_context(|| format!("Failed to walk {:?}", src))?;
        let relative = entry.path().strip_prefix(src)?;
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("Failed to create dir {:?}", target))?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)
                .with_context(|| format!("Failed to copy {:?}", entry.path()))?;
            tracing::debug!("Copied: {:?}", target);
        }
    }

    Ok(())
}
