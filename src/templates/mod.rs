//! Built-in site templates using the Tera template engine
//!
//! Every template is embedded in the binary. Autoescaping is off: the
//! generator decides per value whether it needs `html_escape` or
//! `xml_escape`, and rendered post bodies go in untouched.

use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera};

use crate::helpers;

/// Template renderer with the embedded site theme
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("site/layout.html")),
            ("index.html", include_str!("site/index.html")),
            ("post.html", include_str!("site/post.html")),
            ("tag.html", include_str!("site/tag.html")),
            ("not_found.html", include_str!("site/not_found.html")),
            (
                "partials/post_list.html",
                include_str!("site/partials/post_list.html"),
            ),
            ("rss.xml", include_str!("site/rss.xml")),
            ("sitemap.xml", include_str!("site/sitemap.xml")),
            ("og.svg", include_str!("site/og.svg")),
        ])?;

        tera.register_filter("html_escape", html_escape_filter);
        tera.register_filter("xml_escape", xml_escape_filter);

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}

/// Tera filter: escape for HTML text and attribute values
fn html_escape_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("html_escape", "value", String, value);
    Ok(tera::Value::String(helpers::html_escape(&s)))
}

/// Tera filter: escape for XML text and attribute values
fn xml_escape_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("xml_escape", "value", String, value);
    Ok(tera::Value::String(helpers::xml_escape(&s)))
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct ConfigData {
    pub title: String,
    pub description: String,
    pub language: String,
    pub author: String,
}

/// Head metadata shared by every HTML page
#[derive(Debug, Clone, Serialize)]
pub struct PageMeta {
    pub full_title: String,
    pub description: String,
    pub canonical_url: String,
    pub og_type: String,
    pub og_title: String,
    pub og_description: String,
    /// Absolute `og:image` URL, empty when the page has none
    pub og_image: String,
    pub noindex: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TagLink {
    pub name: String,
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostData {
    pub title: String,
    pub slug: String,
    pub path: String,
    pub date_text: String,
    pub description: String,
    pub tags: Vec<TagLink>,
    pub html: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub pub_date: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SitemapEntry {
    pub loc: String,
    pub lastmod: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout_context() -> Context {
        let mut context = Context::new();
        context.insert(
            "config",
            &ConfigData {
                title: "Tom & Jerry".to_string(),
                description: "A <test> blog".to_string(),
                language: "en".to_string(),
                author: "Tom".to_string(),
            },
        );
        context.extend(
            Context::from_serialize(PageMeta {
                full_title: "Posts | Tom & Jerry".to_string(),
                description: "A <test> blog".to_string(),
                canonical_url: "https://example.com/".to_string(),
                og_type: "website".to_string(),
                og_title: "Posts".to_string(),
                og_description: String::new(),
                og_image: String::new(),
                noindex: true,
            })
            .unwrap(),
        );
        context.insert("home_path", "/");
        context.insert("feed_path", "/rss.xml");
        context.insert("current_year", "2026");
        context.insert("generator_version", "0.1.0");
        context
    }

    #[test]
    fn test_layout_escapes_text() {
        let renderer = TemplateRenderer::new().unwrap();
        let html = renderer.render("not_found.html", &layout_context()).unwrap();
        assert!(html.contains("<title>Posts | Tom &amp; Jerry</title>"));
        assert!(html.contains("A &lt;test&gt; blog"));
        assert!(html.contains(r#"<meta name="robots" content="noindex" />"#));
        assert!(!html.contains("og:image"));
        assert!(html.contains("© 2026 Tom"));
    }

    #[test]
    fn test_post_body_is_not_escaped() {
        let renderer = TemplateRenderer::new().unwrap();
        let mut context = layout_context();
        context.insert(
            "post",
            &PostData {
                title: "<Hello>".to_string(),
                slug: "hello".to_string(),
                path: "/posts/hello/".to_string(),
                date_text: "2024/01/15".to_string(),
                description: String::new(),
                tags: vec![TagLink {
                    name: "rust".to_string(),
                    path: "/tags/rust/".to_string(),
                }],
                html: "<p>body</p>".to_string(),
            },
        );
        let html = renderer.render("post.html", &context).unwrap();
        assert!(html.contains("<h1>&lt;Hello&gt;</h1>"));
        assert!(html.contains("<p>body</p>"));
        assert!(html.contains(r#"href="/tags/rust/">#rust</a>"#));
    }

    #[test]
    fn test_sitemap_omits_missing_lastmod() {
        let renderer = TemplateRenderer::new().unwrap();
        let mut context = Context::new();
        context.insert(
            "entries",
            &vec![
                SitemapEntry {
                    loc: "https://example.com/".to_string(),
                    lastmod: None,
                },
                SitemapEntry {
                    loc: "https://example.com/posts/a/".to_string(),
                    lastmod: Some("2024-01-15".to_string()),
                },
            ],
        );
        let xml = renderer.render("sitemap.xml", &context).unwrap();
        assert!(xml.contains("<url><loc>https://example.com/</loc></url>"));
        assert!(xml.contains("<lastmod>2024-01-15</lastmod>"));
    }
}
