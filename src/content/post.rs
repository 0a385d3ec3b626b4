//! Post model

use chrono::DateTime;
use chrono_tz::Tz;

/// A blog post, built once per build from a source file
#[derive(Debug, Clone)]
pub struct Post {
    /// Post title
    pub title: String,

    /// Publication date in the site timezone
    pub date: DateTime<Tz>,

    /// Publication date formatted for display
    pub date_text: String,

    /// Post tags, in front-matter order without duplicates
    pub tags: Vec<String>,

    /// Drafts are only emitted in development builds
    pub draft: bool,

    /// Short summary used in lists, meta tags and the feed
    pub description: String,

    /// URL-safe identifier used for `/posts/<slug>/`
    pub slug: String,

    /// Rendered HTML body
    pub html: String,

    /// Open Graph title
    pub og_title: String,

    /// Open Graph description
    pub og_description: String,

    /// Source file path relative to the content directory
    pub source: String,
}

impl Post {
    /// Create a new post with minimal required fields
    pub fn new(title: String, date: DateTime<Tz>, slug: String, source: String) -> Self {
        Self {
            og_title: title.clone(),
            title,
            date,
            date_text: String::new(),
            tags: Vec::new(),
            draft: false,
            description: String::new(),
            slug,
            html: String::new(),
            og_description: String::new(),
            source,
        }
    }
}
