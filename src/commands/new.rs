//! Create a new post

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

use crate::helpers::slugify;
use crate::Site;

/// Front-matter written into a scaffolded post
#[derive(Serialize)]
struct Scaffold<'a> {
    title: &'a str,
    date: String,
    tags: Vec<String>,
    draft: bool,
    description: &'a str,
}

/// Create `content_dir/<slug>.md` as a draft dated today
///
/// The slug comes from `slug` if given, otherwise from the title. An
/// existing file is never overwritten.
pub fn create_post(site: &Site, title: &str, slug: Option<&str>) -> Result<PathBuf> {
    let slug = slugify(slug.unwrap_or(title));
    if slug.is_empty() {
        anyhow::bail!("Cannot derive a slug from {:?}, pass --slug", title);
    }

    let timezone = site.config.site_timezone()?;
    let today = chrono::Utc::now().with_timezone(&timezone);

    let front_matter = serde_yaml::to_string(&Scaffold {
        title,
        date: today.format("%Y-%m-%d").to_string(),
        tags: Vec::new(),
        draft: true,
        description: "",
    })?;
    let content = format!("---\n{}---\n\n", front_matter);

    let file_path = site.content_dir.join(format!("{}.md", slug));
    if file_path.exists() {
        anyhow::bail!("File already exists: {:?}", file_path);
    }

    fs::create_dir_all(&site.content_dir)
        .with_context(|| format!("Failed to create {:?}", site.content_dir))?;
    fs::write(&file_path, content).with_context(|| format!("Failed to write {:?}", file_path))?;

    tracing::info!("Created: {:?}", file_path);
    Ok(file_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::FrontMatter;
    use crate::{BuildMode, SiteConfig};

    fn site(dir: &std::path::Path) -> Site {
        Site::from_config(dir, SiteConfig::default(), BuildMode::Development).unwrap()
    }

    #[test]
    fn test_create_post_scaffolds_a_draft() {
        let dir = tempfile::tempdir().unwrap();
        let site = site(dir.path());

        let path = create_post(&site, "Hello: World", None).unwrap();
        assert_eq!(path, site.content_dir.join("hello-world.md"));

        let content = fs::read_to_string(&path).unwrap();
        let (fm, _) = FrontMatter::parse(&content).unwrap();
        assert_eq!(fm.title(), Some("Hello: World"));
        assert!(fm.draft);
        assert!(fm.date_str().is_some());
    }

    #[test]
    fn test_create_post_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let site = site(dir.path());

        create_post(&site, "Post", Some("same")).unwrap();
        assert!(create_post(&site, "Other", Some("same")).is_err());
    }

    #[test]
    fn test_create_post_needs_a_slug() {
        let dir = tempfile::tempdir().unwrap();
        assert!(create_post(&site(dir.path()), "!!!", None).is_err());
    }
}
