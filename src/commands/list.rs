//! List site content

use anyhow::Result;
use clap::ValueEnum;
use indexmap::IndexMap;

use crate::content::loader::ContentLoader;
use crate::Site;

/// What `list` prints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ListKind {
    #[default]
    Posts,
    Tags,
}

/// List site content by type
pub fn run(site: &Site, kind: ListKind) -> Result<()> {
    let loader = ContentLoader::new(site)?;
    let mut posts = loader.load_posts()?;
    posts.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.slug.cmp(&b.slug)));

    match kind {
        ListKind::Posts => {
            println!("Posts ({}):", posts.len());
            for post in &posts {
                println!(
                    "  {} - {} [{}]{}",
                    post.date.format("%Y-%m-%d"),
                    post.title,
                    post.slug,
                    if post.draft { " (draft)" } else { "" }
                );
            }
        }
        ListKind::Tags => {
            let tags = count_tags(posts.iter().flat_map(|p| p.tags.iter()));
            println!("Tags ({}):", tags.len());
            for (tag, count) in tags {
                println!("  {} ({})", tag, count);
            }
        }
    }

    Ok(())
}

/// Tag counts, most used first; ties keep first-seen order
fn count_tags<'a>(tags: impl Iterator<Item = &'a String>) -> Vec<(String, usize)> {
    let mut counts: IndexMap<String, usize> = IndexMap::new();
    for tag in tags {
        *counts.entry(tag.clone()).or_insert(0) += 1;
    }
    let mut counts: Vec<_> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}
