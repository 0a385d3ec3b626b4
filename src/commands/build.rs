//! Build the static site

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::time::Instant;

use crate::content::loader::ContentLoader;
use crate::generator::Generator;
use crate::Site;

/// What a build produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    /// Posts emitted (drafts excluded in production)
    pub posts: usize,
    /// Distinct tags across emitted posts
    pub tags: usize,
    /// Files rendered by the generator, static copies excluded
    pub files: usize,
}

/// Full build stamped with the current time
pub fn run(site: &Site) -> Result<BuildReport> {
    run_at(site, Utc::now())
}

/// Full build: load, render, wipe the output directory, write
pub fn run_at(site: &Site, build_time: DateTime<Utc>) -> Result<BuildReport> {
    let start = Instant::now();

    let loader = ContentLoader::new(site)?;
    let posts = loader.load_posts()?;
    tracing::debug!("Loaded {} posts ({:?} mode)", posts.len(), site.mode);

    let generator = Generator::new(site, build_time)?;
    let published = generator.published(posts)?;
    let tree = generator.render(&published)?;
    generator.write(&tree)?;

    let mut tags: Vec<&str> = published
        .iter()
        .flat_map(|p| p.tags.iter().map(String::as_str))
        .collect();
    tags.sort_unstable();
    tags.dedup();

    let report = BuildReport {
        posts: published.len(),
        tags: tags.len(),
        files: tree.len(),
    };

    tracing::info!("Build complete: {} posts", report.posts);
    tracing::debug!("Built in {:.2}s", start.elapsed().as_secs_f64());

    Ok(report)
}
