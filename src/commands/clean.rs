//! Clean the output directory

use anyhow::{Context, Result};
use std::fs;

use crate::Site;

/// Remove the output directory if it exists
pub fn run(site: &Site) -> Result<()> {
    if site.output_dir.exists() {
        fs::remove_dir_all(&site.output_dir)
            .with_context(|| format!("Failed to remove {:?}", site.output_dir))?;
        tracing::info!("Deleted: {:?}", site.output_dir);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BuildMode, SiteConfig};

    #[test]
    fn test_clean_removes_output_only() {
        let dir = tempfile::tempdir().unwrap();
        let site =
            Site::from_config(dir.path(), SiteConfig::default(), BuildMode::Development).unwrap();
        fs::create_dir_all(site.output_dir.join("posts")).unwrap();
        fs::create_dir_all(&site.content_dir).unwrap();

        run(&site).unwrap();
        assert!(!site.output_dir.exists());
        assert!(site.content_dir.exists());

        // Nothing to delete is fine
        run(&site).unwrap();
    }
}
