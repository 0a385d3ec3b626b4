//! Probe a deployed site for its key entry points

use anyhow::{Context, Result};
use std::time::Duration;

use crate::error::SiteError;
use crate::helpers::{FEED_PATH, HOME_PATH, SITEMAP_PATH};

pub const ENV_DEPLOY_BASE_URL: &str = "DEPLOY_BASE_URL";

const TIMEOUT_SECONDS: u64 = 30;

/// Outcome of one GET against the deployed site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    pub url: String,
    pub status: u16,
    pub ok: bool,
}

/// Trim the configured base URL; blank or missing is a configuration error
pub fn resolve_base_url(url: Option<&str>) -> Result<String, SiteError> {
    match url.map(str::trim) {
        Some(url) if !url.is_empty() => Ok(url.trim_end_matches('/').to_string()),
        _ => Err(SiteError::config(format!("{} is required", ENV_DEPLOY_BASE_URL))),
    }
}

/// URLs probed for a base URL (already trimmed)
pub fn targets(base_url: &str) -> Vec<String> {
    [HOME_PATH, FEED_PATH, SITEMAP_PATH]
        .iter()
        .map(|path| format!("{}{}", base_url, path))
        .collect()
}

/// GET every target, following redirects
pub async fn probe(base_url: &str) -> Result<Vec<Probe>> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(TIMEOUT_SECONDS))
        .build()
        .with_context(|| "Failed to create HTTP client")?;

    let mut probes = Vec::new();
    for url in targets(base_url) {
        let response = client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;
        let status = response.status();
        probes.push(Probe {
            url,
            status: status.as_u16(),
            ok: status.is_success(),
        });
    }

    Ok(probes)
}

/// Probe the deployed site and print `OK|NG <status> <url>` per target
pub async fn run(url: Option<&str>) -> Result<Vec<Probe>> {
    let base_url = resolve_base_url(url)?;
    let probes = probe(&base_url).await?;

    for probe in &probes {
        println!(
            "{} {} {}",
            if probe.ok { "OK" } else { "NG" },
            probe.status,
            probe.url
        );
    }

    if probes.iter().any(|p| !p.ok) {
        anyhow::bail!("deployed URL check failed");
    }

    Ok(probes)
}
