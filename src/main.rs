//! CLI entry point for inkpress

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use inkpress::commands::check_deployed::ENV_DEPLOY_BASE_URL;
use inkpress::commands::list::ListKind;
use inkpress::{BuildMode, Site};

#[derive(Parser)]
#[command(name = "inkpress")]
#[command(version)]
#[command(about = "A small static blog generator with a live-reload preview server", long_about = None)]
struct Cli {
    /// Set the site directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct PreviewArgs {
    /// Address to bind to (overrides PREVIEW_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides PREVIEW_PORT)
    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the static site
    #[command(alias = "b")]
    Build {
        /// Production drops drafts and rejects placeholder config
        #[arg(short, long, value_enum, env = "SITE_ENV", default_value = "development")]
        mode: BuildMode,
    },

    /// Serve the built site
    #[command(alias = "s")]
    Serve {
        #[command(flatten)]
        preview: PreviewArgs,
    },

    /// Build, serve with live reload and rebuild on change
    Dev {
        #[command(flatten)]
        preview: PreviewArgs,
    },

    /// Check internal links in the built site
    CheckLinks,

    /// Check that a deployed site answers on its key URLs
    CheckDeployed {
        /// Base URL of the deployed site
        #[arg(long, env = ENV_DEPLOY_BASE_URL)]
        url: Option<String>,
    },

    /// Create a new draft post
    New {
        /// Title of the new post
        title: String,

        /// Slug (defaults to the slugified title)
        #[arg(short, long)]
        slug: Option<String>,
    },

    /// List posts or tags
    List {
        #[arg(value_enum, default_value = "posts")]
        kind: ListKind,
    },

    /// Remove the output directory
    Clean,
}

fn load_site(base_dir: &Path, mode: BuildMode, preview: Option<PreviewArgs>) -> Result<Site> {
    let mut site = Site::new(base_dir, mode)?;
    if let Some(preview) = preview {
        if let Some(host) = preview.host {
            site.config.preview.host = host;
        }
        if let Some(port) = preview.port {
            site.config.preview.port = port;
        }
    }
    Ok(site)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "inkpress=debug,info"
    } else {
        "inkpress=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to read current directory")?,
    };

    match cli.command {
        Commands::Build { mode } => {
            let site = load_site(&base_dir, mode, None)?;
            tracing::info!("Building site ({:?})...", mode);
            site.build()?;
        }

        Commands::Serve { preview } => {
            let site = load_site(&base_dir, BuildMode::Development, Some(preview))?;
            inkpress::server::start(&site, false).await?;
        }

        Commands::Dev { preview } => {
            let site = load_site(&base_dir, BuildMode::Development, Some(preview))?;
            inkpress::commands::dev::run(site).await?;
        }

        Commands::CheckLinks => {
            let site = load_site(&base_dir, BuildMode::Development, None)?;
            inkpress::commands::check_links::run(&site)?;
        }

        Commands::CheckDeployed { url } => {
            inkpress::commands::check_deployed::run(url.as_deref()).await?;
        }

        Commands::New { title, slug } => {
            let site = load_site(&base_dir, BuildMode::Development, None)?;
            let path = inkpress::commands::new::create_post(&site, &title, slug.as_deref())?;
            println!("Created: {}", path.display());
        }

        Commands::List { kind } => {
            let site = load_site(&base_dir, BuildMode::Development, None)?;
            inkpress::commands::list::run(&site, kind)?;
        }

        Commands::Clean => {
            let site = load_site(&base_dir, BuildMode::Development, None)?;
            site.clean()?;
            println!("Cleaned successfully!");
        }
    }

    Ok(())
}
