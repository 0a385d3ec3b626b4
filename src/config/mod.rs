//! Configuration module

mod site;

pub use site::BuildMode;
pub use site::HighlightConfig;
pub use site::PreviewConfig;
pub use site::SiteConfig;
pub use site::{ENV_AUTHOR, ENV_BASE_PATH, ENV_PREVIEW_HOST, ENV_PREVIEW_PORT, ENV_SITE_URL};
