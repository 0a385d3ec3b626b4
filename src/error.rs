//! Domain errors that abort a build

use thiserror::Error;

/// The two failure classes a build can hit before any output is written
#[derive(Debug, Error)]
pub enum SiteError {
    /// Invalid or placeholder site configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// A content file that cannot be turned into a post
    #[error("content error in {file}: {reason}")]
    Content { file: String, reason: String },
}

impl SiteError {
    pub fn config(message: impl Into<String>) -> Self {
        SiteError::Config(message.into())
    }

    pub fn content(file: impl Into<String>, reason: impl Into<String>) -> Self {
        SiteError::Content {
            file: file.into(),
            reason: reason.into(),
        }
    }
}
