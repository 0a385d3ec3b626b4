//! CLI commands

pub mod build;
pub mod check_deployed;
pub mod check_links;
pub mod clean;
pub mod dev;
pub mod list;
pub mod new;
