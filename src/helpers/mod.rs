//! Helper functions shared by the generator, templates and servers

mod date;
mod html;
mod slug;
mod url;

pub use date::*;
pub use html::*;
pub use slug::*;
pub use url::*;
