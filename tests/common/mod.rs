#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

use inkpress::commands::build::{self, BuildReport};
use inkpress::{BuildMode, Site, SiteConfig};

pub const HELLO: &str = r#"---
title: Hello World
date: 2024-01-15 09:30
tags:
  - rust
  - 日記
description: First <post> & more
ogTitle: Hello OG
---

# Heading

Some text with a [relative link](../second-post/) and an image:

![logo](../../images/logo.png)

```rust
fn main() {}
```
"#;

pub const SECOND: &str = r#"---
title: Second Post
date: 2024/02/01
tags: rust
---

See the [first post](../hello/).
"#;

pub const DRAFT: &str = r#"---
title: Work in progress
date: 2024-03-01
draft: true
tags: [drafts]
---

Not ready.
"#;

pub fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// A site directory with two posts, a draft and a static image
pub fn site_dir(base_path: &str) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    write(
        root,
        "site.yml",
        &format!(
            "title: Test Blog\n\
             description: Notes & things\n\
             site_url: https://example.com/\n\
             base_path: {:?}\n\
             author: Tester\n\
             timezone: Asia/Tokyo\n",
            base_path
        ),
    );
    write(root, "content/posts/hello.md", HELLO);
    write(root, "content/posts/2024/second-post.md", SECOND);
    write(root, "content/posts/draft.md", DRAFT);
    write(root, "public/images/logo.png", "png");
    write(root, "public/CNAME", "blog.example.com");

    dir
}

/// Load the site from its `site.yml` without consulting the process environment
pub fn load(root: &Path, mode: BuildMode) -> Site {
    let mut config = SiteConfig::load(root.join("site.yml")).unwrap();
    config.apply_env_with(|_| None).unwrap();
    Site::from_config(root, config, mode).unwrap()
}

pub fn build_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

pub fn build_site(site: &Site) -> BuildReport {
    build::run_at(site, build_time()).unwrap()
}

pub fn read(root: &Path, relative: &str) -> String {
    fs::read_to_string(root.join(relative))
        .unwrap_or_else(|e| panic!("{}: {}", relative, e))
}
