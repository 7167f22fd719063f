//! Initialize a new site

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::{Site, CONFIG_FILE};

const CONFIG_TEMPLATE: &str = r#"# Site
title: My Blog
description: ''
author: ''
email: ''
language: en

# URL
url: http://localhost:4000
baseurl: ''
pretty_urls: true

# Directory
source: .
destination: _site
layouts_dir: _layouts
includes_dir: _includes
exclude: []

# Writing
default_layout: default
render_drafts: false
markdown_ext: [md, markdown]
markdown:
  highlight_theme: base16-ocean.dark
  line_numbers: false
  heading_ids: true
"#;

const LAYOUT_TEMPLATE: &str = include_str!("../layout/default.html");

/// Initialize a new site in the given directory
pub fn init_site(target_dir: &Path) -> Result<()> {
    let config_path = target_dir.join(CONFIG_FILE);
    if config_path.exists() {
        anyhow::bail!("A site already exists in {:?}", target_dir);
    }

    fs::create_dir_all(target_dir.join("_layouts"))
        .with_context(|| format!("Failed to create {:?}", target_dir))?;
    fs::create_dir_all(target_dir.join("_includes"))?;

    fs::write(&config_path, CONFIG_TEMPLATE)?;
    fs::write(target_dir.join("_layouts/default.html"), LAYOUT_TEMPLATE)?;

    let now = chrono::Local::now();
    let index = format!(
        r#"---
title: Hello World
date: {}
layout: default
---
# Hello World

Welcome to your new site. Edit `index.md` and run `inkpress build`.

```bash
inkpress serve --open
```
"#,
        now.format("%Y-%m-%d %H:%M:%S")
    );
    fs::write(target_dir.join("index.md"), index)?;

    tracing::info!("Initialized site in {:?}", target_dir);
    Ok(())
}

/// Run the init command with an existing site handle
pub fn run(site: &Site) -> Result<()> {
    init_site(&site.base_dir)
}
