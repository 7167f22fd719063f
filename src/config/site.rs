//! Site configuration (_config.yml)

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub author: String,
    pub email: String,
    pub language: String,

    // URL
    pub url: String,
    pub baseurl: String,
    pub pretty_urls: bool,

    // Directory
    pub source: String,
    pub destination: String,
    pub layouts_dir: String,
    pub includes_dir: String,
    #[serde(default)]
    pub exclude: Vec<String>,

    // Writing
    pub default_layout: Option<String>,
    pub render_drafts: bool,
    pub markdown_ext: Vec<String>,
    #[serde(default)]
    pub markdown: MarkdownConfig,

    // Store any additional fields, in file order
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_yaml::Value>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "My Blog".to_string(),
            description: String::new(),
            author: String::new(),
            email: String::new(),
            language: "en".to_string(),

            url: "http://localhost:4000".to_string(),
            baseurl: String::new(),
            pretty_urls: true,

            source: ".".to_string(),
            destination: "_site".to_string(),
            layouts_dir: "_layouts".to_string(),
            includes_dir: "_includes".to_string(),
            exclude: Vec::new(),

            default_layout: None,
            render_drafts: false,
            markdown_ext: vec!["md".to_string(), "markdown".to_string()],
            markdown: MarkdownConfig::default(),

            extra: IndexMap::new(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;

        // An empty _config.yml deserializes to unit, not a mapping
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: SiteConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {:?}", path))?;
        Ok(config)
    }

    /// Whether a file extension marks a markdown document
    pub fn is_markdown_ext(&self, ext: &str) -> bool {
        self.markdown_ext
            .iter()
            .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }
}

/// Markdown renderer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkdownConfig {
    /// syntect theme used for fenced code blocks
    pub highlight_theme: String,
    /// Emit a line-number gutter next to highlighted code
    pub line_numbers: bool,
    /// Give headings slug `id` attributes
    pub heading_ids: bool,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            highlight_theme: "base16-ocean.dark".to_string(),
            line_numbers: false,
            heading_ids: true,
        }
    }
}
