//! inkpress: a small static site generator for front-matter markdown blogs
//!
//! Each markdown document is split into front-matter and body, the body is
//! rendered block by block to HTML, and the result is wrapped in the layout
//! the front-matter names.

pub mod commands;
pub mod config;
pub mod content;
pub mod generator;
pub mod helpers;
pub mod layout;
pub mod server;

use anyhow::Result;
use std::path::{Path, PathBuf};

/// Name of the site configuration file
pub const CONFIG_FILE: &str = "_config.yml";

/// The main site handle
#[derive(Debug, Clone)]
pub struct Site {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Source directory
    pub source_dir: PathBuf,
    /// Output directory
    pub output_dir: PathBuf,
    /// Layouts directory
    pub layouts_dir: PathBuf,
    /// Includes directory
    pub includes_dir: PathBuf,
}

impl Site {
    /// Create a new site from a directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join(CONFIG_FILE);

        let config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            config::SiteConfig::default()
        };

        Ok(Self::with_config(base_dir, config))
    }

    /// Create a site with an explicit configuration
    pub fn with_config(base_dir: PathBuf, config: config::SiteConfig) -> Self {
        let source_dir = base_dir.join(&config.source);
        let output_dir = base_dir.join(&config.destination);
        let layouts_dir = source_dir.join(&config.layouts_dir);
        let includes_dir = source_dir.join(&config.includes_dir);

        Self {
            config,
            base_dir,
            source_dir,
            output_dir,
            layouts_dir,
            includes_dir,
        }
    }

    /// Initialize a new site
    pub fn init(&self) -> Result<()> {
        commands::init::run(self)
    }

    /// Build the static site
    pub fn build(&self) -> Result<generator::BuildReport> {
        commands::build::run(self)
    }

    /// Clean the output directory
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }

    /// Create a new document
    pub fn new_document(&self, title: &str, layout: Option<&str>) -> Result<PathBuf> {
        commands::new::run(self, title, layout)
    }
}
