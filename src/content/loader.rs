//! Content loader - loads documents and static files from the source directory

use anyhow::{Context, Result};
use glob::Pattern;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use super::Document;
use crate::Site;

/// Loads content from the source directory
pub struct ContentLoader<'a> {
    site: &'a Site,
    exclude: Vec<Pattern>,
}

/// Everything found under the source directory
#[derive(Debug, Default)]
pub struct SourceTree {
    pub documents: Vec<Document>,
    /// Non-markdown files, relative to the source directory
    pub assets: Vec<PathBuf>,
}

impl<'a> ContentLoader<'a> {
    /// Create a new content loader
    pub fn new(site: &'a Site) -> Self {
        let exclude = site
            .config
            .exclude
            .iter()
            .filter_map(|p| match Pattern::new(p) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    tracing::warn!("Ignoring invalid exclude pattern {:?}: {}", p, e);
                    None
                }
            })
            .collect();

        Self { site, exclude }
    }

    /// Walk the source directory and sort files into documents and assets
    pub fn load(&self) -> Result<SourceTree> {
        let mut tree = SourceTree::default();

        let walker = WalkDir::new(&self.site.source_dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !self.is_skipped(e));

        for entry in walker.filter_map(|e| e.ok()) {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let relative = path.strip_prefix(&self.site.source_dir).unwrap_or(path);

            if self.is_markdown_file(path) {
                match self.load_document(path, relative) {
                    Ok(doc) => {
                        if doc.published() || self.site.config.render_drafts {
                            tree.documents.push(doc);
                        } else {
                            tracing::debug!("Skipping unpublished document {:?}", relative);
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load document {:?}: {}", path, e);
                    }
                }
            } else {
                tree.assets.push(relative.to_path_buf());
            }
        }

        Ok(tree)
    }

    /// Load all markdown documents
    pub fn load_documents(&self) -> Result<Vec<Document>> {
        Ok(self.load()?.documents)
    }

    /// Load a single document from a file
    fn load_document(&self, path: &Path, relative: &Path) -> Result<Document> {
        let raw = fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        let source = to_slash(relative);
        Ok(Document::parse(
            &source,
            path.to_path_buf(),
            &raw,
            self.site.config.pretty_urls,
        ))
    }

    /// Whether to prune this entry (and everything below it) from the walk
    fn is_skipped(&self, entry: &DirEntry) -> bool {
        let path = entry.path();

        // Never skip the root itself
        if entry.depth() == 0 {
            return false;
        }

        // Skip special files and directories (_layouts, _site, .git, ...)
        let hidden = entry
            .file_name()
            .to_str()
            .map(|name| name.starts_with('_') || name.starts_with('.'))
            .unwrap_or(false);
        if hidden || path == self.site.output_dir {
            return true;
        }

        let relative = to_slash(path.strip_prefix(&self.site.source_dir).unwrap_or(path));
        self.exclude.iter().any(|p| p.matches(&relative))
    }

    /// Check if a file is a markdown file
    fn is_markdown_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.site.config.is_markdown_ext(e))
            .unwrap_or(false)
    }
}

/// Render a relative path with `/` separators
fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
