//! Document model

use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::FrontMatter;

/// Layout names that mean "write the body unwrapped"
const NO_LAYOUT: [&str; 2] = ["none", "null"];

/// One markdown content file
#[derive(Debug, Clone)]
pub struct Document {
    /// Source file path (relative, `/`-separated)
    pub source: String,

    /// Full source file path
    pub full_source: PathBuf,

    /// Parsed front-matter
    pub front_matter: FrontMatter,

    /// Markdown body after the front-matter block
    pub body: String,

    /// URL path (without baseurl), e.g. `posts/testing/`
    pub path: String,

    /// Output file path relative to the destination directory
    pub output: PathBuf,
}

impl Document {
    /// Build a document from a file's contents
    pub fn parse(source: &str, full_source: PathBuf, raw: &str, pretty_urls: bool) -> Self {
        let (front_matter, body) = FrontMatter::parse(raw);
        let (path, output) = output_paths(source, pretty_urls);

        Self {
            source: source.to_string(),
            full_source,
            front_matter,
            body: body.to_string(),
            path,
            output,
        }
    }

    /// Title from front-matter, falling back to the file name
    pub fn title(&self) -> String {
        match self.front_matter.title() {
            Some(title) => title.to_string(),
            None => Path::new(&self.source)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("Untitled")
                .to_string(),
        }
    }

    pub fn date(&self) -> Option<DateTime<Local>> {
        self.front_matter.date()
    }

    pub fn published(&self) -> bool {
        self.front_matter.published()
    }

    /// The layout to wrap this document in, if any
    pub fn layout<'a>(&'a self, default_layout: Option<&'a str>) -> Option<&'a str> {
        self.front_matter
            .layout()
            .or(default_layout)
            .filter(|name| !NO_LAYOUT.contains(name))
    }

    /// Summary used in listings and in layout contexts
    pub fn summary(&self, url: String) -> DocumentSummary {
        DocumentSummary {
            title: self.title(),
            date: self.date().map(|d| d.format("%Y-%m-%d").to_string()),
            path: self.path.clone(),
            url,
            source: self.source.clone(),
        }
    }
}

/// Lightweight view of a document for templates
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    pub title: String,
    pub date: Option<String>,
    pub path: String,
    pub url: String,
    pub source: String,
}

/// Map a source path to its URL path and output file
fn output_paths(source: &str, pretty_urls: bool) -> (String, PathBuf) {
    let without_ext = match source.rfind('.') {
        Some(dot) if !source[dot..].contains('/') => &source[..dot],
        _ => source,
    };

    // index files name their directory
    if without_ext == "index" || without_ext.ends_with("/index") {
        let dir = without_ext.trim_end_matches("index");
        return (dir.to_string(), PathBuf::from(format!("{}index.html", dir)));
    }

    if pretty_urls {
        let path = format!("{}/", without_ext);
        (path.clone(), PathBuf::from(format!("{}index.html", path)))
    } else {
        let path = format!("{}.html", without_ext);
        (path.clone(), PathBuf::from(path))
    }
}
