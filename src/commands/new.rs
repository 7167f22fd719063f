//! Create a new document

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use crate::content::DELIMITER;
use crate::Site;

/// Create a markdown document with front-matter, returning its path
pub fn run(site: &Site, title: &str, layout: Option<&str>) -> Result<PathBuf> {
    let now = chrono::Local::now();

    let slug = slug::slugify(title);
    if slug.is_empty() {
        anyhow::bail!("Cannot derive a file name from title {:?}", title);
    }

    fs::create_dir_all(&site.source_dir)
        .with_context(|| format!("Failed to create {:?}", site.source_dir))?;
    let file_path = site.source_dir.join(format!("{}.md", slug));

    if file_path.exists() {
        anyhow::bail!("File already exists: {:?}", file_path);
    }

    let layout = layout.or(site.config.default_layout.as_deref());

    let mut content = format!("{}\ntitle: {}\n", DELIMITER, title);
    content.push_str(&format!("date: {}\n", now.format("%Y-%m-%d %H:%M:%S")));
    if let Some(layout) = layout {
        content.push_str(&format!("layout: {}\n", layout));
    }
    content.push_str(DELIMITER);
    content.push('\n');

    fs::write(&file_path, content).with_context(|| format!("Failed to write {:?}", file_path))?;
    tracing::info!("Created: {:?}", file_path);

    Ok(file_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::FrontMatter;

    #[test]
    fn test_new_document() {
        let dir = tempfile::tempdir().unwrap();
        let site = Site::new(dir.path()).unwrap();

        let path = run(&site, "Testing With Docker", Some("post")).unwrap();
        assert_eq!(path, site.source_dir.join("testing-with-docker.md"));

        let raw = fs::read_to_string(&path).unwrap();
        let (front_matter, body) = FrontMatter::parse(&raw);
        assert_eq!(front_matter.title(), Some("Testing With Docker"));
        assert_eq!(front_matter.layout(), Some("post"));
        assert!(front_matter.date().is_some());
        assert_eq!(body, "");

        // Same title twice is refused
        assert!(run(&site, "Testing With Docker", None).is_err());
    }

    #[test]
    fn test_new_document_without_layout() {
        let dir = tempfile::tempdir().unwrap();
        let site = Site::new(dir.path()).unwrap();
        let path = run(&site, "Notes", None).unwrap();
        let (front_matter, _) = FrontMatter::parse(&fs::read_to_string(path).unwrap());
        assert_eq!(front_matter.layout(), None);
    }
}
