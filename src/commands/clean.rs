//! Clean the output directory

use anyhow::{Context, Result};
use std::fs;

use crate::Site;

/// Delete the generated site
pub fn run(site: &Site) -> Result<()> {
    if site.output_dir == site.source_dir || site.source_dir.starts_with(&site.output_dir) {
        anyhow::bail!(
            "Refusing to delete {:?}: it contains the source directory",
            site.output_dir
        );
    }

    if site.output_dir.exists() {
        fs::remove_dir_all(&site.output_dir)
            .with_context(|| format!("Failed to delete {:?}", site.output_dir))?;
        tracing::info!("Deleted: {:?}", site.output_dir);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_removes_output() {
        let dir = tempfile::tempdir().unwrap();
        let site = Site::new(dir.path()).unwrap();
        fs::create_dir_all(site.output_dir.join("posts")).unwrap();
        fs::write(site.output_dir.join("index.html"), "x").unwrap();

        run(&site).unwrap();
        assert!(!site.output_dir.exists());

        // Nothing to clean is fine
        run(&site).unwrap();
    }

    #[test]
    fn test_clean_refuses_source_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = crate::config::SiteConfig {
            destination: ".".to_string(),
            ..Default::default()
        };
        let site = Site::with_config(dir.path().to_path_buf(), config);
        assert!(run(&site).is_err());
        assert!(dir.path().exists());
    }
}
