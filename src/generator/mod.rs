//! Generator module - renders documents into layouts and writes the site

use anyhow::{Context as _, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tera::Context;

use crate::config::SiteConfig;
use crate::content::{Document, DocumentSummary, MarkdownRenderer};
use crate::helpers::{encode_path, full_url_for, url_for};
use crate::layout::{LayoutError, Layouts};
use crate::Site;

/// A document that could not be rendered
#[derive(Debug)]
pub struct BuildFailure {
    /// Source path of the document
    pub source: String,
    pub error: LayoutError,
}

/// Outcome of one build
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Output files written, relative to the output directory
    pub rendered: Vec<PathBuf>,
    /// Number of static files copied
    pub copied: usize,
    /// Documents that failed; the rest of the batch still rendered
    pub failures: Vec<BuildFailure>,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Site-wide data available to layouts as `site`
#[derive(Debug, Serialize)]
struct SiteData<'a> {
    #[serde(flatten)]
    config: &'a SiteConfig,
    /// Every document, newest first
    pages: Vec<DocumentSummary>,
}

/// Static site generator
pub struct Generator {
    site: Site,
    renderer: MarkdownRenderer,
    layouts: Layouts,
}

impl Generator {
    /// Create a new generator
    pub fn new(site: &Site) -> Result<Self> {
        let renderer = MarkdownRenderer::from_config(&site.config.markdown);
        let layouts = Layouts::load(&site.config, &site.layouts_dir, &site.includes_dir)?;

        Ok(Self {
            site: site.clone(),
            renderer,
            layouts,
        })
    }

    /// Create a generator with an explicit set of layouts
    pub fn with_layouts(site: &Site, layouts: Layouts) -> Self {
        Self {
            site: site.clone(),
            renderer: MarkdownRenderer::from_config(&site.config.markdown),
            layouts,
        }
    }

    /// Generate the entire site
    pub fn generate(&self, documents: &[Document], assets: &[PathBuf]) -> Result<BuildReport> {
        let output_dir = &self.site.output_dir;
        fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create output directory {:?}", output_dir))?;

        let site_data = self.build_site_data(documents);
        let mut report = BuildReport::default();

        for doc in documents {
            let output_path = output_dir.join(&doc.output);

            match self.render_document(doc, &site_data) {
                Ok(html) => {
                    if let Some(parent) = output_path.parent() {
                        fs::create_dir_all(parent)
                            .with_context(|| format!("Failed to create dir {:?}", parent))?;
                    }
                    fs::write(&output_path, html)
                        .with_context(|| format!("Failed to write {:?}", output_path))?;
                    tracing::debug!("Generated: {:?}", output_path);
                    report.rendered.push(doc.output.clone());
                }
                Err(error) => {
                    tracing::error!("Failed to render {:?}: {}", doc.full_source, error);

                    // A failed document must not leave an older page behind
                    if output_path.is_file() {
                        fs::remove_file(&output_path)
                            .with_context(|| format!("Failed to remove {:?}", output_path))?;
                    }
                    report.failures.push(BuildFailure {
                        source: doc.source.clone(),
                        error,
                    });
                }
            }
        }

        report.copied = self.copy_assets(assets)?;

        tracing::info!(
            "Rendered {} documents, copied {} files, {} failed",
            report.rendered.len(),
            report.copied,
            report.failures.len()
        );

        Ok(report)
    }

    /// Render one document: markdown body, then its layout chain
    pub fn render_document(&self, doc: &Document, site: &impl Serialize) -> Result<String, LayoutError> {
        let body = self.renderer.render(&doc.body);

        let Some(layout) = doc.layout(self.site.config.default_layout.as_deref()) else {
            return Ok(body.html);
        };

        let mut context = Context::new();
        context.insert("site", site);
        context.insert("page", &self.page_data(doc));
        context.insert("toc", &body.toc);

        self.layouts.compose(layout, &body.html, &context)
    }

    /// Front-matter plus derived fields, exposed to layouts as `page`
    fn page_data(&self, doc: &Document) -> serde_json::Value {
        let mut page = serde_json::Map::new();
        for (key, value) in doc.front_matter.iter() {
            page.insert(key.to_string(), serde_json::Value::String(value.to_string()));
        }

        let encoded = encode_path(&doc.path);
        page.insert("title".to_string(), doc.title().into());
        page.insert(
            "permalink".to_string(),
            full_url_for(&self.site.config, &encoded).into(),
        );
        page.insert(
            "url".to_string(),
            url_for(&self.site.config, &encoded).into(),
        );
        page.insert("path".to_string(), doc.path.clone().into());
        page.insert("source".to_string(), doc.source.clone().into());
        if let Some(date) = doc.date() {
            page.insert("date".to_string(), date.format("%Y-%m-%d").to_string().into());
        }

        serde_json::Value::Object(page)
    }

    /// Build site data for layouts
    fn build_site_data<'a>(&'a self, documents: &[Document]) -> SiteData<'a> {
        let mut pages: Vec<_> = documents
            .iter()
            .map(|doc| doc.summary(url_for(&self.site.config, &encode_path(&doc.path))))
            .collect();

        // Newest first; undated pages after dated ones, by path
        pages.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.path.cmp(&b.path)));

        SiteData {
            config: &self.site.config,
            pages,
        }
    }

    /// Copy static files to the output directory
    fn copy_assets(&self, assets: &[PathBuf]) -> Result<usize> {
        for relative in assets {
            let src = self.site.source_dir.join(relative);
            let dest = self.site.output_dir.join(relative);
            copy_file(&src, &dest)?;
            tracing::debug!("Copied: {:?} -> {:?}", src, dest);
        }
        Ok(assets.len())
    }
}

fn copy_file(src: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(src, dest).with_context(|| format!("Failed to copy {:?} to {:?}", src, dest))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn site() -> (TempDir, Site) {
        let dir = tempfile::tempdir().unwrap();
        let site = Site::new(dir.path()).unwrap();
        (dir, site)
    }

    fn layouts(site: &Site) -> Layouts {
        Layouts::from_sources(
            &site.config,
            vec![(
                "default".to_string(),
                "<main>{{ content }}</main>".to_string(),
            )],
            Vec::new(),
        )
        .unwrap()
    }

    fn doc(source: &str, raw: &str) -> Document {
        Document::parse(source, PathBuf::from(source), raw, true)
    }

    #[test]
    fn test_end_to_end_default_layout() {
        let (_dir, site) = site();
        let generator = Generator::with_layouts(&site, layouts(&site));

        let document = doc("index.md", "---\nlayout: default\n---\n# Hello\n");
        assert_eq!(document.front_matter.layout(), Some("default"));
        assert_eq!(document.body, "# Hello\n");

        let html = generator
            .render_document(&document, &serde_json::json!({}))
            .unwrap();
        assert_eq!(html, "<main><h1 id=\"hello\">Hello</h1>\n</main>");
    }

    #[test]
    fn test_missing_layout_fails_only_that_document() {
        let (_dir, site) = site();
        let generator = Generator::with_layouts(&site, layouts(&site));

        let documents = vec![
            doc("broken.md", "---\nlayout: nonexistent\n---\n# Broken\n"),
            doc("index.md", "---\nlayout: default\n---\n# Home\n"),
        ];
        let report = generator.generate(&documents, &[]).unwrap();

        assert!(!report.is_success());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].source, "broken.md");
        assert!(matches!(
            report.failures[0].error,
            LayoutError::NotFound(ref name) if name == "nonexistent"
        ));
        assert_eq!(report.rendered, vec![PathBuf::from("index.html")]);
        assert!(!site.output_dir.join("broken/index.html").exists());
        assert!(site.output_dir.join("index.html").exists());
    }

    #[test]
    fn test_failed_document_removes_stale_output() {
        let (_dir, site) = site();
        let stale = site.output_dir.join("broken/index.html");
        fs::create_dir_all(stale.parent().unwrap()).unwrap();
        fs::write(&stale, "old").unwrap();

        let generator = Generator::with_layouts(&site, layouts(&site));
        let documents = vec![doc("broken.md", "---\nlayout: nonexistent\n---\n")];
        generator.generate(&documents, &[]).unwrap();

        assert!(!stale.exists());
    }

    #[test]
    fn test_document_without_layout_is_unwrapped() {
        let (_dir, site) = site();
        let generator = Generator::with_layouts(&site, layouts(&site));
        let html = generator
            .render_document(&doc("raw.md", "plain *text*\n"), &serde_json::json!({}))
            .unwrap();
        assert_eq!(html, "<p>plain <em>text</em></p>\n");
    }

    #[test]
    fn test_render_twice_is_identical() {
        let (_dir, site) = site();
        let generator = Generator::with_layouts(&site, layouts(&site));
        let document = doc(
            "post.md",
            "---\nlayout: default\n---\n## Setup\n\n```java\npublic class DockerServer {}\n```\n",
        );
        let site_data = serde_json::json!({});
        let first = generator.render_document(&document, &site_data).unwrap();
        let second = generator.render_document(&document, &site_data).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_page_and_site_context() {
        let (_dir, mut site) = site();
        site.config.baseurl = "/blog".to_string();
        let layouts = Layouts::from_sources(
            &site.config,
            vec![(
                "default".to_string(),
                "{{ page.title }}|{{ page.url }}|{% for p in site.pages %}{{ p.title }};{% endfor %}|{% for h in toc %}{{ h.id }}{% endfor %}"
                    .to_string(),
            )],
            Vec::new(),
        )
        .unwrap();
        let generator = Generator::with_layouts(&site, layouts);

        let documents = vec![
            doc("posts/old.md", "---\nlayout: default\ntitle: Old\ndate: 2018-01-01\n---\n"),
            doc("posts/new.md", "---\nlayout: default\ntitle: New\ndate: 2019-01-01\n---\n# Intro\n"),
        ];
        generator.generate(&documents, &[]).unwrap();

        let html = fs::read_to_string(site.output_dir.join("posts/new/index.html")).unwrap();
        assert_eq!(html, "New|/blog/posts/new/|New;Old;|intro");
    }

    #[test]
    fn test_assets_are_copied() {
        let (_dir, site) = site();
        fs::create_dir_all(site.source_dir.join("images")).unwrap();
        fs::write(site.source_dir.join("images/a.png"), "png").unwrap();

        let generator = Generator::with_layouts(&site, layouts(&site));
        let report = generator
            .generate(&[], &[PathBuf::from("images/a.png")])
            .unwrap();

        assert_eq!(report.copied, 1);
        assert_eq!(
            fs::read_to_string(site.output_dir.join("images/a.png")).unwrap(),
            "png"
        );
    }
}
